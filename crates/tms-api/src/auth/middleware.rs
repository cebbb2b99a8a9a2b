/// Authorization gate for protected route groups
///
/// `auth_middleware` verifies the access token (cookie first, then the
/// `Authorization: Bearer` header) and stores the caller's identity in the
/// request extensions. `require_any_role` then admits only the listed roles.
use super::cookies::read_access_token;
use super::jwt::{validate_access_token, Claims};
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tms_core::Role;

/// Caller identity taken from a verified access token
///
/// Extract in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: Role,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthError::MissingToken | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        };

        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Access token from the cookie, falling back to a Bearer header
pub fn extract_access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    read_access_token(jar).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

/// Require a valid access token
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
///
/// let app = Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_access_token(&jar, request.headers()).ok_or(AuthError::MissingToken)?;

    let claims = match validate_access_token(&state.jwt_config, &token) {
        Ok(claims) => claims,
        Err(e) => {
            let ctx = RequestContext::from_headers(request.headers());
            audit_log(&AuditEvent::InvalidToken {
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
                reason: e.to_string(),
            });
            return Err(AuthError::InvalidToken);
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}

type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Admit only callers holding one of `allowed`
///
/// Must run after [`auth_middleware`]; with `route_layer` that means adding
/// it first:
///
/// ```ignore
/// let admin = Router::new()
///     .route("/departments", get(list_departments))
///     .route_layer(middleware::from_fn(require_any_role(&[Role::Admin])))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub fn require_any_role(
    allowed: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = *request
                .extensions()
                .get::<AuthenticatedUser>()
                .ok_or(AuthError::MissingToken)?;

            if !allowed.contains(&user.role) {
                let ctx = RequestContext::from_headers(request.headers());
                audit_log(&AuditEvent::AccessDenied {
                    user_id: user.user_id,
                    role: user.role.as_str().to_string(),
                    resource: request.uri().path().to_string(),
                    required_roles: allowed
                        .iter()
                        .map(Role::as_str)
                        .collect::<Vec<_>>()
                        .join(","),
                    ip_address: ctx.ip_address,
                });

                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_user_from_claims() {
        let claims = Claims {
            user_id: 42,
            role: Role::Manager,
            iat: 1000,
            exp: 2000,
            token_type: "access".to_string(),
        };

        let user = AuthenticatedUser::from(claims);
        assert_eq!(user.user_id, 42);
        assert_eq!(user.role, Role::Manager);
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            "access_token",
            "from-cookie",
        ));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(
            extract_access_token(&jar, &headers).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            extract_access_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_malformed_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(extract_access_token(&CookieJar::new(), &headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(extract_access_token(&CookieJar::new(), &headers).is_none());
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            AuthError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
