//! Authentication API handlers
//!
//! Login is role-scoped: each role has its own endpoint, and an account
//! only authenticates through the endpoint of its own role. Session tokens
//! travel in http-only cookies; the access token is also returned in the
//! body for clients that prefer the `Authorization` header.

use crate::audit::RequestContext;
use crate::auth::cookies::read_refresh_token;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::MessageResponse;
use crate::services::NewAccount;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tms_core::{Role, UserProfile, UserStatus};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
    pub access_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub message: String,
    pub access_token: String,
    pub expires_in: i64,
}

/// Self-registration form; missing fields are reported together
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    pub email: String,
    pub department_id: i64,
    pub position: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

async fn login(
    state: &AppState,
    jar: CookieJar,
    headers: &HeaderMap,
    role: Role,
    request: LoginRequest,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    request.validate()?;

    let ctx = RequestContext::from_headers(headers);
    let email = request.email.trim().to_lowercase();
    let outcome = state
        .sessions
        .login(&email, &request.password, role, &ctx)
        .await?;

    let jar = state.cookies.set_session(
        jar,
        &outcome.tokens.access_token,
        &outcome.tokens.refresh_token,
    );

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: outcome.user,
            access_token: outcome.tokens.access_token,
            expires_in: outcome.tokens.expires_in,
        }),
    ))
}

/// HR administrator login
#[utoipa::path(
    post,
    path = "/api/v1/auth/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookies set", body = LoginResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    login(&state, jar, &headers, Role::Admin, request).await
}

/// Department head login
#[utoipa::path(
    post,
    path = "/api/v1/auth/manager/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn manager_login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    login(&state, jar, &headers, Role::Manager, request).await
}

/// Staff login
#[utoipa::path(
    post,
    path = "/api/v1/auth/staff/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn staff_login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    login(&state, jar, &headers, Role::Staff, request).await
}

async fn register(
    state: &AppState,
    headers: &HeaderMap,
    role: Role,
    request: RegisterRequest,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let ctx = RequestContext::from_headers(headers);
    let account = NewAccount {
        name: request.name,
        email: request.email,
        employee_id: request.employee_id,
        phone: request.phone,
        position: request.position,
        password: request.password,
        department_id: request.department_id,
        status: UserStatus::Active,
    };

    let user = state
        .users
        .register(account, &request.confirm_password, role, &ctx)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
            user,
        }),
    ))
}

/// Register a department head account
#[utoipa::path(
    post,
    path = "/api/v1/auth/manager/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input or duplicate account", body = crate::error::ApiError),
    )
)]
pub async fn manager_register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    register(&state, &headers, Role::Manager, request).await
}

/// Register a staff account
#[utoipa::path(
    post,
    path = "/api/v1/auth/staff/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid input or duplicate account", body = crate::error::ApiError),
    )
)]
pub async fn staff_register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    register(&state, &headers, Role::Staff, request).await
}

/// Rotate the refresh token and mint a new access token
///
/// Any failure clears both session cookies.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens rotated, session cookies reset", body = RefreshResponse),
        (status = 401, description = "Missing, expired, revoked or reused refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<RefreshResponse>), (CookieJar, AppError)> {
    let Some(refresh_token) = read_refresh_token(&jar) else {
        return Err((
            state.cookies.clear_session(jar),
            AppError::Unauthorized("Refresh token missing".to_string()),
        ));
    };

    let ctx = RequestContext::from_headers(&headers);
    match state.sessions.refresh(&refresh_token, &ctx).await {
        Ok(tokens) => {
            let jar = state
                .cookies
                .set_session(jar, &tokens.access_token, &tokens.refresh_token);
            Ok((
                jar,
                Json(RefreshResponse {
                    message: "Token refreshed".to_string(),
                    access_token: tokens.access_token,
                    expires_in: tokens.expires_in,
                }),
            ))
        }
        Err(e) => Err((state.cookies.clear_session(jar), e)),
    }
}

/// End the session; succeeds whether or not a session existed
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookies cleared", body = MessageResponse),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<MessageResponse>) {
    let ctx = RequestContext::from_headers(&headers);
    let refresh_token = read_refresh_token(&jar);
    state
        .sessions
        .logout(refresh_token.as_deref(), &ctx)
        .await;

    (
        state.cookies.clear_session(jar),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.sessions.current_user(user.user_id).await?))
}
