//! Session lifecycle: login, refresh-token rotation, logout
//!
//! A user holds at most one live refresh token. Login replaces whatever was
//! there; refresh consumes the presented token and issues its successor in
//! one conditional step, so two concurrent refreshes of the same token can
//! never both succeed.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tms_core::{NewRefreshToken, RefreshTokenRepository, Role, User, UserProfile, UserRepository};

use super::jwt::{generate_access_token, JwtConfig};
use super::password::{verify_password, PasswordConfig};
use super::tokens::{generate_refresh_token, hash_token};
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::error::AppError;

/// Tokens minted by a successful login or refresh
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    /// Raw refresh token; only its digest is persisted
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: SessionTokens,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    jwt_config: JwtConfig,
    refresh_ttl: Duration,
    password_config: PasswordConfig,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        jwt_config: JwtConfig,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_config,
            refresh_ttl: Duration::days(refresh_ttl_days),
            password_config: PasswordConfig::default(),
        }
    }

    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    /// Authenticate against the role the login endpoint is scoped to
    ///
    /// Unknown email, wrong role, inactive account and wrong password all
    /// produce the same `Unauthorized` response.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
        ctx: &RequestContext,
    ) -> Result<LoginOutcome, AppError> {
        let reject = |reason: &str| {
            audit_log(&AuditEvent::LoginFailure {
                email: email.to_string(),
                role: role.as_str().to_string(),
                reason: reason.to_string(),
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
            });
            AppError::unauthorized()
        };

        let user = match self.users.find_by_email_and_role(email, role).await? {
            Some(user) => user,
            None => {
                // Match the hashing cost of the wrong-password path
                let _ = self.password_config.hash(password);
                return Err(reject("no account with this email and role"));
            }
        };

        if !user.is_active() {
            return Err(reject("account inactive"));
        }

        if !verify_password(password, &user.password_hash)? {
            return Err(reject("invalid password"));
        }

        let refresh_token = generate_refresh_token();
        self.refresh_tokens
            .replace_for_user(self.new_refresh_row(user.id, &refresh_token))
            .await?;

        let tokens = self.session_tokens(&user, refresh_token)?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(LoginOutcome {
            tokens,
            user: user.to_profile(),
        })
    }

    /// Exchange a refresh token for a new access and refresh token pair
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<SessionTokens, AppError> {
        let record = self
            .refresh_tokens
            .find_by_hash(&hash_token(refresh_token))
            .await?
            .ok_or_else(AppError::unauthorized)?;

        if record.revoked {
            audit_log(&AuditEvent::RefreshTokenReuse {
                user_id: record.user_id,
                token_id: record.id,
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
            });
            return Err(AppError::unauthorized());
        }

        if record.is_expired() {
            tracing::debug!(token_id = record.id, "Expired refresh token presented");
            return Err(AppError::unauthorized());
        }

        let user = match self.users.find_by_id(record.user_id).await? {
            Some(user) if user.is_active() => user,
            _ => {
                self.refresh_tokens.revoke_if_active(record.id).await?;
                tracing::info!(
                    user_id = record.user_id,
                    "Refresh token revoked, owner missing or inactive"
                );
                return Err(AppError::unauthorized());
            }
        };

        let successor = generate_refresh_token();
        let rotated = self
            .refresh_tokens
            .rotate(record.id, self.new_refresh_row(user.id, &successor))
            .await?;

        if rotated.is_none() {
            // A concurrent refresh consumed the token first
            return Err(AppError::unauthorized());
        }

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        self.session_tokens(&user, successor)
    }

    /// Best-effort revoke of the presented token. Never fails.
    pub async fn logout(&self, refresh_token: Option<&str>, ctx: &RequestContext) {
        let mut user_id = None;

        if let Some(token) = refresh_token {
            let token_hash = hash_token(token);
            match self.refresh_tokens.find_by_hash(&token_hash).await {
                Ok(Some(record)) => user_id = Some(record.user_id),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Refresh token lookup failed during logout"),
            }
            if let Err(e) = self.refresh_tokens.revoke_by_hash(&token_hash).await {
                tracing::warn!(error = %e, "Failed to revoke refresh token during logout");
            }
        }

        audit_log(&AuditEvent::Logout {
            user_id,
            ip_address: ctx.ip_address.clone(),
        });
    }

    pub async fn current_user(&self, user_id: i64) -> Result<UserProfile, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| user.to_profile())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn new_refresh_row(&self, user_id: i64, raw_token: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token_hash: hash_token(raw_token),
            expires_at: Utc::now() + self.refresh_ttl,
        }
    }

    fn session_tokens(&self, user: &User, refresh_token: String) -> Result<SessionTokens, AppError> {
        let access_token = generate_access_token(&self.jwt_config, user.id, user.role)?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt_config.access_expiration_secs,
        })
    }
}
