//! Security audit logging for authentication events
//!
//! All audit events are logged at INFO (WARN for token reuse) with the
//! "audit" target, so they can be filtered and routed separately from
//! application logs. Each record carries the event serialized as JSON.
//!
//! ```ignore
//! use tms_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: 7,
//!     email: "mali@company.com".to_string(),
//!     role: "Staff".to_string(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: i64,
        email: String,
        role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login; the reason is never returned to the client
    LoginFailure {
        email: String,
        role: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    Logout {
        user_id: Option<i64>,
        ip_address: Option<String>,
    },

    TokenRefresh {
        user_id: i64,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// A refresh token was presented after it had been revoked
    RefreshTokenReuse {
        user_id: i64,
        token_id: i64,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    RegistrationSuccess {
        user_id: i64,
        email: String,
        role: String,
        ip_address: Option<String>,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// An administrator ended every session of an account
    SessionsRevoked {
        user_id: i64,
        admin_id: i64,
        reason: String,
        revoked: u64,
    },

    /// Authenticated but not allowed on the route group
    AccessDenied {
        user_id: i64,
        role: String,
        resource: String,
        required_roles: String,
        ip_address: Option<String>,
    },

    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },
}

/// Client metadata captured once per request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event on the "audit" target
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess { user_id, email, .. } => {
            info!(target: "audit", event = %event_json, user_id, email = %email, "Login successful");
        }
        AuditEvent::LoginFailure { email, reason, .. } => {
            info!(target: "audit", event = %event_json, email = %email, reason = %reason, "Login failed");
        }
        AuditEvent::Logout { user_id, .. } => {
            info!(target: "audit", event = %event_json, user_id = ?user_id, "Logout");
        }
        AuditEvent::TokenRefresh { user_id, .. } => {
            info!(target: "audit", event = %event_json, user_id, "Token refreshed");
        }
        AuditEvent::RefreshTokenReuse {
            user_id, token_id, ..
        } => {
            warn!(target: "audit", event = %event_json, user_id, token_id, "Revoked refresh token presented");
        }
        AuditEvent::RegistrationSuccess { user_id, email, .. } => {
            info!(target: "audit", event = %event_json, user_id, email = %email, "Registration successful");
        }
        AuditEvent::RegistrationFailure { email, reason, .. } => {
            info!(target: "audit", event = %event_json, email = %email, reason = %reason, "Registration failed");
        }
        AuditEvent::SessionsRevoked {
            user_id, reason, ..
        } => {
            info!(target: "audit", event = %event_json, user_id, reason = %reason, "Sessions revoked");
        }
        AuditEvent::AccessDenied {
            user_id, resource, ..
        } => {
            info!(target: "audit", event = %event_json, user_id, resource = %resource, "Access denied");
        }
        AuditEvent::InvalidToken { reason, .. } => {
            info!(target: "audit", event = %event_json, reason = %reason, "Invalid token");
        }
    }
}

/// Client IP from X-Forwarded-For (first hop) or X-Real-IP
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::RefreshTokenReuse {
            user_id: 3,
            token_id: 11,
            ip_address: None,
            user_agent: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"refresh_token_reuse\""));
        assert!(json.contains("\"token_id\":11"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "a@co.com".to_string(),
            role: "Staff".to_string(),
            reason: "no account with this role".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: None,
        });
        audit_log(&AuditEvent::Logout {
            user_id: None,
            ip_address: None,
        });
    }

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.1, 198.51.100.1".parse().unwrap());
        headers.insert(axum::http::header::USER_AGENT, "curl/8".parse().unwrap());

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(extract_ip_address(&headers), Some("203.0.113.9".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
