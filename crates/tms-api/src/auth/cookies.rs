//! Session cookies
//!
//! `access_token` is sent on every path; `refresh_token` only to the auth
//! route group. Both are http-only, and `Secure` + `SameSite=Lax` in
//! production.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tms_core::AuthConfig;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub const ACCESS_COOKIE_PATH: &str = "/";
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub domain: Option<String>,
    pub access_max_age_secs: i64,
    pub refresh_max_age_secs: i64,
}

impl CookieConfig {
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        Self {
            secure: auth.environment.is_production(),
            domain: auth.cookie_domain.clone(),
            access_max_age_secs: auth.access_token_ttl_secs,
            refresh_max_age_secs: auth.refresh_token_ttl_days * 24 * 60 * 60,
        }
    }

    fn build(&self, name: &'static str, value: String, path: &'static str, max_age: i64) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .path(path)
            .http_only(true)
            .max_age(time::Duration::seconds(max_age));

        if self.secure {
            builder = builder.secure(true).same_site(SameSite::Lax);
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// Add both session cookies to the jar
    pub fn set_session(&self, jar: CookieJar, access_token: &str, refresh_token: &str) -> CookieJar {
        jar.add(self.build(
            ACCESS_COOKIE,
            access_token.to_string(),
            ACCESS_COOKIE_PATH,
            self.access_max_age_secs,
        ))
        .add(self.build(
            REFRESH_COOKIE,
            refresh_token.to_string(),
            REFRESH_COOKIE_PATH,
            self.refresh_max_age_secs,
        ))
    }

    /// Expire both session cookies, whether or not the client sent them
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(ACCESS_COOKIE, String::new(), ACCESS_COOKIE_PATH, 0))
            .add(self.build(REFRESH_COOKIE, String::new(), REFRESH_COOKIE_PATH, 0))
    }
}

pub fn read_access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn read_refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
