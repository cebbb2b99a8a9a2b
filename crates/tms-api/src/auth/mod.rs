//! Authentication and authorization
//!
//! - Access-token signing and verification (HS256)
//! - Opaque refresh tokens and their digests
//! - Password hashing with Argon2id
//! - Session cookies
//! - The session manager (login, refresh rotation, logout)
//! - The authorization gate middleware

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
pub mod tokens;

pub use cookies::CookieConfig;
pub use jwt::{generate_access_token, validate_access_token, Claims, JwtConfig, JwtError};
pub use middleware::{auth_middleware, require_any_role, AuthError, AuthenticatedUser};
pub use password::{hash_password, hash_password_with_config, verify_password, PasswordConfig};
pub use session::{LoginOutcome, SessionManager, SessionTokens};
pub use tokens::{generate_refresh_token, hash_token};
