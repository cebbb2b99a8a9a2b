//! Opaque refresh tokens

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Random bytes per refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure, URL-safe refresh token
pub fn generate_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; REFRESH_TOKEN_BYTES] = rng.gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Digest stored in place of the raw token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
