//! Credential verification over Argon2 PHC hashes.
//!
//! `authenticate` answers the same way for an unknown user and a wrong password; the
//! reason only shows up in debug logs. Unknown users are still checked against a fixed
//! dummy hash so the two paths cost roughly the same.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};
use tracing::debug;

use crate::error::AppError;
use crate::identity::{Identity, IdentityStore};

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("codecamp-no-such-user").ok());

/// The only failure callers ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid credentials")]
pub struct InvalidCredentials;

impl From<InvalidCredentials> for AppError {
    fn from(_: InvalidCredentials) -> Self { AppError::InvalidCredentials }
}

pub fn authenticate(store: &IdentityStore, username: &str, password: &str) -> Result<Identity, InvalidCredentials> {
    let Some(identity) = store.find_by_name(username) else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(dummy, password);
        }
        debug!(target: "auth", user = %username, reason = "unknown_user", "credential check failed");
        return Err(InvalidCredentials);
    };
    if !verify_password(&identity.password_hash, password) {
        debug!(target: "auth", user = %username, reason = "wrong_password", "credential check failed");
        return Err(InvalidCredentials);
    }
    Ok(identity)
}
