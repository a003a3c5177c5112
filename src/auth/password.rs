use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// PHC string stored in `User::password`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow!("hash user password: {e}")
        })
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash unreadable");
        anyhow!("parse stored password hash: {e}")
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify user password: {e}")),
    }
}

/// Argon2 is slow on purpose; keep it off the async workers.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("join hash_password task")?
}

pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .context("join verify_password task")?
}
