//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::config::HashingConfig;
use crate::error::{UserError, UserResult};

/// Argon2id hasher producing self-describing PHC strings.
///
/// Both operations run on the blocking pool.
#[derive(Clone, Debug)]
pub struct CredentialEngine {
    params: Params,
}

impl CredentialEngine {
    pub fn new(config: &HashingConfig) -> Result<Self, argon2::Error> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)?;
        Ok(Self { params })
    }

    /// Hash with a fresh random salt.
    pub async fn hash(&self, password: &str) -> UserResult<String> {
        let params = self.params.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(UserError::unexpected)?
        .map_err(|e| UserError::unexpected(e).context("generating password hash"))
    }

    /// Check `password` against a stored PHC string using the cost recorded
    /// in it. Malformed hashes and mismatches both yield `false`.
    pub async fn verify(&self, hash: &str, password: &str) -> bool {
        let hash = hash.to_owned();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            PasswordHash::new(&hash)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(password.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}

impl Default for CredentialEngine {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_engine() -> CredentialEngine {
    CredentialEngine::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
