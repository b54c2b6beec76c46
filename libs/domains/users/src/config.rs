use argon2::Params;
use core_config::{ConfigError, FromEnv, env_parse_or_default};

/// Argon2id cost parameters for new password hashes.
///
/// Environment variables (defaults are the argon2 crate's):
/// - `PASSWORD_HASH_MEMORY_KIB` (default: 19456)
/// - `PASSWORD_HASH_ITERATIONS` (default: 2)
/// - `PASSWORD_HASH_PARALLELISM` (default: 1)
///
/// Existing hashes keep verifying after a change; each carries its own cost.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl FromEnv for HashingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: env_parse_or_default("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_parse_or_default("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: env_parse_or_default("PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        })
    }
}
