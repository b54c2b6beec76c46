//! Token signing configuration.

use core_config::{ConfigError, FromEnv, env_or_default, env_required};

pub const DEFAULT_ISSUER: &str = "users service";

/// JWT signing configuration.
///
/// Loaded from environment variables:
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `JWT_ISSUER` (default: `"users service"`)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Written to `iss` on issue and required on verify
    pub issuer: String,
}

impl JwtConfig {
    /// # Panics
    /// Panics if the secret is less than 32 characters.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.len() >= 32,
            "JWT secret must be at least 32 characters"
        );
        Self {
            secret,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;

        if secret.len() < 32 {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least 32 characters (got {}). Generate one with: openssl rand -base64 32",
                    secret.len()
                ),
            });
        }

        Ok(Self {
            secret,
            issuer: env_or_default("JWT_ISSUER", DEFAULT_ISSUER),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "this-is-a-valid-secret-with-32-chars!";

    #[test]
    #[should_panic(expected = "JWT secret must be at least 32 characters")]
    fn test_jwt_config_new_too_short() {
        JwtConfig::new("short");
    }

    #[test]
    fn test_jwt_config_from_env_defaults_issuer() {
        temp_env::with_vars([("JWT_SECRET", Some(SECRET)), ("JWT_ISSUER", None)], || {
            let config = JwtConfig::from_env().unwrap();
            assert_eq!(config.secret, SECRET);
            assert_eq!(config.issuer, DEFAULT_ISSUER);
        });
    }

    #[test]
    fn test_jwt_config_from_env_custom_issuer() {
        temp_env::with_vars(
            [("JWT_SECRET", Some(SECRET)), ("JWT_ISSUER", Some("staging users"))],
            || {
                assert_eq!(JwtConfig::from_env().unwrap().issuer, "staging users");
            },
        );
    }

    #[test]
    fn test_jwt_config_from_env_missing() {
        temp_env::with_var_unset("JWT_SECRET", || {
            let err = JwtConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("JWT_SECRET"));
        });
    }

    #[test]
    fn test_jwt_config_from_env_too_short() {
        temp_env::with_var("JWT_SECRET", Some("short"), || {
            let err = JwtConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("32 characters"));
        });
    }
}
