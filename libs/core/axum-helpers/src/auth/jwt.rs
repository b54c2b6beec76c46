use super::config::JwtConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// HS256 token signer and verifier.
///
/// The claims type is chosen by the caller; it must carry `exp` and `iss`
/// as Unix seconds and a string respectively.
#[derive(Clone)]
pub struct JwtAuth {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    issuer: String,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!(issuer = %config.issuer, "JWT auth initialized");
        Self {
            encoding: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            issuer: config.issuer.clone(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `claims` as a compact JWS.
    pub fn sign<C: Serialize>(&self, claims: &C) -> eyre::Result<String> {
        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, claims, &self.encoding)?)
    }

    /// Check signature, expiry and issuer, then decode the claims.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> eyre::Result<C> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<C>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}
