//! HS256 access-token signing.

use jsonwebtoken::{EncodingKey, Header, encode};

use sessionhub_core::config::AuthConfig;
use sessionhub_core::error::AppError;
use sessionhub_core::result::AppResult;

use super::claims::Claims;

/// Turns claims into a signed, stateless access token.
pub trait AccessTokenSigner: Send + Sync + std::fmt::Debug + 'static {
    /// Sign `claims`.
    fn sign(&self, claims: &Claims) -> AppResult<String>;
}

/// Signs access tokens with an HMAC secret.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").finish_non_exhaustive()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }
}

impl AccessTokenSigner for JwtEncoder {
    fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }
}
