//! # sessionhub-auth
//!
//! Credential handling and refresh-session orchestration for SessionHub.
//!
//! ## Modules
//!
//! - `jwt`: access-token claims, signing, and verification
//! - `password`: Argon2id credential hashing and verification
//! - `session`: the [`TokenService`] driving login, refresh, and logout flows

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{AccessTokenSigner, Claims, JwtDecoder, JwtEncoder};
pub use password::{CredentialVerifier, PasswordHasher};
pub use session::TokenService;
