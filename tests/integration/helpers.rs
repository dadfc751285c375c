//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use sessionhub_auth::{CredentialVerifier, JwtDecoder, JwtEncoder, PasswordHasher, TokenService};
use sessionhub_cache::CacheSessionRepository;
use sessionhub_cache::memory::MemoryCacheStore;
use sessionhub_core::config::{AuthConfig, SessionConfig};
use sessionhub_core::error::AppError;
use sessionhub_core::result::AppResult;
use sessionhub_entity::session::{ClientContext, SessionRepository};
use sessionhub_entity::user::{CreateUser, User, UserStore, normalize_email};

pub const PASSWORD: &str = "password123";

/// Users held in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create(&self, data: &CreateUser) -> AppResult<User> {
        let email = normalize_email(&data.email);
        if self.users.iter().any(|u| u.email == email) {
            return Err(AppError::conflict(format!("Email '{email}' is already registered")));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            display_name: data.display_name.clone(),
            password_hash: data.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.remove(&id).is_some())
    }
}

/// Cheap reversible "hash" so tests are not dominated by Argon2.
#[derive(Debug, Default)]
pub struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn hash(&self, plaintext: &str) -> AppResult<String> {
        Ok(format!("plain:{plaintext}"))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(plaintext))
    }
}

/// A token service over in-memory stores, with handles to inspect them.
pub struct TestApp {
    pub service: TokenService,
    pub sessions: Arc<dyn SessionRepository>,
    pub store: Arc<MemoryCacheStore>,
    pub users: Arc<MemoryUserStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub decoder: JwtDecoder,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(SessionConfig::default(), Arc::new(PlainVerifier))
    }

    pub fn with_session_config(config: SessionConfig) -> Self {
        Self::build(config, Arc::new(PlainVerifier))
    }

    pub fn with_argon2() -> Self {
        Self::build(SessionConfig::default(), Arc::new(PasswordHasher::new()))
    }

    fn build(config: SessionConfig, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let auth = AuthConfig {
            jwt_secret: "integration-secret".to_string(),
            ..AuthConfig::default()
        };
        let store = Arc::new(MemoryCacheStore::default());
        let sessions: Arc<dyn SessionRepository> = Arc::new(CacheSessionRepository::new(
            store.clone(),
            config.reclaim_batch_size,
        ));
        let users = Arc::new(MemoryUserStore::default());

        let service = TokenService::new(
            Arc::clone(&sessions),
            users.clone(),
            Arc::clone(&verifier),
            Arc::new(JwtEncoder::new(&auth)),
            config,
            &auth,
        );

        Self {
            service,
            sessions,
            store,
            users,
            verifier,
            decoder: JwtDecoder::new(&auth),
        }
    }

    /// Insert a user directly, bypassing registration.
    pub async fn create_user(&self, email: &str, password: &str) -> User {
        let password_hash = self.verifier.hash(password).unwrap();
        self.users
            .create(&CreateUser {
                email: email.to_string(),
                display_name: None,
                password_hash,
            })
            .await
            .unwrap()
    }

    /// Tokens of the user's live sessions, oldest first.
    pub async fn session_tokens(&self, user_id: Uuid) -> Vec<String> {
        self.sessions
            .get_all_by_user(user_id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.refresh_token().to_string())
            .collect()
    }
}

/// Client context for a device.
pub fn device(fingerprint: &str) -> ClientContext {
    ClientContext::new(fingerprint, "192.0.2.10", Some("integration-test/1.0".to_string()))
}
