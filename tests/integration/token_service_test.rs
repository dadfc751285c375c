//! Integration tests for login, registration, rotation, and logout flows.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use sessionhub_auth::{JwtEncoder, TokenService};
use sessionhub_cache::CacheSessionRepository;
use sessionhub_core::config::{AuthConfig, SessionConfig};
use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::result::AppResult;
use sessionhub_entity::session::{RefreshSession, SessionRepository, SessionTransaction};

use helpers::{PASSWORD, TestApp, device};

#[tokio::test]
async fn test_register_then_login_with_argon2() {
    let app = TestApp::with_argon2();
    let issued = app
        .service
        .register("Ada@Example.com", PASSWORD, Some("Ada".into()), &device("laptop"))
        .await
        .unwrap();
    assert_eq!(issued.refresh_token.len(), 64);
    assert!(issued.expires_in_ms > 0);

    let claims = app.decoder.decode(&issued.access_token).unwrap();
    let session = app
        .sessions
        .get_by_token(&issued.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claims.user_id(), session.user_id());

    let again = app
        .service
        .login("ada@example.com", PASSWORD, &device("phone"))
        .await
        .unwrap();
    assert_ne!(again.refresh_token, issued.refresh_token);
    assert_eq!(app.session_tokens(session.user_id()).await.len(), 2);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new();
    app.create_user("grace@example.com", PASSWORD).await;

    let err = app
        .service
        .login("grace@example.com", "wrong-password", &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let err = app
        .service
        .login("nobody@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.service
        .register("linus@example.com", PASSWORD, None, &device("a"))
        .await
        .unwrap();

    let err = app
        .service
        .register("  LINUS@example.com ", PASSWORD, None, &device("b"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = TestApp::new();
    let err = app
        .service
        .register("not-an-email", "short", None, &device("a"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(app.users.len(), 0);
}

#[tokio::test]
async fn test_invalid_client_context_is_validation_error() {
    let app = TestApp::new();
    app.create_user("ip@example.com", PASSWORD).await;

    let mut ctx = device("laptop");
    ctx.ip_address = "localhost".into();
    let err = app
        .service
        .login("ip@example.com", PASSWORD, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_refresh_with_bad_context_keeps_session() {
    let app = TestApp::new();
    let user = app.create_user("ctx@example.com", PASSWORD).await;
    let issued = app
        .service
        .login("ctx@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();

    let mut ctx = device("laptop");
    ctx.ip_address = "not-an-ip".into();
    let err = app
        .service
        .refresh_token(&issued.refresh_token, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert!(app.sessions.get_by_token(&issued.refresh_token).await.unwrap().is_some());
    assert_eq!(app.session_tokens(user.id).await, vec![issued.refresh_token.clone()]);

    app.service
        .refresh_token(&issued.refresh_token, &device("laptop"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_register_with_bad_context_creates_no_user() {
    let app = TestApp::new();
    let mut ctx = device("");
    ctx.user_agent = Some(String::new());

    let err = app
        .service
        .register("new@example.com", PASSWORD, None, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(app.users.len(), 0);
}

#[tokio::test]
async fn test_change_password_with_bad_context_changes_nothing() {
    let app = TestApp::new();
    let user = app.create_user("keep@example.com", PASSWORD).await;
    let issued = app
        .service
        .login("keep@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();

    let mut ctx = device("laptop");
    ctx.ip_address = "300.1.1.1".into();
    let err = app
        .service
        .change_password(user.id, PASSWORD, "brand-new-pass", &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(app.session_tokens(user.id).await, vec![issued.refresh_token.clone()]);
    app.service
        .login("keep@example.com", PASSWORD, &device("phone"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_refresh_rotates_and_consumes_token() {
    let app = TestApp::new();
    let user = app.create_user("rot@example.com", PASSWORD).await;
    let first = app
        .service
        .login("rot@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();

    let second = app
        .service
        .refresh_token(&first.refresh_token, &device("laptop"))
        .await
        .unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);

    assert!(app.sessions.get_by_token(&first.refresh_token).await.unwrap().is_none());
    assert_eq!(app.session_tokens(user.id).await, vec![second.refresh_token.clone()]);

    let err = app
        .service
        .refresh_token(&first.refresh_token, &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_refresh_unknown_or_expired_is_unauthorized() {
    let app = TestApp::with_session_config(SessionConfig {
        refresh_ttl_hours: 0,
        ..SessionConfig::default()
    });
    app.create_user("exp@example.com", PASSWORD).await;
    let issued = app
        .service
        .login("exp@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    for token in [issued.refresh_token.as_str(), "never-issued"] {
        let err = app
            .service
            .refresh_token(token, &device("laptop"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}

#[tokio::test]
async fn test_logout() {
    let app = TestApp::new();
    let user = app.create_user("out@example.com", PASSWORD).await;
    let issued = app
        .service
        .login("out@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();

    app.service.logout(&issued.refresh_token).await.unwrap();
    assert!(app.session_tokens(user.id).await.is_empty());

    app.service.logout(&issued.refresh_token).await.unwrap();
    app.service.logout("never-issued").await.unwrap();
}

#[tokio::test]
async fn test_logout_all_except_current() {
    let app = TestApp::new();
    let user = app.create_user("many@example.com", PASSWORD).await;
    let mut tokens = Vec::new();
    for fp in ["A", "B", "C"] {
        let issued = app
            .service
            .login("many@example.com", PASSWORD, &device(fp))
            .await
            .unwrap();
        tokens.push(issued.refresh_token);
    }

    app.service
        .logout_all_except_current(user.id, &tokens[0])
        .await
        .unwrap();
    assert_eq!(app.session_tokens(user.id).await, vec![tokens[0].clone()]);
}

#[tokio::test]
async fn test_change_password_resets_sessions() {
    let app = TestApp::new();
    let user = app.create_user("pw@example.com", PASSWORD).await;
    let laptop = app
        .service
        .login("pw@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();
    app.service
        .login("pw@example.com", PASSWORD, &device("phone"))
        .await
        .unwrap();

    let err = app
        .service
        .change_password(user.id, "not-it", "brand-new-pass", &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    let err = app
        .service
        .change_password(user.id, PASSWORD, "short", &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(app.session_tokens(user.id).await.len(), 2);

    let fresh = app
        .service
        .change_password(user.id, PASSWORD, "brand-new-pass", &device("laptop"))
        .await
        .unwrap();
    assert_eq!(app.session_tokens(user.id).await, vec![fresh.refresh_token.clone()]);
    assert!(app.sessions.get_by_token(&laptop.refresh_token).await.unwrap().is_none());

    let err = app
        .service
        .login("pw@example.com", PASSWORD, &device("tablet"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    app.service
        .login("pw@example.com", "brand-new-pass", &device("tablet"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_sessions_oldest_first() {
    let app = TestApp::new();
    let user = app.create_user("list@example.com", PASSWORD).await;
    for fp in ["first", "second", "third"] {
        app.service
            .login("list@example.com", PASSWORD, &device(fp))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let listed = app.service.list_sessions(user.id).await.unwrap();
    let fingerprints: Vec<_> = listed.iter().map(|s| s.fingerprint()).collect();
    assert_eq!(fingerprints, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_delete_account() {
    let app = TestApp::new();
    let user = app.create_user("bye@example.com", PASSWORD).await;
    let issued = app
        .service
        .login("bye@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();

    let err = app
        .service
        .delete_account(user.id, "wrong-password")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    app.service.delete_account(user.id, PASSWORD).await.unwrap();
    assert_eq!(app.users.len(), 0);
    assert!(app.sessions.get_by_token(&issued.refresh_token).await.unwrap().is_none());
    assert!(app.session_tokens(user.id).await.is_empty());
}

/// Session store that never answers.
#[derive(Debug)]
struct StalledSessions;

#[async_trait]
impl SessionRepository for StalledSessions {
    async fn create(&self, _session: &RefreshSession) -> AppResult<RefreshSession> {
        std::future::pending().await
    }
    async fn get_by_token(&self, _token: &str) -> AppResult<Option<RefreshSession>> {
        std::future::pending().await
    }
    async fn get_all_by_user(&self, _user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        std::future::pending().await
    }
    async fn delete_by_token(&self, _token: &str) -> AppResult<()> {
        std::future::pending().await
    }
    async fn delete_all_by_user(&self, _user_id: Uuid) -> AppResult<()> {
        std::future::pending().await
    }
    async fn delete_all_by_user_except(&self, _user_id: Uuid, _token: &str) -> AppResult<()> {
        std::future::pending().await
    }
    async fn begin(&self) -> AppResult<Box<dyn SessionTransaction>> {
        std::future::pending().await
    }
    async fn reclaim_expired(&self) -> AppResult<u64> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_times_out() {
    let auth = AuthConfig::default();
    let service = TokenService::new(
        Arc::new(StalledSessions),
        Arc::new(helpers::MemoryUserStore::default()),
        Arc::new(helpers::PlainVerifier),
        Arc::new(JwtEncoder::new(&auth)),
        SessionConfig {
            store_timeout_ms: 250,
            ..SessionConfig::default()
        },
        &auth,
    );

    let err = service.logout("any-token").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);

    let err = service
        .refresh_token("any-token", &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
}

/// A write held back until its unit of work commits.
#[derive(Debug)]
enum Pending {
    Create(RefreshSession),
    Delete(String),
    DeleteUser(Uuid),
}

/// Session repository whose units of work apply writes only on commit,
/// with creates optionally failing.
#[derive(Debug, Clone)]
struct StagedSessions {
    inner: CacheSessionRepository,
    fail_create: bool,
}

struct StagedUnit {
    inner: CacheSessionRepository,
    fail_create: bool,
    writes: Vec<Pending>,
}

#[async_trait]
impl SessionTransaction for StagedUnit {
    async fn get_all_by_user(&mut self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        let mut sessions = self.inner.get_all_by_user(user_id).await?;
        for write in &self.writes {
            match write {
                Pending::Create(s) => sessions.push(s.clone()),
                Pending::Delete(token) => sessions.retain(|s| s.refresh_token() != token),
                Pending::DeleteUser(id) => sessions.retain(|s| s.user_id() != *id),
            }
        }
        Ok(sessions)
    }
    async fn create(&mut self, session: &RefreshSession) -> AppResult<RefreshSession> {
        if self.fail_create {
            return Err(AppError::store_unavailable("insert failed"));
        }
        self.writes.push(Pending::Create(session.clone()));
        Ok(session.clone())
    }
    async fn delete_by_token(&mut self, token: &str) -> AppResult<()> {
        self.writes.push(Pending::Delete(token.to_string()));
        Ok(())
    }
    async fn delete_all_by_user(&mut self, user_id: Uuid) -> AppResult<()> {
        self.writes.push(Pending::DeleteUser(user_id));
        Ok(())
    }
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let StagedUnit { inner, writes, .. } = *self;
        for write in writes {
            match write {
                Pending::Create(s) => {
                    inner.create(&s).await?;
                }
                Pending::Delete(token) => inner.delete_by_token(&token).await?,
                Pending::DeleteUser(id) => inner.delete_all_by_user(id).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for StagedSessions {
    async fn create(&self, session: &RefreshSession) -> AppResult<RefreshSession> {
        self.inner.create(session).await
    }
    async fn get_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        self.inner.get_by_token(token).await
    }
    async fn get_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<RefreshSession>> {
        self.inner.get_all_by_user(user_id).await
    }
    async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        self.inner.delete_by_token(token).await
    }
    async fn delete_all_by_user(&self, user_id: Uuid) -> AppResult<()> {
        self.inner.delete_all_by_user(user_id).await
    }
    async fn delete_all_by_user_except(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        self.inner.delete_all_by_user_except(user_id, token).await
    }
    async fn begin(&self) -> AppResult<Box<dyn SessionTransaction>> {
        Ok(Box::new(StagedUnit {
            inner: self.inner.clone(),
            fail_create: self.fail_create,
            writes: Vec::new(),
        }))
    }
    async fn reclaim_expired(&self) -> AppResult<u64> {
        self.inner.reclaim_expired().await
    }
}

fn staged_service(app: &TestApp, fail_create: bool) -> TokenService {
    let auth = AuthConfig::default();
    TokenService::new(
        Arc::new(StagedSessions {
            inner: CacheSessionRepository::new(app.store.clone(), 10),
            fail_create,
        }),
        app.users.clone(),
        Arc::clone(&app.verifier),
        Arc::new(JwtEncoder::new(&auth)),
        SessionConfig::default(),
        &auth,
    )
}

#[tokio::test]
async fn test_failed_create_rolls_back_rotation_and_eviction() {
    let app = TestApp::new();
    let user = app.create_user("unit@example.com", PASSWORD).await;
    let laptop = app
        .service
        .login("unit@example.com", PASSWORD, &device("laptop"))
        .await
        .unwrap();
    for i in 1..=4 {
        app.service
            .login("unit@example.com", PASSWORD, &device(&format!("d{i}")))
            .await
            .unwrap();
    }
    let before = app.session_tokens(user.id).await;
    assert_eq!(before.len(), 5);

    let failing = staged_service(&app, true);
    let err = failing
        .refresh_token(&laptop.refresh_token, &device("laptop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
    assert_eq!(app.session_tokens(user.id).await, before);

    let err = failing
        .login("unit@example.com", PASSWORD, &device("tablet"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
    assert_eq!(app.session_tokens(user.id).await, before);

    let rotated = staged_service(&app, false)
        .refresh_token(&laptop.refresh_token, &device("laptop"))
        .await
        .unwrap();
    let after = app.session_tokens(user.id).await;
    assert_eq!(after.len(), 5);
    assert!(after.contains(&rotated.refresh_token));
    assert!(!after.contains(&laptop.refresh_token));
}
