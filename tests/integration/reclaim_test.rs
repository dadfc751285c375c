//! Integration tests for scheduled reclamation of expired sessions.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use sessionhub_cache::CacheStore;
use sessionhub_cache::keys::user_sessions_key;
use sessionhub_entity::session::{RefreshSession, SessionDraft, SessionRepository};
use sessionhub_worker::ReclaimJob;

use helpers::TestApp;

fn session_at(user_id: Uuid, token: &str, offset_ms: i64) -> RefreshSession {
    let now = Utc::now();
    RefreshSession::restore(
        SessionDraft {
            user_id,
            refresh_token: token.to_string(),
            fingerprint: format!("fp-{token}"),
            ip_address: "2001:db8::7".to_string(),
            user_agent: None,
        },
        None,
        now + chrono::Duration::milliseconds(offset_ms),
        now,
    )
    .unwrap()
}

#[tokio::test]
async fn test_reclaim_drops_expired_and_keeps_live() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    app.sessions.create(&session_at(user, "expired", -1_000)).await.unwrap();
    app.sessions.create(&session_at(user, "live", 10_000)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let job = ReclaimJob::new(Arc::clone(&app.sessions));
    assert_eq!(job.run_once().await.unwrap(), 1);

    assert!(app.sessions.get_by_token("expired").await.unwrap().is_none());
    assert!(app.sessions.get_by_token("live").await.unwrap().is_some());

    let markers = app.store.members(&user_sessions_key(user)).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert!(markers[0].starts_with("live:"));
}

#[tokio::test]
async fn test_reclaim_across_many_users_and_pages() {
    let app = TestApp::new();
    let mut users = Vec::new();
    for i in 0..250 {
        let user = Uuid::new_v4();
        app.sessions
            .create(&session_at(user, &format!("old-{i}"), -50))
            .await
            .unwrap();
        if i % 2 == 0 {
            app.sessions
                .create(&session_at(user, &format!("new-{i}"), 60_000))
                .await
                .unwrap();
        }
        users.push(user);
    }

    let job = ReclaimJob::new(Arc::clone(&app.sessions));
    assert_eq!(job.run_once().await.unwrap(), 250);
    assert_eq!(job.run_once().await.unwrap(), 0);

    for (i, user) in users.iter().enumerate() {
        let markers = app.store.members(&user_sessions_key(*user)).await.unwrap();
        assert_eq!(markers.len(), usize::from(i % 2 == 0));
    }
}

#[tokio::test]
async fn test_reclaim_on_empty_store() {
    let app = TestApp::new();
    let job = ReclaimJob::new(Arc::clone(&app.sessions));
    assert_eq!(job.run_once().await.unwrap(), 0);
}
