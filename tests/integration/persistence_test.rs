//! Restart behaviour over SQLite storage

use crate::common::{manager_on, monitor, open_db, temp_db_path, test_config, RecordingApi};
use crate::assert_ok;
use pretty_assertions::assert_eq;
use serde_json::json;
use siteforce_offline::client::local_db::{keys, KeyValueStore};
use siteforce_offline::client::ApiError;
use siteforce_offline::shared::{ActionType, FailureReason};
use std::sync::Arc;

#[tokio::test]
async fn test_queue_survives_restart_in_order() {
    let (_dir, path) = temp_db_path();

    let queued = {
        let manager = manager_on(
            open_db(&path).await,
            Arc::new(RecordingApi::new()),
            monitor(false),
            test_config(),
        )
        .await;
        let mut queued = Vec::new();
        queued.push(
            manager
                .queue_action(ActionType::ClockIn, json!({"lat": 1.35, "lng": 103.82}))
                .await
                .unwrap(),
        );
        queued.push(
            manager
                .queue_action(ActionType::StartTask, json!({"taskId": 8}))
                .await
                .unwrap(),
        );
        queued.push(
            manager
                .queue_action(ActionType::UpdateProgress, json!({"taskId": 8, "progress": 50}))
                .await
                .unwrap(),
        );
        queued
    };

    let restarted = manager_on(
        open_db(&path).await,
        Arc::new(RecordingApi::new()),
        monitor(false),
        test_config(),
    )
    .await;

    assert_eq!(restarted.queued_actions().await, queued);
}

#[tokio::test]
async fn test_retry_state_survives_restart() {
    let (_dir, path) = temp_db_path();
    let api = Arc::new(RecordingApi::new());

    {
        let manager = manager_on(
            open_db(&path).await,
            api.clone(),
            monitor(true),
            test_config(),
        )
        .await;
        manager.queue_action(ActionType::ClockOut, json!({})).await.unwrap();
        manager.queue_action(ActionType::ClockIn, json!({})).await.unwrap();
        api.script(Err(ApiError::Timeout));
        api.script(Err(ApiError::status(422, "outside geofence")));
        manager.sync_queued_actions().await.unwrap();
    }

    let restarted = manager_on(
        open_db(&path).await,
        Arc::new(RecordingApi::new()),
        monitor(false),
        test_config(),
    )
    .await;

    let queued = restarted.queued_actions().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].attempts, 1);
    assert!(queued[0].next_attempt_at.is_some());

    let failed = restarted.failed_actions().await;
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0].reason, FailureReason::Rejected { .. }));
}

#[tokio::test]
async fn test_cache_and_last_sync_survive_restart() {
    let (_dir, path) = temp_db_path();
    let api = Arc::new(RecordingApi::new());

    let last_sync = {
        let manager = manager_on(
            open_db(&path).await,
            api.clone(),
            monitor(true),
            test_config(),
        )
        .await;
        manager.cache_data("tasks", vec![json!({"id": 1}), json!({"id": 2})]).await;
        manager.queue_action(ActionType::ClockIn, json!({})).await.unwrap();
        manager.sync_queued_actions().await.unwrap();
        manager.state().await.sync.last_sync_time
    };
    assert!(last_sync.is_some());

    let restarted = manager_on(open_db(&path).await, api, monitor(false), test_config()).await;

    assert_eq!(restarted.get_cached_data("tasks").await.len(), 2);
    assert_eq!(restarted.get_data_freshness().await.last_sync_time, last_sync);
}

#[tokio::test]
async fn test_clear_all_wipes_storage() {
    let (_dir, path) = temp_db_path();
    let db = open_db(&path).await;
    let api = Arc::new(RecordingApi::new());
    let manager = manager_on(db.clone(), api.clone(), monitor(true), test_config()).await;

    manager.cache_data("tasks", vec![json!({"id": 1})]).await;
    manager.queue_action(ActionType::ClockIn, json!({})).await.unwrap();
    manager.sync_queued_actions().await.unwrap();
    api.script(Err(ApiError::status(400, "bad")));
    manager.queue_action(ActionType::ClockOut, json!({})).await.unwrap();
    manager.sync_queued_actions().await.unwrap();

    assert_ok!(manager.clear_all().await);

    let stored = assert_ok!(
        db.multi_get(&[
            keys::QUEUED_ACTIONS.to_string(),
            keys::FAILED_ACTIONS.to_string(),
            keys::LAST_SYNC_TIME.to_string(),
            keys::cached("tasks"),
        ])
        .await
    );
    assert!(stored.iter().all(|(_, value)| value.is_none()));
    assert_eq!(assert_ok!(db.get_stats().await).key_count, 0);
}
