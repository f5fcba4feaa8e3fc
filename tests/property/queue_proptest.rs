//! Property-based tests for the action queue
//!
//! Uses proptest to generate random enqueue sequences and verify ordering
//! and identity guarantees

use proptest::prelude::*;
use serde_json::json;
use siteforce_offline::client::local_db::MemoryStore;
use siteforce_offline::client::offline::ActionQueue;
use siteforce_offline::shared::{ActionType, OverflowPolicy, QueuedAction};
use std::collections::HashSet;
use std::sync::Arc;

fn action_type() -> impl Strategy<Value = ActionType> {
    prop_oneof![
        Just(ActionType::ClockIn),
        Just(ActionType::ClockOut),
        Just(ActionType::StartTask),
        Just(ActionType::UpdateProgress),
        Just(ActionType::CompleteTask),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_enqueue_length_and_distinct_ids(
        types in prop::collection::vec(action_type(), 1..60),
    ) {
        let queue = ActionQueue::new(Arc::new(MemoryStore::new()), 100, OverflowPolicy::RejectNew);

        let queued: Vec<QueuedAction> = runtime().block_on(async {
            for (i, action_type) in types.iter().enumerate() {
                queue.enqueue(*action_type, json!({"taskId": i})).await.unwrap();
            }
            queue.snapshot().await
        });

        prop_assert_eq!(queued.len(), types.len());
        let ids: HashSet<&str> = queued.iter().map(|a| a.id.as_str()).collect();
        prop_assert_eq!(ids.len(), types.len());

        let order: Vec<ActionType> = queued.iter().map(|a| a.action_type).collect();
        prop_assert_eq!(order, types);
    }

    #[test]
    fn test_persist_then_rehydrate_is_identical(
        types in prop::collection::vec(action_type(), 0..30),
    ) {
        let store = Arc::new(MemoryStore::new());

        let (original, restored) = runtime().block_on(async {
            let queue = ActionQueue::new(store.clone(), 100, OverflowPolicy::RejectNew);
            for action_type in &types {
                queue.enqueue(*action_type, json!({"taskId": 1})).await.unwrap();
            }
            let original = queue.snapshot().await;

            let stored: Vec<QueuedAction> = siteforce_offline::client::local_db::read_json(
                store.as_ref(),
                siteforce_offline::client::local_db::keys::QUEUED_ACTIONS,
            )
            .await
            .unwrap()
            .unwrap_or_default();

            let fresh = ActionQueue::new(store.clone(), 100, OverflowPolicy::RejectNew);
            fresh.rehydrate(stored).await;
            (original, fresh.snapshot().await)
        });

        prop_assert_eq!(original, restored);
    }

    #[test]
    fn test_drop_oldest_keeps_newest(
        capacity in 1usize..10,
        extra in 1usize..10,
    ) {
        let queue =
            ActionQueue::new(Arc::new(MemoryStore::new()), capacity, OverflowPolicy::DropOldest);

        let (queued, newest, evicted) = runtime().block_on(async {
            let mut all = Vec::new();
            let mut evicted = 0usize;
            for i in 0..capacity + extra {
                let enqueued = queue
                    .enqueue(ActionType::UpdateProgress, json!({"taskId": i}))
                    .await
                    .unwrap();
                if enqueued.evicted.is_some() {
                    evicted += 1;
                }
                all.push(enqueued.action.id);
            }
            let queued: Vec<String> = queue.snapshot().await.into_iter().map(|a| a.id).collect();
            (queued, all.split_off(extra), evicted)
        });

        prop_assert_eq!(&queued, &newest);
        prop_assert_eq!(queued.len(), capacity);
        prop_assert_eq!(evicted, extra);
    }
}
