//! Property-based tests for data freshness

use chrono::{Duration, Utc};
use proptest::prelude::*;
use siteforce_offline::client::local_db::MemoryStore;
use siteforce_offline::client::offline::cache::{describe_age, LocalCache};
use std::sync::Arc;

proptest! {
    #[test]
    fn test_stale_iff_older_than_threshold(
        age_secs in 0i64..(7 * 24 * 3600),
        threshold_minutes in 1i64..240,
    ) {
        let threshold = Duration::minutes(threshold_minutes);
        let cache = LocalCache::new(Arc::new(MemoryStore::new()), threshold);
        let now = Utc::now();

        let freshness = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(async {
                cache.record_sync(now - Duration::seconds(age_secs)).await;
                cache.freshness(now).await
            });

        prop_assert_eq!(freshness.is_stale, age_secs > threshold_minutes * 60);
        prop_assert_ne!(freshness.stale_duration, "Never synced");
    }

    #[test]
    fn test_describe_age_units(minutes in 0i64..(30 * 24 * 60)) {
        let text = describe_age(Duration::minutes(minutes));

        let expected_unit = if minutes < 1 {
            "Just now"
        } else if minutes < 60 {
            "minute"
        } else if minutes < 24 * 60 {
            "hour"
        } else {
            "day"
        };
        prop_assert!(text.contains(expected_unit), "{} for {} minutes", text, minutes);
    }
}
