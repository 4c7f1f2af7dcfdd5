// tests/lifecycle.rs
//
// End-to-end behavior of the announcement manager against scripted fetchers
// and an in-memory status cache.

mod common;

use std::collections::HashSet;

use announcement_tracker::cache::CacheStore;
use announcement_tracker::{StatusRecord, TrackerError};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::*;

#[tokio::test]
async fn two_segments_both_eligible_with_default_dates() {
    let fetcher = ScriptedFetcher::new(RAW);
    let mut m = manager(fetcher.clone(), FlakyCache::new());

    let unposted = m.all_unposted(now()).await.unwrap();
    assert_eq!(unposted.len(), 2);

    // oldest first
    assert_eq!(unposted[0].id, MAINNET_ID);
    assert_eq!(unposted[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(unposted[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert!(unposted
        .iter()
        .all(|a| a.source == announcement_tracker::Source::Website));
}

#[tokio::test]
async fn refresh_is_gated_by_interval() {
    let fetcher = ScriptedFetcher::new(RAW);
    let mut m = manager(fetcher.clone(), FlakyCache::new());

    assert!(m.refresh_if_due(now()).await.unwrap());
    assert!(!m.refresh_if_due(now() + Duration::minutes(10)).await.unwrap());
    assert_eq!(fetcher.calls(), 1);

    // selection calls inside the window reuse the store
    for i in 0..5 {
        m.random_unposted(now() + Duration::minutes(i)).await.unwrap();
    }
    assert_eq!(fetcher.calls(), 1);

    assert!(m.refresh_if_due(now() + Duration::minutes(30)).await.unwrap());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(m.last_refreshed(), Some(now() + Duration::minutes(30)));
}

#[tokio::test]
async fn force_refresh_ignores_the_interval() {
    let fetcher = ScriptedFetcher::new(RAW);
    let mut m = manager(fetcher.clone(), FlakyCache::new());
    m.force_refresh(now()).await.unwrap();
    m.force_refresh(now()).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn posted_status_survives_refresh() {
    let fetcher = ScriptedFetcher::new(RAW);
    let mut m = manager(fetcher.clone(), FlakyCache::new());
    m.force_refresh(now()).await.unwrap();
    m.mark_posted(MAINNET_ID, now()).await.unwrap();

    let later = now() + Duration::minutes(31);
    let all = m.announcements(later).await.unwrap();
    assert_eq!(fetcher.calls(), 2);

    let mainnet = all.iter().find(|a| a.id == MAINNET_ID).unwrap();
    assert!(mainnet.posted);
    assert_eq!(mainnet.last_posted, Some(now()));
    // derived fields are from the parse, not the refresh
    assert_eq!(mainnet.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn selection_never_repeats_posted_items() {
    let raw = "2024-01-01 alpha\n\n2024-01-02 beta\n\n2023-12-31 gamma\n\ndelta";
    let fetcher = ScriptedFetcher::new(raw);
    let mut m = manager(fetcher, FlakyCache::new());

    let mut seen = HashSet::new();
    while let Some(a) = m.random_unposted(now()).await.unwrap() {
        assert!(seen.insert(a.id.clone()), "picked {} twice", a.id);
        m.mark_posted(&a.id, now()).await.unwrap();
    }
    assert_eq!(seen.len(), 4);
    assert!(m.all_unposted(now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn nothing_eligible_is_none_not_an_error() {
    // too old, and too fresh (undated => today, only 30 minutes in)
    let fetcher = ScriptedFetcher::new("2023-01-01 ancient news\n\nbrand new item");
    let mut m = manager(fetcher, FlakyCache::new());
    let just_after_midnight = Utc.with_ymd_and_hms(2024, 1, 3, 0, 30, 0).unwrap();
    assert!(m.random_unposted(just_after_midnight).await.unwrap().is_none());
    assert!(m.all_unposted(just_after_midnight).await.unwrap().is_empty());
    assert_eq!(m.announcements(just_after_midnight).await.unwrap().len(), 2);
}

#[tokio::test]
async fn marking_absent_id_is_kept_for_rediscovery() {
    let fetcher = ScriptedFetcher::new("Unrelated community call recap");
    let cache = FlakyCache::new();
    let mut m = manager(fetcher.clone(), cache.clone());
    m.force_refresh(now()).await.unwrap();

    m.mark_posted(MAINNET_ID, now()).await.unwrap();
    assert_eq!(cache.writes(), 1);

    fetcher.set_text(RAW);
    m.force_refresh(now()).await.unwrap();
    let all = m.announcements(now()).await.unwrap();
    let mainnet = all.iter().find(|a| a.id == MAINNET_ID).unwrap();
    assert!(mainnet.posted);
}

#[tokio::test]
async fn status_persists_across_instances() {
    let cache = FlakyCache::new();
    {
        let mut first = manager(ScriptedFetcher::new(RAW), cache.clone());
        first.force_refresh(now()).await.unwrap();
        first.mark_posted(MAINNET_ID, now()).await.unwrap();
    }

    let mut second = manager(ScriptedFetcher::new(RAW), cache.clone());
    let unposted = second.all_unposted(now()).await.unwrap();
    assert_eq!(unposted.len(), 1);
    assert_ne!(unposted[0].id, MAINNET_ID);

    let stored: Vec<StatusRecord> = serde_json::from_value(
        cache
            .inner
            .get("announcements/posted_status")
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert!(stored.iter().any(|r| r.id == MAINNET_ID && r.posted));
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    let fetcher = ScriptedFetcher::new(RAW);
    let mut m = manager(fetcher.clone(), FlakyCache::new());
    m.force_refresh(now()).await.unwrap();
    let before = m.announcements(now()).await.unwrap();

    fetcher.set_failing(true);
    let err = m.force_refresh(now() + Duration::hours(1)).await.unwrap_err();
    assert!(err.is_fetch());
    assert_eq!(m.last_refreshed(), Some(now()));

    // a due refresh that fails surfaces through selection too
    let later = now() + Duration::hours(2);
    assert!(matches!(
        m.random_unposted(later).await,
        Err(TrackerError::Fetch(_))
    ));

    fetcher.set_failing(false);
    assert_eq!(m.announcements(now()).await.unwrap(), before);
    assert!(m.random_unposted(later).await.unwrap().is_some());
    assert_eq!(m.last_refreshed(), Some(later));
}

#[tokio::test]
async fn first_refresh_failure_retries_next_call() {
    let fetcher = ScriptedFetcher::new(RAW);
    fetcher.set_failing(true);
    let mut m = manager(fetcher.clone(), FlakyCache::new());

    assert!(m.random_unposted(now()).await.is_err());
    assert_eq!(m.last_refreshed(), None);

    fetcher.set_failing(false);
    assert!(m.random_unposted(now()).await.unwrap().is_some());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn unreadable_cache_does_not_block_refresh() {
    let cache = FlakyCache::new();
    cache.set_fail_reads(true);
    let mut m = manager(ScriptedFetcher::new(RAW), cache);
    let stats = m.force_refresh(now()).await.unwrap();
    assert_eq!(stats.kept, 2);
    assert_eq!(m.all_unposted(now()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_cache_payload_counts_as_empty() {
    let cache = FlakyCache::new();
    cache
        .inner
        .set("announcements/posted_status", serde_json::json!("garbage"))
        .await
        .unwrap();
    let mut m = manager(ScriptedFetcher::new(RAW), cache);
    assert_eq!(m.all_unposted(now()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_status_write_propagates() {
    let cache = FlakyCache::new();
    let mut m = manager(ScriptedFetcher::new(RAW), cache.clone());
    m.force_refresh(now()).await.unwrap();

    cache.set_fail_writes(true);
    let err = m.mark_posted(MAINNET_ID, now()).await.unwrap_err();
    assert!(matches!(err, TrackerError::PersistenceWrite { .. }));

    // still posted in memory, so it is not offered again this process
    let unposted = m.all_unposted(now()).await.unwrap();
    assert!(unposted.iter().all(|a| a.id != MAINNET_ID));

    // the next successful write carries it
    cache.set_fail_writes(false);
    m.mark_posted("2024-01-02-other", now()).await.unwrap();
    let mut fresh = manager(ScriptedFetcher::new(RAW), cache);
    let unposted = fresh.all_unposted(now()).await.unwrap();
    assert!(unposted.iter().all(|a| a.id != MAINNET_ID));
}

#[tokio::test]
async fn marking_before_refresh_keeps_existing_records() {
    let cache = FlakyCache::new();
    let earlier = vec![StatusRecord::posted_now("2023-12-20-Older", now())];
    cache
        .inner
        .set(
            "announcements/posted_status",
            serde_json::to_value(&earlier).unwrap(),
        )
        .await
        .unwrap();

    let mut m = manager(ScriptedFetcher::new(RAW), cache.clone());
    m.mark_posted(MAINNET_ID, now()).await.unwrap();

    let stored: Vec<StatusRecord> = serde_json::from_value(
        cache
            .inner
            .get("announcements/posted_status")
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    let ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["2023-12-20-Older", MAINNET_ID]);
}

#[tokio::test]
async fn listing_is_newest_first() {
    let raw = "2024-01-01 one\n\n2024-01-02 two\n\nundated three";
    let mut m = manager(ScriptedFetcher::new(raw), FlakyCache::new());
    let dates: Vec<String> = m
        .announcements(now())
        .await
        .unwrap()
        .iter()
        .map(|a| a.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
}

#[tokio::test]
async fn seeded_selection_is_repeatable() {
    let raw = "2024-01-01 alpha\n\n2024-01-02 beta\n\n2023-12-31 gamma";
    let mut a = manager(ScriptedFetcher::new(raw), FlakyCache::new());
    let mut b = manager(ScriptedFetcher::new(raw), FlakyCache::new());
    for _ in 0..5 {
        let x = a.random_unposted(now()).await.unwrap().map(|x| x.id);
        let y = b.random_unposted(now()).await.unwrap().map(|y| y.id);
        assert_eq!(x, y);
    }
}

#[tokio::test]
async fn persisted_status_stays_bounded_by_the_age_window() {
    // undated text gets a new id (today's date) every day
    let cache = FlakyCache::new();
    let mut m = manager(ScriptedFetcher::new("Weekly community call recap"), cache.clone());

    for day in 0..200 {
        let at = now() + Duration::days(day);
        m.force_refresh(at).await.unwrap();
        let id = m.announcements(at).await.unwrap()[0].id.clone();
        m.mark_posted(&id, at).await.unwrap();
    }

    let stored: Vec<StatusRecord> = serde_json::from_value(
        cache
            .inner
            .get("announcements/posted_status")
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    // today plus the 29 earlier days still inside the 30-day window
    assert_eq!(stored.len(), 30);
    assert!(stored.iter().all(|r| r.posted));
}

#[tokio::test]
async fn unreadable_cache_never_overwrites_existing_status() {
    let cache = FlakyCache::new();
    let earlier = vec![StatusRecord::posted_now("2023-12-20-Older", now())];
    cache
        .inner
        .set(
            "announcements/posted_status",
            serde_json::to_value(&earlier).unwrap(),
        )
        .await
        .unwrap();

    cache.set_fail_reads(true);
    let mut m = manager(ScriptedFetcher::new(RAW), cache.clone());
    m.force_refresh(now()).await.unwrap();

    let err = m.mark_posted(MAINNET_ID, now()).await.unwrap_err();
    assert!(matches!(err, TrackerError::PersistenceRead { .. }));
    assert_eq!(cache.writes(), 0);
    // not offered again by this process
    let unposted = m.all_unposted(now()).await.unwrap();
    assert!(unposted.iter().all(|a| a.id != MAINNET_ID));

    // once the cache answers again, the next write keeps everything
    cache.set_fail_reads(false);
    m.mark_posted("2024-01-02-other", now()).await.unwrap();
    let stored: Vec<StatusRecord> = serde_json::from_value(
        cache
            .inner
            .get("announcements/posted_status")
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    for id in ["2023-12-20-Older", MAINNET_ID, "2024-01-02-other"] {
        assert!(
            stored.iter().any(|r| r.id == id && r.posted),
            "missing {id}"
        );
    }
}
