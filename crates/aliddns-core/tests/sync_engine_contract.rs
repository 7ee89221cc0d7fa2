//! Contract Test: Sync Cycle Semantics
//!
//! Constraints verified:
//! - One result per tracked record, in order
//! - Changed addresses are written once; unchanged ones are not written
//! - Records whose family has no address are skipped, not failed
//! - A failing record does not abort the cycle
//! - Missing credentials and missing addresses fail the whole cycle
//!
//! If this test fails, the engine no longer reconciles records correctly.

mod common;

use std::sync::Arc;

use aliddns_core::{
    CurrentIps, Error, ProviderClient, SyncEngine, SyncStatus, SyncSummary, TrackedRecord,
};
use common::*;

fn engine(api: &Arc<FakeDnsApi>, resolver: FixedResolver) -> SyncEngine {
    SyncEngine::new(Arc::new(resolver), ProviderClient::new(api.clone(), fast_policy()))
}

#[tokio::test]
async fn changed_address_is_written() {
    let api = Arc::new(FakeDnsApi::new().with_record("1", "example.com", "home", "A", "1.2.3.4"));
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));

    let results = engine.sync(&[home_a()], None).await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.status, SyncStatus::Success);
    assert_eq!(result.domain, "example.com");
    assert_eq!(result.rr, "home");
    assert_eq!(result.old_value.as_deref(), Some("1.2.3.4"));
    assert_eq!(result.new_value.as_deref(), Some("5.6.7.8"));
    assert!(result.message.contains("home.example.com"));

    assert_eq!(api.update_call_count(), 1);
    assert_eq!(api.updates()[0].value, "5.6.7.8");
    assert_eq!(api.value_of("1").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn unchanged_address_is_skipped() {
    let api = Arc::new(FakeDnsApi::new().with_record("1", "example.com", "home", "A", "1.2.3.4"));
    let engine = engine(&api, FixedResolver::new(Some("1.2.3.4"), None));

    let results = engine.sync(&[home_a()], None).await.unwrap();

    assert_eq!(results[0].status, SyncStatus::Skipped);
    assert!(results[0].message.contains("unchanged"));
    assert_eq!(results[0].old_value.as_deref(), Some("1.2.3.4"));
    assert_eq!(results[0].new_value.as_deref(), Some("1.2.3.4"));
    assert_eq!(api.update_call_count(), 0);
}

#[tokio::test]
async fn aaaa_without_ipv6_is_skipped() {
    let api = Arc::new(
        FakeDnsApi::new().with_record("2", "example.com", "home", "AAAA", "2001:db8:0:0:0:0:0:1"),
    );
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));
    let record = TrackedRecord::new("2", "example.com", "home", "AAAA");

    let results = engine.sync(&[record], None).await.unwrap();

    assert_eq!(results[0].status, SyncStatus::Skipped);
    assert!(results[0].message.contains("IPv6"));
    assert_eq!(api.update_call_count(), 0);
    assert_eq!(api.describe_records_call_count(), 0);
}

#[tokio::test]
async fn non_address_type_is_skipped_without_calls() {
    let api = Arc::new(FakeDnsApi::new().with_record("3", "example.com", "www", "CNAME", "a.b.c"));
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));
    let record = TrackedRecord::new("3", "example.com", "www", "CNAME");

    let results = engine.sync(&[record], None).await.unwrap();

    assert_eq!(results[0].status, SyncStatus::Skipped);
    assert!(results[0].message.contains("CNAME"));
    assert_eq!(api.describe_records_call_count(), 0);
    assert_eq!(api.update_call_count(), 0);
}

#[tokio::test]
async fn supplied_addresses_bypass_the_resolver() {
    let api = Arc::new(FakeDnsApi::new().with_record("1", "example.com", "home", "A", "1.2.3.4"));
    let resolver = Arc::new(FixedResolver::new(Some("9.9.9.9"), None));
    let engine = SyncEngine::new(resolver.clone(), ProviderClient::new(api.clone(), fast_policy()));

    let ips = CurrentIps::new(Some("5.6.7.8".into()), None);
    let results = engine.sync(&[home_a()], Some(ips)).await.unwrap();

    assert_eq!(results[0].new_value.as_deref(), Some("5.6.7.8"));
    assert_eq!(resolver.call_count(), 0);
}

#[tokio::test]
async fn failing_record_does_not_abort_cycle() {
    let api = Arc::new(
        FakeDnsApi::new()
            .with_record("1", "example.com", "home", "A", "1.2.3.4")
            .with_record("2", "example.com", "nas", "A", "1.2.3.4")
            .with_record("3", "example.com", "home", "AAAA", "2001:db8:0:0:0:0:0:1"),
    );
    api.fail_updates([
        UpdateFailure::Provider("InternalError: one".into()),
        UpdateFailure::Provider("InternalError: two".into()),
        UpdateFailure::Provider("InternalError: three".into()),
    ]);
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));
    let records = vec![
        home_a(),
        TrackedRecord::new("2", "example.com", "nas", "A"),
        TrackedRecord::new("3", "example.com", "home", "AAAA"),
    ];

    let results = engine.sync(&records, None).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, SyncStatus::Error);
    assert!(results[0].message.contains("three"));
    assert_eq!(results[1].status, SyncStatus::Success);
    assert_eq!(results[1].rr, "nas");
    assert_eq!(results[2].status, SyncStatus::Skipped);

    let summary = SyncSummary::from(results.as_slice());
    assert_eq!((summary.success, summary.skipped, summary.error), (1, 1, 1));
    assert_eq!(api.value_of("2").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn no_address_fails_the_cycle() {
    let api = Arc::new(FakeDnsApi::new().with_record("1", "example.com", "home", "A", "1.2.3.4"));
    let engine = engine(&api, FixedResolver::new(None, None));

    let err = engine.sync(&[home_a()], None).await.unwrap_err();

    assert!(matches!(err, Error::NoAddressAvailable));
    assert_eq!(api.describe_records_call_count(), 0);
}

#[tokio::test]
async fn empty_record_list_is_not_an_error() {
    let api = Arc::new(FakeDnsApi::new());
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));

    let results = engine.sync(&[], None).await.unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn unconfigured_fails_before_resolving() {
    let resolver = Arc::new(FixedResolver::new(Some("5.6.7.8"), None));
    let engine = SyncEngine::new(resolver.clone(), ProviderClient::unconfigured(fast_policy()));

    let err = engine.sync(&[home_a()], None).await.unwrap_err();

    assert!(matches!(err, Error::NotConfigured));
    assert_eq!(resolver.call_count(), 0);
}

#[tokio::test]
async fn cancelled_engine_skips_remaining_records() {
    let api = Arc::new(FakeDnsApi::new().with_record("1", "example.com", "home", "A", "1.2.3.4"));
    let engine = engine(&api, FixedResolver::new(Some("5.6.7.8"), None));
    engine.cancel();

    let results = engine.sync(&[home_a()], None).await.unwrap();

    assert_eq!(results[0].status, SyncStatus::Skipped);
    assert!(results[0].message.contains("cancelled"));
    assert_eq!(api.update_call_count(), 0);
}
