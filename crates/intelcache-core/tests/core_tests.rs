//! Tests for intelcache-core: topics, reports, outcomes, diagnostics, metadata, errors

use chrono::{TimeZone, Utc};
use intelcache_core::*;

// ===========================================================================
// Topic
// ===========================================================================

#[test]
fn topic_new_and_display() {
    let topic = Topic::new("monitor firmware");
    assert_eq!(topic.as_str(), "monitor firmware");
    assert_eq!(format!("{}", topic), "monitor firmware");
}

#[test]
fn topic_serializes_as_plain_string() {
    let topic: Topic = "kvm switching".into();
    assert_eq!(serde_json::to_string(&topic).unwrap(), r#""kvm switching""#);
    let back: Topic = serde_json::from_str(r#""kvm switching""#).unwrap();
    assert_eq!(back, topic);
}

// ===========================================================================
// Report / QueryOutcome
// ===========================================================================

fn web_item(url: &str) -> WebItem {
    WebItem {
        title: "t".into(),
        url: url.into(),
        source_domain: "example.com".into(),
        snippet: "s".into(),
        why_relevant: "w".into(),
        score: 1.0,
    }
}

#[test]
fn report_without_items_has_no_data() {
    let report = Report::default();
    assert!(!report.has_data());
}

#[test]
fn report_with_any_source_has_data() {
    let report = Report {
        web: vec![web_item("https://a")],
        ..Default::default()
    };
    assert!(report.has_data());
}

#[test]
fn outcome_from_report_distinguishes_empty() {
    let full = QueryOutcome::from_report(Report {
        web: vec![web_item("https://a")],
        ..Default::default()
    });
    assert!(matches!(full, QueryOutcome::Success(_)));
    assert!(full.has_data());

    let empty = QueryOutcome::from_report(Report::default());
    assert!(matches!(empty, QueryOutcome::EmptySuccess(_)));
    assert!(!empty.has_data());
    assert!(!empty.is_failure());
    assert!(empty.report().is_some());
}

#[test]
fn failure_outcome_has_no_report() {
    let outcome = QueryOutcome::failure("exit code 2");
    assert!(outcome.is_failure());
    assert!(!outcome.has_data());
    assert!(outcome.report().is_none());
    assert_eq!(outcome.as_failure().unwrap().reason, "exit code 2");
}

#[test]
fn report_items_tolerate_missing_fields() {
    let json = r#"{"reddit":[{"title":"Firmware M3T105","score":8}],"x":[],"web":[]}"#;
    let report: Report = serde_json::from_str(json).unwrap();
    assert_eq!(report.reddit[0].title, "Firmware M3T105");
    assert_eq!(report.reddit[0].score, 8.0);
    assert!(report.reddit[0].comment_insights.is_empty());
    assert!(report.topic.is_empty());
}

#[test]
fn report_requires_source_arrays() {
    let json = r#"{"reddit":[],"x":[]}"#;
    assert!(serde_json::from_str::<Report>(json).is_err());
}

// ===========================================================================
// Diagnostic / RefreshStatus
// ===========================================================================

#[test]
fn diagnostic_omits_absent_excerpts() {
    let d = Diagnostic::new("init", "cache dir missing");
    let json = serde_json::to_string(&d).unwrap();
    assert_eq!(json, r#"{"topic":"init","reason":"cache dir missing"}"#);
}

#[test]
fn diagnostic_from_failure_copies_excerpts() {
    let failure = QueryFailure::new("exit code 1").with_stderr("boom");
    let d = Diagnostic::from_failure(&Topic::new("hdr"), &failure);
    assert_eq!(d.topic, "hdr");
    assert_eq!(d.stderr.as_deref(), Some("boom"));
    assert!(d.stdout.is_none());
}

#[test]
fn refresh_status_wire_names() {
    assert_eq!(serde_json::to_string(&RefreshStatus::NoCache).unwrap(), r#""no_cache""#);
    assert_eq!(serde_json::to_string(&RefreshStatus::Refreshed).unwrap(), r#""refreshed""#);
    assert_eq!(RefreshStatus::Fresh.to_string(), "fresh");
    assert_eq!(RefreshStatus::Failed.to_string(), "failed");
}

#[test]
fn refresh_status_failure_classes() {
    assert!(RefreshStatus::Failed.is_failure());
    assert!(RefreshStatus::NoCache.is_failure());
    assert!(!RefreshStatus::Fresh.is_failure());
    assert!(!RefreshStatus::Refreshed.is_failure());
}

// ===========================================================================
// CacheMetadata
// ===========================================================================

#[test]
fn metadata_serializes_in_field_order_with_millis() {
    let meta = CacheMetadata {
        last_updated: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        topics_researched: vec![Topic::new("a"), Topic::new("b")],
        next_update_after: Utc.with_ymd_and_hms(2026, 2, 1, 3, 4, 5).unwrap(),
    };
    let json = serde_json::to_string(&meta).unwrap();
    assert_eq!(
        json,
        r#"{"last_updated":"2026-01-02T03:04:05.000Z","topics_researched":["a","b"],"next_update_after":"2026-02-01T03:04:05.000Z"}"#
    );
    let back: CacheMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(back, meta);
}

#[test]
fn metadata_missing_field_is_rejected() {
    let json = r#"{"last_updated":"2026-01-02T03:04:05.000Z","topics_researched":[]}"#;
    assert!(serde_json::from_str::<CacheMetadata>(json).is_err());
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display() {
    let e = Error::cache_dir("CLAUDE_PLUGIN_ROOT is not set");
    assert_eq!(e.to_string(), "cache directory unavailable: CLAUDE_PLUGIN_ROOT is not set");

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let e = Error::publish("/tmp/x.md", io);
    assert!(e.to_string().contains("/tmp/x.md"));
    assert!(e.to_string().contains("denied"));
}
