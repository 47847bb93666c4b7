//! Core types for intelcache

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// Topic identifier - one provider query per cycle, cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Topic(Arc<str>);

impl Topic {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Topic> for String {
    fn from(t: Topic) -> Self {
        t.0.to_string()
    }
}

// ===========================================================================
// Provider report
// ===========================================================================

/// The three source collections every provider report must carry.
pub const SOURCE_FIELDS: [&str; 3] = ["reddit", "x", "web"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditItem {
    pub title: String,
    pub url: String,
    pub subreddit: String,
    pub date: Option<String>,
    pub why_relevant: String,
    pub score: f64,
    pub comment_insights: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XItem {
    pub text: String,
    pub url: String,
    pub author_handle: String,
    pub date: Option<String>,
    pub why_relevant: String,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebItem {
    pub title: String,
    pub url: String,
    pub source_domain: String,
    pub snippet: String,
    pub why_relevant: String,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRange {
    pub from: String,
    pub to: String,
}

/// One successful provider query. The source arrays are required; everything
/// else is optional so older provider builds still validate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ReportRange>,
    pub reddit: Vec<RedditItem>,
    pub x: Vec<XItem>,
    pub web: Vec<WebItem>,
}

impl Report {
    pub fn has_data(&self) -> bool {
        self.reddit.len() + self.x.len() + self.web.len() > 0
    }
}

// ===========================================================================
// Query outcome
// ===========================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct QueryFailure {
    pub reason: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl QueryFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            stdout: None,
            stderr: None,
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }
}

/// Result of one topic query. Never retried within a cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutcome {
    Success(Report),
    /// Structurally valid report with all three collections empty.
    EmptySuccess(Report),
    Failure(QueryFailure),
}

impl QueryOutcome {
    pub fn from_report(report: Report) -> Self {
        if report.has_data() {
            Self::Success(report)
        } else {
            Self::EmptySuccess(report)
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(QueryFailure::new(reason))
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Success(r) | Self::EmptySuccess(r) => Some(r),
            Self::Failure(_) => None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.report().is_some_and(Report::has_data)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn as_failure(&self) -> Option<&QueryFailure> {
        match self {
            Self::Failure(f) => Some(f),
            _ => None,
        }
    }
}

/// A query outcome paired with the topic that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicOutcome {
    pub topic: Topic,
    pub outcome: QueryOutcome,
}

// ===========================================================================
// Diagnostics and status
// ===========================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub topic: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl Diagnostic {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
            stdout: None,
            stderr: None,
        }
    }

    pub fn from_failure(topic: &Topic, failure: &QueryFailure) -> Self {
        Self {
            topic: topic.to_string(),
            reason: failure.reason.clone(),
            stdout: failure.stdout.clone(),
            stderr: failure.stderr.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Fresh,
    NoCache,
    Refreshed,
    Failed,
}

impl RefreshStatus {
    /// Statuses a strict caller would treat as a hard failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::NoCache)
    }
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::NoCache => write!(f, "no_cache"),
            Self::Refreshed => write!(f, "refreshed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ===========================================================================
// Persisted metadata
// ===========================================================================

/// RFC 3339, UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

/// Sole authority for staleness decisions. Field order is the on-disk order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(serialize_with = "serialize_timestamp")]
    pub last_updated: DateTime<Utc>,
    pub topics_researched: Vec<Topic>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub next_update_after: DateTime<Utc>,
}
