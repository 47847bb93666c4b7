use chrono::{DateTime, Duration, Utc};
use intelcache_core::{CacheMetadata, Error, Result, Topic, TopicOutcome};

use crate::config::ScheduleConfig;

/// Which interval the scheduler picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Standard,
    /// Fewer than half the topics had data; re-check sooner.
    Thin,
    /// Nothing came back; retry after a short fixed delay.
    Backoff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Non-failed outcomes that actually carry data.
    pub success_count: usize,
    pub topic_count: usize,
    pub has_any_data: bool,
    pub interval_kind: IntervalKind,
    pub next_interval: Duration,
}

impl Classification {
    pub fn is_total_failure(&self) -> bool {
        self.success_count == 0
    }

    /// Human-readable summary carried in the status line.
    pub fn detail(&self) -> String {
        match self.interval_kind {
            IntervalKind::Backoff => format!(
                "all queries failed, backoff {}h",
                self.next_interval.num_hours()
            ),
            IntervalKind::Standard | IntervalKind::Thin => format!(
                "{}/{} topics (interval: {}d)",
                self.success_count,
                self.topic_count,
                self.next_interval.num_days()
            ),
        }
    }
}

pub fn classify(outcomes: &[TopicOutcome], schedule: &ScheduleConfig) -> Classification {
    let success_count = outcomes.iter().filter(|o| o.outcome.has_data()).count();
    let topic_count = outcomes.len();

    let (interval_kind, next_interval) = if success_count == 0 {
        (IntervalKind::Backoff, schedule.failure_backoff())
    } else if success_count * 2 < topic_count {
        (IntervalKind::Thin, schedule.thin_interval())
    } else {
        (IntervalKind::Standard, schedule.refresh_interval())
    };

    Classification {
        success_count,
        topic_count,
        has_any_data: success_count > 0,
        interval_kind,
        next_interval,
    }
}

/// Metadata for the cycle that just ran. On total failure only
/// `next_update_after` moves; the previous `last_updated` is kept when it
/// could be recovered. An interval that pushes `next_update_after` past
/// the calendar is a config error.
pub fn next_metadata(
    classification: &Classification,
    topics: &[Topic],
    now: DateTime<Utc>,
    previous_last_updated: Option<DateTime<Utc>>,
) -> Result<CacheMetadata> {
    let last_updated = if classification.is_total_failure() {
        previous_last_updated.unwrap_or(now)
    } else {
        now
    };
    let next_update_after = now
        .checked_add_signed(classification.next_interval)
        .ok_or_else(|| {
            Error::ConfigError(format!(
                "{:?} interval of {}h overflows the calendar",
                classification.interval_kind,
                classification.next_interval.num_hours()
            ))
        })?;
    Ok(CacheMetadata {
        last_updated,
        topics_researched: topics.to_vec(),
        next_update_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use intelcache_core::{QueryOutcome, Report, XItem};

    fn data(topic: &str) -> TopicOutcome {
        TopicOutcome {
            topic: Topic::new(topic),
            outcome: QueryOutcome::from_report(Report {
                x: vec![XItem::default()],
                ..Default::default()
            }),
        }
    }

    fn empty(topic: &str) -> TopicOutcome {
        TopicOutcome {
            topic: Topic::new(topic),
            outcome: QueryOutcome::from_report(Report::default()),
        }
    }

    fn failed(topic: &str) -> TopicOutcome {
        TopicOutcome {
            topic: Topic::new(topic),
            outcome: QueryOutcome::failure("timeout after 60000ms"),
        }
    }

    #[test]
    fn only_data_bearing_successes_count() {
        let outcomes = vec![
            data("a"),
            data("b"),
            empty("c"),
            empty("d"),
            failed("e"),
            failed("f"),
        ];
        let c = classify(&outcomes, &ScheduleConfig::default());
        assert_eq!(c.success_count, 2);
        assert!(c.has_any_data);
        assert_eq!(c.interval_kind, IntervalKind::Thin);
        assert_eq!(c.next_interval, Duration::days(7));
        assert_eq!(c.detail(), "2/6 topics (interval: 7d)");
    }

    #[test]
    fn half_or_more_uses_standard_interval() {
        let outcomes = vec![
            data("a"),
            data("b"),
            data("c"),
            failed("d"),
            failed("e"),
            failed("f"),
        ];
        let c = classify(&outcomes, &ScheduleConfig::default());
        assert_eq!(c.interval_kind, IntervalKind::Standard);
        assert_eq!(c.detail(), "3/6 topics (interval: 30d)");
    }

    #[test]
    fn odd_topic_counts_round_like_a_real_half() {
        // 2 < 5/2 is thin, 3 < 5/2 is not
        let schedule = ScheduleConfig::default();
        let thin = classify(
            &[data("a"), data("b"), failed("c"), failed("d"), failed("e")],
            &schedule,
        );
        assert_eq!(thin.interval_kind, IntervalKind::Thin);
        let standard = classify(
            &[data("a"), data("b"), data("c"), failed("d"), failed("e")],
            &schedule,
        );
        assert_eq!(standard.interval_kind, IntervalKind::Standard);
    }

    #[test]
    fn all_empty_is_total_failure() {
        let c = classify(&[empty("a"), empty("b")], &ScheduleConfig::default());
        assert!(c.is_total_failure());
        assert!(!c.has_any_data);
        assert_eq!(c.interval_kind, IntervalKind::Backoff);
        assert_eq!(c.detail(), "all queries failed, backoff 4h");
    }

    #[test]
    fn backoff_preserves_previous_last_updated() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let earlier = now - Duration::days(40);
        let c = classify(&[failed("a")], &ScheduleConfig::default());
        let topics = vec![Topic::new("a")];

        let m = next_metadata(&c, &topics, now, Some(earlier)).unwrap();
        assert_eq!(m.last_updated, earlier);
        assert_eq!(m.next_update_after, now + Duration::hours(4));

        let m = next_metadata(&c, &topics, now, None).unwrap();
        assert_eq!(m.last_updated, now);
    }

    #[test]
    fn refresh_stamps_now() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let c = classify(&[data("a")], &ScheduleConfig::default());
        let previous = Some(now - Duration::days(3));
        let m = next_metadata(&c, &[Topic::new("a")], now, previous).unwrap();
        assert_eq!(m.last_updated, now);
        assert_eq!(m.next_update_after, now + Duration::days(30));
        assert!(m.next_update_after >= m.last_updated);
    }

    #[test]
    fn interval_past_the_calendar_is_a_config_error() {
        let schedule = ScheduleConfig {
            refresh_interval_days: u32::MAX,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let c = classify(&[data("a")], &schedule);
        let err = next_metadata(&c, &[Topic::new("a")], now, None).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("overflows the calendar"));
    }
}
