use futures::future::join_all;
use intelcache_core::{Diagnostic, Topic, TopicOutcome};

use super::executor::QueryProvider;

/// Query every topic concurrently and wait for all of them to settle.
/// Results come back in input order regardless of completion order.
pub async fn fan_out<P>(topics: &[Topic], provider: &P) -> Vec<TopicOutcome>
where
    P: QueryProvider + ?Sized,
{
    let queries = topics.iter().map(|topic| async move {
        TopicOutcome {
            topic: topic.clone(),
            outcome: provider.query(topic).await,
        }
    });
    join_all(queries).await
}

/// One diagnostic per failed topic, in topic order.
pub fn collect_diagnostics(outcomes: &[TopicOutcome]) -> Vec<Diagnostic> {
    outcomes
        .iter()
        .filter_map(|o| {
            o.outcome
                .as_failure()
                .map(|f| Diagnostic::from_failure(&o.topic, f))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intelcache_core::{QueryOutcome, Report, WebItem};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Completes topics in reverse length order and fails anything containing "bad".
    struct StaggeredProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl QueryProvider for StaggeredProvider {
        async fn query(&self, topic: &Topic) -> QueryOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = 50u64.saturating_sub(topic.as_str().len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if topic.as_str().contains("bad") {
                return QueryOutcome::failure("exit code 1");
            }
            QueryOutcome::from_report(Report {
                topic: topic.to_string(),
                web: vec![WebItem::default()],
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn preserves_input_order_and_isolates_failures() {
        let provider = StaggeredProvider {
            calls: AtomicUsize::new(0),
        };
        let topics: Vec<Topic> = ["a", "bad one", "ccccccc", "d"]
            .into_iter()
            .map(Topic::from)
            .collect();

        let outcomes = fan_out(&topics, &provider).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        let order: Vec<&str> = outcomes.iter().map(|o| o.topic.as_str()).collect();
        assert_eq!(order, vec!["a", "bad one", "ccccccc", "d"]);
        assert!(outcomes[1].outcome.is_failure());
        assert!(outcomes[0].outcome.has_data());
        assert!(outcomes[3].outcome.has_data());

        let diags = collect_diagnostics(&outcomes);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].topic, "bad one");
        assert_eq!(diags[0].reason, "exit code 1");
    }

    #[tokio::test]
    async fn queries_run_concurrently() {
        struct Sleepy;
        #[async_trait::async_trait]
        impl QueryProvider for Sleepy {
            async fn query(&self, _topic: &Topic) -> QueryOutcome {
                tokio::time::sleep(Duration::from_millis(200)).await;
                QueryOutcome::from_report(Report::default())
            }
        }

        let topics: Vec<Topic> = (0..5).map(|i| Topic::new(format!("t{i}"))).collect();
        let start = std::time::Instant::now();
        let outcomes = fan_out(&topics, &Sleepy).await;
        assert_eq!(outcomes.len(), 5);
        // Sequential would take ~1s.
        assert!(start.elapsed() < Duration::from_millis(800));
    }

    #[tokio::test]
    async fn empty_topic_set_yields_nothing() {
        let provider = StaggeredProvider {
            calls: AtomicUsize::new(0),
        };
        assert!(fan_out(&[], &provider).await.is_empty());
    }
}
