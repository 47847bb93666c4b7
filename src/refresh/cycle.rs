use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use intelcache_core::{format_timestamp, Diagnostic, RefreshStatus, Result, Topic};
use tracing::{error, info, warn};

use super::executor::QueryProvider;
use super::fanout::{collect_diagnostics, fan_out};
use super::gate;
use super::publish::{self, CachePaths};
use super::report::RunReport;
use super::schedule::{classify, next_metadata};
use crate::config::{resolve_cache_dir_with, RefreshConfig, ScheduleConfig};
use crate::render::{render_digest, RenderOptions};

/// One refresh cycle: gate, fan out, classify, publish, report.
pub struct RefreshCycle {
    paths: CachePaths,
    topics: Vec<Topic>,
    schedule: ScheduleConfig,
    render: RenderOptions,
}

impl RefreshCycle {
    pub fn new(
        paths: CachePaths,
        topics: Vec<Topic>,
        schedule: ScheduleConfig,
        render: RenderOptions,
    ) -> Self {
        Self {
            paths,
            topics,
            schedule,
            render,
        }
    }

    pub fn from_config(config: &RefreshConfig, cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            CachePaths::new(cache_dir, &config.cache),
            config.topic_list(),
            config.schedule.clone(),
            RenderOptions::from_config(&config.render, config.schedule.refresh_interval_days),
        )
    }

    /// Validate the config and resolve the cache directory from the process
    /// environment.
    pub fn prepare(config: &RefreshConfig, explicit_dir: Option<&Path>) -> Result<Self> {
        Self::prepare_with(config, explicit_dir, |key| std::env::var(key).ok())
    }

    pub fn prepare_with(
        config: &RefreshConfig,
        explicit_dir: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        let dir = resolve_cache_dir_with(explicit_dir, &config.cache.skill, env)?;
        Ok(Self::from_config(config, dir))
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Run to completion. Never fails: anything that escapes the cycle is
    /// folded into the report as a `main` diagnostic.
    pub async fn run<P>(&self, provider: &P, now: DateTime<Utc>) -> RunReport
    where
        P: QueryProvider + ?Sized,
    {
        let mut diagnostics = Vec::new();
        match self.try_run(provider, now, &mut diagnostics).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "refresh cycle aborted");
                diagnostics.push(Diagnostic::new("main", format!("fatal: {e}")));
                RunReport::new(RefreshStatus::Failed).with_diagnostics(diagnostics)
            }
        }
    }

    async fn try_run<P>(
        &self,
        provider: &P,
        now: DateTime<Utc>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<RunReport>
    where
        P: QueryProvider + ?Sized,
    {
        self.paths.ensure_dir()?;

        let freshness = gate::check(&self.paths, now, self.schedule.max_cache_age());
        if freshness.is_fresh() {
            info!(%freshness, "cache is fresh, skipping refresh");
            return Ok(RunReport::new(RefreshStatus::Fresh));
        }
        if let gate::Freshness::Unreadable(reason) = &freshness {
            warn!(%reason, "ignoring unreadable cache metadata");
        }
        info!(%freshness, topics = self.topics.len(), "refreshing cache");

        let had_artifact = self.paths.artifact_exists();
        let outcomes = fan_out(&self.topics, provider).await;
        diagnostics.extend(collect_diagnostics(&outcomes));
        for d in diagnostics.iter() {
            warn!(topic = %d.topic, reason = %d.reason, "topic query failed");
        }

        let classification = classify(&outcomes, &self.schedule);

        if classification.is_total_failure() {
            let previous = publish::read_last_updated(&self.paths.metadata);
            let metadata = next_metadata(&classification, &self.topics, now, previous)?;
            publish::publish(&self.paths, None, &metadata)?;

            let status = if had_artifact {
                RefreshStatus::Failed
            } else {
                RefreshStatus::NoCache
            };
            info!(
                %status,
                next_update_after = %format_timestamp(&metadata.next_update_after),
                "no topic returned data, backing off"
            );
            return Ok(RunReport::new(status)
                .with_detail(classification.detail())
                .with_diagnostics(std::mem::take(diagnostics)));
        }

        let metadata = next_metadata(&classification, &self.topics, now, None)?;
        let document = render_digest(
            &outcomes,
            &format_timestamp(&metadata.last_updated),
            &self.render,
        );
        publish::publish(&self.paths, Some(&document), &metadata)?;

        info!(
            success = classification.success_count,
            total = classification.topic_count,
            interval = ?classification.interval_kind,
            next_update_after = %format_timestamp(&metadata.next_update_after),
            "cache refreshed"
        );
        Ok(RunReport::new(RefreshStatus::Refreshed)
            .with_detail(classification.detail())
            .with_diagnostics(std::mem::take(diagnostics)))
    }
}

/// Run a prepared cycle, or report why it could not be prepared as an
/// `init` diagnostic.
pub async fn run_prepared<P>(
    prepared: Result<RefreshCycle>,
    provider: &P,
    now: DateTime<Utc>,
) -> RunReport
where
    P: QueryProvider + ?Sized,
{
    match prepared {
        Ok(cycle) => cycle.run(provider, now).await,
        Err(e) => {
            error!(error = %e, "refresh could not start");
            RunReport::init_failure(e.to_string())
        }
    }
}
