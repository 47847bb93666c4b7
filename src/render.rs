use intelcache_core::{Report, TopicOutcome};

use crate::config::RenderConfig;

pub struct RenderOptions {
    pub title: String,
    pub top_n: usize,
    pub include_quiet_topics: bool,
    pub refresh_interval_days: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Community Intelligence".into(),
            top_n: 5,
            include_quiet_topics: false,
            refresh_interval_days: 30,
        }
    }
}

impl RenderOptions {
    pub fn from_config(render: &RenderConfig, refresh_interval_days: u32) -> Self {
        Self {
            title: render.title.clone(),
            top_n: render.top_n,
            include_quiet_topics: render.include_quiet_topics,
            refresh_interval_days,
        }
    }
}

const MAX_POST_PREVIEW_CHARS: usize = 120;

/// Render the digest in topic order. Failed topics never appear; topics that
/// answered with nothing appear only with `include_quiet_topics`.
pub fn render_digest(outcomes: &[TopicOutcome], updated_at: &str, opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", opts.title));
    out.push_str(&format!("Auto-generated by `intelcache` on {}.\n", updated_at));
    out.push_str(&format!(
        "Refreshed every {} days from provider research.\n\n",
        opts.refresh_interval_days
    ));

    for entry in outcomes {
        let Some(report) = entry.outcome.report() else {
            continue;
        };
        if !report.has_data() {
            if opts.include_quiet_topics {
                out.push_str(&format!("## {}\n\n", entry.topic));
                out.push_str("No significant community activity found for this topic.\n\n");
            }
            continue;
        }
        out.push_str(&format!("## {}\n\n", entry.topic));
        render_report(&mut out, report, opts.top_n);
    }

    out
}

fn render_report(out: &mut String, report: &Report, top_n: usize) {
    let mut urls: Vec<&str> = Vec::new();

    if !report.reddit.is_empty() {
        let mut sorted: Vec<_> = report.reddit.iter().collect();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.push_str("### Reddit\n\n");
        for item in sorted.into_iter().take(top_n) {
            out.push_str(&format!(
                "- [{}]({}) (r/{})\n",
                item.title, item.url, item.subreddit
            ));
            out.push_str(&format!("  {}\n", item.why_relevant));
            for insight in &item.comment_insights {
                out.push_str(&format!("  - {}\n", insight));
            }
            urls.push(&item.url);
        }
        out.push('\n');
    }

    if !report.x.is_empty() {
        let mut sorted: Vec<_> = report.x.iter().collect();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.push_str("### X (Twitter)\n\n");
        for item in sorted.into_iter().take(top_n) {
            out.push_str(&format!(
                "- [@{}]({}): \"{}\"\n",
                item.author_handle,
                item.url,
                preview(&item.text)
            ));
            out.push_str(&format!("  {}\n", item.why_relevant));
            urls.push(&item.url);
        }
        out.push('\n');
    }

    if !report.web.is_empty() {
        let mut sorted: Vec<_> = report.web.iter().collect();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.push_str("### Web\n\n");
        for item in sorted.into_iter().take(top_n) {
            out.push_str(&format!(
                "- [{}]({}) ({})\n",
                item.title, item.url, item.source_domain
            ));
            out.push_str(&format!("  {}\n", item.snippet));
            urls.push(&item.url);
        }
        out.push('\n');
    }

    if !urls.is_empty() {
        out.push_str("### Sources\n\n");
        for url in urls {
            out.push_str(&format!("- {}\n", url));
        }
        out.push('\n');
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(MAX_POST_PREVIEW_CHARS) {
        Some((boundary, _)) => format!("{}...", &text[..boundary]),
        None => text.to_string(),
    }
}
