use intelcache_core::{Diagnostic, RefreshStatus};
use serde::Serialize;

/// The single status record a run prints. `errors` accumulates every
/// diagnostic collected along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub status: RefreshStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "errors", skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new(status: RefreshStatus) -> Self {
        Self {
            status,
            detail: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// A run that could not get as far as querying (e.g. no cache directory).
    pub fn init_failure(reason: impl Into<String>) -> Self {
        Self::new(RefreshStatus::Failed).with_diagnostics(vec![Diagnostic::new("init", reason)])
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"status":"{}"}}"#, self.status))
    }

    /// Process exit code: 0 unless `strict` and the run ended failed or
    /// no_cache.
    pub fn exit_code(&self, strict: bool) -> u8 {
        if strict && self.status.is_failure() {
            1
        } else {
            0
        }
    }

    /// Print the status line on stdout. Called exactly once per run.
    pub fn emit(&self) {
        println!("{}", self.to_json_line());
    }
}
