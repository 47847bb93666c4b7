//! Query executor: one provider run per topic, bounded by a hard timeout.
//!
//! Every way a query can go wrong (spawn error, timeout, non-zero exit,
//! malformed output) comes back as `QueryOutcome::Failure`; nothing here
//! returns `Err` or panics on provider behavior.

use std::time::Duration;

use intelcache_core::{QueryFailure, QueryOutcome, Report, Topic, SOURCE_FIELDS};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::provider::ProviderCommand;

/// Stream excerpts carried in diagnostics.
pub const EXCERPT_CHARS: usize = 300;
/// JSON preview carried in "unexpected shape" reasons.
pub const SHAPE_PREVIEW_CHARS: usize = 200;

/// The seam between the orchestrator and whatever answers topic queries.
#[async_trait::async_trait]
pub trait QueryProvider: Send + Sync {
    async fn query(&self, topic: &Topic) -> QueryOutcome;
}

/// Runs the external provider as a child process.
pub struct CommandProvider {
    command: ProviderCommand,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(command: ProviderCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait::async_trait]
impl QueryProvider for CommandProvider {
    async fn query(&self, topic: &Topic) -> QueryOutcome {
        debug!(
            topic = %topic,
            program = %self.command.program.display(),
            "spawning provider"
        );

        let mut child = match self.command.build(topic).spawn() {
            Ok(child) => child,
            Err(e) => return QueryOutcome::failure(format!("spawn failed: {e}")),
        };
        let pid = child.id();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // The deadline covers the exit and both pipes closing: a descendant
        // that inherited stdout keeps the query open until it is killed too.
        let run = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                read_pipe(stdout_pipe, "stdout"),
                read_pipe(stderr_pipe, "stderr"),
            );
            (status, stdout, stderr)
        };
        let settled = tokio::time::timeout(self.timeout, run).await;

        let (status, stdout, stderr) = match settled {
            Ok((Ok(status), stdout, stderr)) => (status, stdout, stderr),
            Ok((Err(e), _, _)) => return QueryOutcome::failure(format!("wait failed: {e}")),
            Err(_) => {
                kill_process_group(pid);
                let _ = child.kill().await;
                warn!(
                    topic = %topic,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "provider timed out, killed its process group"
                );
                return QueryOutcome::failure(format!(
                    "timeout after {}ms",
                    self.timeout.as_millis()
                ));
            }
        };

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return QueryOutcome::Failure(
                QueryFailure::new(format!("exit code {code}"))
                    .with_stderr(excerpt(&stderr, EXCERPT_CHARS)),
            );
        }

        let outcome = parse_output(&stdout, &stderr);
        if let Some(failure) = outcome.as_failure() {
            warn!(topic = %topic, reason = %failure.reason, "provider output rejected");
        }
        outcome
    }
}

/// Read all bytes from an optional child pipe into a string. A read error
/// keeps whatever arrived before it.
async fn read_pipe(pipe: Option<impl tokio::io::AsyncRead + Unpin>, name: &str) -> String {
    let Some(mut p) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = p.read_to_end(&mut buf).await {
        debug!(pipe = name, read = buf.len(), error = %e, "provider pipe read failed");
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// SIGKILL the provider's process group. The child leads its own group (see
/// `ProviderCommand::build`), so this reaches anything it spawned.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let group = Pid::from_raw(pid as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Turn a zero-exit provider's output into an outcome.
pub fn parse_output(stdout: &str, stderr: &str) -> QueryOutcome {
    let value: Value = match serde_json::from_str(stdout.trim()) {
        Ok(v) => v,
        Err(_) => {
            return QueryOutcome::Failure(
                QueryFailure::new("stdout was not valid JSON")
                    .with_stdout(excerpt(stdout, EXCERPT_CHARS))
                    .with_stderr(excerpt(stderr, EXCERPT_CHARS)),
            )
        }
    };
    match validate_report(&value) {
        Ok(report) => QueryOutcome::from_report(report),
        Err(reason) => QueryOutcome::failure(reason),
    }
}

/// Explicit schema check: an object whose three source fields are arrays,
/// and whose items deserialize.
pub fn validate_report(value: &Value) -> Result<Report, String> {
    let arrays_present = value.as_object().is_some_and(|obj| {
        SOURCE_FIELDS
            .iter()
            .all(|field| obj.get(*field).is_some_and(Value::is_array))
    });
    if !arrays_present {
        return Err(unexpected_shape(value));
    }
    Report::deserialize(value).map_err(|_| unexpected_shape(value))
}

fn unexpected_shape(value: &Value) -> String {
    format!(
        "unexpected shape: {}",
        excerpt(&value.to_string(), SHAPE_PREVIEW_CHARS)
    )
}

/// First `max` chars of `s`, respecting char boundaries.
pub fn excerpt(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((boundary, _)) => s[..boundary].to_string(),
        None => s.to_string(),
    }
}
