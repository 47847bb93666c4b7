use std::path::{Path, PathBuf};
use std::process::Stdio;

use intelcache_core::Topic;
use tokio::process::Command;

use crate::config::{ProviderConfig, TOPIC_PLACEHOLDER};

/// Fully resolved provider invocation, built once per run and reused per topic.
#[derive(Debug, Clone)]
pub struct ProviderCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ProviderCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let program = resolve_program(&config.program, &config.fallback_paths);
        Self {
            program,
            args: config.args.clone(),
            env: config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Arguments for one topic. The topic is appended when no argument
    /// carries the placeholder.
    pub fn args_for(&self, topic: &Topic) -> Vec<String> {
        if self.args.iter().any(|a| a.contains(TOPIC_PLACEHOLDER)) {
            self.args
                .iter()
                .map(|a| a.replace(TOPIC_PLACEHOLDER, topic.as_str()))
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(topic.to_string());
            args
        }
    }

    pub fn build(&self, topic: &Topic) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(topic))
            .env("NO_COLOR", "1")
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down grandchildren too.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Candidates in priority order: PATH lookup, then the fallbacks. If none
/// exists the bare name is returned and the spawn is left to fail on its own.
pub fn resolve_program(program: &str, fallbacks: &[PathBuf]) -> PathBuf {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return PathBuf::from(program);
    }
    search_path(program)
        .or_else(|| fallbacks.iter().find(|p| p.is_file()).cloned())
        .unwrap_or_else(|| PathBuf::from(program))
}

fn search_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_substituted() {
        let cmd = ProviderCommand::new(
            "bunx",
            vec!["pkg".into(), "{topic}".into(), "--emit=json".into()],
        );
        let args = cmd.args_for(&Topic::new("hdr scaling"));
        assert_eq!(args, vec!["pkg", "hdr scaling", "--emit=json"]);
    }

    #[test]
    fn topic_appended_without_placeholder() {
        let cmd = ProviderCommand::new("research", vec!["--json".into()]);
        assert_eq!(cmd.args_for(&Topic::new("kvm")), vec!["--json", "kvm"]);
    }

    #[test]
    fn resolve_finds_program_on_path() {
        // sh is on PATH on every unix CI image
        let resolved = resolve_program("sh", &[]);
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sh"));
    }

    #[test]
    fn resolve_uses_first_existing_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("bunx");
        std::fs::write(&present, "#!/bin/sh\n").unwrap();
        let fallbacks = vec![dir.path().join("missing"), present.clone()];
        let resolved = resolve_program("definitely-not-installed-xyz", &fallbacks);
        assert_eq!(resolved, present);
    }

    #[test]
    fn resolve_falls_back_to_bare_name() {
        let resolved = resolve_program("definitely-not-installed-xyz", &[PathBuf::from("/nope")]);
        assert_eq!(resolved, PathBuf::from("definitely-not-installed-xyz"));
    }

    #[test]
    fn explicit_path_is_used_as_is() {
        let resolved = resolve_program("/opt/tools/research", &[]);
        assert_eq!(resolved, PathBuf::from("/opt/tools/research"));
    }
}
