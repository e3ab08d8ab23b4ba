use anyhow::{bail, Context, Result};
use std::env;

/// Presence (with any value) turns on logging of every first-time edge.
pub const VERBOSE_ENV: &str = "EDGE_RUNTIME_VERBOSE";
/// File descriptor the harness feeds bytes through.
pub const INPUT_FD_ENV: &str = "EDGE_RUNTIME_INPUT_FD";
/// `tracing_subscriber::EnvFilter` directive for the runtime's own subscriber.
pub const LOG_FILTER_ENV: &str = "EDGE_RUNTIME_LOG";

pub const STDIN_FD: i32 = 0;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub verbose: bool,
    pub input_fd: i32,
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            input_fd: STDIN_FD,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var_os(name).map(|v| v.to_string_lossy().into_owned()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.verbose = lookup(VERBOSE_ENV).is_some();
        if let Some(raw) = lookup(INPUT_FD_ENV) {
            config.input_fd = parse_fd(&raw)?;
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }
        Ok(config)
    }
}

fn parse_fd(raw: &str) -> Result<i32> {
    let fd = raw
        .trim()
        .parse::<i32>()
        .with_context(|| format!("{} must be a file descriptor number, got {:?}", INPUT_FD_ENV, raw))?;
    if fd < 0 {
        bail!("{} must not be negative, got {}", INPUT_FD_ENV, fd);
    }
    Ok(fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<RuntimeConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(!config.verbose);
        assert_eq!(config.input_fd, STDIN_FD);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_verbose_by_presence() {
        assert!(config_from(&[(VERBOSE_ENV, "")]).unwrap().verbose);
        assert!(config_from(&[(VERBOSE_ENV, "0")]).unwrap().verbose);
    }

    #[test]
    fn test_input_fd() {
        assert_eq!(config_from(&[(INPUT_FD_ENV, " 7 ")]).unwrap().input_fd, 7);
        let err = config_from(&[(INPUT_FD_ENV, "stdin")]).unwrap_err();
        assert!(err.to_string().contains(INPUT_FD_ENV));
        assert!(config_from(&[(INPUT_FD_ENV, "-1")]).is_err());
    }

    #[test]
    fn test_log_filter() {
        let config = config_from(&[(LOG_FILTER_ENV, "edge_runtime=debug")]).unwrap();
        assert_eq!(config.log_filter, "edge_runtime=debug");
        assert_eq!(config_from(&[(LOG_FILTER_ENV, "  ")]).unwrap().log_filter, "info");
    }
}
