//! Runner configuration from environment variables.

use std::path::PathBuf;

pub use wms_observability::LogFormat;

pub const SNAPSHOT_ENV: &str = "WMS_SNAPSHOT";
pub const LOG_FORMAT_ENV: &str = "WMS_LOG_FORMAT";
pub const AUDIT_ACTOR_ENV: &str = "WMS_AUDIT_ACTOR";

pub const DEFAULT_AUDIT_ACTOR: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Snapshot file the runner loads stores from.
    pub snapshot_path: Option<PathBuf>,
    pub log_format: LogFormat,
    /// Actor recorded in audit entries.
    pub audit_actor: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            log_format: LogFormat::Json,
            audit_actor: DEFAULT_AUDIT_ACTOR.to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset, blank or unparsable values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let log_format = match value(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unknown log format, using default");
                defaults.log_format
            }),
            None => defaults.log_format,
        };

        Self {
            snapshot_path: value(SNAPSHOT_ENV).map(PathBuf::from),
            log_format,
            audit_actor: value(AUDIT_ACTOR_ENV).unwrap_or(defaults.audit_actor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = RunnerConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, RunnerConfig::default());
        assert_eq!(cfg.audit_actor, "system");
    }

    #[test]
    fn reads_every_setting() {
        let cfg = RunnerConfig::from_lookup(lookup(&[
            (SNAPSHOT_ENV, "/tmp/wms.json"),
            (LOG_FORMAT_ENV, "pretty"),
            (AUDIT_ACTOR_ENV, " night-shift "),
        ]));
        assert_eq!(cfg.snapshot_path, Some(PathBuf::from("/tmp/wms.json")));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.audit_actor, "night-shift");
    }

    #[test]
    fn blank_or_bad_values_fall_back() {
        let cfg = RunnerConfig::from_lookup(lookup(&[
            (SNAPSHOT_ENV, "  "),
            (LOG_FORMAT_ENV, "xml"),
            (AUDIT_ACTOR_ENV, ""),
        ]));
        assert_eq!(cfg, RunnerConfig::default());
    }
}
