/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Engine-wide tunables: concurrency cap, initial local resource capacity,
//! dispatcher poll/backoff intervals, and the scratch-area root for local
//! execution.
//!
//! A typed config struct over ad hoc globals, same as the node registry.
//! Unlike the registry this one is small enough to construct
//! programmatically in the common case (`EngineConfig::default()`), with
//! an optional YAML loader for deployments that want a file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tunables for one [`crate::engine::Engine`] instance.
///
/// `local_cpu_capacity`/`local_ram_gb_capacity`/`local_gpu_capacity` seed
/// the resource ledger; everything else governs the dispatcher loop and
/// local execution's scratch area.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_concurrent_tasks: usize,
    pub local_cpu_capacity: f64,
    pub local_ram_gb_capacity: f64,
    pub local_gpu_capacity: f64,
    pub scratch_root: PathBuf,
    pub dispatcher_poll_interval_ms: u64,
    pub dispatcher_error_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_concurrent_tasks: 8,
            local_cpu_capacity: 4.0,
            local_ram_gb_capacity: 8.0,
            local_gpu_capacity: 0.0,
            scratch_root: PathBuf::from("/tmp/fog-engine/scratch"),
            dispatcher_poll_interval_ms: 100,
            dispatcher_error_backoff_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Parses a YAML document of the shape documented alongside this
    /// struct's fields. Fields absent from the file keep their
    /// [`EngineConfig::default`] value.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open engine config file: {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse engine config YAML: {}", path.display()))?;
        Ok(config)
    }

    pub fn dispatcher_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dispatcher_poll_interval_ms)
    }

    pub fn dispatcher_error_backoff(&self) -> Duration {
        Duration::from_millis(self.dispatcher_error_backoff_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_has_sane_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_tasks, 8);
        assert!(config.local_cpu_capacity > 0.0);
    }

    #[test]
    fn load_from_file_overrides_only_given_fields() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"max_concurrent_tasks: 2\nlocal_cpu_capacity: 16.0\n").unwrap();

        let config = EngineConfig::load_from_file(f.path()).unwrap();
        assert_eq!(config.max_concurrent_tasks, 2);
        assert_eq!(config.local_cpu_capacity, 16.0);
        // Untouched fields keep their default.
        assert_eq!(config.local_ram_gb_capacity, EngineConfig::default().local_ram_gb_capacity);
    }

    #[test]
    fn load_from_file_missing_file_is_an_error() {
        let result = EngineConfig::load_from_file(Path::new("/nonexistent/engine.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn poll_and_backoff_durations_convert_from_millis() {
        let config = EngineConfig::default();
        assert_eq!(config.dispatcher_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.dispatcher_error_backoff(), Duration::from_secs(1));
    }
}
