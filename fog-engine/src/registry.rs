/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Static catalogue of remote worker nodes.
//!
//! A read-only, typed view over a YAML node list, generalised from "CPU
//! set + memory budget" to the fog dispatcher's CPU/RAM/GPU capacity
//! triple plus network address and an advertised activity flag.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::task::ResourceEstimate;

// ── Node descriptor ───────────────────────────────────────────────────────────

/// Immutable description of one remote worker node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub cpu: f64,
    pub ram_gb: f64,
    #[serde(default)]
    pub gpu: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NodeDescriptor {
    /// The node's advertised capacity as a [`ResourceEstimate`], for
    /// comparison against a task's estimate.
    pub fn capacity(&self) -> ResourceEstimate {
        ResourceEstimate {
            cpu: self.cpu,
            ram_gb: self.ram_gb,
            gpu: self.gpu,
        }
    }

    /// The address the placement/execution engine POSTs task payloads to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── YAML file shape ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NodeRegistryFile {
    #[serde(default)]
    nodes: Vec<NodeDescriptor>,
}

// ── NodeRegistry ───────────────────────────────────────────────────────────────

/// Static, read-only catalogue of worker nodes, queryable by fit and by
/// activity. Built once and never mutated for the life of the instance —
/// "activity" is an advertised attribute of the descriptor, not a live
/// health probe.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<NodeDescriptor>,
}

impl NodeRegistry {
    /// Builds a registry from an explicit, ordered list of descriptors.
    /// Registration order (the order of `nodes`) is preserved and is the
    /// order returned by both queries below.
    pub fn new(nodes: Vec<NodeDescriptor>) -> Self {
        NodeRegistry { nodes }
    }

    /// Parses a YAML file of the shape documented in `SPEC_FULL.md` and
    /// builds a registry from it. An empty or absent `nodes` list is a
    /// valid registry with zero remote nodes, not an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading node registry");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open node registry file: {}", path.display()))?;
        let file: NodeRegistryFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse node registry YAML: {}", path.display()))?;

        for node in &file.nodes {
            debug!(
                node = %node.id,
                cpu = node.cpu,
                ram_gb = node.ram_gb,
                gpu = node.gpu,
                active = node.active,
                "node registered"
            );
        }
        info!(node_count = file.nodes.len(), "node registry loaded");

        Ok(NodeRegistry { nodes: file.nodes })
    }

    /// Returns every active node whose advertised capacity is `>=`
    /// `estimate` in all three dimensions, in registration order.
    pub fn nodes_fitting(&self, estimate: &ResourceEstimate) -> Vec<&NodeDescriptor> {
        self.nodes
            .iter()
            .filter(|n| n.active && estimate.fits_within(&n.capacity()))
            .collect()
    }

    /// Returns every active node, in registration order.
    pub fn all_active(&self) -> Vec<&NodeDescriptor> {
        self.nodes.iter().filter(|n| n.active).collect()
    }

    /// Total number of registered nodes (active or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn node(id: &str, cpu: f64, ram_gb: f64, gpu: f64, active: bool) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_string(),
            host: "127.0.0.1".to_string(),
            port: 9000,
            cpu,
            ram_gb,
            gpu,
            active,
        }
    }

    #[test]
    fn nodes_fitting_respects_registration_order() {
        let reg = NodeRegistry::new(vec![
            node("n1", 4.0, 8.0, 0.0, true),
            node("n2", 2.0, 4.0, 0.0, true),
        ]);
        let fits = reg.nodes_fitting(&ResourceEstimate {
            cpu: 1.0,
            ram_gb: 1.0,
            gpu: 0.0,
        });
        assert_eq!(fits.len(), 2);
        assert_eq!(fits[0].id, "n1");
        assert_eq!(fits[1].id, "n2");
    }

    #[test]
    fn nodes_fitting_excludes_inactive_nodes() {
        let reg = NodeRegistry::new(vec![node("n1", 8.0, 16.0, 0.0, false)]);
        let fits = reg.nodes_fitting(&ResourceEstimate {
            cpu: 1.0,
            ram_gb: 1.0,
            gpu: 0.0,
        });
        assert!(fits.is_empty());
    }

    #[test]
    fn nodes_fitting_excludes_undersized_nodes() {
        let reg = NodeRegistry::new(vec![node("n1", 1.0, 1.0, 0.0, true)]);
        let fits = reg.nodes_fitting(&ResourceEstimate {
            cpu: 2.0,
            ram_gb: 1.0,
            gpu: 0.0,
        });
        assert!(fits.is_empty());
    }

    #[test]
    fn all_active_filters_and_preserves_order() {
        let reg = NodeRegistry::new(vec![
            node("n1", 1.0, 1.0, 0.0, true),
            node("n2", 1.0, 1.0, 0.0, false),
            node("n3", 1.0, 1.0, 0.0, true),
        ]);
        let active = reg.all_active();
        assert_eq!(active.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["n1", "n3"]);
    }

    #[test]
    fn load_from_file_parses_documented_shape() {
        let yaml = r#"
nodes:
  - id: node01
    host: 10.0.0.11
    port: 9500
    cpu: 4.0
    ram_gb: 8.0
    gpu: 1.0
    active: true
  - id: node02
    host: 10.0.0.12
    port: 9500
    cpu: 2.0
    ram_gb: 4.0
"#;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();

        let reg = NodeRegistry::load_from_file(f.path()).unwrap();
        assert_eq!(reg.len(), 2);
        let n2 = reg.all_active().into_iter().find(|n| n.id == "node02").unwrap();
        assert_eq!(n2.gpu, 0.0); // default
        assert!(n2.active); // default
    }

    #[test]
    fn load_from_file_empty_nodes_is_valid() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"nodes: []\n").unwrap();
        let reg = NodeRegistry::load_from_file(f.path()).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn load_from_file_missing_file_is_an_error() {
        let result = NodeRegistry::load_from_file(Path::new("/nonexistent/registry.yaml"));
        assert!(result.is_err());
    }
}
