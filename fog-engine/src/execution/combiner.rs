/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pluggable result combiner for the distributed execution path.
//!
//! Modelled as a capability keyed on task-type, the way `ImageMap` keys
//! container images on task-type, rather than as a combiner class
//! hierarchy.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Combines the N per-subtask results of a split task, in index order,
/// into the parent task's final result.
pub trait Combiner: Send + Sync {
    fn combine(&self, results: Vec<Value>) -> Value;
}

/// The default combiner: the list of per-shard results, unchanged.
pub struct ListCombiner;

impl Combiner for ListCombiner {
    fn combine(&self, results: Vec<Value>) -> Value {
        Value::Array(results)
    }
}

/// Task-type → combiner table. Unregistered task types fall back to
/// [`ListCombiner`].
pub struct CombinerRegistry {
    combiners: HashMap<String, Arc<dyn Combiner>>,
    default: Arc<dyn Combiner>,
}

impl CombinerRegistry {
    pub fn new() -> Self {
        CombinerRegistry {
            combiners: HashMap::new(),
            default: Arc::new(ListCombiner),
        }
    }

    /// Registers a type-aware combiner for `task_type`, overriding the
    /// default for that type.
    pub fn register(&mut self, task_type: impl Into<String>, combiner: Arc<dyn Combiner>) {
        self.combiners.insert(task_type.into(), combiner);
    }

    /// Resolves the combiner for `task_type`, falling back to
    /// [`ListCombiner`] for unregistered types.
    pub fn combiner_for(&self, task_type: &str) -> Arc<dyn Combiner> {
        self.combiners
            .get(task_type)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for CombinerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
