/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the fog-computing dispatcher.
//!
//! A [`Task`] is the one type that flows through the whole pipeline:
//!
//! ```text
//! client ──(submit)──►  Task (Pending)  ──►  dispatcher  ──►  placement  ──►  execution
//!                         ↑ immutable descriptor        ↑ mutable lifecycle fields
//! ```
//!
//! # Ownership model
//! A `Task` is owned by the engine from [`Engine::submit`](crate::engine::Engine::submit)
//! onward. Only the component currently holding it — admission queue,
//! dispatcher, or the executor worker assigned to it — ever mutates its
//! lifecycle fields, and only ever sequentially.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Task identifier ───────────────────────────────────────────────────────────

/// Opaque, globally unique task identifier.
///
/// Generated once at construction from a UUIDv4 and never reassigned — a
/// stable identity field, generated rather than caller-supplied so
/// identifiers stay distinct across any sequence of submissions without
/// cooperation from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh, unique identifier.
    pub fn new() -> Self {
        TaskId(Uuid::new_v4().to_string())
    }

    /// Builds a subtask identifier `<parent>-<index>` for the distributed
    /// execution path.
    pub fn subtask(&self, index: usize) -> TaskId {
        TaskId(format!("{}-{}", self.0, index))
    }

    /// Borrows the identifier as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Resource estimate ─────────────────────────────────────────────────────────

/// CPU/RAM/GPU estimate carried by a task, and the shape of the resource
/// ledger's three counters.
///
/// `gpu` is constrained to `[0, 1]` by convention (0 = none, 1 = one whole
/// device) but is not clamped here — the placement engine and ledger treat
/// out-of-range values the same as any other unmet requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub cpu: f64,
    pub ram_gb: f64,
    pub gpu: f64,
}

impl ResourceEstimate {
    pub const ZERO: ResourceEstimate = ResourceEstimate {
        cpu: 0.0,
        ram_gb: 0.0,
        gpu: 0.0,
    };

    /// Returns `true` if every one of `self`'s fields is `<=` the
    /// corresponding field of `capacity`.
    pub fn fits_within(&self, capacity: &ResourceEstimate) -> bool {
        self.cpu <= capacity.cpu && self.ram_gb <= capacity.ram_gb && self.gpu <= capacity.gpu
    }

    /// Element-wise sum, used when accumulating advertised node capacity
    /// during split placement.
    pub fn add(&self, other: &ResourceEstimate) -> ResourceEstimate {
        ResourceEstimate {
            cpu: self.cpu + other.cpu,
            ram_gb: self.ram_gb + other.ram_gb,
            gpu: self.gpu + other.gpu,
        }
    }

    /// Element-wise subtraction, used to track "remaining requirement" while
    /// greedily taking nodes during split placement.
    pub fn sub(&self, other: &ResourceEstimate) -> ResourceEstimate {
        ResourceEstimate {
            cpu: self.cpu - other.cpu,
            ram_gb: self.ram_gb - other.ram_gb,
            gpu: self.gpu - other.gpu,
        }
    }

    /// `true` once every field has reached zero or gone negative — the
    /// greedy split scan's stopping condition.
    pub fn fully_satisfied(&self) -> bool {
        self.cpu <= 0.0 && self.ram_gb <= 0.0 && self.gpu <= 0.0
    }
}

// ── Task status ───────────────────────────────────────────────────────────────

/// Lifecycle state of a [`Task`]. `Completed` and `Failed` are terminal;
/// there are no backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Scheduling,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `true` for `Completed` or `Failed` — no further transition is
    /// possible and the task's in-flight slot (if any) must be released.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// `true` for `Scheduling` or `Running` — counted against
    /// `max_concurrent_tasks`.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskStatus::Scheduling | TaskStatus::Running)
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A single unit of work accepted by the engine.
///
/// Constructed via [`Task::new`] with status `Pending`; every other field
/// than `status`, `assigned_nodes`, and `result` is immutable for the life
/// of the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    pub input_data: Value,
    pub estimate: ResourceEstimate,
    pub is_divisible: bool,
    pub max_execution_time_secs: u32,
    pub status: TaskStatus,
    pub created_at_epoch_secs: u64,
    pub assigned_nodes: Vec<String>,
    pub result: Option<Value>,
    /// Populated only on a `Failed` transition — the human-readable error
    /// surfaced through `status()`.
    pub error: Option<String>,
}

impl Task {
    /// Builds a new `Pending` task.
    ///
    /// # Panics
    /// Panics if `max_execution_time_secs == 0` — a zero deadline can never
    /// be met, so a caller passing one is a programmer error at the
    /// boundary, not a task-level failure.
    pub fn new(
        task_type: impl Into<String>,
        input_data: Value,
        estimate: ResourceEstimate,
        is_divisible: bool,
        max_execution_time_secs: u32,
    ) -> Self {
        assert!(
            max_execution_time_secs > 0,
            "max_execution_time_secs must be positive"
        );
        assert!(
            estimate.cpu >= 0.0 && estimate.ram_gb >= 0.0 && estimate.gpu >= 0.0,
            "resource estimates must be non-negative"
        );

        Task {
            id: TaskId::new(),
            task_type: task_type.into(),
            input_data,
            estimate,
            is_divisible,
            max_execution_time_secs,
            status: TaskStatus::Pending,
            created_at_epoch_secs: now_epoch_secs(),
            assigned_nodes: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// `true` if `input_data` is a JSON object — the only payload shape the
    /// distributed execution path can partition key-wise (resolves Open
    /// Question 2, see `SPEC_FULL.md`).
    pub fn has_partitionable_input(&self) -> bool {
        self.input_data.is_object()
    }

    /// Borrows `input_data` as a JSON object map, if it is one.
    pub fn input_as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.input_data.as_object()
    }

    fn transition(&mut self, to: TaskStatus) {
        debug_assert!(
            !self.status.is_terminal(),
            "attempted to transition a terminal task {} from {:?} to {:?}",
            self.id,
            self.status,
            to
        );
        self.status = to;
    }

    pub fn mark_scheduling(&mut self) {
        self.transition(TaskStatus::Scheduling);
    }

    pub fn mark_running(&mut self, assigned_nodes: Vec<String>) {
        self.assigned_nodes = assigned_nodes;
        self.transition(TaskStatus::Running);
    }

    /// Records a successful result and transitions to `Completed`. The
    /// write of `result` happens-before the write of `status` (both guarded
    /// by the same lock in practice) so a reader never observes `Completed`
    /// with no result.
    pub fn mark_completed(&mut self, result: Value) {
        self.result = Some(result);
        self.transition(TaskStatus::Completed);
    }

    /// Records a failure reason and transitions to `Failed`. Idempotent in
    /// the sense that a `Failed` task's message can be inspected any number
    /// of times, but the transition itself only ever happens once per task.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.error = Some(reason.into());
        self.transition(TaskStatus::Failed);
    }
}

fn now_epoch_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Split a JSON object's keys into `n` contiguous chunks, the last chunk
/// absorbing any remainder.
///
/// The incoming key order is the object's natural (insertion) order, which
/// `serde_json::Map` with the `preserve_order` feature retains; without
/// that feature the map is still iterated in a single consistent order
/// within one process, which is enough to guarantee no key is lost or
/// duplicated across chunks even though the exact chunk boundaries would
/// differ from an implementation that explicitly sorts keys.
pub fn partition_object(
    obj: &serde_json::Map<String, Value>,
    n: usize,
) -> Vec<serde_json::Map<String, Value>> {
    assert!(n >= 1, "partition count must be at least 1");

    let keys: Vec<&String> = obj.keys().collect();
    let len = keys.len();
    let chunk_size = len / n;

    let mut chunks = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let end = if i == n - 1 { len } else { start + chunk_size };
        let mut chunk = serde_json::Map::new();
        for key in &keys[start..end] {
            chunk.insert((*key).clone(), obj[*key].clone());
        }
        chunks.push(chunk);
        start = end;
    }
    chunks
}

/// Per-node grouping of scheduled task identifiers, used by the placement
/// engine's split path to describe which subtask ids were handed to which
/// node. Not part of the public `Task` record — purely an internal
/// bookkeeping type for the distributed execution path.
pub type SubtaskMap = HashMap<String, Vec<TaskId>>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn subtask_id_format() {
        let parent = TaskId::new();
        let child = parent.subtask(2);
        assert_eq!(child.as_str(), format!("{}-2", parent.as_str()));
    }

    #[test]
    fn new_task_starts_pending_with_no_result() {
        let task = Task::new(
            "image_processing",
            json!({"a": 1}),
            ResourceEstimate {
                cpu: 1.0,
                ram_gb: 2.0,
                gpu: 0.0,
            },
            false,
            30,
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_nodes.is_empty());
        assert!(task.result.is_none());
    }

    #[test]
    #[should_panic(expected = "positive")]
    fn zero_max_execution_time_panics() {
        Task::new("t", json!({}), ResourceEstimate::ZERO, false, 0);
    }

    #[test]
    fn mark_completed_sets_result_before_status_is_observed() {
        let mut task = Task::new("t", json!({}), ResourceEstimate::ZERO, false, 10);
        task.mark_scheduling();
        task.mark_running(vec![]);
        task.mark_completed(json!({"ok": true}));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, Some(json!({"ok": true})));
    }

    #[test]
    fn mark_failed_records_reason() {
        let mut task = Task::new("t", json!({}), ResourceEstimate::ZERO, false, 10);
        task.mark_scheduling();
        task.mark_failed("no placement found");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("no placement found"));
        assert!(task.result.is_none());
    }

    #[test]
    fn resource_estimate_fits_within() {
        let small = ResourceEstimate {
            cpu: 1.0,
            ram_gb: 2.0,
            gpu: 0.0,
        };
        let big = ResourceEstimate {
            cpu: 4.0,
            ram_gb: 8.0,
            gpu: 1.0,
        };
        assert!(small.fits_within(&big));
        assert!(!big.fits_within(&small));
    }

    #[test]
    fn resource_estimate_fully_satisfied_after_subtraction() {
        let need = ResourceEstimate {
            cpu: 3.0,
            ram_gb: 6.0,
            gpu: 0.0,
        };
        let node = ResourceEstimate {
            cpu: 4.0,
            ram_gb: 8.0,
            gpu: 0.0,
        };
        let remaining = need.sub(&node);
        assert!(remaining.fully_satisfied());
    }

    #[test]
    fn partition_object_distributes_keys_with_remainder_last() {
        let obj = json!({"a": 1, "b": 2, "c": 3, "d": 4}).as_object().unwrap().clone();
        let chunks = partition_object(&obj, 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len() + chunks[1].len(), 4);
    }

    #[test]
    fn partition_object_preserves_total_key_set() {
        let obj = json!({"a": 1, "b": 2, "c": 3, "d": 4, "e": 5})
            .as_object()
            .unwrap()
            .clone();
        let chunks = partition_object(&obj, 3);
        let mut seen: Vec<String> = chunks.iter().flat_map(|c| c.keys().cloned()).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn has_partitionable_input_requires_object() {
        let object_task = Task::new("t", json!({"a": 1}), ResourceEstimate::ZERO, true, 10);
        let scalar_task = Task::new("t", json!(42), ResourceEstimate::ZERO, true, 10);
        assert!(object_task.has_partitionable_input());
        assert!(!scalar_task.has_partitionable_input());
    }
}
