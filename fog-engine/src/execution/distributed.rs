/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Distributed execution: fan out a divisible task's partitioned input to
//! N chosen nodes and combine their results.

use serde_json::Value;

use crate::registry::NodeDescriptor;
use crate::task::{partition_object, TaskId};

use super::combiner::Combiner;
use super::error::ExecutionError;
use super::remote::dispatch_to_node;

/// One subtask's identifier, assigned node, and input slice, in the same
/// order the parent's nodes were chosen.
#[derive(Debug, Clone)]
pub struct SubtaskAssignment {
    pub subtask_id: TaskId,
    pub node: NodeDescriptor,
    pub input_data: Value,
}

/// Partitions `input_obj`'s keys into `nodes.len()` contiguous chunks (the
/// last absorbing any remainder) and pairs each chunk with its subtask
/// identifier and assigned node.
///
/// # Panics
/// Panics if `nodes` has fewer than two entries — the placement engine
/// guarantees distributed plans always carry at least two.
pub fn subtask_assignments(
    parent_id: &TaskId,
    input_obj: &serde_json::Map<String, Value>,
    nodes: &[NodeDescriptor],
) -> Vec<SubtaskAssignment> {
    assert!(
        nodes.len() >= 2,
        "distributed execution requires at least two nodes, got {}",
        nodes.len()
    );

    let chunks = partition_object(input_obj, nodes.len());
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| SubtaskAssignment {
            subtask_id: parent_id.subtask(i),
            node: nodes[i].clone(),
            input_data: Value::Object(chunk),
        })
        .collect()
}

/// Dispatches every assignment to its node, collects the N results in
/// index order, and combines them. Any single subtask failure fails the
/// whole parent — the remaining in-flight dispatches are allowed to run to
/// completion (no coordinated cancel, per `SPEC_FULL.md`'s open point on
/// cancellation) but their results are discarded.
pub async fn execute_distributed(
    task_type: &str,
    docker_image: &str,
    max_execution_time_secs: u32,
    assignments: &[SubtaskAssignment],
    client: &reqwest::Client,
    combiner: &dyn Combiner,
) -> Result<Value, ExecutionError> {
    let dispatches = assignments.iter().map(|assignment| {
        dispatch_to_node(
            client,
            &assignment.node,
            &assignment.subtask_id,
            task_type,
            &assignment.input_data,
            docker_image,
            max_execution_time_secs,
        )
    });

    let results = futures::future::join_all(dispatches).await;

    let mut ordered = Vec::with_capacity(results.len());
    for result in results {
        ordered.push(result?);
    }

    Ok(combiner.combine(ordered))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
