/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Local container execution.
//!
//! [`run_local`] is the sole entry point: it materialises the task's input,
//! launches the container, waits for it with a deadline, reads and parses
//! the output, and — regardless of which step failed — always tears the
//! container and scratch area down and releases the task's reserved ledger
//! capacity. Cleanup is therefore not a `Drop` guard (container teardown is
//! async, and `Drop` cannot `.await`); instead [`run_local`] wraps the
//! fallible steps in [`run_local_inner`] and runs cleanup unconditionally
//! afterwards, logging but not propagating cleanup failures.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::ledger::ResourceLedger;
use crate::task::{ResourceEstimate, TaskId};

use super::container::{ContainerClient, ContainerOutcome, ContainerSpec, ImageMap};
use super::error::ExecutionError;

/// Runs one locally-placed task to completion.
///
/// `ledger` is released exactly once, after every other cleanup step, no
/// matter which branch below returns. Callers must have already reserved
/// `estimate` from the same ledger before calling this (the placement
/// engine only decides; the dispatcher reserves).
#[allow(clippy::too_many_arguments)]
pub async fn run_local(
    task_id: &TaskId,
    task_type: &str,
    input_data: &Value,
    estimate: ResourceEstimate,
    max_execution_time_secs: u32,
    image_map: &ImageMap,
    container: &dyn ContainerClient,
    ledger: &Mutex<ResourceLedger>,
    scratch_root: &Path,
) -> Result<Value, ExecutionError> {
    let image = image_map.image_for(task_type).to_string();
    let container_name = format!("fog-task-{task_id}");
    let scratch_dir = scratch_root.join(task_id.as_str());

    let outcome = run_local_inner(
        task_id,
        &image,
        input_data,
        estimate,
        max_execution_time_secs,
        &container_name,
        &scratch_dir,
        container,
    )
    .await;

    if let Err(e) = container.remove(&container_name).await {
        warn!(task = %task_id, error = %e, "container cleanup failed");
    }
    if let Err(e) = std::fs::remove_dir_all(&scratch_dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(task = %task_id, error = %e, "scratch area cleanup failed");
        }
    }
    ledger.lock().unwrap().release(&estimate);

    outcome
}

#[allow(clippy::too_many_arguments)]
async fn run_local_inner(
    task_id: &TaskId,
    image: &str,
    input_data: &Value,
    estimate: ResourceEstimate,
    max_execution_time_secs: u32,
    container_name: &str,
    scratch_dir: &Path,
    container: &dyn ContainerClient,
) -> Result<Value, ExecutionError> {
    std::fs::create_dir_all(scratch_dir)
        .map_err(|e| ExecutionError::Internal(format!("cannot create scratch area: {e}")))?;

    let input_path: PathBuf = scratch_dir.join("input.json");
    let serialized = serde_json::to_vec(input_data)
        .map_err(|e| ExecutionError::Internal(format!("cannot serialise input_data: {e}")))?;
    std::fs::write(&input_path, serialized)
        .map_err(|e| ExecutionError::Internal(format!("cannot write input.json: {e}")))?;

    let spec = ContainerSpec {
        name: container_name.to_string(),
        image: image.to_string(),
        command: vec![
            "python".to_string(),
            "/app/run.py".to_string(),
            "--input".to_string(),
            "/data/input.json".to_string(),
            "--output".to_string(),
            "/data/output.json".to_string(),
        ],
        host_mount: scratch_dir.to_path_buf(),
        container_mount: "/data".to_string(),
        memory_limit_mib: (estimate.ram_gb * 1024.0) as i64,
        cpu_quota_micros: (estimate.cpu * 100_000.0) as i64,
        cpu_period_micros: 100_000,
    };

    container
        .create_and_start(&spec)
        .await
        .map_err(|e| ExecutionError::Internal(format!("container start failed: {e}")))?;

    let deadline = Duration::from_secs(u64::from(max_execution_time_secs));
    let outcome = container
        .wait(container_name, deadline)
        .await
        .map_err(|e| ExecutionError::Internal(format!("container wait failed: {e}")))?;

    match outcome {
        ContainerOutcome::TimedOut => {
            let _ = task_id; // id carried only for tracing in the caller
            Err(ExecutionError::ContainerTimeout(max_execution_time_secs))
        }
        ContainerOutcome::Exited { code } if code != 0 => Err(ExecutionError::ContainerNonZero { code }),
        ContainerOutcome::Exited { .. } => {
            let output_path = scratch_dir.join("output.json");
            let content = std::fs::read(&output_path)
                .map_err(|e| ExecutionError::OutputUnparsable(format!("cannot read output.json: {e}")))?;
            serde_json::from_slice(&content).map_err(|e| ExecutionError::OutputUnparsable(e.to_string()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
