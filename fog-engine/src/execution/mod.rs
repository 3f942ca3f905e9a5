/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Execution engine: runs whatever [`crate::placement::Plan`] the
//! placement engine chose, local, single-remote, or distributed, and
//! returns either the task's final result or the error that failed it.
//!
//! Each sub-module owns one execution path:
//! - [`local`]: container orchestration for [`Plan::Local`]
//! - [`remote`]: the shared `POST /execute_task` protocol
//! - [`distributed`]: fan-out/combine for [`Plan::Distributed`]
//! - [`container`]: the injectable container runtime capability and image map
//! - [`combiner`]: the injectable, task-type-keyed result combiner
//! - [`error`]: the error taxonomy

pub mod combiner;
pub mod container;
pub mod distributed;
pub mod error;
pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::ledger::ResourceLedger;
use crate::placement::Plan;
use crate::task::Task;

pub use error::ExecutionError;

use combiner::CombinerRegistry;
use container::{ContainerClient, ImageMap};

/// Everything the execution engine needs that is injected once at engine
/// construction rather than threaded through every call: the container
/// runtime capability, the image map, the combiner registry, the HTTP
/// client used for remote dispatch, and the scratch-area root for local
/// execution.
pub struct ExecutionContext {
    pub container: std::sync::Arc<dyn ContainerClient>,
    pub image_map: ImageMap,
    pub combiners: CombinerRegistry,
    pub http_client: reqwest::Client,
    pub scratch_root: PathBuf,
}

/// Result of a successful execution: the task's final value and the list
/// of node identifiers it ran on (empty for local execution).
pub struct Executed {
    pub result: Value,
    pub assigned_nodes: Vec<String>,
}

/// Runs `task` according to `plan`, against the shared ledger (released on
/// every local-execution exit path, whatever the outcome).
pub async fn execute(
    plan: &Plan,
    task: &Task,
    ctx: &ExecutionContext,
    ledger: &Mutex<ResourceLedger>,
) -> Result<Executed, ExecutionError> {
    match plan {
        Plan::Local => {
            let result = local::run_local(
                &task.id,
                &task.task_type,
                &task.input_data,
                task.estimate,
                task.max_execution_time_secs,
                &ctx.image_map,
                ctx.container.as_ref(),
                ledger,
                &ctx.scratch_root,
            )
            .await?;
            Ok(Executed {
                result,
                assigned_nodes: Vec::new(),
            })
        }

        Plan::SingleRemote(node) => {
            let image = ctx.image_map.image_for(&task.task_type);
            let result = remote::dispatch_to_node(
                &ctx.http_client,
                node,
                &task.id,
                &task.task_type,
                &task.input_data,
                image,
                task.max_execution_time_secs,
            )
            .await?;
            Ok(Executed {
                result,
                assigned_nodes: vec![node.id.clone()],
            })
        }

        Plan::Distributed(nodes) => {
            let input_obj = task.input_as_object().ok_or_else(|| {
                ExecutionError::Internal(
                    "distributed plan produced for a non-object input_data".to_string(),
                )
            })?;
            let image = ctx.image_map.image_for(&task.task_type).to_string();
            let assignments = distributed::subtask_assignments(&task.id, input_obj, nodes);
            let assigned_nodes = assignments.iter().map(|a| a.node.id.clone()).collect();
            let combiner = ctx.combiners.combiner_for(&task.task_type);

            let result = distributed::execute_distributed(
                &task.task_type,
                &image,
                task.max_execution_time_secs,
                &assignments,
                &ctx.http_client,
                combiner.as_ref(),
            )
            .await?;

            Ok(Executed {
                result,
                assigned_nodes,
            })
        }
    }
}
