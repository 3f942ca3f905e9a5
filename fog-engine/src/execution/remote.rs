/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-remote dispatch: the `POST /execute_task` protocol shared by
//! both the single-remote path and the distributed path's per-subtask
//! fan-out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::NodeDescriptor;
use crate::task::TaskId;

use super::error::ExecutionError;

/// Wire shape of the request body, per `SPEC_FULL.md`'s remote worker
/// protocol section.
#[derive(Debug, Serialize)]
struct TaskPayload<'a> {
    task_id: &'a str,
    task_type: &'a str,
    input_data: &'a Value,
    docker_image: &'a str,
    max_execution_time: u32,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    status: String,
    #[serde(default)]
    results: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Dispatches one task (or subtask) to `node` and waits for its result.
///
/// The protocol is a single request/response round trip: a subtask's
/// result is the response body of this same call, so there is no
/// separate retrieval request.
pub async fn dispatch_to_node(
    client: &reqwest::Client,
    node: &NodeDescriptor,
    task_id: &TaskId,
    task_type: &str,
    input_data: &Value,
    docker_image: &str,
    max_execution_time_secs: u32,
) -> Result<Value, ExecutionError> {
    let url = format!("http://{}/execute_task", node.address());
    let timeout = std::time::Duration::from_secs(u64::from(max_execution_time_secs) + 10);

    let payload = TaskPayload {
        task_id: task_id.as_str(),
        task_type,
        input_data,
        docker_image,
        max_execution_time: max_execution_time_secs,
    };

    debug!(task = %task_id, node = %node.id, url = %url, "dispatching to remote node");

    let response = client
        .post(&url)
        .json(&payload)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ExecutionError::RemoteHttpError {
            node: node.id.clone(),
            source: e.to_string(),
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(node = %node.id, status = %status, "remote node returned non-200");
        return Err(ExecutionError::RemoteHttpError {
            node: node.id.clone(),
            source: format!("HTTP {status}: {body}"),
        });
    }

    let body: TaskResponse = response.json().await.map_err(|e| ExecutionError::RemoteHttpError {
        node: node.id.clone(),
        source: format!("unparsable response body: {e}"),
    })?;

    if body.status != "Completed" {
        let reason = body.error.unwrap_or_else(|| format!("status={}", body.status));
        return Err(ExecutionError::RemoteReportedFailure {
            node: node.id.clone(),
            reason,
        });
    }

    body.results.ok_or_else(|| ExecutionError::RemoteReportedFailure {
        node: node.id.clone(),
        reason: "status Completed but no results field present".to_string(),
    })
}
