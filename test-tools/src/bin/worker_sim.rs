/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulates a remote worker node's `/execute_task` endpoint, the wire
//! format `fog-engine::execution::remote` speaks as a client.
//!
//! Serves `POST /execute_task`, echoing the request's `input_data` back as
//! `results` by default. Optional flags inject a delay (timeout testing) or
//! a scripted failure (remote-HTTP-error / remote-reported-failure
//! testing), so `execution::remote` and `execution::distributed` can be
//! exercised against a real socket instead of only the in-process fake.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use fog_engine::task::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Simulates a fog worker node's /execute_task endpoint")]
struct Args {
    /// TCP port to listen on.
    #[arg(long, default_value_t = 9500)]
    port: u16,

    /// Milliseconds to sleep before responding — simulates a slow worker
    /// for exercising the client's timeout deadline.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Always respond with `{"status":"Failed", "error": "..."}` instead of
    /// completing the task — simulates `RemoteReportedFailure`.
    #[arg(long)]
    fail: bool,

    /// Respond with this HTTP status code instead of 200 — simulates
    /// `RemoteHttpError`. Overrides `--fail` when set.
    #[arg(long)]
    http_error: Option<u16>,
}

#[derive(Debug, Clone)]
struct SimConfig {
    delay: Duration,
    fail: bool,
    http_error: Option<StatusCode>,
}

#[derive(Debug, Deserialize)]
struct TaskRequest {
    // Re-uses fog-engine's own wire-identifier type rather than a bare
    // `String` — it deserializes transparently from the same JSON string.
    task_id: TaskId,
    #[allow(dead_code)]
    task_type: String,
    input_data: Value,
    #[allow(dead_code)]
    docker_image: String,
    #[allow(dead_code)]
    max_execution_time: u32,
}

#[derive(Debug, Serialize)]
struct TaskResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Arc::new(SimConfig {
        delay: Duration::from_millis(args.delay_ms),
        fail: args.fail,
        http_error: args
            .http_error
            .map(|code| StatusCode::from_u16(code).expect("valid HTTP status code")),
    });

    let app = Router::new()
        .route("/execute_task", post(execute_task))
        .with_state(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(%addr, "worker-sim listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn execute_task(
    State(config): State<Arc<SimConfig>>,
    Json(request): Json<TaskRequest>,
) -> Response {
    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay).await;
    }

    info!(task = %request.task_id, "worker-sim received task");

    if let Some(status) = config.http_error {
        return (status, "simulated remote failure").into_response();
    }

    if config.fail {
        let body = TaskResponse {
            status: "Failed",
            results: None,
            error: Some("simulated task failure".to_string()),
        };
        return Json(body).into_response();
    }

    let body = TaskResponse {
        status: "Completed",
        results: Some(request.input_data),
        error: None,
    };
    Json(body).into_response()
}
