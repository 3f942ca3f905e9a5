/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Minimal demo entry point. Wires up the library's public pieces — a
//! config, an empty node registry, and a real Docker-backed execution
//! context — submits one task, and prints it once it reaches a terminal
//! state.
//!
//! The wire format advertised by worker nodes, credential/transport
//! security, and persistence are all out of scope here; this binary
//! exists only to exercise the in-process engine API.

use std::sync::Arc;
use std::time::Duration;

use fog_engine::config::EngineConfig;
use fog_engine::engine::Engine;
use fog_engine::execution::combiner::CombinerRegistry;
use fog_engine::execution::container::{BollardContainerClient, ContainerClient, ImageMap};
use fog_engine::execution::ExecutionContext;
use fog_engine::registry::NodeRegistry;
use fog_engine::task::{ResourceEstimate, Task};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::default();
    let registry = NodeRegistry::new(Vec::new());

    let container: Arc<dyn ContainerClient> = Arc::new(BollardContainerClient::connect()?);
    let ctx = ExecutionContext {
        container,
        image_map: ImageMap::default(),
        combiners: CombinerRegistry::new(),
        http_client: reqwest::Client::new(),
        scratch_root: config.scratch_root.clone(),
    };

    let engine = Engine::new(config, registry, ctx);

    let task = Task::new(
        "image_processing",
        serde_json::json!({"greeting": "hello fog"}),
        ResourceEstimate {
            cpu: 0.5,
            ram_gb: 0.5,
            gpu: 0.0,
        },
        false,
        30,
    );
    let id = engine.submit(task);
    println!("submitted task {id}");

    loop {
        if let Some(task) = engine.status(&id) {
            if task.status.is_terminal() {
                println!("task {id} finished: {:?}", task.status);
                if let Some(result) = task.result {
                    println!("result: {result}");
                }
                if let Some(err) = task.error {
                    println!("error: {err}");
                }
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}
