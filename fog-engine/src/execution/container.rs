/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Local container orchestration: task-type → image mapping and the
//! injectable [`ContainerClient`] capability.
//!
//! The local execution path never talks to Docker directly — it depends
//! on a `dyn ContainerClient`, injected once at engine construction
//! ([`crate::engine::Engine::new`]). Production wiring uses
//! [`BollardContainerClient`]; tests substitute `fake::FakeContainerClient`,
//! which simulates exit codes, captured outputs, and timeouts without a
//! real Docker daemon.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

// ── Task-type → image mapping ─────────────────────────────────────────────────

/// Static, extendable task-type → container image table. Unrecognised
/// task types resolve to a default image.
#[derive(Debug, Clone)]
pub struct ImageMap {
    images: HashMap<String, String>,
    default_image: String,
}

impl ImageMap {
    /// Builds the default mapping: `{image_processing, text_analysis,
    /// ml_training}` → dedicated images, with `default_image` as the
    /// fallback for any other type.
    pub fn new(default_image: impl Into<String>) -> Self {
        let mut images = HashMap::new();
        images.insert(
            "image_processing".to_string(),
            "fog/image-processing:latest".to_string(),
        );
        images.insert(
            "text_analysis".to_string(),
            "fog/text-analysis:latest".to_string(),
        );
        images.insert("ml_training".to_string(), "fog/ml-training:latest".to_string());
        ImageMap {
            images,
            default_image: default_image.into(),
        }
    }

    /// Registers or overrides the image for a task type.
    pub fn register(&mut self, task_type: impl Into<String>, image: impl Into<String>) {
        self.images.insert(task_type.into(), image.into());
    }

    /// Resolves the image for `task_type`, falling back to the default
    /// image for unrecognised types.
    pub fn image_for(&self, task_type: &str) -> &str {
        self.images
            .get(task_type)
            .map(|s| s.as_str())
            .unwrap_or(&self.default_image)
    }
}

impl Default for ImageMap {
    fn default() -> Self {
        Self::new("fog/default:latest")
    }
}

// ── Container runtime capability ──────────────────────────────────────────────

/// Everything the container runtime needs to know to start one task
/// container, already resolved from the task record (image, resource
/// limits, command, mount point).
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    /// Host-side scratch area, bind-mounted read-write into the
    /// container at `container_mount`.
    pub host_mount: PathBuf,
    pub container_mount: String,
    pub memory_limit_mib: i64,
    pub cpu_quota_micros: i64,
    pub cpu_period_micros: i64,
}

/// Result of waiting for a container to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerOutcome {
    Exited { code: i64 },
    TimedOut,
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container runtime error: {0}")]
    Runtime(String),
}

/// The container runtime capability injected into the local execution
/// path. Implementations must make `create_and_start`/`wait`/`remove`
/// safe to call from multiple concurrent worker tasks.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<(), ContainerError>;

    /// Waits up to `timeout` for the named container to exit. Returns
    /// `Ok(ContainerOutcome::TimedOut)` — not an error — when the deadline
    /// elapses first; the caller is responsible for then calling
    /// [`ContainerClient::remove`] to terminate it.
    async fn wait(&self, name: &str, timeout: Duration) -> Result<ContainerOutcome, ContainerError>;

    async fn remove(&self, name: &str) -> Result<(), ContainerError>;
}

// ── Docker Engine implementation ──────────────────────────────────────────────

/// Production [`ContainerClient`] backed by a real Docker Engine, via the
/// `bollard` crate's async API.
pub struct BollardContainerClient {
    docker: bollard::Docker,
}

impl BollardContainerClient {
    /// Connects using the platform's default Docker socket (`DOCKER_HOST`
    /// or the local Unix/Windows named pipe).
    pub fn connect() -> Result<Self, ContainerError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        Ok(BollardContainerClient { docker })
    }
}

#[async_trait]
impl ContainerClient for BollardContainerClient {
    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<(), ContainerError> {
        use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};
        use bollard::models::HostConfig;

        let host_config = HostConfig {
            memory: Some(spec.memory_limit_mib * 1024 * 1024),
            cpu_quota: Some(spec.cpu_quota_micros),
            cpu_period: Some(spec.cpu_period_micros),
            binds: Some(vec![format!(
                "{}:{}:rw",
                spec.host_mount.display(),
                spec.container_mount
            )]),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        self.docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;

        self.docker
            .start_container(&spec.name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;

        Ok(())
    }

    async fn wait(&self, name: &str, timeout: Duration) -> Result<ContainerOutcome, ContainerError> {
        use bollard::container::WaitContainerOptions;
        use futures::StreamExt;

        let wait_for_exit = async {
            let mut stream = self
                .docker
                .wait_container(name, None::<WaitContainerOptions<String>>);
            match stream.next().await {
                Some(Ok(response)) => Ok(ContainerOutcome::Exited {
                    code: response.status_code,
                }),
                Some(Err(e)) => Err(ContainerError::Runtime(e.to_string())),
                None => Err(ContainerError::Runtime(
                    "container wait stream closed with no response".to_string(),
                )),
            }
        };

        match tokio::time::timeout(timeout, wait_for_exit).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(ContainerOutcome::TimedOut),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), ContainerError> {
        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        Ok(())
    }
}

// ── In-memory fake, for tests ─────────────────────────────────────────────────

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Scripted outcome for one container name.
    #[derive(Debug, Clone)]
    pub enum Scripted {
        Exit(i64),
        /// Like `Exit`, but also materialises `output.json` into the
        /// container's host mount on `create_and_start`, the way a real
        /// container would before exiting — for scenarios that need the
        /// local execution path to read back a real result.
        ExitWithOutput(i64, serde_json::Value),
        Timeout,
    }

    /// In-memory [`ContainerClient`] for tests: simulates exit codes and
    /// timeouts without touching a real Docker daemon, and tracks whether
    /// every created container was eventually removed, so tests can assert
    /// "no orphan container remains" after a timeout scenario.
    #[derive(Default)]
    pub struct FakeContainerClient {
        scripted: Mutex<HashMap<String, Scripted>>,
        live: Mutex<HashSet<String>>,
    }

    impl FakeContainerClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts the outcome for a container created with this exact
        /// name.
        pub fn script(&self, name: impl Into<String>, outcome: Scripted) {
            self.scripted.lock().unwrap().insert(name.into(), outcome);
        }

        /// `true` if every container this fake has created has since been
        /// removed — used by the container-timeout scenario test.
        pub fn no_orphans(&self) -> bool {
            self.live.lock().unwrap().is_empty()
        }
    }

    #[async_trait]
    impl ContainerClient for FakeContainerClient {
        async fn create_and_start(&self, spec: &ContainerSpec) -> Result<(), ContainerError> {
            self.live.lock().unwrap().insert(spec.name.clone());

            if let Some(Scripted::ExitWithOutput(_, output)) =
                self.scripted.lock().unwrap().get(&spec.name)
            {
                let serialized = serde_json::to_vec(output)
                    .map_err(|e| ContainerError::Runtime(e.to_string()))?;
                std::fs::write(spec.host_mount.join("output.json"), serialized)
                    .map_err(|e| ContainerError::Runtime(e.to_string()))?;
            }

            Ok(())
        }

        async fn wait(
            &self,
            name: &str,
            timeout: Duration,
        ) -> Result<ContainerOutcome, ContainerError> {
            let scripted = self
                .scripted
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or(Scripted::Exit(0));

            match scripted {
                Scripted::Exit(code) => Ok(ContainerOutcome::Exited { code }),
                Scripted::ExitWithOutput(code, _) => Ok(ContainerOutcome::Exited { code }),
                Scripted::Timeout => {
                    // Simulate a container that outlives the deadline.
                    tokio::time::sleep(timeout + Duration::from_millis(10)).await;
                    Ok(ContainerOutcome::TimedOut)
                }
            }
        }

        async fn remove(&self, name: &str) -> Result<(), ContainerError> {
            self.live.lock().unwrap().remove(name);
            Ok(())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
