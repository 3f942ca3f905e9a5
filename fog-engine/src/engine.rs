/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Engine facade: owns the admission queue, task map, resource ledger,
//! node registry, and execution context, and spawns the dispatcher loop
//! at construction.
//!
//! A single owning facade over the engine's mutable, shared,
//! process-lifetime state, unlike a stateless per-call scheduler.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tracing::info;

use crate::config::EngineConfig;
use crate::execution::ExecutionContext;
use crate::ledger::ResourceLedger;
use crate::registry::NodeRegistry;
use crate::task::{ResourceEstimate, Task, TaskId};

/// Shared state reachable from both the public facade and the dispatcher
/// loop it owns. `tasks` and `queue` are guarded by one mutex each (not a
/// single combined mutex) because the two are never locked together in the
/// same critical section — `submit` takes both in sequence but never holds
/// one while blocking on the other.
pub(crate) struct EngineState {
    pub(crate) tasks: Mutex<HashMap<TaskId, Task>>,
    pub(crate) queue: Mutex<VecDeque<TaskId>>,
    pub(crate) ledger: Mutex<ResourceLedger>,
    pub(crate) registry: NodeRegistry,
    pub(crate) exec_ctx: ExecutionContext,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) in_flight: AtomicUsize,
}

/// The fog dispatcher's top-level handle. Constructed once, spawns its
/// dispatcher loop immediately, and lives for the process — there is no
/// graceful shutdown path.
pub struct Engine {
    state: Arc<EngineState>,
    _dispatcher: tokio::task::JoinHandle<()>,
}

impl Engine {
    /// Builds the engine and spawns its background dispatcher loop.
    ///
    /// `registry` is the static remote-node catalogue; `exec_ctx` carries
    /// the injected container-runtime capability, image map, combiner
    /// registry, and HTTP client.
    pub fn new(config: EngineConfig, registry: NodeRegistry, exec_ctx: ExecutionContext) -> Self {
        let state = Arc::new(EngineState {
            tasks: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            ledger: Mutex::new(ResourceLedger::new(
                config.local_cpu_capacity,
                config.local_ram_gb_capacity,
                config.local_gpu_capacity,
            )),
            registry,
            exec_ctx,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1))),
            in_flight: AtomicUsize::new(0),
        });

        let dispatcher_state = state.clone();
        let poll_interval = config.dispatcher_poll_interval();
        let error_backoff = config.dispatcher_error_backoff();
        let dispatcher = tokio::spawn(async move {
            crate::dispatcher::run(dispatcher_state, poll_interval, error_backoff).await;
        });

        info!(
            max_concurrent_tasks = config.max_concurrent_tasks,
            node_count = state.registry.len(),
            "engine started"
        );

        Engine {
            state,
            _dispatcher: dispatcher,
        }
    }

    /// Enqueues a fully-constructed, `Pending` task and returns its
    /// identifier immediately — never blocks on execution.
    pub fn submit(&self, task: Task) -> TaskId {
        let id = task.id.clone();
        info!(task = %id, task_type = %task.task_type, "task submitted");
        self.state.tasks.lock().unwrap().insert(id.clone(), task);
        self.state.queue.lock().unwrap().push_back(id.clone());
        id
    }

    /// Returns a snapshot of the task's current fields, or `None` if no
    /// task with that id has ever been submitted, returned as a value
    /// rather than raised as an exception.
    pub fn status(&self, task_id: &TaskId) -> Option<Task> {
        self.state.tasks.lock().unwrap().get(task_id).cloned()
    }

    /// Current uncommitted local ledger capacity. Test/operator
    /// introspection only, added to observe ledger restoration without
    /// reaching into private state.
    pub fn ledger_snapshot(&self) -> ResourceEstimate {
        self.state.ledger.lock().unwrap().as_estimate()
    }

    /// Total number of registered remote nodes (active or not).
    pub fn node_count(&self) -> usize {
        self.state.registry.len()
    }

    /// Tasks currently `Scheduling` or `Running`.
    pub fn in_flight_count(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
