/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dispatcher loop: drains the admission queue into the placement engine
//! under a concurrency cap.
//!
//! One long-running dispatcher task feeding a semaphore-bounded pool,
//! equivalent to a channel of task identifiers drained by N workers —
//! implemented with a `tokio::sync::Semaphore` gating a fixed-size pool
//! of spawned workers.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::engine::EngineState;
use crate::execution::{self, ExecutionError};
use crate::placement::{self, Plan, PlacementError};
use crate::task::TaskId;

/// Runs forever, popping admitted tasks and handing them to worker tasks
/// until the process exits. Never returns under normal operation.
pub(crate) async fn run(state: Arc<EngineState>, poll_interval: Duration, error_backoff: Duration) {
    loop {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| try_dispatch_one(&state)));

        match outcome {
            Ok(true) => {
                // Dispatched a task this tick; check again immediately —
                // the queue may hold more work and permits may still be
                // free.
            }
            Ok(false) => {
                tokio::time::sleep(poll_interval).await;
            }
            Err(_) => {
                error!("dispatcher iteration panicked; backing off");
                tokio::time::sleep(error_backoff).await;
            }
        }
    }
}

/// One dispatcher iteration: if the queue holds a task and a worker
/// permit is free, pop the head and spawn a worker for it. Returns `true`
/// if a task was dispatched, `false` if the iteration found nothing to do
/// (empty queue, or the pool is at capacity).
fn try_dispatch_one(state: &Arc<EngineState>) -> bool {
    if state.queue.lock().unwrap().is_empty() {
        return false;
    }

    let permit = match state.semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => return false, // pool at max_concurrent_tasks
    };

    let task_id = state.queue.lock().unwrap().pop_front();
    let Some(task_id) = task_id else {
        return false; // another pop beat us to it (shouldn't happen: single dispatcher)
    };

    let worker_state = state.clone();
    tokio::spawn(async move {
        let _permit = permit; // held for the task's full Scheduling+Running lifetime
        run_task(worker_state, task_id).await;
    });

    true
}

/// Counts `task_id` as in-flight for the duration of `f`, decrementing on
/// every exit path including a panic unwind.
struct InFlightGuard<'a>(&'a std::sync::atomic::AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn new(counter: &'a std::sync::atomic::AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one task end to end: placement, optional ledger reservation,
/// execution, and the final status transition. Every error path ends in
/// `Task::mark_failed` rather than propagating — the engine's public API
/// never raises for task-level failures.
async fn run_task(state: Arc<EngineState>, task_id: TaskId) {
    let _in_flight = InFlightGuard::new(&state.in_flight);

    {
        let mut tasks = state.tasks.lock().unwrap();
        match tasks.get_mut(&task_id) {
            Some(task) => task.mark_scheduling(),
            None => return, // submitted task vanished — cannot happen under normal operation
        }
    }

    let task_snapshot = match state.tasks.lock().unwrap().get(&task_id).cloned() {
        Some(task) => task,
        None => return,
    };

    let plan = {
        let ledger = state.ledger.lock().unwrap();
        placement::place(&task_snapshot, &ledger, &state.registry)
    };

    let plan = match plan {
        Ok(plan) => plan,
        Err(err) => {
            info!(task = %task_id, reason = %err, "placement rejected task");
            fail_task(&state, &task_id, describe_placement_error(&err));
            return;
        }
    };

    if matches!(plan, Plan::Local) {
        let mut ledger = state.ledger.lock().unwrap();
        if let Err(err) = ledger.reserve(&task_snapshot.estimate) {
            drop(ledger);
            warn!(task = %task_id, error = %err, "ledger reserve failed after placement verified fit");
            fail_task(&state, &task_id, err.to_string());
            return;
        }
    }

    {
        let mut tasks = state.tasks.lock().unwrap();
        if let Some(task) = tasks.get_mut(&task_id) {
            task.mark_running(assigned_node_ids(&plan));
        }
    }

    let outcome = execution::execute(&plan, &task_snapshot, &state.exec_ctx, &state.ledger).await;

    let mut tasks = state.tasks.lock().unwrap();
    let Some(task) = tasks.get_mut(&task_id) else {
        return;
    };
    match outcome {
        Ok(executed) => {
            task.assigned_nodes = executed.assigned_nodes;
            task.mark_completed(executed.result);
            info!(task = %task_id, "task completed");
        }
        Err(err) => {
            warn!(task = %task_id, error = %err, "task execution failed");
            task.mark_failed(describe_execution_error(&err));
        }
    }
}

fn assigned_node_ids(plan: &Plan) -> Vec<String> {
    match plan {
        Plan::Local => Vec::new(),
        Plan::SingleRemote(node) => vec![node.id.clone()],
        Plan::Distributed(nodes) => nodes.iter().map(|n| n.id.clone()).collect(),
    }
}

fn fail_task(state: &EngineState, task_id: &TaskId, reason: String) {
    let mut tasks = state.tasks.lock().unwrap();
    if let Some(task) = tasks.get_mut(task_id) {
        task.mark_failed(reason);
    }
}

fn describe_placement_error(err: &PlacementError) -> String {
    err.to_string()
}

fn describe_execution_error(err: &ExecutionError) -> String {
    err.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::execution::combiner::CombinerRegistry;
    use crate::execution::container::fake::{FakeContainerClient, Scripted};
    use crate::execution::container::ImageMap;
    use crate::execution::ExecutionContext;
    use crate::registry::NodeRegistry;
    use crate::task::{ResourceEstimate, Task, TaskStatus};
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    fn state_with_capacity(cap: usize) -> (Arc<EngineState>, Arc<FakeContainerClient>, tempfile::TempDir) {
        let scratch = tempfile::tempdir().unwrap();
        let container = Arc::new(FakeContainerClient::new());
        let ctx = ExecutionContext {
            container: container.clone(),
            image_map: ImageMap::default(),
            combiners: CombinerRegistry::new(),
            http_client: reqwest::Client::new(),
            scratch_root: scratch.path().to_path_buf(),
        };
        let state = Arc::new(EngineState {
            tasks: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            ledger: Mutex::new(crate::ledger::ResourceLedger::new(4.0, 8.0, 1.0)),
            registry: NodeRegistry::new(vec![]),
            exec_ctx: ctx,
            semaphore: Arc::new(Semaphore::new(cap)),
            in_flight: AtomicUsize::new(0),
        });
        (state, container, scratch)
    }

    #[tokio::test]
    async fn try_dispatch_one_is_false_on_empty_queue() {
        let (state, _container, _scratch) = state_with_capacity(4);
        assert!(!try_dispatch_one(&state));
    }

    #[tokio::test]
    async fn try_dispatch_one_respects_the_semaphore_cap() {
        let (state, _container, _scratch) = state_with_capacity(1);
        let _held_permit = state.semaphore.clone().try_acquire_owned().unwrap();

        let task = Task::new("t", json!({}), ResourceEstimate::ZERO, false, 5);
        let id = task.id.clone();
        state.tasks.lock().unwrap().insert(id.clone(), task);
        state.queue.lock().unwrap().push_back(id);

        assert!(!try_dispatch_one(&state), "no free permit should mean no dispatch");
    }

    #[tokio::test]
    async fn run_task_to_completion_clears_in_flight_counter() {
        let (state, container, _scratch) = state_with_capacity(4);
        let task = Task::new(
            "image_processing",
            json!({"a": 1}),
            ResourceEstimate {
                cpu: 1.0,
                ram_gb: 1.0,
                gpu: 0.0,
            },
            false,
            5,
        );
        let id = task.id.clone();
        container.script(format!("fog-task-{id}"), Scripted::ExitWithOutput(0, json!({"ok": true})));
        state.tasks.lock().unwrap().insert(id.clone(), task);

        run_task(state.clone(), id.clone()).await;

        assert_eq!(state.in_flight.load(Ordering::SeqCst), 0);
        let finished = state.tasks.lock().unwrap().get(&id).cloned().unwrap();
        assert_eq!(finished.status, TaskStatus::Completed);
        assert_eq!(finished.result, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn run_task_with_no_placement_fails_cleanly() {
        let (state, _container, _scratch) = state_with_capacity(4);
        {
            let mut ledger = state.ledger.lock().unwrap();
            *ledger = crate::ledger::ResourceLedger::new(0.0, 0.0, 0.0);
        }

        let task = Task::new(
            "text_analysis",
            json!({"a": 1}),
            ResourceEstimate {
                cpu: 1.0,
                ram_gb: 1.0,
                gpu: 0.0,
            },
            false,
            5,
        );
        let id = task.id.clone();
        state.tasks.lock().unwrap().insert(id.clone(), task);

        run_task(state.clone(), id.clone()).await;

        let finished = state.tasks.lock().unwrap().get(&id).cloned().unwrap();
        assert_eq!(finished.status, TaskStatus::Failed);
        assert!(finished.result.is_none());
        assert_eq!(state.in_flight.load(Ordering::SeqCst), 0);
    }
}
