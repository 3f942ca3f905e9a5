/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error taxonomy for the execution engine.
//!
//! Every variant here ends a task's single execution attempt with a
//! `Failed` transition; none are retried. The display message is recorded
//! verbatim on the task via `Task::mark_failed`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("container exited non-zero: {code}")]
    ContainerNonZero { code: i64 },

    #[error("container did not exit within {0}s")]
    ContainerTimeout(u32),

    #[error("task output could not be parsed as JSON: {0}")]
    OutputUnparsable(String),

    #[error("remote dispatch to {node} failed: {source}")]
    RemoteHttpError { node: String, source: String },

    #[error("node {node} reported failure: {reason}")]
    RemoteReportedFailure { node: String, reason: String },

    #[error("internal error during orchestration: {0}")]
    Internal(String),
}
