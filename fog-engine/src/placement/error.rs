/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the placement engine.
//!
//! A single enum rather than a detailed per-attempt reason plus a
//! top-level error, since the placement engine has only one failure
//! outcome ("no plan fits"), not a per-node admission gate with several
//! independent rejection reasons.

use thiserror::Error;

/// Why the placement engine could not find a viable execution plan for a
/// task. Every variant is named so the engine can both log a precise
/// message and record it verbatim as the task's `error` field via
/// `Task::mark_failed`.
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    /// Local fit failed, no single remote node fits, and either the task
    /// is not divisible or the combined capacity of all active nodes does
    /// not meet the estimate.
    #[error("no local, single-remote, or split placement fits the task's resource estimate")]
    NoPlacement,

    /// A divisible task's `input_data` is not a JSON object, so it cannot
    /// be partitioned key-wise.
    #[error("divisible task input_data must be a JSON object to be split across nodes")]
    NonObjectPayload,
}
