/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Local resource ledger: the three uncommitted CPU/RAM/GPU counters that
//! gate local placement.
//!
//! Single-owner state belonging to the engine. The only mutators are
//! [`ResourceLedger::reserve`] (called after the placement engine verifies
//! fit) and [`ResourceLedger::release`] (called exactly once, from the
//! local execution path's cleanup step). Both are expected to run under
//! the engine's single mutex — this type itself has no interior
//! synchronisation.

use thiserror::Error;
use tracing::debug;

use crate::task::ResourceEstimate;

/// An attempt to reserve more of a resource than the ledger currently has
/// uncommitted. This is a programming error — the placement engine must
/// have verified fit before calling `reserve` — and callers are expected
/// to fail the task rather than let the ledger go negative.
#[derive(Debug, Error, PartialEq)]
#[error("insufficient {resource}: requested {requested}, available {available}")]
pub struct LedgerError {
    pub resource: &'static str,
    pub requested: f64,
    pub available: f64,
}

/// Tracks uncommitted local CPU (cores), RAM (GB), and GPU (fractional
/// device count) capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLedger {
    cpu: f64,
    ram_gb: f64,
    gpu: f64,
}

impl ResourceLedger {
    /// Creates a ledger initialised to the given local capacity.
    pub fn new(cpu: f64, ram_gb: f64, gpu: f64) -> Self {
        ResourceLedger { cpu, ram_gb, gpu }
    }

    /// `true` if the ledger currently has enough uncommitted capacity to
    /// cover `estimate` in all three dimensions — the predicate behind
    /// placement step 1 ("local fit").
    pub fn fits(&self, estimate: &ResourceEstimate) -> bool {
        estimate.fits_within(&self.as_estimate())
    }

    /// Snapshot of the current counters as a [`ResourceEstimate`], used by
    /// tests and operator introspection (`Engine::ledger_snapshot`).
    pub fn as_estimate(&self) -> ResourceEstimate {
        ResourceEstimate {
            cpu: self.cpu,
            ram_gb: self.ram_gb,
            gpu: self.gpu,
        }
    }

    /// Subtracts `estimate` from the three counters.
    ///
    /// # Errors
    /// Returns [`LedgerError`] if any counter would go negative. The
    /// caller (the placement/dispatch path) must already have checked
    /// `fits()` before calling this — an error here indicates a logic bug
    /// and the calling task must be aborted with `Failed`, not retried.
    pub fn reserve(&mut self, estimate: &ResourceEstimate) -> Result<(), LedgerError> {
        if estimate.cpu > self.cpu {
            return Err(LedgerError {
                resource: "cpu",
                requested: estimate.cpu,
                available: self.cpu,
            });
        }
        if estimate.ram_gb > self.ram_gb {
            return Err(LedgerError {
                resource: "ram_gb",
                requested: estimate.ram_gb,
                available: self.ram_gb,
            });
        }
        if estimate.gpu > self.gpu {
            return Err(LedgerError {
                resource: "gpu",
                requested: estimate.gpu,
                available: self.gpu,
            });
        }

        self.cpu -= estimate.cpu;
        self.ram_gb -= estimate.ram_gb;
        self.gpu -= estimate.gpu;

        debug!(
            cpu = self.cpu,
            ram_gb = self.ram_gb,
            gpu = self.gpu,
            "resources reserved"
        );
        Ok(())
    }

    /// Adds `estimate` back to the three counters. Idempotence is not
    /// required — each task's resources are released exactly once, from
    /// the local path's unconditional cleanup step — but a
    /// double release here would silently overcommit the ledger, so
    /// callers must guarantee single-release themselves (`execution::local`
    /// runs this unconditionally after every other cleanup step, regardless
    /// of which branch of the main execution logic returned).
    pub fn release(&mut self, estimate: &ResourceEstimate) {
        self.cpu += estimate.cpu;
        self.ram_gb += estimate.ram_gb;
        self.gpu += estimate.gpu;

        debug!(
            cpu = self.cpu,
            ram_gb = self.ram_gb,
            gpu = self.gpu,
            "resources released"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
