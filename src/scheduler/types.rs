//! Core types for the task scheduler.
//!
//! This module defines the scheduler's vocabulary:
//! - Generational task handles ([`TaskId`])
//! - Construction parameters ([`TaskParams`])
//! - Optional capabilities selected at scheduler construction
//!   ([`Capabilities`])
//! - Error values ([`SchedulerError`])

use core::fmt;

use bitflags::bitflags;

use crate::traits::Ticks;

/// Iteration count meaning "run indefinitely until disabled".
///
/// Any negative iteration count has the same meaning; this constant is the
/// conventional spelling.
pub const RUN_FOREVER: i32 = -1;

/// Stable handle to a task slot in a [`Scheduler`](super::Scheduler).
///
/// Handles are generational: deleting a task bumps its slot's generation, so
/// a handle held past `delete_task` is rejected with
/// [`SchedulerError::UnknownTask`] instead of silently addressing whatever
/// task reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Construction parameters for a task.
///
/// The default is an always-due (`interval == 0`), unlimited-iteration task
/// that starts disabled.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskParams {
    /// Human-readable task name, used only for diagnostics.
    pub name: &'static str,

    /// Ticks between successive due times; 0 means "always due".
    pub interval: Ticks,

    /// Iteration budget: negative = unlimited ([`RUN_FOREVER`]), 0 =
    /// exhausted, positive = number of runs.
    pub iterations: i32,

    /// Enable the task immediately on insertion (runs the on-enable hook).
    pub auto_enable: bool,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            name: "",
            interval: 0,
            iterations: RUN_FOREVER,
            auto_enable: false,
        }
    }
}

bitflags! {
    /// Optional scheduler capabilities, combinable, chosen at construction.
    ///
    /// These replace build-time feature switches: a scheduler built without
    /// a capability simply skips the associated bookkeeping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        /// Track per-task overrun (actual minus ideal execution tick) so
        /// cadence-compensating callbacks can read their drift.
        const TIME_CRITICAL = 0b0001;
        /// Invoke the idle hook after a pass in which no task ran, as an
        /// advisory sign the processor may be suspended.
        const SLEEP_ON_IDLE = 0b0010;
        /// Emit verbose trace output from the execution pass (requires the
        /// `defmt` cargo feature to produce anything).
        const DEBUG_DIAGNOSTICS = 0b0100;
    }
}

/// Errors reported by scheduler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every slot in the arena is occupied; the task was not added.
    ChainFull,
    /// The handle does not address a live task (never existed, or deleted).
    UnknownTask,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::ChainFull => write!(f, "task arena is full"),
            SchedulerError::UnknownTask => write!(f, "handle does not address a live task"),
        }
    }
}
