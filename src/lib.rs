//! cotick - Cooperative tick scheduler for single-threaded no_std targets
//!
//! This crate polls a bounded set of periodic or finite-iteration tasks and
//! invokes their callbacks when due. There is no preemption, no priorities,
//! and no runtime allocation: the scheduler owns a fixed-capacity arena of
//! task slots and drives exactly one pass over them per [`Scheduler::execute`]
//! call, in insertion order.
//!
//! # Design Principles
//!
//! - **Pure no_std**: no std library dependencies, host-testable as-is
//! - **Trait abstractions**: the monotonic clock is injected via
//!   [`traits::TickSource`]; the crate never generates time itself
//! - **No allocation**: capacity is a const generic, membership is managed
//!   through generational [`scheduler::TaskId`] handles
//!
//! # Modules
//!
//! - [`traits`]: platform-agnostic abstractions ([`traits::TickSource`],
//!   [`traits::MockClock`])
//! - [`scheduler`]: the task arena, per-task state machine, and the
//!   execution pass
//!
//! # Concurrency
//!
//! The whole crate is single-context: [`Scheduler::execute`] is the only
//! operation that advances task state, and every operation runs to
//! completion without blocking or yielding. Hosts that mutate task state
//! from interrupt context must wrap those calls in their own critical
//! sections; the crate provides no locking.
//!
//! [`Scheduler::execute`]: scheduler::Scheduler::execute

#![no_std]

pub mod scheduler;
pub mod traits;
