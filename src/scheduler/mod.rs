//! Cooperative task scheduling.
//!
//! A [`Scheduler`] owns a fixed-capacity arena of task slots threaded onto a
//! doubly linked chain in insertion order. Each [`Scheduler::execute`] call
//! performs exactly one pass over the chain and invokes the callback of every
//! enabled, due task. Tasks are addressed by generational [`TaskId`] handles,
//! so a handle to a deleted task is detected instead of corrupting the chain.
//!
//! # Components
//!
//! - [`types`]: handles, parameters, capabilities, and errors
//! - [`task`]: per-task timing state machine, hooks, and the callback-side
//!   [`TaskContext`] view
//! - [`chain`]: the arena, chain management, and the execution pass
//!
//! # Example
//!
//! ```
//! use cotick::scheduler::{Scheduler, TaskContext, TaskHooks, TaskParams};
//! use cotick::traits::MockClock;
//!
//! let clock = MockClock::new();
//! let mut sched: Scheduler<_, 4> = Scheduler::new(&clock);
//!
//! let blink: &dyn Fn(&mut TaskContext) = &|_| { /* toggle a pin */ };
//! let id = sched
//!     .add_task(
//!         TaskParams {
//!             name: "blink",
//!             interval: 500,
//!             ..TaskParams::default()
//!         },
//!         TaskHooks {
//!             run: Some(blink),
//!             ..TaskHooks::default()
//!         },
//!     )
//!     .unwrap();
//!
//! sched.enable(id).unwrap();
//! clock.advance(500);
//! assert!(sched.execute());
//! ```

pub mod chain;
pub mod task;
pub mod types;

pub use chain::*;
pub use task::*;
pub use types::*;
