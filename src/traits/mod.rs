//! Platform-agnostic trait abstractions.
//!
//! The scheduler core is decoupled from any concrete time source: the host
//! injects an implementation of [`TickSource`] at construction. A
//! controllable [`MockClock`] is always available for host testing.

pub mod time;

pub use time::{MockClock, TickSource, Ticks};
