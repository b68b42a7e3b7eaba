//! Tick source abstraction for platform-agnostic timing.
//!
//! This module provides the [`TickSource`] trait that abstracts over
//! different monotonic time providers (hardware timers, a mock, etc.) so
//! the scheduler can be tested on host without embedded dependencies.

use core::cell::Cell;

/// Opaque monotonic tick count supplied by the host environment.
///
/// The unit is implementation-defined (milliseconds, timer overflows,
/// whatever the host counts in). All elapsed-time arithmetic in this crate
/// uses wrapping subtraction, so a counter that wraps around `u32::MAX` is
/// handled correctly as long as a task's true elapsed time stays below a
/// full wrap period.
pub type Ticks = u32;

/// Platform-agnostic monotonic tick source.
///
/// The scheduler never generates time itself; the host supplies an
/// ever-increasing (wrap-tolerant) tick count through this trait.
///
/// # Example
///
/// ```
/// use cotick::traits::{MockClock, TickSource};
///
/// fn poll<C: TickSource>(clock: &C, last: &mut u32) -> bool {
///     let due = clock.ticks_since(*last) >= 100;
///     if due {
///         *last = clock.now();
///     }
///     due
/// }
///
/// let clock = MockClock::new();
/// let mut last = 0;
/// clock.advance(150);
/// assert!(poll(&clock, &mut last));
/// ```
pub trait TickSource {
    /// Returns the current tick count.
    fn now(&self) -> Ticks;

    /// Returns elapsed ticks since a reference point.
    ///
    /// Wrapping subtraction, so a tick counter that has wrapped since the
    /// reference was taken still yields the correct distance.
    fn ticks_since(&self, reference: Ticks) -> Ticks {
        self.now().wrapping_sub(reference)
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now(&self) -> Ticks {
        (**self).now()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock tick source with controllable time advancement.
///
/// Allows tests to drive time explicitly, enabling deterministic testing of
/// due-time computation. Hand the scheduler a `&MockClock` and keep the
/// original to advance it:
///
/// ```
/// use cotick::traits::{MockClock, TickSource};
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now(), 100);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current: Cell<Ticks>,
}

impl MockClock {
    /// Creates a new `MockClock` starting at tick 0.
    pub fn new() -> Self {
        Self {
            current: Cell::new(0),
        }
    }

    /// Creates a new `MockClock` starting at the specified tick.
    pub fn with_initial(ticks: Ticks) -> Self {
        Self {
            current: Cell::new(ticks),
        }
    }

    /// Sets the current tick count to an absolute value.
    pub fn set(&self, ticks: Ticks) {
        self.current.set(ticks);
    }

    /// Advances the current tick count, wrapping on overflow.
    pub fn advance(&self, ticks: Ticks) {
        self.current.set(self.current.get().wrapping_add(ticks));
    }
}

impl TickSource for MockClock {
    fn now(&self) -> Ticks {
        self.current.get()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
