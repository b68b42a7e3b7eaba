//! Per-task state machine and callback hooks.
//!
//! [`TaskControl`] is the timing/iteration bookkeeping for one task: when it
//! is due, how many runs remain, and how enable/delay/restart reposition its
//! next due time. It is pure arithmetic over [`Ticks`] and carries no
//! references, so the whole state machine is unit-tested here on host.
//!
//! [`TaskHooks`] bundles the task's callables. [`TaskContext`] is the view a
//! running callback receives of its own task (the only way task state can be
//! touched from inside the pass).

use crate::traits::Ticks;

use super::types::TaskId;

/// Run callback: invoked once per due pass with a view of the running task.
pub type RunHook<'a> = &'a dyn Fn(&mut TaskContext<'_>);

/// Enable gate: returning `false` aborts the enable and leaves the task
/// disabled with its timing untouched.
pub type EnableHook<'a> = &'a dyn Fn() -> bool;

/// Disable notification: invoked when an enabled task becomes disabled,
/// including exhaustion of a finite iteration budget.
pub type DisableHook<'a> = &'a dyn Fn();

/// The callables attached to a task. Every hook is optional.
#[derive(Clone, Copy, Default)]
pub struct TaskHooks<'a> {
    /// Invoked when the task is due during an execution pass.
    pub run: Option<RunHook<'a>>,
    /// Consulted by every enabling operation.
    pub on_enable: Option<EnableHook<'a>>,
    /// Invoked on the enabled-to-disabled transition.
    pub on_disable: Option<DisableHook<'a>>,
}

/// Timing and iteration state for one task.
///
/// Due time is kept as a pair: `last_tick` (always a past-or-present
/// instant) plus `next_due_in` (ticks to wait from it). Keeping the anchor
/// in the past is what makes wrapping tick arithmetic sound: a one-shot
/// delay longer than the interval never places the anchor in the future.
///
/// Single-context only: fields are mutated exclusively through the owning
/// scheduler (or a [`TaskContext`] during the task's own callback).
#[derive(Debug, Clone)]
pub(crate) struct TaskControl {
    pub(crate) name: &'static str,
    pub(crate) interval: Ticks,
    /// Negative = unlimited, 0 = exhausted, positive = runs remaining.
    pub(crate) iterations: i32,
    /// Budget restored by `restart`; tracks the last configured value.
    pub(crate) iterations_budget: i32,
    /// Tick the current wait is anchored at: the last run, or the point an
    /// enable/delay/force operation was performed.
    pub(crate) last_tick: Ticks,
    /// Ticks after `last_tick` at which the task is next due. Normally the
    /// interval; repositioned by the enable, delay, and force operations.
    pub(crate) next_due_in: Ticks,
    /// Completed executions; saturating, never reset.
    pub(crate) run_counter: u32,
    pub(crate) enabled: bool,
    /// Drift of the last run: actual tick minus ideal scheduled tick
    /// (positive = late). Maintained only under `TIME_CRITICAL`.
    pub(crate) overrun: i32,
}

impl TaskControl {
    pub(crate) fn new(name: &'static str, interval: Ticks, iterations: i32) -> Self {
        Self {
            name,
            interval,
            iterations,
            iterations_budget: iterations,
            last_tick: 0,
            next_due_in: interval,
            run_counter: 0,
            enabled: false,
            overrun: 0,
        }
    }

    /// A task is due when the current wait has elapsed. An interval of zero
    /// keeps the wait at zero between runs, so such tasks are always due.
    pub(crate) fn is_due(&self, now: Ticks) -> bool {
        now.wrapping_sub(self.last_tick) >= self.next_due_in
    }

    /// A finite budget that has reached zero; such a task never runs again
    /// until `restart` or `set_iterations` refills it.
    pub(crate) fn is_exhausted(&self) -> bool {
        self.iterations == 0
    }

    /// Re-anchors the wait so the next run occurs `delay` ticks from `now`.
    /// `delay == 0` makes the task immediately due; `delay == interval`
    /// reproduces the plain-enable timing.
    pub(crate) fn due_in(&mut self, now: Ticks, delay: Ticks) {
        self.last_tick = now;
        self.next_due_in = delay;
    }

    /// Changes the interval; the pending wait is recomputed from the
    /// current anchor (not from "now"), matching the plain due rule
    /// "elapsed since last execution >= interval".
    pub(crate) fn set_interval(&mut self, interval: Ticks) {
        self.interval = interval;
        self.next_due_in = interval;
    }

    /// Bookkeeping performed when the pass selects this task, before its
    /// callback runs.
    ///
    /// The anchor advances to the ideal scheduled tick rather than to
    /// `now`, so late passes do not compound drift; a task that missed
    /// several intervals stays due and catches up one run per pass. The
    /// iteration decrement happens here, before the callback, so an
    /// in-callback `set_iterations` fully replaces the remaining budget.
    pub(crate) fn begin_run(&mut self, now: Ticks, time_critical: bool) {
        if self.interval == 0 {
            if time_critical {
                self.overrun = 0;
            }
            self.last_tick = now;
            self.next_due_in = 0;
        } else {
            let scheduled = self.last_tick.wrapping_add(self.next_due_in);
            if time_critical {
                self.overrun = now.wrapping_sub(scheduled) as i32;
            }
            self.last_tick = scheduled;
            self.next_due_in = self.interval;
        }
        self.run_counter = self.run_counter.saturating_add(1);
        if self.iterations > 0 {
            self.iterations -= 1;
        }
    }

    pub(crate) fn set_iterations(&mut self, iterations: i32) {
        self.iterations = iterations;
        self.iterations_budget = iterations;
    }

    pub(crate) fn is_first_iteration(&self) -> bool {
        self.run_counter <= 1
    }

    pub(crate) fn is_last_iteration(&self) -> bool {
        self.iterations == 0
    }
}

/// View of the currently executing task, passed to its run callback.
///
/// This replaces a `currentTask()`-style global accessor: the scheduler is
/// exclusively borrowed for the duration of the pass, so self-inspection and
/// self-mutation go through this context instead. A disable requested here
/// takes effect when the callback returns (the in-progress invocation always
/// completes).
pub struct TaskContext<'t> {
    pub(crate) id: TaskId,
    pub(crate) now: Ticks,
    pub(crate) control: &'t mut TaskControl,
}

impl TaskContext<'_> {
    /// Handle of the running task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Diagnostic name of the running task.
    pub fn name(&self) -> &'static str {
        self.control.name
    }

    /// Completed executions including the one in progress.
    pub fn run_counter(&self) -> u32 {
        self.control.run_counter
    }

    /// True during the task's first-ever execution.
    pub fn is_first_iteration(&self) -> bool {
        self.control.is_first_iteration()
    }

    /// True during the final execution of a finite iteration budget.
    pub fn is_last_iteration(&self) -> bool {
        self.control.is_last_iteration()
    }

    /// Runs remaining after this one; negative = unlimited.
    pub fn iterations_remaining(&self) -> i32 {
        self.control.iterations
    }

    /// Drift of this run (actual minus ideal tick, positive = late).
    /// Meaningful only when the scheduler has the `TIME_CRITICAL`
    /// capability.
    pub fn overrun(&self) -> i32 {
        self.control.overrun
    }

    /// Changes the interval; the next due time is recomputed from this
    /// run's scheduled tick, not from "now".
    pub fn set_interval(&mut self, interval: Ticks) {
        self.control.set_interval(interval);
    }

    /// Replaces the iteration budget. The in-progress run has already been
    /// accounted for, so the task will run exactly `iterations` more times
    /// (setting 0 exhausts it when this callback returns).
    pub fn set_iterations(&mut self, iterations: i32) {
        self.control.set_iterations(iterations);
    }

    /// Postpones the next run to `delay` ticks from now.
    pub fn delay(&mut self, delay: Ticks) {
        let now = self.now;
        self.control.due_in(now, delay);
    }

    /// Makes the task due again on the very next pass.
    pub fn force_next_iteration(&mut self) {
        let now = self.now;
        self.control.due_in(now, 0);
    }

    /// Disables the task once this callback returns; the on-disable hook
    /// fires at that point.
    pub fn disable(&mut self) {
        self.control.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::types::RUN_FOREVER;

    fn control(interval: Ticks, iterations: i32) -> TaskControl {
        TaskControl::new("test", interval, iterations)
    }

    #[test]
    fn zero_interval_always_due() {
        let ctl = control(0, RUN_FOREVER);
        assert!(ctl.is_due(0));
        assert!(ctl.is_due(u32::MAX));
    }

    #[test]
    fn due_after_full_interval() {
        let mut ctl = control(100, RUN_FOREVER);
        ctl.due_in(0, 100);

        assert!(!ctl.is_due(0));
        assert!(!ctl.is_due(99));
        assert!(ctl.is_due(100));
        assert!(ctl.is_due(250));
    }

    #[test]
    fn due_check_across_wrap() {
        let mut ctl = control(100, RUN_FOREVER);
        ctl.due_in(u32::MAX - 20, 100);

        assert!(!ctl.is_due(u32::MAX - 10)); // 10 elapsed
        assert!(ctl.is_due(79)); // 100 elapsed, wrapped
    }

    #[test]
    fn due_in_zero_is_immediately_due() {
        let mut ctl = control(500, RUN_FOREVER);
        ctl.due_in(1_000, 0);
        assert!(ctl.is_due(1_000));
    }

    #[test]
    fn due_in_longer_than_interval_waits_fully() {
        // A one-shot postponement longer than the interval must not look
        // already-elapsed under wrapping arithmetic.
        let mut ctl = control(100, RUN_FOREVER);
        ctl.due_in(1_000, 500);

        assert!(!ctl.is_due(1_100));
        assert!(!ctl.is_due(1_499));
        assert!(ctl.is_due(1_500));
    }

    #[test]
    fn begin_run_advances_to_scheduled_tick_not_now() {
        let mut ctl = control(100, RUN_FOREVER);
        ctl.due_in(0, 100);

        // Pass arrives late at tick 350: the ideal tick was 100.
        ctl.begin_run(350, true);
        assert_eq!(ctl.last_tick, 100);
        assert_eq!(ctl.overrun, 250);

        // Still due: the task catches up one run per pass.
        assert!(ctl.is_due(350));
    }

    #[test]
    fn begin_run_resumes_interval_cadence_after_a_delay() {
        let mut ctl = control(100, RUN_FOREVER);
        ctl.due_in(1_000, 500);

        ctl.begin_run(1_500, false);
        assert_eq!(ctl.last_tick, 1_500);
        assert!(!ctl.is_due(1_599));
        assert!(ctl.is_due(1_600));
    }

    #[test]
    fn begin_run_zero_interval_snaps_to_now() {
        let mut ctl = control(0, RUN_FOREVER);
        ctl.begin_run(777, true);
        assert_eq!(ctl.last_tick, 777);
        assert_eq!(ctl.overrun, 0);
        assert!(ctl.is_due(777));
    }

    #[test]
    fn begin_run_counts_and_decrements() {
        let mut ctl = control(100, 2);
        ctl.due_in(0, 100);

        ctl.begin_run(100, false);
        assert_eq!(ctl.run_counter, 1);
        assert_eq!(ctl.iterations, 1);
        assert!(!ctl.is_exhausted());

        ctl.begin_run(200, false);
        assert_eq!(ctl.run_counter, 2);
        assert!(ctl.is_exhausted());
    }

    #[test]
    fn begin_run_never_decrements_unlimited() {
        let mut ctl = control(10, RUN_FOREVER);
        for pass in 1..=50u32 {
            ctl.begin_run(pass * 10, false);
        }
        assert_eq!(ctl.iterations, RUN_FOREVER);
        assert_eq!(ctl.run_counter, 50);
    }

    #[test]
    fn first_and_last_iteration_flags() {
        let mut ctl = control(100, 2);
        assert!(ctl.is_first_iteration()); // nothing has run yet

        ctl.begin_run(100, false);
        assert!(ctl.is_first_iteration());
        assert!(!ctl.is_last_iteration());

        ctl.begin_run(200, false);
        assert!(!ctl.is_first_iteration());
        assert!(ctl.is_last_iteration());
    }

    #[test]
    fn set_interval_rebases_wait_on_current_anchor() {
        let mut ctl = control(1_000, RUN_FOREVER);
        ctl.due_in(200, 1_000);

        ctl.set_interval(50);
        assert!(!ctl.is_due(240));
        assert!(ctl.is_due(250)); // anchor 200 + new interval 50
    }

    #[test]
    fn set_iterations_updates_budget() {
        let mut ctl = control(100, 3);
        ctl.begin_run(100, false);
        ctl.set_iterations(7);
        assert_eq!(ctl.iterations, 7);
        assert_eq!(ctl.iterations_budget, 7);
    }
}
