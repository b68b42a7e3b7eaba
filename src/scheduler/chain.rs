//! Task arena, chain management, and the execution pass.
//!
//! The scheduler owns a fixed-capacity arena of task slots. Chain order is
//! expressed as prev/next slot indexes inside the arena (the scheduler
//! tracks head and tail), so insertion and removal are O(1) and no task ever
//! holds a dangling link to a neighbour. Handles are generational: a slot's
//! generation is bumped on delete, and every operation validates the handle
//! it is given.
//!
//! One [`Scheduler::execute`] call performs exactly one head-to-tail pass
//! and runs every enabled, due task in insertion order. Nothing in the pass
//! blocks, yields, or allocates; a long callback delays every task behind it
//! in the chain, which is the caller's responsibility.

use heapless::Vec;

use crate::traits::{TickSource, Ticks};

use super::task::{DisableHook, EnableHook, RunHook, TaskContext, TaskControl, TaskHooks};
use super::types::{Capabilities, SchedulerError, TaskId, TaskParams};

#[derive(Debug, Clone, Copy)]
struct Links {
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot<'a> {
    control: TaskControl,
    hooks: TaskHooks<'a>,
    links: Links,
}

/// Cooperative task scheduler over a fixed arena of `N` slots.
///
/// The clock is injected at construction ([`TickSource`]); the host drives
/// scheduling by calling [`Scheduler::execute`] repeatedly from its main
/// loop. Granularity is bounded by how often that loop runs a pass.
pub struct Scheduler<'a, C: TickSource, const N: usize> {
    clock: C,
    capabilities: Capabilities,
    slots: [Option<Slot<'a>>; N],
    /// Bumped when a slot's task is deleted; stale handles are rejected.
    generations: [u32; N],
    free: Vec<usize, N>,
    head: Option<usize>,
    tail: Option<usize>,
    /// Slot of the task whose callback is in flight, pass-local.
    current: Option<usize>,
    sleep_allowed: bool,
    idle_hook: Option<&'a dyn Fn()>,
}

impl<'a, C: TickSource, const N: usize> Scheduler<'a, C, N> {
    /// Creates an empty scheduler with no optional capabilities.
    pub fn new(clock: C) -> Self {
        Self::with_capabilities(clock, Capabilities::empty())
    }

    /// Creates an empty scheduler with the given capability set.
    pub fn with_capabilities(clock: C, capabilities: Capabilities) -> Self {
        let mut free = Vec::new();
        // Reverse order so slots are handed out from index 0 upward.
        for index in (0..N).rev() {
            let _ = free.push(index);
        }
        Self {
            clock,
            capabilities,
            slots: core::array::from_fn(|_| None),
            generations: [0; N],
            free,
            head: None,
            tail: None,
            current: None,
            sleep_allowed: true,
            idle_hook: None,
        }
    }

    /// Number of tasks currently in the chain.
    pub fn len(&self) -> usize {
        N - self.free.len()
    }

    /// True when the chain holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slot capacity.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Handles of all tasks in chain (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let index = cursor?;
            let slot = self.slots[index].as_ref()?;
            cursor = slot.links.next;
            Some(TaskId {
                index,
                generation: self.generations[index],
            })
        })
    }

    /// Handle of the task whose callback is currently executing.
    ///
    /// `Some` only during a run callback's dynamic extent; between passes
    /// (and for skipped tasks) this is `None`.
    pub fn current_task(&self) -> Option<TaskId> {
        self.current.map(|index| TaskId {
            index,
            generation: self.generations[index],
        })
    }

    /// Permits or forbids the idle hook. Advisory only; defaults to
    /// permitted.
    pub fn allow_sleep(&mut self, state: bool) {
        self.sleep_allowed = state;
    }

    /// Installs the hook invoked after a pass in which no task ran.
    ///
    /// Requires the [`Capabilities::SLEEP_ON_IDLE`] capability to ever
    /// fire. Purely a hint that the processor may be suspended until the
    /// next pass; it never affects due-time computation.
    pub fn set_idle_hook(&mut self, hook: &'a dyn Fn()) {
        self.idle_hook = Some(hook);
    }

    // ========================================================================
    // Chain membership
    // ========================================================================

    /// Appends a task as the new tail of the chain. O(1).
    ///
    /// The task is owned by the scheduler's arena; the returned handle is
    /// the caller's only way to address it. With `auto_enable` set the task
    /// goes through the regular enable path (on-enable gate included).
    pub fn add_task(
        &mut self,
        params: TaskParams,
        hooks: TaskHooks<'a>,
    ) -> Result<TaskId, SchedulerError> {
        let index = self.free.pop().ok_or(SchedulerError::ChainFull)?;
        debug_assert!(self.slots[index].is_none(), "free list handed out a live slot");

        self.slots[index] = Some(Slot {
            control: TaskControl::new(params.name, params.interval, params.iterations),
            hooks,
            links: Links {
                prev: self.tail,
                next: None,
            },
        });
        match self.tail {
            Some(tail) => {
                if let Some(slot) = self.slots[tail].as_mut() {
                    slot.links.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);

        #[cfg(feature = "defmt")]
        if self.capabilities.contains(Capabilities::DEBUG_DIAGNOSTICS) {
            defmt::trace!("task {=str}: added in slot {=usize}", params.name, index);
        }

        let id = TaskId {
            index,
            generation: self.generations[index],
        };
        if params.auto_enable {
            self.enable(id)?;
        }
        Ok(id)
    }

    /// Splices a task out of the chain, repairing head/tail and neighbour
    /// links. O(1).
    ///
    /// Safe to call with a stale handle (e.g. from a second delete of the
    /// same task): the handle is rejected with
    /// [`SchedulerError::UnknownTask`] and the chain is untouched.
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        if id.index >= N || self.generations[id.index] != id.generation {
            return Err(SchedulerError::UnknownTask);
        }
        let slot = self.slots[id.index]
            .take()
            .ok_or(SchedulerError::UnknownTask)?;

        let Links { prev, next } = slot.links;
        match prev {
            Some(prev) => {
                if let Some(slot) = self.slots[prev].as_mut() {
                    slot.links.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(slot) = self.slots[next].as_mut() {
                    slot.links.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        self.generations[id.index] = self.generations[id.index].wrapping_add(1);
        let _ = self.free.push(id.index);

        #[cfg(feature = "defmt")]
        if self.capabilities.contains(Capabilities::DEBUG_DIAGNOSTICS) {
            defmt::trace!("task {=str}: deleted from slot {=usize}", slot.control.name, id.index);
        }
        Ok(())
    }

    /// Removes every task and invalidates all outstanding handles.
    pub fn clear(&mut self) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            cursor = self.slots[index].take().and_then(|slot| slot.links.next);
            self.generations[index] = self.generations[index].wrapping_add(1);
            let _ = self.free.push(index);
        }
        self.head = None;
        self.tail = None;
        self.current = None;
    }

    // ========================================================================
    // Per-task operations
    // ========================================================================

    /// Enables the task so it becomes due one full interval from now.
    ///
    /// The on-enable gate runs first; if it returns `false` the enable is
    /// aborted and the task's timing is untouched. Returns whether the task
    /// is enabled afterwards.
    pub fn enable(&mut self, id: TaskId) -> Result<bool, SchedulerError> {
        let now = self.clock.now();
        let slot = self.slot_mut(id)?;
        let delay = slot.control.interval;
        Ok(enable_slot(slot, now, delay))
    }

    /// Enables the task only if it is not already enabled.
    ///
    /// Returns `true` (and does nothing) when the task was already enabled,
    /// `false` when it was disabled and an enable was performed.
    pub fn enable_if_not(&mut self, id: TaskId) -> Result<bool, SchedulerError> {
        if self.slot_ref(id)?.control.enabled {
            return Ok(true);
        }
        self.enable(id)?;
        Ok(false)
    }

    /// Enables the task with its first run `delay` ticks from now instead
    /// of one full interval.
    pub fn enable_delayed(&mut self, id: TaskId, delay: Ticks) -> Result<bool, SchedulerError> {
        let now = self.clock.now();
        let slot = self.slot_mut(id)?;
        Ok(enable_slot(slot, now, delay))
    }

    /// Disables the task, running its on-disable hook if it was enabled.
    /// Returns the prior enabled state.
    pub fn disable(&mut self, id: TaskId) -> Result<bool, SchedulerError> {
        let slot = self.slot_mut(id)?;
        Ok(disable_slot(slot))
    }

    /// Postpones the next run to `delay` ticks from now without changing
    /// enablement. To postpone by one full interval, pass the task's
    /// interval.
    pub fn delay(&mut self, id: TaskId, delay: Ticks) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        let slot = self.slot_mut(id)?;
        slot.control.due_in(now, delay);
        Ok(())
    }

    /// Makes the task due on the very next pass, overriding the normal
    /// interval wait. Does not change enablement.
    pub fn force_next_iteration(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        let slot = self.slot_mut(id)?;
        slot.control.due_in(now, 0);
        Ok(())
    }

    /// Restores the iteration budget last configured and enables the task
    /// for immediate execution. The run counter is cumulative and is not
    /// reset. Returns whether the task is enabled afterwards (on-enable
    /// gate, as with [`Scheduler::enable`]).
    pub fn restart(&mut self, id: TaskId) -> Result<bool, SchedulerError> {
        self.restart_delayed(id, 0)
    }

    /// As [`Scheduler::restart`], but the first run occurs `delay` ticks
    /// from now.
    pub fn restart_delayed(&mut self, id: TaskId, delay: Ticks) -> Result<bool, SchedulerError> {
        let now = self.clock.now();
        let slot = self.slot_mut(id)?;
        slot.control.iterations = slot.control.iterations_budget;
        Ok(enable_slot(slot, now, delay))
    }

    /// Atomically replaces interval, iteration budget, and all hooks.
    /// Enablement is unchanged.
    pub fn set(
        &mut self,
        id: TaskId,
        interval: Ticks,
        iterations: i32,
        hooks: TaskHooks<'a>,
    ) -> Result<(), SchedulerError> {
        let slot = self.slot_mut(id)?;
        slot.control.set_interval(interval);
        slot.control.set_iterations(iterations);
        slot.hooks = hooks;
        Ok(())
    }

    /// Changes the interval only. The next due time is recomputed from the
    /// task's last execution tick, not from "now", and enablement is
    /// unchanged.
    pub fn set_interval(&mut self, id: TaskId, interval: Ticks) -> Result<(), SchedulerError> {
        self.slot_mut(id)?.control.set_interval(interval);
        Ok(())
    }

    /// Replaces the remaining iteration count and the budget restored by
    /// [`Scheduler::restart`].
    pub fn set_iterations(&mut self, id: TaskId, iterations: i32) -> Result<(), SchedulerError> {
        self.slot_mut(id)?.control.set_iterations(iterations);
        Ok(())
    }

    /// Replaces the run callback.
    pub fn set_callback(
        &mut self,
        id: TaskId,
        run: Option<RunHook<'a>>,
    ) -> Result<(), SchedulerError> {
        self.slot_mut(id)?.hooks.run = run;
        Ok(())
    }

    /// Replaces the on-enable gate.
    pub fn set_on_enable(
        &mut self,
        id: TaskId,
        hook: Option<EnableHook<'a>>,
    ) -> Result<(), SchedulerError> {
        self.slot_mut(id)?.hooks.on_enable = hook;
        Ok(())
    }

    /// Replaces the on-disable notification.
    pub fn set_on_disable(
        &mut self,
        id: TaskId,
        hook: Option<DisableHook<'a>>,
    ) -> Result<(), SchedulerError> {
        self.slot_mut(id)?.hooks.on_disable = hook;
        Ok(())
    }

    /// Whether the task is currently enabled.
    pub fn is_enabled(&self, id: TaskId) -> Result<bool, SchedulerError> {
        Ok(self.slot_ref(id)?.control.enabled)
    }

    /// The task's current interval.
    pub fn interval(&self, id: TaskId) -> Result<Ticks, SchedulerError> {
        Ok(self.slot_ref(id)?.control.interval)
    }

    /// Runs remaining; negative = unlimited.
    pub fn iterations(&self, id: TaskId) -> Result<i32, SchedulerError> {
        Ok(self.slot_ref(id)?.control.iterations)
    }

    /// Completed executions over the task's lifetime.
    pub fn run_counter(&self, id: TaskId) -> Result<u32, SchedulerError> {
        Ok(self.slot_ref(id)?.control.run_counter)
    }

    /// Drift of the task's last run (positive = late). Meaningful only
    /// under [`Capabilities::TIME_CRITICAL`].
    pub fn overrun(&self, id: TaskId) -> Result<i32, SchedulerError> {
        Ok(self.slot_ref(id)?.control.overrun)
    }

    /// The task's diagnostic name.
    pub fn name(&self, id: TaskId) -> Result<&'static str, SchedulerError> {
        Ok(self.slot_ref(id)?.control.name)
    }

    // ========================================================================
    // Whole-chain operations
    // ========================================================================

    /// Enables every task, in chain order, through the regular enable path.
    pub fn enable_all(&mut self) {
        let now = self.clock.now();
        let mut cursor = self.head;
        while let Some(index) = cursor {
            cursor = match self.slots[index].as_mut() {
                Some(slot) => {
                    let delay = slot.control.interval;
                    enable_slot(slot, now, delay);
                    slot.links.next
                }
                None => {
                    debug_assert!(false, "chain references an empty slot");
                    None
                }
            };
        }
    }

    /// Disables every task, in chain order, firing on-disable hooks for the
    /// tasks that were enabled.
    pub fn disable_all(&mut self) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            cursor = match self.slots[index].as_mut() {
                Some(slot) => {
                    disable_slot(slot);
                    slot.links.next
                }
                None => {
                    debug_assert!(false, "chain references an empty slot");
                    None
                }
            };
        }
    }

    // ========================================================================
    // Execution pass
    // ========================================================================

    /// Performs exactly one pass over the chain, head to tail, and runs the
    /// callback of every enabled, due task. Returns whether any task ran.
    ///
    /// Due time advances by exactly one interval per run (never to "now"),
    /// so a late pass does not compound drift; a task that missed several
    /// intervals stays due and catches up one run per pass. A task whose
    /// finite budget reaches zero is auto-disabled at the end of its run,
    /// with its on-disable hook fired exactly once.
    ///
    /// When the pass ran nothing, sleeping is allowed, and the scheduler
    /// has [`Capabilities::SLEEP_ON_IDLE`], the idle hook (if installed)
    /// is invoked once before returning.
    pub fn execute(&mut self) -> bool {
        let time_critical = self.capabilities.contains(Capabilities::TIME_CRITICAL);
        #[cfg(feature = "defmt")]
        let diagnostics = self.capabilities.contains(Capabilities::DEBUG_DIAGNOSTICS);

        let mut ran_any = false;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let now = self.clock.now();
            let (next, due) = match self.slots[index].as_ref() {
                Some(slot) => (
                    slot.links.next,
                    slot.control.enabled
                        && !slot.control.is_exhausted()
                        && slot.control.is_due(now),
                ),
                None => {
                    debug_assert!(false, "chain references an empty slot");
                    (None, false)
                }
            };

            if due {
                self.current = Some(index);
                if let Some(slot) = self.slots[index].as_mut() {
                    slot.control.begin_run(now, time_critical);

                    #[cfg(feature = "defmt")]
                    if diagnostics {
                        defmt::trace!(
                            "task {=str}: run {=u32} at tick {=u32}",
                            slot.control.name,
                            slot.control.run_counter,
                            now
                        );
                    }

                    if let Some(run) = slot.hooks.run {
                        let mut ctx = TaskContext {
                            id: TaskId {
                                index,
                                generation: self.generations[index],
                            },
                            now,
                            control: &mut slot.control,
                        };
                        run(&mut ctx);
                    }

                    // Exhaustion of a finite budget, or a disable requested
                    // from inside the callback. Either way the hook fires
                    // exactly once, here.
                    if slot.control.is_exhausted() || !slot.control.enabled {
                        if let Some(hook) = slot.hooks.on_disable {
                            hook();
                        }
                        slot.control.enabled = false;
                    }
                }
                self.current = None;
                ran_any = true;
            }
            cursor = next;
        }

        if !ran_any && self.sleep_allowed && self.capabilities.contains(Capabilities::SLEEP_ON_IDLE)
        {
            if let Some(hook) = self.idle_hook {
                hook();
            }
        }
        ran_any
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn slot_ref(&self, id: TaskId) -> Result<&Slot<'a>, SchedulerError> {
        if id.index >= N || self.generations[id.index] != id.generation {
            return Err(SchedulerError::UnknownTask);
        }
        self.slots[id.index]
            .as_ref()
            .ok_or(SchedulerError::UnknownTask)
    }

    fn slot_mut(&mut self, id: TaskId) -> Result<&mut Slot<'a>, SchedulerError> {
        if id.index >= N || self.generations[id.index] != id.generation {
            return Err(SchedulerError::UnknownTask);
        }
        self.slots[id.index]
            .as_mut()
            .ok_or(SchedulerError::UnknownTask)
    }
}

/// Runs the on-enable gate, then enables with the next run `delay` ticks
/// from `now`. An aborted enable leaves the timing untouched.
fn enable_slot(slot: &mut Slot<'_>, now: Ticks, delay: Ticks) -> bool {
    let allowed = slot.hooks.on_enable.map_or(true, |hook| hook());
    if allowed {
        slot.control.enabled = true;
        slot.control.due_in(now, delay);
    }
    allowed
}

/// Disables, firing the on-disable hook only on the enabled-to-disabled
/// transition. Returns the prior enabled state.
fn disable_slot(slot: &mut Slot<'_>) -> bool {
    let was_enabled = slot.control.enabled;
    if was_enabled {
        if let Some(hook) = slot.hooks.on_disable {
            hook();
        }
    }
    slot.control.enabled = false;
    was_enabled
}
