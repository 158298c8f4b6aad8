// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delayed and recurring callbacks driven by the stage tick.

use alloc::vec::Vec;

use veil_element::ElementId;

use crate::behavior::BehaviorId;

/// Handle of a scheduled timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

/// What a timer fires into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TimerTarget {
    /// Dwell activation of an element.
    Dwell(ElementId),
    /// A behavior's `on_timer` with a tag.
    Behavior(BehaviorId, u32),
}

#[derive(Copy, Clone, Debug)]
struct Timer {
    id: TimerId,
    due: u64,
    interval: Option<u64>,
    target: TimerTarget,
}

/// Timer queue. Timers only fire from [`Scheduler::due`], which the stage
/// calls once per tick, so a timer never fires more than once per tick.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scheduler {
    timers: Vec<Timer>,
    next_id: u32,
}

impl Scheduler {
    pub(crate) fn schedule(&mut self, due: u64, target: TimerTarget) -> TimerId {
        self.insert(due, None, target)
    }

    pub(crate) fn schedule_repeating(&mut self, due: u64, interval: u64, target: TimerTarget) -> TimerId {
        self.insert(due, Some(interval.max(1)), target)
    }

    fn insert(&mut self, due: u64, interval: Option<u64>, target: TimerTarget) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.timers.push(Timer {
            id,
            due,
            interval,
            target,
        });
        id
    }

    /// Cancel a timer. Unknown or already fired one-shot ids are ignored.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    /// Cancel every timer aimed at `behavior`.
    pub(crate) fn cancel_behavior(&mut self, behavior: BehaviorId) {
        self.timers
            .retain(|t| !matches!(t.target, TimerTarget::Behavior(b, _) if b == behavior));
    }

    pub(crate) fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Collect timers due at `now`, in due-time order. One-shot timers are
    /// removed; repeating ones are rescheduled one interval after `now`.
    pub(crate) fn due(&mut self, now: u64) -> Vec<TimerTarget> {
        let mut fired: Vec<(u64, TimerId, TimerTarget)> = Vec::new();
        self.timers.retain_mut(|t| {
            if t.due > now {
                return true;
            }
            fired.push((t.due, t.id, t.target));
            match t.interval {
                Some(interval) => {
                    t.due = now + interval;
                    true
                }
                None => false,
            }
        });
        fired.sort_by_key(|(due, id, _)| (*due, *id));
        fired.into_iter().map(|(_, _, target)| target).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const B: BehaviorId = BehaviorId::new(0, 1);

    #[test]
    fn one_shot_fires_once_in_due_order() {
        let mut s = Scheduler::default();
        s.schedule(20, TimerTarget::Behavior(B, 2));
        s.schedule(10, TimerTarget::Behavior(B, 1));
        assert!(s.due(5).is_empty());
        assert_eq!(
            s.due(25),
            [TimerTarget::Behavior(B, 1), TimerTarget::Behavior(B, 2)]
        );
        assert!(s.due(100).is_empty());
    }

    #[test]
    fn repeating_reschedules_and_cancels() {
        let mut s = Scheduler::default();
        let id = s.schedule_repeating(10, 10, TimerTarget::Behavior(B, 0));
        assert_eq!(s.due(10).len(), 1);
        assert!(s.due(15).is_empty());
        assert_eq!(s.due(20).len(), 1);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.due(100).is_empty());
    }
}
