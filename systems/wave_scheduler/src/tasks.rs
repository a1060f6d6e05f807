//! Cooperative timed tasks resumed by the scheduler clock.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

/// Work resumed once the clock reaches its scheduled time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Task {
    /// Spawns the next battler of a sequence.
    Sequence {
        wave: usize,
        sequence: usize,
        next_spawn: u32,
    },
    /// Starts the current wave after the delay between waves.
    StartWave,
}

#[derive(Debug)]
struct Scheduled {
    resume_at: Duration,
    order: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap yields the earliest task first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .resume_at
            .cmp(&self.resume_at)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Min-heap of tasks keyed by resume time, then insertion order.
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    heap: BinaryHeap<Scheduled>,
    next_order: u64,
}

impl TaskQueue {
    pub(crate) fn schedule(&mut self, resume_at: Duration, task: Task) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.heap.push(Scheduled {
            resume_at,
            order,
            task,
        });
    }

    /// Removes the earliest task whose resume time is not after `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<(Duration, Task)> {
        if self.heap.peek()?.resume_at > now {
            return None;
        }
        self.heap
            .pop()
            .map(|scheduled| (scheduled.resume_at, scheduled.task))
    }

    /// Drops every pending delayed wave start.
    pub(crate) fn cancel_wave_starts(&mut self) {
        self.heap
            .retain(|scheduled| !matches!(scheduled.task, Task::StartWave));
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
