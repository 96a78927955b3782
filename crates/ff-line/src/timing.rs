//! Timed sequences as plain state
//!
//! Nothing here sleeps or suspends. A [`Countdown`] is stepped by its
//! owner; a [`TaskScheduler`] holds delayed tasks and hands them back once
//! they are due. Cancelling either simply drops the state, so a cancelled
//! sequence never leaves a half-applied effect behind.

/// Elapsed/duration pair stepped once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    elapsed: f32,
    duration: f32,
}

impl Countdown {
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Step by `dt`; returns true once finished
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    /// 0..1 (a zero-length countdown is always complete)
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }
}

/// Handle for a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
struct PendingTask<T> {
    id: TaskId,
    due_at: f64,
    task: T,
}

/// Delayed tasks keyed by due time
#[derive(Debug)]
pub struct TaskScheduler<T> {
    pending: Vec<PendingTask<T>>,
    clock: f64,
    next_id: u64,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskScheduler<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            clock: 0.0,
            next_id: 1,
        }
    }

    /// Run `task` after `delay` seconds of advanced time
    pub fn schedule(&mut self, task: T, delay: f32) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTask {
            id,
            due_at: self.clock + delay.max(0.0) as f64,
            task,
        });
        id
    }

    /// Drop a task before it fires; false if it already fired or never existed
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Drop every task matching `pred`, returning how many were dropped
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.pending.len();
        self.pending.retain(|p| !pred(&p.task));
        before - self.pending.len()
    }

    /// Advance time and take every due task, earliest first
    ///
    /// Tasks due at the same instant come back in scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.clock += dt.max(0.0) as f64;
        if self.pending.is_empty() {
            return Vec::new();
        }

        let clock = self.clock;
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due_at <= clock);
        self.pending = rest;

        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.id.cmp(&b.id)));
        due.into_iter().map(|p| p.task).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    /// Seconds until a task fires
    pub fn time_until(&self, id: TaskId) -> Option<f32> {
        self.pending
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p.due_at - self.clock).max(0.0) as f32)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
