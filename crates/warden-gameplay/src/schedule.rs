//! Cancellable timed continuations.
//!
//! A [`Timeline`] holds effects due at a point in simulation time. The owner
//! advances it once per tick and applies the effects that came due, in due
//! order. Scheduling returns a [`TimerHandle`] that can cancel the effect
//! before it fires.
//!
//! Time accumulates in `f64` so long sessions keep sub-millisecond precision;
//! deltas and delays stay `f32` like the rest of the simulation.

use tracing::trace;

/// Handle to a scheduled effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Scheduled<E> {
    handle: TimerHandle,
    due: f64,
    effect: E,
}

/// Ordered set of pending effects in simulation time.
#[derive(Debug, Clone)]
pub struct Timeline<E> {
    now: f64,
    next_handle: u64,
    pending: Vec<Scheduled<E>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Timeline<E> {
    /// Creates an empty timeline at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 1,
            pending: Vec::new(),
        }
    }

    /// Current timeline time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Schedules `effect` to come due after `delay` seconds.
    ///
    /// Negative delays are treated as zero.
    pub fn schedule(&mut self, delay: f32, effect: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let due = self.now + f64::from(delay.max(0.0));
        trace!("Timer {} scheduled at {:.3}s", handle.0, due);
        self.pending.push(Scheduled {
            handle,
            due,
            effect,
        });
        handle
    }

    /// Cancels a pending effect. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.handle != handle);
        let cancelled = self.pending.len() != before;
        if cancelled {
            trace!("Timer {} cancelled", handle.0);
        }
        cancelled
    }

    /// Returns true if the effect behind `handle` has not fired yet.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|s| s.handle == handle)
    }

    /// Number of pending effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending effect.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Advances time by `dt` and returns the effects that came due, ordered
    /// by due time (ties keep scheduling order).
    ///
    /// Effects scheduled while applying the returned ones are measured from
    /// the new time and fire on a later call at the earliest.
    pub fn advance(&mut self, dt: f32) -> Vec<(TimerHandle, E)> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now;

        let (mut due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = rest;

        // Stable sort keeps insertion order for equal due times.
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        due.into_iter().map(|s| (s.handle, s.effect)).collect()
    }
}
