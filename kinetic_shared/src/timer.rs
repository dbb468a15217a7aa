//! Cancelable delayed actions, advanced in simulation time.
//!
//! A scene owns its `TimerQueue` and clears it on cleanup, so a delayed
//! action scheduled by one scene can never fire into the next.

/// Handle to a scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TimerHandle,
    due: f64,
    action: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    now: f64,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to fire `delay` seconds of simulation time from now.
    pub fn schedule(&mut self, delay: f64, action: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due: self.now + delay.max(0.0),
            action,
        });
        handle
    }

    /// Returns the action if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let pos = self.pending.iter().position(|p| p.handle == handle)?;
        Some(self.pending.remove(pos).action)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Advances the clock and returns every action now due, earliest first.
    /// Ties fire in scheduling order.
    pub fn advance(&mut self, dt: f64) -> Vec<T> {
        self.now += dt.max(0.0);
        let now = self.now;

        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|p| p.action).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Cancels everything and rewinds the clock.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.now = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_when_due() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, "done");

        assert!(timers.advance(0.5).is_empty());
        assert_eq!(timers.advance(0.5), vec!["done"]);
        assert!(timers.advance(10.0).is_empty());
    }

    #[test]
    fn canceled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let h = timers.schedule(0.1, 1);
        assert_eq!(timers.cancel(h), Some(1));
        assert_eq!(timers.cancel(h), None);
        assert!(timers.advance(1.0).is_empty());
    }

    #[test]
    fn fires_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(0.3, 'c');
        timers.schedule(0.1, 'a');
        timers.schedule(0.2, 'b');
        assert_eq!(timers.advance(1.0), vec!['a', 'b', 'c']);
    }

    #[test]
    fn clear_drops_pending() {
        let mut timers = TimerQueue::new();
        let h = timers.schedule(0.1, ());
        timers.clear();
        assert!(!timers.is_pending(h));
        assert!(timers.is_empty());
    }
}
