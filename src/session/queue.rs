//! FIFO inbound queue for the session loop.
//!
//! Producers (input thread, timers, provider workers) only ever push; the
//! controller is the single consumer. Events come out in arrival order.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct QueueState<E> {
    events: VecDeque<E>,
    closed: bool,
}

pub struct EventQueue<E> {
    state: Mutex<QueueState<E>>,
    cvar: Condvar,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                closed: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Enqueues `event`. Returns `false` (dropping the event) once the queue is closed.
    pub fn push(&self, event: E) -> bool {
        let mut state = lock_unpoisoned(&self.state);
        if state.closed {
            return false;
        }
        state.events.push_back(event);
        self.cvar.notify_one();
        true
    }

    /// Blocks until an event is available. `None` means the queue was closed.
    pub fn pop(&self) -> Option<E> {
        let mut state = lock_unpoisoned(&self.state);
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`pop`](Self::pop) but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<E> {
        let deadline = Instant::now() + timeout;
        let mut state = lock_unpoisoned(&self.state);
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            let now = Instant::now();
            if state.closed || now >= deadline {
                return None;
            }
            state = self
                .cvar
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    pub fn try_pop(&self) -> Option<E> {
        lock_unpoisoned(&self.state).events.pop_front()
    }

    /// Refuses further pushes and wakes any waiting consumer. Queued events
    /// can still be drained.
    pub fn close(&self) {
        let mut state = lock_unpoisoned(&self.state);
        state.closed = true;
        self.cvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        lock_unpoisoned(&self.state).closed
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.state).events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
