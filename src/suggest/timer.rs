//! Delayed event delivery on one background thread.
//!
//! Debounce, idle and animation timers all fire by posting an event into the
//! session queue. A fired timer is never cancelled; the receiver decides
//! whether the event is still current.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::session::queue::EventQueue;

struct Entry<E> {
    deadline: Instant,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest deadline; ties keep FIFO order.
impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct TimerState<E> {
    pending: BinaryHeap<Entry<E>>,
    next_seq: u64,
    stopped: bool,
}

struct TimerShared<E> {
    state: Mutex<TimerState<E>>,
    cvar: Condvar,
}

pub struct Timer<E: Send + 'static> {
    shared: Arc<TimerShared<E>>,
    handle: Option<JoinHandle<()>>,
}

impl<E: Send + 'static> Timer<E> {
    /// Starts the timer thread; fired events are pushed into `sink`.
    pub fn start(sink: Arc<EventQueue<E>>) -> io::Result<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                pending: BinaryHeap::new(),
                next_seq: 0,
                stopped: false,
            }),
            cvar: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("prompt-timer".to_string())
            .spawn(move || run_timer(&worker, &sink))?;
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub fn schedule(&self, delay: Duration, event: E) {
        let mut state = lock_unpoisoned(&self.shared.state);
        if state.stopped {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Entry {
            deadline: Instant::now() + delay,
            seq,
            event,
        });
        self.shared.cvar.notify_one();
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        lock_unpoisoned(&self.shared.state).pending.len()
    }

    /// Drops unfired events and joins the thread.
    pub fn stop(&mut self) {
        {
            let mut state = lock_unpoisoned(&self.shared.state);
            state.stopped = true;
            state.pending.clear();
            self.shared.cvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("timer thread panicked");
            }
        }
    }
}

impl<E: Send + 'static> Drop for Timer<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer<E>(shared: &TimerShared<E>, sink: &EventQueue<E>) {
    let mut state = lock_unpoisoned(&shared.state);
    loop {
        if state.stopped {
            return;
        }
        let now = Instant::now();
        let wait = match state.pending.peek() {
            Some(entry) if entry.deadline <= now => None,
            Some(entry) => Some(entry.deadline - now),
            None => {
                state = shared
                    .cvar
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                continue;
            }
        };
        match wait {
            None => {
                if let Some(entry) = state.pending.pop() {
                    sink.push(entry.event);
                }
            }
            Some(wait) => {
                state = shared
                    .cvar
                    .wait_timeout(state, wait)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
