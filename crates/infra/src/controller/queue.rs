//! Deduplicating, rate-limited work queue of job keys.
//!
//! Semantics the runner relies on:
//!
//! - A key added several times before a worker picks it up is handed out once.
//! - A key is never handed to two workers at the same time. Adding a key that
//!   is being processed marks it dirty; `done` puts it back on the queue.
//! - `add_after` delays an add; `add_rate_limited` derives the delay from the
//!   key's consecutive failure count, which `forget` resets.
//! - After `shut_down`, `get` returns `None` and adds are ignored.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::backoff::Backoff;

#[derive(Debug)]
struct Delayed<K> {
    ready_at: Instant,
    seq: u64,
    key: K,
}

impl<K> PartialEq for Delayed<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl<K> Eq for Delayed<K> {}

impl<K> PartialOrd for Delayed<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Delayed<K> {
    // Reversed: BinaryHeap is a max-heap, the earliest deadline must be on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug)]
struct State<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    waiting: BinaryHeap<Delayed<K>>,
    failures: HashMap<K, u32>,
    seq: u64,
    shutting_down: bool,
}

impl<K> Default for State<K> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            waiting: BinaryHeap::new(),
            failures: HashMap::new(),
            seq: 0,
            shutting_down: false,
        }
    }
}

impl<K> State<K>
where
    K: Clone + Eq + Hash,
{
    fn add(&mut self, key: K) -> bool {
        if self.shutting_down || !self.dirty.insert(key.clone()) {
            return false;
        }
        if self.processing.contains(&key) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    fn promote_ready(&mut self, now: Instant) {
        while self.waiting.peek().is_some_and(|d| d.ready_at <= now) {
            if let Some(d) = self.waiting.pop() {
                self.add(d.key);
            }
        }
    }
}

#[derive(Debug)]
pub struct WorkQueue<K> {
    state: Mutex<State<K>>,
    ready: Condvar,
    backoff: Backoff,
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
            backoff,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<K>> {
        // A worker panicking while holding the lock leaves the sets consistent
        // (every mutation is a single insert/remove), so keep going.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add(&self, key: K) {
        if self.lock().add(key) {
            self.ready.notify_one();
        }
    }

    pub fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            return self.add(key);
        }

        let mut state = self.lock();
        if state.shutting_down {
            return;
        }
        state.seq += 1;
        let seq = state.seq;
        state.waiting.push(Delayed {
            ready_at: Instant::now() + delay,
            seq,
            key,
        });
        drop(state);

        // Sleeping workers must recompute their wake-up time.
        self.ready.notify_all();
    }

    /// Requeue after a failure, returning the backoff delay applied.
    pub fn add_rate_limited(&self, key: K) -> Duration {
        let failures = {
            let mut state = self.lock();
            let n = state.failures.entry(key.clone()).or_insert(0);
            *n = n.saturating_add(1);
            *n
        };
        let delay = self.backoff.delay_for(failures);
        self.add_after(key, delay);
        delay
    }

    /// Clear the failure history of `key` (after a successful reconcile).
    pub fn forget(&self, key: &K) {
        self.lock().failures.remove(key);
    }

    pub fn failures(&self, key: &K) -> u32 {
        self.lock().failures.get(key).copied().unwrap_or(0)
    }

    /// Block until a key is ready, or return `None` once shut down.
    pub fn get(&self) -> Option<K> {
        let mut state = self.lock();
        loop {
            if state.shutting_down {
                return None;
            }

            state.promote_ready(Instant::now());

            if let Some(key) = state.queue.pop_front() {
                state.dirty.remove(&key);
                state.processing.insert(key.clone());
                return Some(key);
            }

            state = match state.waiting.peek().map(|d| d.ready_at) {
                Some(ready_at) => {
                    let timeout = ready_at.saturating_duration_since(Instant::now());
                    self.ready
                        .wait_timeout(state, timeout)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|p| p.into_inner().0)
                }
                None => self
                    .ready
                    .wait(state)
                    .unwrap_or_else(|p| p.into_inner()),
            };
        }
    }

    /// Mark `key` as no longer being processed.
    pub fn done(&self, key: &K) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.ready.notify_one();
        }
    }

    /// Keys ready to be handed out.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.ready.notify_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}
