// Copyright 2025 rrdsink developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! FIFO dispatch queue between the cache and the write worker.
//!
//! Filenames whose buffered samples are due for persistence wait here
//! until the worker picks them up. The queue supports front-insert for
//! operator-driven priority flushes and promotion of an already-queued
//! filename to the head.
//!
//! Each enqueued filename is its own owned `String`, so queue lifetime is
//! decoupled from cache lifetime. A filename appears at most once at any
//! time; the caller guarantees this via the cache entry's queued flag.
//!
//! Lock order: callers that hold the cache mutex may call into the queue,
//! never the other way around.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

/// Where to splice an enqueued filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// Ahead of everything already queued (priority flush).
    Front,
    /// Behind everything already queued (normal aging).
    Back,
}

/// Result of a blocking dequeue.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Dequeued {
    /// The next filename to write.
    File(String),
    /// The queue is empty and shutdown has been requested.
    Shutdown,
}

#[derive(Debug, Default)]
struct QueueState {
    files:    VecDeque<String>,
    shutdown: bool,
}

/// FIFO of filenames awaiting write, paired with a condition variable the
/// write worker blocks on while idle.
#[derive(Debug, Default)]
pub(crate) struct DispatchQueue {
    state:     Mutex<QueueState>,
    available: Condvar,
}

impl DispatchQueue {
    pub(crate) fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Splice a filename at the head or tail and wake the worker.
    pub(crate) fn enqueue(&self, filename: &str, position: Position) {
        let mut state = self.lock();
        match position {
            Position::Front => state.files.push_front(filename.to_owned()),
            Position::Back => state.files.push_back(filename.to_owned()),
        }
        drop(state);
        self.available.notify_one();
    }

    /// Relink an already-queued filename to the head.
    ///
    /// Returns whether a move occurred; a filename already at the head (or
    /// not queued at all) is left untouched.
    pub(crate) fn promote(&self, filename: &str) -> bool {
        let mut state = self.lock();
        match state.files.iter().position(|f| f == filename) {
            None | Some(0) => false,
            Some(idx) => {
                if let Some(f) = state.files.remove(idx) {
                    state.files.push_front(f);
                }
                true
            }
        }
    }

    /// Wait for the next filename, or the shutdown sentinel once the queue
    /// has drained after [`shutdown`](Self::shutdown).
    pub(crate) fn dequeue_blocking(&self) -> Dequeued {
        let mut state = self.lock();
        loop {
            if let Some(filename) = state.files.pop_front() {
                return Dequeued::File(filename);
            }
            if state.shutdown {
                return Dequeued::Shutdown;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Request shutdown: the worker keeps dequeueing until the queue is
    /// empty, then observes the flag and exits.
    pub(crate) fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        drop(state);
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize { self.lock().files.len() }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lock().files.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        queue.enqueue("b.rrd", Position::Back);
        queue.enqueue("c.rrd", Position::Back);

        assert_eq!(queue.dequeue_blocking(), Dequeued::File("a.rrd".into()));
        assert_eq!(queue.dequeue_blocking(), Dequeued::File("b.rrd".into()));
        assert_eq!(queue.dequeue_blocking(), Dequeued::File("c.rrd".into()));
    }

    #[test]
    fn test_front_insert_takes_priority() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        queue.enqueue("b.rrd", Position::Front);

        assert_eq!(queue.dequeue_blocking(), Dequeued::File("b.rrd".into()));
        assert_eq!(queue.dequeue_blocking(), Dequeued::File("a.rrd".into()));
    }

    #[test]
    fn test_promote_moves_interior_node_to_head() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        queue.enqueue("b.rrd", Position::Back);
        queue.enqueue("c.rrd", Position::Back);

        assert!(queue.promote("c.rrd"));
        assert_eq!(queue.snapshot(), vec!["c.rrd", "a.rrd", "b.rrd"]);
    }

    #[test]
    fn test_promote_is_idempotent_on_head() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        queue.enqueue("b.rrd", Position::Back);

        assert!(!queue.promote("a.rrd"));
        assert_eq!(queue.snapshot(), vec!["a.rrd", "b.rrd"]);
    }

    #[test]
    fn test_promote_unknown_filename() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        assert!(!queue.promote("missing.rrd"));
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue = Arc::new(DispatchQueue::new());
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue_blocking())
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue("a.rrd", Position::Back);

        assert_eq!(waiter.join().unwrap(), Dequeued::File("a.rrd".into()));
    }

    #[test]
    fn test_shutdown_wakes_idle_waiter() {
        let queue = Arc::new(DispatchQueue::new());
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue_blocking())
        };

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();

        assert_eq!(waiter.join().unwrap(), Dequeued::Shutdown);
    }

    #[test]
    fn test_pending_files_drain_before_shutdown_sentinel() {
        let queue = DispatchQueue::new();
        queue.enqueue("a.rrd", Position::Back);
        queue.enqueue("b.rrd", Position::Back);
        queue.shutdown();

        assert_eq!(queue.dequeue_blocking(), Dequeued::File("a.rrd".into()));
        assert_eq!(queue.dequeue_blocking(), Dequeued::File("b.rrd".into()));
        assert_eq!(queue.dequeue_blocking(), Dequeued::Shutdown);
    }
}
