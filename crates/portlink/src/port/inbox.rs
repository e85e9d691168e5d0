// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-port receive queue with blocking pop.
//!
//! Two policies:
//! - `Queue { depth }`: FIFO; when `depth > 0` and full, the oldest message
//!   is dropped.
//! - `Latest`: holds at most one undelivered message; a newer arrival
//!   replaces it.
//!
//! Closing wakes every blocked reader. Interrupting makes reads return
//! immediately until resumed.

use super::reply::ReplyHandle;
use super::Stamp;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InboxMode {
    Queue { depth: usize },
    Latest,
}

/// One message in an inbox. Dropping it unread abandons any pending reply.
#[derive(Debug)]
pub(crate) struct Delivery {
    pub payload: Arc<[u8]>,
    pub stamp: Stamp,
    pub reply: Option<ReplyHandle>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Wait {
    No,
    Forever,
    For(Duration),
}

struct State {
    queue: VecDeque<Delivery>,
    mode: InboxMode,
    closed: bool,
    interrupted: bool,
    dropped: u64,
}

pub(crate) struct Inbox {
    state: Mutex<State>,
    ready: Condvar,
}

impl Inbox {
    pub fn new(mode: InboxMode) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                mode,
                closed: false,
                interrupted: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueue a delivery. Returns `false` if the inbox is closed.
    pub fn push(&self, delivery: Delivery) -> bool {
        let mut st = self.state.lock();
        if st.closed {
            return false;
        }
        match st.mode {
            InboxMode::Latest => {
                if st.queue.pop_front().is_some() {
                    st.dropped += 1;
                }
            }
            InboxMode::Queue { depth } if depth > 0 => {
                while st.queue.len() >= depth {
                    st.queue.pop_front();
                    st.dropped += 1;
                    log::warn!("[inbox] Full (depth={}), dropping oldest message", depth);
                }
            }
            InboxMode::Queue { .. } => {}
        }
        st.queue.push_back(delivery);
        drop(st);
        self.ready.notify_one();
        true
    }

    /// Take the next delivery. `None` on close, interrupt, timeout or (for
    /// `Wait::No`) an empty queue.
    pub fn pop(&self, wait: Wait) -> Option<Delivery> {
        let deadline = match wait {
            // Too far out to represent: wait without a deadline.
            Wait::For(d) => Instant::now().checked_add(d),
            _ => None,
        };
        let mut st = self.state.lock();
        loop {
            if st.closed || st.interrupted {
                return None;
            }
            if let Some(delivery) = st.queue.pop_front() {
                return Some(delivery);
            }
            match (wait, deadline) {
                (Wait::No, _) => return None,
                (_, Some(deadline)) => {
                    if self.ready.wait_until(&mut st, deadline).timed_out() {
                        return if st.closed || st.interrupted {
                            None
                        } else {
                            st.queue.pop_front()
                        };
                    }
                }
                _ => self.ready.wait(&mut st),
            }
        }
    }

    pub fn set_mode(&self, mode: InboxMode) {
        let mut st = self.state.lock();
        st.mode = mode;
        if mode == InboxMode::Latest {
            while st.queue.len() > 1 {
                st.queue.pop_front();
                st.dropped += 1;
            }
        }
    }

    pub fn close(&self) {
        let mut st = self.state.lock();
        st.closed = true;
        st.queue.clear();
        drop(st);
        self.ready.notify_all();
    }

    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.ready.notify_all();
    }

    pub fn resume(&self) {
        self.state.lock().interrupted = false;
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.lock().interrupted
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn delivery(n: u64) -> Delivery {
        Delivery {
            payload: Arc::from(n.to_le_bytes().to_vec()),
            stamp: Stamp { count: n, time: 0.0 },
            reply: None,
        }
    }

    #[test]
    fn test_queue_is_fifo() {
        let inbox = Inbox::new(InboxMode::Queue { depth: 0 });
        for n in 0..5 {
            assert!(inbox.push(delivery(n)));
        }
        let counts: Vec<u64> = std::iter::from_fn(|| inbox.pop(Wait::No))
            .map(|d| d.stamp.count)
            .collect();
        assert_eq!(counts, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounded_queue_drops_oldest() {
        let inbox = Inbox::new(InboxMode::Queue { depth: 2 });
        for n in 0..4 {
            inbox.push(delivery(n));
        }
        assert_eq!(inbox.dropped(), 2);
        assert_eq!(inbox.pop(Wait::No).map(|d| d.stamp.count), Some(2));
    }

    #[test]
    fn test_latest_replaces_pending() {
        let inbox = Inbox::new(InboxMode::Latest);
        inbox.push(delivery(1));
        inbox.push(delivery(2));
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox.dropped(), 1);
        assert_eq!(inbox.pop(Wait::No).map(|d| d.stamp.count), Some(2));
        assert!(inbox.pop(Wait::No).is_none());
    }

    #[test]
    fn test_close_wakes_blocked_reader() {
        let inbox = Arc::new(Inbox::new(InboxMode::Queue { depth: 0 }));
        let reader = {
            let inbox = Arc::clone(&inbox);
            thread::spawn(move || inbox.pop(Wait::Forever))
        };
        thread::sleep(Duration::from_millis(20));
        inbox.close();
        assert!(reader.join().expect("join").is_none());
        assert!(!inbox.push(delivery(0)));
    }

    #[test]
    fn test_timed_pop_expires() {
        let inbox = Inbox::new(InboxMode::Queue { depth: 0 });
        let start = Instant::now();
        assert!(inbox.pop(Wait::For(Duration::from_millis(30))).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_timed_pop_with_unbounded_timeout() {
        let inbox = Inbox::new(InboxMode::Queue { depth: 0 });
        inbox.push(delivery(3));
        let got = inbox.pop(Wait::For(Duration::MAX));
        assert_eq!(got.map(|d| d.stamp.count), Some(3));
    }

    #[test]
    fn test_interrupt_and_resume() {
        let inbox = Inbox::new(InboxMode::Queue { depth: 0 });
        inbox.push(delivery(7));
        inbox.interrupt();
        assert!(inbox.pop(Wait::Forever).is_none());
        inbox.resume();
        assert_eq!(inbox.pop(Wait::No).map(|d| d.stamp.count), Some(7));
    }
}
