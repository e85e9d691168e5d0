// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot reply channel between a writer and the reader that took its
//! message.
//!
//! ```text
//! writer: write_with_reply -> ReplyCell::wait ....................> Some(reply) / None
//!                 |                                                      ^
//!                 +-- Delivery { reply: ReplyHandle } -> inbox -> Replier::reply
//! ```
//!
//! Every path that discards the delivery (plain read, inbox overflow,
//! close, decode failure, a dropped [`Replier`]) abandons the cell, so the
//! writer never waits on a reply that cannot come.

use super::inbox::Wait;
use super::Portable;
use crate::Result;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Instant;

enum ReplyState {
    Waiting,
    Answered(Vec<u8>),
    Abandoned,
}

pub(crate) struct ReplyCell {
    state: Mutex<ReplyState>,
    ready: Condvar,
}

impl ReplyCell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ReplyState::Waiting),
            ready: Condvar::new(),
        })
    }

    /// First completion wins; later ones are ignored.
    fn complete(&self, outcome: ReplyState) -> bool {
        let mut st = self.state.lock();
        if !matches!(*st, ReplyState::Waiting) {
            return false;
        }
        *st = outcome;
        drop(st);
        self.ready.notify_all();
        true
    }

    pub fn abandon(&self) {
        self.complete(ReplyState::Abandoned);
    }

    /// Wait for the reply bytes. `None` if abandoned or the wait expires.
    pub fn wait(&self, wait: Wait) -> Option<Vec<u8>> {
        let deadline = match wait {
            Wait::For(d) => Instant::now().checked_add(d),
            _ => None,
        };
        let mut st = self.state.lock();
        loop {
            if !matches!(*st, ReplyState::Waiting) {
                return match std::mem::replace(&mut *st, ReplyState::Abandoned) {
                    ReplyState::Answered(bytes) => Some(bytes),
                    _ => None,
                };
            }
            match (wait, deadline) {
                (Wait::No, _) => return None,
                (_, Some(deadline)) => {
                    if self.ready.wait_until(&mut st, deadline).timed_out()
                        && matches!(*st, ReplyState::Waiting)
                    {
                        return None;
                    }
                }
                _ => self.ready.wait(&mut st),
            }
        }
    }
}

/// Travels with a delivery; abandons the cell when dropped unanswered.
pub(crate) struct ReplyHandle(Arc<ReplyCell>);

impl ReplyHandle {
    pub fn new(cell: &Arc<ReplyCell>) -> Self {
        Self(Arc::clone(cell))
    }
}

impl Drop for ReplyHandle {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReplyHandle")
    }
}

/// Answer channel returned by [`Port::read_with_reply`](super::Port::read_with_reply).
///
/// Dropping it without calling [`reply`](Self::reply) releases the waiting
/// writer with no reply.
#[derive(Debug, Default)]
pub struct Replier {
    handle: Option<ReplyHandle>,
}

impl Replier {
    pub(crate) fn new(handle: Option<ReplyHandle>) -> Self {
        Self { handle }
    }

    /// `true` if the writer is waiting for an answer.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.handle.is_some()
    }

    /// Send `msg` back to the writer.
    ///
    /// Returns `Ok(false)` when no writer is waiting (plain write, or the
    /// writer already gave up).
    pub fn reply<R: Portable>(mut self, msg: &R) -> Result<bool> {
        let Some(handle) = self.handle.take() else {
            log::debug!("[port] reply() on a message that expects none");
            return Ok(false);
        };
        let bytes = msg.encode()?;
        Ok(handle.0.complete(ReplyState::Answered(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bottle;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reply_reaches_waiter() {
        let cell = ReplyCell::new();
        let replier = Replier::new(Some(ReplyHandle::new(&cell)));
        assert!(replier.expects_reply());
        let answer = thread::spawn(move || replier.reply(&Bottle::from_text("ok")));
        let bytes = cell.wait(Wait::Forever).expect("reply");
        assert!(answer.join().expect("join").expect("reply"));
        assert_eq!(Bottle::from_bytes(&bytes).expect("decode").to_string(), "ok");
    }

    #[test]
    fn test_dropped_replier_releases_waiter() {
        let cell = ReplyCell::new();
        let replier = Replier::new(Some(ReplyHandle::new(&cell)));
        let dropper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(replier);
        });
        assert!(cell.wait(Wait::Forever).is_none());
        dropper.join().expect("join");
    }

    #[test]
    fn test_reply_without_waiter() {
        let replier = Replier::default();
        assert!(!replier.expects_reply());
        assert!(!replier.reply(&Bottle::new()).expect("reply"));
    }

    #[test]
    fn test_timed_wait_with_huge_timeout() {
        let cell = ReplyCell::new();
        cell.abandon();
        assert!(cell.wait(Wait::For(Duration::MAX)).is_none());
    }
}
