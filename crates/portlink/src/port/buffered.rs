// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Double-buffered port: one staging frame for the writer, one published
//! frame for readers.
//!
//! ```text
//! writer: prepare() -> fill staging -> write()  (publishes a snapshot)
//! reader: read()    -> latest published frame not yet returned
//! ```
//!
//! Readers never observe a half-written frame: `write()` encodes the staged
//! value into an immutable snapshot before any reader can see it. Input is
//! "latest wins" unless [`BufferedPort::set_strict`] asks for every frame.

use super::inbox::InboxMode;
use super::{Port, Portable, Stamp};
use crate::network::Network;
use crate::{Error, Result};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Port with a staging frame on the write side and latest-wins reads.
pub struct BufferedPort<T: Portable> {
    port: Arc<Port>,
    staging: Mutex<Option<T>>,
    strict: Mutex<bool>,
    callback: Mutex<Option<JoinHandle<()>>>,
}

/// Writable view of the staging frame returned by [`BufferedPort::prepare`].
///
/// The staging frame stays locked while this guard lives; publish it with
/// [`Prepared::write`].
pub struct Prepared<'a, T: Portable> {
    owner: &'a BufferedPort<T>,
    frame: MappedMutexGuard<'a, T>,
}

impl<T: Portable> Prepared<'_, T> {
    /// Publish this frame (same as dropping the guard and calling
    /// [`BufferedPort::write`]).
    pub fn write(self) -> Result<()> {
        let owner = self.owner;
        drop(self);
        owner.write()
    }
}

impl<T: Portable> Deref for Prepared<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.frame
    }
}

impl<T: Portable> DerefMut for Prepared<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.frame
    }
}

impl<T: Portable> BufferedPort<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_network(&Network::global())
    }

    #[must_use]
    pub fn with_network(network: &Arc<Network>) -> Self {
        let port = Port::with_network(network);
        port.set_inbox_mode(InboxMode::Latest);
        Self {
            port: Arc::new(port),
            staging: Mutex::new(None),
            strict: Mutex::new(false),
            callback: Mutex::new(None),
        }
    }

    pub fn open(&self, name: &str) -> Result<()> {
        self.port.open(name)
    }

    /// Close the port, stop any callback thread and discard the staged frame.
    pub fn close(&self) {
        self.port.close();
        self.join_callback();
        if let Some(mut slot) = self.staging.try_lock() {
            slot.take();
        }
    }

    /// Underlying plain port (connections, counters, interrupt).
    #[must_use]
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Access the staging frame, creating it with `T::default()` if needed.
    ///
    /// Repeated calls before [`write`](Self::write) return the same frame.
    pub fn prepare(&self) -> Prepared<'_, T>
    where
        T: Default,
    {
        let frame = MutexGuard::map(self.staging.lock(), |slot| slot.get_or_insert_with(T::default));
        Prepared { owner: self, frame }
    }

    /// Stage an explicit value, replacing any prepared frame.
    pub fn prepare_with(&self, value: T) -> Prepared<'_, T> {
        let frame = MutexGuard::map(self.staging.lock(), |slot| slot.insert(value));
        Prepared { owner: self, frame }
    }

    /// Drop the staged frame without sending it.
    ///
    /// No effect while a [`Prepared`] guard is alive.
    pub fn unprepare(&self) {
        match self.staging.try_lock() {
            Some(mut slot) => {
                slot.take();
            }
            None => log::warn!("[buffered] unprepare() while the staging frame is still prepared"),
        }
    }

    /// Publish the staged frame to every connected reader.
    ///
    /// Without a staged frame this is a no-op. The next `prepare` starts
    /// from a fresh frame. Never waits: while a [`Prepared`] guard is alive
    /// this fails with [`Error::FrameInUse`]; use [`Prepared::write`] or drop
    /// the guard first. On failure the staged frame is kept.
    pub fn write(&self) -> Result<()> {
        if !self.port.is_open() {
            return Err(Error::ClosedEndpoint);
        }
        let Some(mut slot) = self.staging.try_lock() else {
            log::warn!("[buffered] write() while the staging frame is still prepared");
            return Err(Error::FrameInUse);
        };
        let Some(frame) = slot.as_ref() else {
            log::debug!("[buffered] write() without prepare(), nothing sent");
            return Ok(());
        };
        self.port.write(frame)?;
        slot.take();
        Ok(())
    }

    /// Most recent frame not yet returned, or `None` (non-blocking and
    /// nothing new, or the port closed while waiting).
    pub fn read(&self, blocking: bool) -> Result<Option<T>> {
        self.port.read(blocking)
    }

    pub fn read_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        self.port.read_timeout(timeout)
    }

    /// Strict mode keeps every frame in FIFO order instead of only the latest.
    pub fn set_strict(&self, strict: bool) {
        *self.strict.lock() = strict;
        let mode = if strict {
            InboxMode::Queue {
                depth: self.port.network().config().inbox_depth(),
            }
        } else {
            InboxMode::Latest
        };
        self.port.set_inbox_mode(mode);
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        *self.strict.lock()
    }

    /// Frames replaced before any reader saw them.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.port.dropped_count()
    }

    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.port.pending_reads()
    }

    #[must_use]
    pub fn last_stamp(&self) -> Option<Stamp> {
        self.port.last_stamp()
    }

    /// Deliver every incoming frame to `handler` on a dedicated thread.
    ///
    /// The thread stops when the port is closed or the callback disabled.
    /// Frames that fail to decode are logged and skipped.
    pub fn use_callback<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&T) + Send + 'static,
    {
        if !self.port.is_open() {
            return Err(Error::ClosedEndpoint);
        }
        self.disable_callback();
        let port = Arc::clone(&self.port);
        let handle = std::thread::Builder::new()
            .name("portlink-callback".to_string())
            .spawn(move || loop {
                match port.read::<T>(true) {
                    Ok(Some(frame)) => handler(&frame),
                    Ok(None) => break,
                    Err(e) => log::warn!("[buffered] Dropping undecodable frame: {}", e),
                }
            })?;
        *self.callback.lock() = Some(handle);
        Ok(())
    }

    /// Stop the callback thread; later frames wait for [`read`](Self::read).
    pub fn disable_callback(&self) {
        if self.callback.lock().is_none() {
            return;
        }
        self.port.interrupt();
        self.join_callback();
        self.port.resume();
    }

    fn join_callback(&self) {
        let handle = self.callback.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("[buffered] Callback thread panicked");
            }
        }
    }
}

impl<T: Portable> Default for BufferedPort<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Portable> Drop for BufferedPort<T> {
    fn drop(&mut self) {
        self.close();
    }
}
