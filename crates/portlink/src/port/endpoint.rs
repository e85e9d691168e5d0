// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared state of one open port: inbox, outgoing connections and the
//! registration token that keeps its name bound.

use super::inbox::{Delivery, Inbox, InboxMode};
use super::reply::{ReplyCell, ReplyHandle};
use super::Stamp;
use crate::name::EndpointHandle;
use crate::network::Network;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Releases the name when dropped.
pub(crate) struct Registration {
    network: Weak<Network>,
    handle: EndpointHandle,
}

impl Registration {
    pub fn new(network: &Arc<Network>, handle: EndpointHandle) -> Self {
        Self {
            network: Arc::downgrade(network),
            handle,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(network) = self.network.upgrade() {
            network.names().unregister(&self.handle);
        }
    }
}

struct Connection {
    dest_name: Arc<str>,
    dest: Weak<PortCore>,
    carrier: String,
}

impl Connection {
    fn live(&self) -> Option<Arc<PortCore>> {
        self.dest.upgrade().filter(|d| !d.is_closed())
    }
}

pub(crate) struct PortCore {
    name: Arc<str>,
    pub(super) inbox: Inbox,
    outputs: Mutex<Vec<Connection>>,
    inputs: Mutex<Vec<Arc<str>>>,
    sequence: AtomicU64,
    closed: AtomicBool,
    registration: Mutex<Option<Registration>>,
    /// Replies this port is waiting for as a writer.
    awaiting: Mutex<Vec<Weak<ReplyCell>>>,
}

impl PortCore {
    pub fn new(name: &str, mode: InboxMode) -> Self {
        Self {
            name: Arc::from(name),
            inbox: Inbox::new(mode),
            outputs: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            registration: Mutex::new(None),
            awaiting: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach(&self, registration: Registration) {
        *self.registration.lock() = Some(registration);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Add `dest` as an output. Returns `false` if already connected.
    pub fn add_output(&self, dest: &Arc<PortCore>, carrier: &str) -> bool {
        {
            let mut outputs = self.outputs.lock();
            outputs.retain(|c| c.live().is_some());
            if outputs.iter().any(|c| *c.dest_name == *dest.name) {
                return false;
            }
            outputs.push(Connection {
                dest_name: Arc::clone(&dest.name),
                dest: Arc::downgrade(dest),
                carrier: carrier.to_string(),
            });
        }
        dest.inputs.lock().push(Arc::clone(&self.name));
        true
    }

    pub fn remove_output(&self, dest_name: &str) -> bool {
        let removed: Vec<Connection> = {
            let mut outputs = self.outputs.lock();
            let (gone, kept): (Vec<Connection>, Vec<Connection>) = outputs
                .drain(..)
                .partition(|c| &*c.dest_name == dest_name || c.live().is_none());
            *outputs = kept;
            gone
        };
        let mut found = false;
        for conn in removed {
            if let Some(dest) = conn.live() {
                found |= &*conn.dest_name == dest_name;
                dest.remove_input(&self.name);
            }
        }
        found
    }

    fn remove_input(&self, source: &str) {
        self.inputs.lock().retain(|name| &**name != source);
    }

    pub fn has_output(&self, dest_name: &str) -> bool {
        self.outputs
            .lock()
            .iter()
            .any(|c| &*c.dest_name == dest_name && c.live().is_some())
    }

    pub fn output_count(&self) -> usize {
        self.outputs.lock().iter().filter(|c| c.live().is_some()).count()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.lock().len()
    }

    /// Carrier names of live outputs, by destination.
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs
            .lock()
            .iter()
            .filter(|c| c.live().is_some())
            .map(|c| (c.dest_name.to_string(), c.carrier.clone()))
            .collect()
    }

    /// Hand `payload` to every live output. Returns how many accepted it.
    ///
    /// `reply` rides with the copy for the first live output only.
    pub fn deliver(&self, payload: &Arc<[u8]>, stamp: Stamp, mut reply: Option<ReplyHandle>) -> usize {
        let targets: Vec<Arc<PortCore>> = {
            let mut outputs = self.outputs.lock();
            outputs.retain(|c| c.live().is_some());
            outputs.iter().filter_map(Connection::live).collect()
        };
        targets
            .iter()
            .filter(|dest| {
                dest.inbox.push(Delivery {
                    payload: Arc::clone(payload),
                    stamp,
                    reply: reply.take(),
                })
            })
            .count()
    }

    /// Track a reply this port waits for, so close or interrupt releases it.
    pub fn await_reply(&self, cell: &Arc<ReplyCell>) {
        let mut awaiting = self.awaiting.lock();
        awaiting.retain(|w| w.strong_count() > 0);
        awaiting.push(Arc::downgrade(cell));
    }

    /// Release every writer blocked in a reply wait on this port.
    pub fn cancel_replies(&self) {
        let awaiting: Vec<Weak<ReplyCell>> = self.awaiting.lock().drain(..).collect();
        for cell in awaiting.iter().filter_map(Weak::upgrade) {
            cell.abandon();
        }
    }

    /// Close: wake readers, drop connections, release the name.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inbox.close();
        self.cancel_replies();
        let outputs: Vec<Connection> = self.outputs.lock().drain(..).collect();
        for conn in outputs {
            if let Some(dest) = conn.dest.upgrade() {
                dest.remove_input(&self.name);
            }
        }
        self.inputs.lock().clear();
        let registration = self.registration.lock().take();
        drop(registration);
        log::debug!("[port] Closed {}", self.name);
    }
}

impl Drop for PortCore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
