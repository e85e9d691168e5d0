// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name registry: the directory that maps port names to contacts.
//!
//! # Architecture
//!
//! ```text
//! NameRegistry
//! +-- entries: DashMap<Arc<str>, Entry>
//! |     Entry { id, contact, endpoint: Option<Weak<PortCore>> }
//! +-- change: Mutex<u64> + Condvar    generation bumped on every change
//! ```
//!
//! Registration is atomic (first writer wins, everyone else gets
//! `NameInUse`). Each registration carries a unique id, so unregistering
//! through a stale [`EndpointHandle`] can never remove a newer binding of
//! the same name.
//!
//! Names bound to an endpoint that has since been dropped are reclaimed on
//! the next registration attempt.

use crate::config::{RuntimeConfig, ANONYMOUS_PREFIX, MAX_NAME_LEN};
use crate::network::InitGuard;
use crate::port::PortCore;
use crate::{Error, Result};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Name that asks the registry to generate a unique one.
pub const ANONYMOUS: &str = "...";

/// Where a registered name can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contact {
    pub name: String,
    pub host: String,
    pub port_number: u16,
    pub carrier: String,
}

impl std::fmt::Display for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:/{}:{}{}", self.carrier, self.host, self.port_number, self.name)
    }
}

/// Proof of a registration, needed to unregister it.
///
/// Unlike an open port, a bare handle does not release the name on drop;
/// call [`NameRegistry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointHandle {
    name: Arc<str>,
    id: u64,
}

impl EndpointHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Check that `name` is a usable port name.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = name.len() > 1
        && name.len() <= MAX_NAME_LEN
        && name.starts_with('/')
        && !name.chars().any(|c| c.is_whitespace() || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

struct Entry {
    id: u64,
    contact: Contact,
    endpoint: Option<Weak<PortCore>>,
}

impl Entry {
    /// A binding whose port was dropped without unregistering.
    fn is_stale(&self) -> bool {
        self.endpoint
            .as_ref()
            .is_some_and(|weak| weak.strong_count() == 0)
    }
}

/// Concurrent name -> contact directory.
pub struct NameRegistry {
    entries: DashMap<Arc<str>, Entry>,
    next_id: AtomicU64,
    next_anonymous: AtomicU64,
    next_port: AtomicU64,
    generation: Mutex<u64>,
    changed: Condvar,
    guard: Arc<InitGuard>,
    config: RuntimeConfig,
}

impl NameRegistry {
    pub(crate) fn new(guard: Arc<InitGuard>, config: RuntimeConfig) -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
            next_anonymous: AtomicU64::new(1),
            next_port: AtomicU64::new(0),
            generation: Mutex::new(0),
            changed: Condvar::new(),
            guard,
            config,
        }
    }

    /// Register `name` with no attached endpoint (an externally served name).
    ///
    /// `"..."` generates a unique `/tmp/port/<n>` name.
    pub fn register(&self, name: &str) -> Result<EndpointHandle> {
        self.insert(name, None)
    }

    pub(crate) fn register_endpoint(
        &self,
        name: &str,
        endpoint: Weak<PortCore>,
    ) -> Result<EndpointHandle> {
        self.insert(name, Some(endpoint))
    }

    fn insert(&self, name: &str, endpoint: Option<Weak<PortCore>>) -> Result<EndpointHandle> {
        self.guard.ensure()?;
        if name == ANONYMOUS {
            loop {
                let candidate = self.anonymous_name();
                match self.try_insert(&candidate, endpoint.clone()) {
                    Err(Error::NameInUse(_)) => continue,
                    other => return other,
                }
            }
        }
        validate_name(name)?;
        self.try_insert(name, endpoint)
    }

    /// Next candidate for a generated name (`/tmp/port/<n>`).
    pub(crate) fn anonymous_name(&self) -> String {
        let n = self.next_anonymous.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", ANONYMOUS_PREFIX, n)
    }

    fn try_insert(&self, name: &str, endpoint: Option<Weak<PortCore>>) -> Result<EndpointHandle> {
        let key: Arc<str> = Arc::from(name);
        let id = match self.entries.entry(Arc::clone(&key)) {
            MapEntry::Occupied(mut slot) => {
                if !slot.get().is_stale() {
                    return Err(Error::NameInUse(name.to_string()));
                }
                log::debug!("[names] Reclaiming stale binding for {}", name);
                let entry = self.make_entry(name, endpoint);
                let id = entry.id;
                slot.insert(entry);
                id
            }
            MapEntry::Vacant(slot) => {
                let entry = self.make_entry(name, endpoint);
                let id = entry.id;
                slot.insert(entry);
                id
            }
        };
        log::debug!("[names] Registered {} (id={})", name, id);
        self.bump();
        Ok(EndpointHandle { name: key, id })
    }

    fn make_entry(&self, name: &str, endpoint: Option<Weak<PortCore>>) -> Entry {
        Entry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            contact: self.make_contact(name),
            endpoint,
        }
    }

    fn make_contact(&self, name: &str) -> Contact {
        let net = self.config.network();
        let offset = self.next_port.fetch_add(1, Ordering::Relaxed);
        let span = u64::from(u16::MAX - net.port_base).max(1);
        Contact {
            name: name.to_string(),
            host: net.host,
            port_number: net.port_base + (offset % span) as u16,
            carrier: net.carrier,
        }
    }

    /// Release a registration. Returns `false` if it was already gone or the
    /// name has been rebound since.
    pub fn unregister(&self, handle: &EndpointHandle) -> bool {
        let removed = self
            .entries
            .remove_if(&handle.name, |_, entry| entry.id == handle.id)
            .is_some();
        if removed {
            log::debug!("[names] Unregistered {}", handle.name);
            self.bump();
        }
        removed
    }

    /// Look up the contact bound to `name`.
    pub fn resolve(&self, name: &str) -> Result<Contact> {
        self.guard.ensure()?;
        match self.entries.get(name) {
            Some(entry) if !entry.is_stale() => Ok(entry.contact.clone()),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    /// Live endpoint bound to `name`, if any.
    pub(crate) fn endpoint(&self, name: &str) -> Option<Arc<PortCore>> {
        let weak = self.entries.get(name)?.endpoint.clone()?;
        weak.upgrade().filter(|core| !core.is_closed())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_stale())
            .map(|e| e.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// Number of live bindings (same set as [`names`](Self::names)).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.value().is_stale()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
        self.bump();
    }

    /// Change counter, incremented on every register/unregister.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until the generation moves past `seen` or `timeout` elapses.
    /// Returns the current generation.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> u64 {
        let mut generation = self.generation.lock();
        if *generation == seen {
            let _ = self.changed.wait_for(&mut generation, timeout);
        }
        *generation
    }

    fn bump(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.changed.notify_all();
    }
}

impl std::fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameRegistry")
            .field("entries", &self.entries.len())
            .field("generation", &self.generation())
            .finish()
    }
}
