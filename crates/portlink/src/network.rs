// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network context: init guard, name registry and connection management.
//!
//! # Architecture
//!
//! ```text
//! Network (one global, or isolated instances for tests)
//! +-- guard: Arc<InitGuard>          single CAS on first init
//! +-- names: NameRegistry            name -> contact (+ live endpoint)
//! +-- config: RuntimeConfig          connect window, inbox depth, ...
//! ```
//!
//! Every port operation that touches the registry fails with
//! [`Error::NotInitialized`] until [`Network::init`] (or
//! [`Network::initialize`] on an isolated instance) has run.
//!
//! # Connect
//!
//! `connect(src, dst)` waits up to `connect_timeout` for both names to be
//! bound to live endpoints. Registry changes wake the waiter at once;
//! otherwise it re-checks every `retry_interval`.

use crate::config::RuntimeConfig;
use crate::name::{validate_name, Contact, NameRegistry};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

// =======================================================================
// Init Guard
// =======================================================================

/// One-shot initialization flag.
///
/// Concurrent first callers race on a single compare-and-set; exactly one
/// wins and performs initialization, everyone else observes a no-op.
#[derive(Debug, Default)]
pub struct InitGuard {
    ready: AtomicBool,
}

impl InitGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the single caller that performed initialization.
    pub fn initialize_once(&self) -> bool {
        match self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(_) => {
                log::debug!("[network] Already initialized, ignoring");
                false
            }
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return to the uninitialized state. Returns `true` if it was initialized.
    pub fn reset(&self) -> bool {
        self.ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Err(NotInitialized)` unless initialized.
    pub fn ensure(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

// =======================================================================
// Connect options
// =======================================================================

/// Per-call overrides for [`Network::connect_with`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Retry window; `None` uses the configured `connect_timeout`.
    pub timeout: Option<Duration>,
    /// Carrier recorded on the connection; `None` uses the configured default.
    pub carrier: Option<String>,
}

impl ConnectOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}

// =======================================================================
// Network
// =======================================================================

static GLOBAL: OnceLock<Arc<Network>> = OnceLock::new();

/// A namespace of ports plus the guard that gates it.
#[derive(Debug)]
pub struct Network {
    guard: Arc<InitGuard>,
    names: NameRegistry,
    config: RuntimeConfig,
}

impl Network {
    /// Isolated network with its own namespace. Starts uninitialized.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Arc<Self> {
        let guard = Arc::new(InitGuard::new());
        Arc::new(Self {
            names: NameRegistry::new(Arc::clone(&guard), config.clone()),
            guard,
            config,
        })
    }

    /// Process-wide network, configured from the environment on first use.
    pub fn global() -> Arc<Network> {
        Arc::clone(GLOBAL.get_or_init(|| Network::new(RuntimeConfig::from_env())))
    }

    /// Initialize the process-wide network.
    ///
    /// Idempotent: returns `true` only for the call that did the work.
    pub fn init() -> bool {
        Self::global().initialize()
    }

    /// Initialize this network. Returns `true` for the first caller only.
    pub fn initialize(&self) -> bool {
        let first = self.guard.initialize_once();
        if first {
            let net = self.config.network();
            log::info!(
                "[network] Initialized (host={} port_base={} connect_timeout={:?})",
                net.host,
                net.port_base,
                net.connect_timeout
            );
        }
        first
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.guard.is_initialized()
    }

    /// Tear down: every name is released and later operations fail with
    /// `NotInitialized` until the network is initialized again.
    ///
    /// Open ports keep their local state but lose their registration.
    pub fn shutdown(&self) {
        if self.guard.reset() {
            self.names.clear();
            log::info!("[network] Shut down");
        }
    }

    #[must_use]
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn guard(&self) -> &InitGuard {
        &self.guard
    }

    /// Resolve a name to its contact.
    pub fn query_name(&self, name: &str) -> Result<Contact> {
        self.names.resolve(name)
    }

    /// `true` if `name` is currently registered.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.names.resolve(name).is_ok()
    }

    /// Connect `src` to `dst` using the configured retry window.
    pub fn connect(&self, src: &str, dst: &str) -> Result<()> {
        self.connect_with(src, dst, &ConnectOptions::default())
    }

    /// Connect `src` to `dst`.
    ///
    /// Blocks until both names are bound to live endpoints or the retry
    /// window elapses, in which case `UnreachablePeer` is returned.
    /// Connecting an already connected pair is a no-op.
    pub fn connect_with(&self, src: &str, dst: &str, opts: &ConnectOptions) -> Result<()> {
        self.guard.ensure()?;
        validate_name(src)?;
        validate_name(dst)?;

        let window = opts.timeout.unwrap_or_else(|| self.config.connect_timeout());
        let retry = self.config.retry_interval().max(Duration::from_millis(1));
        let carrier = opts
            .carrier
            .clone()
            .unwrap_or_else(|| self.config.network().carrier);
        // `None`: the window is too large to represent, keep retrying.
        let deadline = Instant::now().checked_add(window);

        loop {
            let seen = self.names.generation();
            if let (Some(source), Some(dest)) = (self.names.endpoint(src), self.names.endpoint(dst)) {
                if source.add_output(&dest, &carrier) {
                    log::debug!("[network] Connected {} -> {} ({})", src, dst, carrier);
                }
                return Ok(());
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                log::warn!(
                    "[network] Connect {} -> {} gave up after {:?}",
                    src,
                    dst,
                    window
                );
                return Err(Error::UnreachablePeer {
                    source: src.to_string(),
                    dest: dst.to_string(),
                });
            }
            let pause = deadline.map_or(retry, |deadline| retry.min(deadline - now));
            self.names.wait_for_change(seen, pause);
        }
    }

    /// Remove the `src -> dst` connection.
    pub fn disconnect(&self, src: &str, dst: &str) -> Result<()> {
        self.guard.ensure()?;
        let source = self
            .names
            .endpoint(src)
            .ok_or_else(|| Error::NotFound(src.to_string()))?;
        if source.remove_output(dst) {
            log::debug!("[network] Disconnected {} -> {}", src, dst);
            Ok(())
        } else {
            Err(Error::NotFound(format!("{} -> {}", src, dst)))
        }
    }

    /// `true` if `src` currently delivers to `dst`.
    #[must_use]
    pub fn is_connected(&self, src: &str, dst: &str) -> bool {
        self.names
            .endpoint(src)
            .is_some_and(|source| source.has_output(dst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_initialize_once_is_idempotent() {
        let guard = InitGuard::new();
        assert!(!guard.is_initialized());
        assert!(matches!(guard.ensure(), Err(Error::NotInitialized)));
        assert!(guard.initialize_once());
        assert!(!guard.initialize_once());
        assert!(guard.is_initialized());
        assert!(guard.ensure().is_ok());
    }

    #[test]
    fn test_concurrent_first_init_has_single_winner() {
        for _ in 0..20 {
            let guard = Arc::new(InitGuard::new());
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let guard = Arc::clone(&guard);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        guard.initialize_once()
                    })
                })
                .collect();
            let winners = handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }

    #[test]
    fn test_reset_allows_reinitialization() {
        let guard = InitGuard::new();
        assert!(!guard.reset());
        guard.initialize_once();
        assert!(guard.reset());
        assert!(guard.initialize_once());
    }

    #[test]
    fn test_uninitialized_network_rejects_connect() {
        let net = Network::new(RuntimeConfig::new());
        assert!(matches!(net.connect("/a", "/b"), Err(Error::NotInitialized)));
        assert!(matches!(net.disconnect("/a", "/b"), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_connect_rejects_invalid_names() {
        let net = Network::new(RuntimeConfig::new());
        net.initialize();
        assert!(matches!(net.connect("a", "/b"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_connect_times_out_on_missing_peer() {
        let net = Network::new(RuntimeConfig::new());
        net.initialize();
        let opts = ConnectOptions::default().timeout(Duration::from_millis(60));
        let start = Instant::now();
        let err = net.connect_with("/nobody", "/nowhere", &opts);
        assert!(matches!(err, Err(Error::UnreachablePeer { .. })));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_connect_with_unbounded_window() {
        let net = Network::new(RuntimeConfig::new());
        net.initialize();
        let a = crate::Port::with_network(&net);
        let b = crate::Port::with_network(&net);
        a.open("/huge/a").expect("open");
        b.open("/huge/b").expect("open");
        let opts = ConnectOptions::default().timeout(Duration::MAX);
        net.connect_with("/huge/a", "/huge/b", &opts).expect("connect");
        assert!(net.is_connected("/huge/a", "/huge/b"));
    }

    #[test]
    fn test_shutdown_releases_names() {
        let net = Network::new(RuntimeConfig::new());
        net.initialize();
        net.names().register("/kept").expect("register");
        net.shutdown();
        assert!(!net.is_initialized());
        net.initialize();
        assert!(!net.exists("/kept"));
    }
}
