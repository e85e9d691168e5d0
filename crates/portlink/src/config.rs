// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! portlink Global Configuration
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: defaults as constants (connect window, port base)
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`], shared by every component of a
//!   [`Network`](crate::Network)
//!
//! # Sources
//!
//! Lowest to highest precedence:
//!
//! 1. compiled-in defaults ([`NetworkConfig::default`])
//! 2. YAML file ([`RuntimeConfig::load_yaml`], feature `config-file`)
//! 3. environment (`PORTLINK_*`, see [`NetworkConfig::apply_env`])
//! 4. programmatic [`RuntimeConfig::set_network`]
//!
//! # Performance
//!
//! - **Atomic swap**: `ArcSwap` for the network config (readers never lock)
//! - **Lock-free**: `DashMap` for user keys
//!
//! # Example
//!
//! ```ignore
//! use portlink::config::*;
//! use std::time::Duration;
//!
//! let config = RuntimeConfig::from_env();
//! let mut net = config.network();
//! net.connect_timeout = Duration::from_millis(500);
//! config.set_network(net);
//!
//! config.set_user("app.robot", "icub");
//! ```

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

// =======================================================================
// Defaults
// =======================================================================

/// Bounded retry window for `connect` when a peer name is not yet registered.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Upper bound between two resolution attempts while a connect is pending.
///
/// Registry changes wake pending connects immediately; this only caps the
/// sleep when nothing changes.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 50;

/// First port number handed out to registered names.
pub const DEFAULT_PORT_BASE: u16 = 10002;

/// Host advertised in contacts (transport is in-process).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Carrier recorded on connections when none is requested.
pub const DEFAULT_CARRIER: &str = "tcp";

/// Unbounded FIFO inbox.
pub const DEFAULT_INBOX_DEPTH: usize = 0;

/// Longest accepted port name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Prefix of generated names for ports opened as `...`.
pub const ANONYMOUS_PREFIX: &str = "/tmp/port/";

// Environment variables
pub const ENV_HOST: &str = "PORTLINK_HOST";
pub const ENV_PORT_BASE: &str = "PORTLINK_PORT_BASE";
pub const ENV_CARRIER: &str = "PORTLINK_CARRIER";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "PORTLINK_CONNECT_TIMEOUT_MS";
pub const ENV_RETRY_INTERVAL_MS: &str = "PORTLINK_RETRY_INTERVAL_MS";
pub const ENV_INBOX_DEPTH: &str = "PORTLINK_INBOX_DEPTH";

// =======================================================================
// Network Configuration
// =======================================================================

/// Settings that govern naming, connection and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct NetworkConfig {
    /// Host advertised in resolved contacts.
    pub host: String,
    /// First port number allocated to registrations.
    pub port_base: u16,
    /// Default carrier name for new connections.
    pub carrier: String,
    /// How long `connect` waits for both names to resolve.
    #[cfg_attr(feature = "config-file", serde(with = "millis"))]
    pub connect_timeout: Duration,
    /// Maximum sleep between resolution attempts.
    #[cfg_attr(feature = "config-file", serde(with = "millis"))]
    pub retry_interval: Duration,
    /// FIFO inbox bound for plain ports (0 = unbounded, oldest dropped when full).
    pub inbox_depth: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port_base: DEFAULT_PORT_BASE,
            carrier: DEFAULT_CARRIER.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            inbox_depth: DEFAULT_INBOX_DEPTH,
        }
    }
}

impl NetworkConfig {
    /// Overlay values from `PORTLINK_*` environment variables.
    ///
    /// Malformed values are logged and ignored (fail-safe).
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(host) = get(ENV_HOST) {
            self.host = host;
        }
        if let Some(carrier) = get(ENV_CARRIER) {
            self.carrier = carrier;
        }
        if let Some(v) = parse_var::<u16>(&get, ENV_PORT_BASE) {
            self.port_base = v;
        }
        if let Some(ms) = parse_var::<u64>(&get, ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&get, ENV_RETRY_INTERVAL_MS) {
            self.retry_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(depth) = parse_var::<usize>(&get, ENV_INBOX_DEPTH) {
            self.inbox_depth = depth;
        }
    }
}

fn parse_var<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[config] Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

#[cfg(feature = "config-file")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// =======================================================================
// Runtime Configuration (Dynamic, Lock-Free)
// =======================================================================

/// Shared runtime configuration (thread-safe, lock-free reads).
///
/// Cloning is cheap (two `Arc` increments); every clone sees updates.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Current network settings, replaced atomically.
    network: Arc<ArcSwap<NetworkConfig>>,
    /// User-land key/value store (`user.*` / `app.*`).
    user: Arc<DashMap<Arc<str>, Arc<str>>>,
}

impl RuntimeConfig {
    /// Config holding compiled-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_network(NetworkConfig::default())
    }

    #[must_use]
    pub fn with_network(network: NetworkConfig) -> Self {
        Self {
            network: Arc::new(ArcSwap::from_pointee(network)),
            user: Arc::new(DashMap::new()),
        }
    }

    /// Defaults overlaid with `PORTLINK_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut network = NetworkConfig::default();
        network.apply_env();
        Self::with_network(network)
    }

    /// Load a YAML file, then overlay the environment.
    ///
    /// Missing keys keep their defaults:
    ///
    /// ```yaml
    /// host: 10.0.0.2
    /// connect_timeout: 500
    /// inbox_depth: 16
    /// ```
    #[cfg(feature = "config-file")]
    pub fn load_yaml(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut network: NetworkConfig = serde_yaml::from_str(&text).map_err(|e| {
            crate::Error::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        network.apply_env();
        log::debug!("[config] Loaded network config from {}", path.display());
        Ok(Self::with_network(network))
    }

    /// Snapshot of the current network settings.
    #[must_use]
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig::clone(&self.network.load())
    }

    /// Replace the network settings (atomic swap).
    pub fn set_network(&self, network: NetworkConfig) {
        self.network.store(Arc::new(network));
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.network.load().connect_timeout
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.network.load().retry_interval
    }

    #[must_use]
    pub fn inbox_depth(&self) -> usize {
        self.network.load().inbox_depth
    }

    // ===================================================================
    // User-Land Keys
    // ===================================================================

    /// Set a user-land key. Keys must start with `user.` or `app.`;
    /// anything else is logged and skipped.
    pub fn set_user(&self, key: &str, value: &str) {
        if !is_user_key(key) {
            log::error!(
                "[config] User-land keys must start with 'user.' or 'app.', got: '{}'. Skipping.",
                key
            );
            return;
        }
        self.user.insert(Arc::from(key), Arc::from(value));
    }

    #[must_use]
    pub fn get_user(&self, key: &str) -> Option<Arc<str>> {
        if !is_user_key(key) {
            log::warn!("[config] get_user called with non user-land key '{}'", key);
            return None;
        }
        self.user.get(key).map(|v| Arc::clone(v.value()))
    }

    /// All user keys starting with `prefix`, sorted.
    #[must_use]
    pub fn search_user_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        let mut found: Vec<_> = self
            .user
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (Arc::clone(e.key()), Arc::clone(e.value())))
            .collect();
        found.sort();
        found
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("network", &*self.network.load())
            .field("user_keys", &self.user.len())
            .finish()
    }
}

fn is_user_key(key: &str) -> bool {
    key.starts_with("user.") || key.starts_with("app.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let net = NetworkConfig::default();
        assert_eq!(net.connect_timeout, Duration::from_millis(2000));
        assert_eq!(net.retry_interval, Duration::from_millis(50));
        assert_eq!(net.port_base, 10002);
        assert_eq!(net.inbox_depth, 0);
    }

    #[test]
    fn test_env_overlay() {
        let mut net = NetworkConfig::default();
        net.apply_vars(vars(&[
            (ENV_CONNECT_TIMEOUT_MS, "500"),
            (ENV_HOST, "10.1.2.3"),
            (ENV_INBOX_DEPTH, "8"),
            (ENV_RETRY_INTERVAL_MS, "0"),
        ]));
        assert_eq!(net.connect_timeout, Duration::from_millis(500));
        assert_eq!(net.host, "10.1.2.3");
        assert_eq!(net.inbox_depth, 8);
        assert_eq!(net.retry_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_malformed_env_is_ignored() {
        let mut net = NetworkConfig::default();
        net.apply_vars(vars(&[(ENV_PORT_BASE, "not-a-port")]));
        assert_eq!(net.port_base, DEFAULT_PORT_BASE);
    }

    #[test]
    fn test_set_network_visible_to_clones() {
        let config = RuntimeConfig::new();
        let clone = config.clone();
        let mut net = config.network();
        net.connect_timeout = Duration::from_millis(123);
        config.set_network(net);
        assert_eq!(clone.connect_timeout(), Duration::from_millis(123));
    }

    #[test]
    fn test_user_keys_require_namespace() {
        let config = RuntimeConfig::new();
        config.set_user("app.robot", "icub");
        config.set_user("user.fps", "30");
        config.set_user("network.host", "ignored");
        assert_eq!(config.get_user("app.robot").as_deref(), Some("icub"));
        assert!(config.get_user("network.host").is_none());
        let found = config.search_user_prefix("user.");
        assert_eq!(found.len(), 1);
        assert_eq!(&*found[0].1, "30");
    }
}
