// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ports: named endpoints that exchange [`Portable`] messages.
//!
//! # Architecture
//!
//! ```text
//! Port
//! +-- network: Arc<Network>          registry + config
//! +-- core: ArcSwapOption<PortCore>  None while closed
//!       +-- inbox                    blocking receive queue
//!       +-- outputs                  Weak refs to destination cores
//!       +-- registration             releases the name on close
//! ```
//!
//! A write encodes the message once and pushes the same immutable bytes to
//! every connected destination. Messages from one writer reach a given
//! reader in write order.
//!
//! Closing a port releases its name, drops its connections and wakes any
//! thread blocked in [`Port::read`], which then returns `Ok(None)`.
//!
//! A writer may also ask for an answer with [`Port::write_with_reply`]; the
//! reader takes the message with [`Port::read_with_reply`] and answers
//! through the returned [`Replier`].
//!
//! # Example
//!
//! ```rust,no_run
//! use portlink::{Bottle, Network, Port};
//!
//! Network::init();
//! let out = Port::new();
//! out.open("/sender/out")?;
//! let inp = Port::new();
//! inp.open("/receiver/in")?;
//! Network::global().connect("/sender/out", "/receiver/in")?;
//!
//! let mut msg = Bottle::new();
//! msg.add_string("hello");
//! out.write(&msg)?;
//! let got: Option<Bottle> = inp.read(true)?;
//! assert_eq!(got, Some(msg));
//! # Ok::<(), portlink::Error>(())
//! ```

mod buffered;
mod endpoint;
mod inbox;
mod reply;

pub use buffered::{BufferedPort, Prepared};
pub(crate) use endpoint::PortCore;
pub use reply::Replier;

use endpoint::Registration;
use crate::name::ANONYMOUS;
use crate::network::{ConnectOptions, Network};
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use inbox::{InboxMode, Wait};
use reply::{ReplyCell, ReplyHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A message type that can travel through a port.
pub trait Portable: Sized + Send + 'static {
    /// Serialize to the wire form.
    fn encode(&self) -> Result<Vec<u8>>;
    /// Rebuild from the wire form.
    fn decode(data: &[u8]) -> Result<Self>;
}

/// Envelope metadata attached to every write.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stamp {
    /// Per-writer sequence number, starting at 0.
    pub count: u64,
    /// Wall-clock seconds since the Unix epoch at write time.
    pub time: f64,
}

impl Stamp {
    fn now(count: u64) -> Self {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self { count, time }
    }
}

/// A named messaging endpoint.
///
/// All methods take `&self`; a port can be shared between a reader thread
/// and a thread that closes it.
pub struct Port {
    network: Arc<Network>,
    core: ArcSwapOption<PortCore>,
    lifecycle: Mutex<()>,
    mode: Mutex<Option<InboxMode>>,
    last_stamp: Mutex<Option<Stamp>>,
}

impl Port {
    /// Unopened port on the process-wide network.
    #[must_use]
    pub fn new() -> Self {
        Self::with_network(&Network::global())
    }

    /// Unopened port on a specific network.
    #[must_use]
    pub fn with_network(network: &Arc<Network>) -> Self {
        Self {
            network: Arc::clone(network),
            core: ArcSwapOption::empty(),
            lifecycle: Mutex::new(()),
            mode: Mutex::new(None),
            last_stamp: Mutex::new(None),
        }
    }

    /// Bind this port to `name` (or a generated name for `"..."`).
    ///
    /// An already open port is closed first.
    pub fn open(&self, name: &str) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        self.network.guard().ensure()?;
        if let Some(old) = self.core.swap(None) {
            old.shutdown();
        }

        let mode = self.inbox_mode();
        let core = if name == ANONYMOUS {
            loop {
                let candidate = self.network.names().anonymous_name();
                match self.bind(&candidate, mode) {
                    Err(Error::NameInUse(_)) => continue,
                    other => break other?,
                }
            }
        } else {
            self.bind(name, mode)?
        };

        log::debug!("[port] Opened {}", core.name());
        self.core.store(Some(core));
        Ok(())
    }

    /// Register a fresh core under `name`. The core is alive before its
    /// binding is visible, so the binding is never taken for stale.
    fn bind(&self, name: &str, mode: InboxMode) -> Result<Arc<PortCore>> {
        let core = Arc::new(PortCore::new(name, mode));
        match self
            .network
            .names()
            .register_endpoint(name, Arc::downgrade(&core))
        {
            Ok(handle) => {
                core.attach(Registration::new(&self.network, handle));
                Ok(core)
            }
            Err(e) => {
                core.shutdown();
                Err(e)
            }
        }
    }

    /// Open under a generated `/tmp/port/<n>` name.
    pub fn open_anonymous(&self) -> Result<()> {
        self.open(ANONYMOUS)
    }

    /// Release the name, drop connections and wake blocked readers.
    ///
    /// Closing a closed port is a no-op.
    pub fn close(&self) {
        let _lifecycle = self.lifecycle.lock();
        if let Some(core) = self.core.swap(None) {
            core.shutdown();
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.core.load().is_some()
    }

    /// Bound name while open.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.core.load().as_ref().map(|core| core.name().to_string())
    }

    #[must_use]
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    fn open_core(&self) -> Result<Arc<PortCore>> {
        self.core.load_full().ok_or(Error::ClosedEndpoint)
    }

    /// Send `msg` to every connected destination.
    ///
    /// With no connections this succeeds and delivers nothing.
    pub fn write<T: Portable>(&self, msg: &T) -> Result<()> {
        let core = self.open_core()?;
        let payload: Arc<[u8]> = Arc::from(msg.encode()?);
        let delivered = core.deliver(&payload, Stamp::now(core.next_sequence()), None);
        log::trace!(
            "[port] {} wrote {} bytes to {} reader(s)",
            core.name(),
            payload.len(),
            delivered
        );
        Ok(())
    }

    /// Send `msg` and block until the first connected reader answers.
    ///
    /// Every output receives the message; only the first live one is asked
    /// to reply. Returns `Ok(None)` when there is no output, the reader
    /// drops the message without replying, or this port is closed or
    /// interrupted while waiting.
    pub fn write_with_reply<T: Portable, R: Portable>(&self, msg: &T) -> Result<Option<R>> {
        self.write_reply_with(msg, Wait::Forever)
    }

    /// Like [`write_with_reply`](Self::write_with_reply), giving up after `timeout`.
    pub fn write_with_reply_timeout<T: Portable, R: Portable>(
        &self,
        msg: &T,
        timeout: Duration,
    ) -> Result<Option<R>> {
        self.write_reply_with(msg, Wait::For(timeout))
    }

    fn write_reply_with<T: Portable, R: Portable>(&self, msg: &T, wait: Wait) -> Result<Option<R>> {
        let core = self.open_core()?;
        let payload: Arc<[u8]> = Arc::from(msg.encode()?);
        let cell = ReplyCell::new();
        core.await_reply(&cell);
        if core.is_closed() || core.inbox.is_interrupted() {
            cell.abandon();
        }
        let stamp = Stamp::now(core.next_sequence());
        let delivered = core.deliver(&payload, stamp, Some(ReplyHandle::new(&cell)));
        log::trace!("[port] {} wrote {} bytes expecting a reply", core.name(), payload.len());
        if delivered == 0 {
            return Ok(None);
        }
        match cell.wait(wait) {
            Some(bytes) => R::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read the next message.
    ///
    /// Blocking reads wait until a message arrives, the port is closed or
    /// interrupted; the last two yield `Ok(None)`. Non-blocking reads return
    /// `Ok(None)` when nothing is pending. A closed port reads `Ok(None)`.
    pub fn read<T: Portable>(&self, blocking: bool) -> Result<Option<T>> {
        self.read_with(if blocking { Wait::Forever } else { Wait::No })
    }

    /// Like a blocking [`read`](Self::read) that gives up after `timeout`.
    pub fn read_timeout<T: Portable>(&self, timeout: Duration) -> Result<Option<T>> {
        self.read_with(Wait::For(timeout))
    }

    /// Read the next message together with a [`Replier`] for its writer.
    ///
    /// Same sentinels as [`read`](Self::read). The replier expects an
    /// answer only if the message came from
    /// [`write_with_reply`](Self::write_with_reply).
    pub fn read_with_reply<T: Portable>(&self, blocking: bool) -> Result<Option<(T, Replier)>> {
        let Some((msg, reply)) = self.take(if blocking { Wait::Forever } else { Wait::No })? else {
            return Ok(None);
        };
        Ok(Some((msg, Replier::new(reply))))
    }

    fn read_with<T: Portable>(&self, wait: Wait) -> Result<Option<T>> {
        Ok(self.take(wait)?.map(|(msg, _reply)| msg))
    }

    fn take<T: Portable>(&self, wait: Wait) -> Result<Option<(T, Option<ReplyHandle>)>> {
        let Some(core) = self.core.load_full() else {
            return Ok(None);
        };
        let Some(delivery) = core.inbox.pop(wait) else {
            return Ok(None);
        };
        *self.last_stamp.lock() = Some(delivery.stamp);
        let msg = T::decode(&delivery.payload)?;
        Ok(Some((msg, delivery.reply)))
    }

    /// Envelope of the last message returned by a read.
    #[must_use]
    pub fn last_stamp(&self) -> Option<Stamp> {
        *self.last_stamp.lock()
    }

    /// Connect this port's output to `dest`.
    pub fn add_output(&self, dest: &str) -> Result<()> {
        self.add_output_with(dest, &ConnectOptions::default())
    }

    pub fn add_output_with(&self, dest: &str, opts: &ConnectOptions) -> Result<()> {
        let core = self.open_core()?;
        self.network.connect_with(core.name(), dest, opts)
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.core.load().as_ref().map_or(0, |core| core.input_count())
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.core.load().as_ref().map_or(0, |core| core.output_count())
    }

    /// `(destination, carrier)` for every live output.
    #[must_use]
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.core.load().as_ref().map_or_else(Vec::new, |core| core.outputs())
    }

    /// Messages waiting in the inbox.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.core.load().as_ref().map_or(0, |core| core.inbox.len())
    }

    /// Messages discarded by inbox overflow or replacement.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.core.load().as_ref().map_or(0, |core| core.inbox.dropped())
    }

    /// Make pending and future reads return `Ok(None)` until [`resume`](Self::resume).
    pub fn interrupt(&self) {
        if let Some(core) = self.core.load().as_ref() {
            core.inbox.interrupt();
            core.cancel_replies();
        }
    }

    pub fn resume(&self) {
        if let Some(core) = self.core.load().as_ref() {
            core.inbox.resume();
        }
    }

    fn inbox_mode(&self) -> InboxMode {
        let configured = *self.mode.lock();
        configured.unwrap_or(InboxMode::Queue {
            depth: self.network.config().inbox_depth(),
        })
    }

    pub(crate) fn set_inbox_mode(&self, mode: InboxMode) {
        *self.mode.lock() = Some(mode);
        if let Some(core) = self.core.load().as_ref() {
            core.inbox.set_mode(mode);
        }
    }
}

impl Default for Port {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name())
            .field("pending", &self.pending_reads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::Bottle;
    use std::thread;

    fn network() -> Arc<Network> {
        let net = Network::new(RuntimeConfig::new());
        net.initialize();
        net
    }

    fn text(s: &str) -> Bottle {
        Bottle::from_text(s)
    }

    #[test]
    fn test_open_requires_init() {
        let net = Network::new(RuntimeConfig::new());
        let port = Port::with_network(&net);
        assert!(matches!(port.open("/p"), Err(Error::NotInitialized)));
        assert!(!port.is_open());
    }

    #[test]
    fn test_open_registers_and_close_releases() {
        let net = network();
        let port = Port::with_network(&net);
        port.open("/p").expect("open");
        assert_eq!(port.name().as_deref(), Some("/p"));
        assert!(net.exists("/p"));
        port.close();
        assert!(!net.exists("/p"));
        port.close();
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let net = network();
        let a = Port::with_network(&net);
        a.open("/dup").expect("open");
        let b = Port::with_network(&net);
        assert!(matches!(b.open("/dup"), Err(Error::NameInUse(_))));
        assert!(!b.is_open());
        assert!(net.exists("/dup"));
    }

    #[test]
    fn test_drop_releases_name() {
        let net = network();
        {
            let port = Port::with_network(&net);
            port.open("/scoped").expect("open");
        }
        assert!(!net.exists("/scoped"));
    }

    #[test]
    fn test_reopen_under_new_name() {
        let net = network();
        let port = Port::with_network(&net);
        port.open("/first").expect("open");
        port.open("/second").expect("reopen");
        assert!(!net.exists("/first"));
        assert!(net.exists("/second"));
    }

    #[test]
    fn test_write_on_closed_port_fails() {
        let net = network();
        let port = Port::with_network(&net);
        assert!(matches!(port.write(&text("x")), Err(Error::ClosedEndpoint)));
    }

    #[test]
    fn test_write_without_connections_is_ok() {
        let net = network();
        let port = Port::with_network(&net);
        port.open("/lonely").expect("open");
        port.write(&text("x")).expect("write");
    }

    #[test]
    fn test_messages_arrive_in_order_with_stamps() {
        let net = network();
        let out = Port::with_network(&net);
        out.open("/o").expect("open");
        let inp = Port::with_network(&net);
        inp.open("/i").expect("open");
        out.add_output("/i").expect("connect");
        assert_eq!(out.output_count(), 1);
        assert_eq!(inp.input_count(), 1);

        for n in 0..10 {
            let mut b = Bottle::new();
            b.add_int32(n);
            out.write(&b).expect("write");
        }
        for n in 0..10 {
            let b: Bottle = inp.read(false).expect("read").expect("message");
            assert_eq!(b.get(0).and_then(|v| v.as_i64()), Some(i64::from(n)));
            assert_eq!(inp.last_stamp().map(|s| s.count), Some(n as u64));
        }
        assert!(inp.read::<Bottle>(false).expect("read").is_none());
    }

    #[test]
    fn test_fan_out_to_two_readers() {
        let net = network();
        let out = Port::with_network(&net);
        out.open("/fan").expect("open");
        let readers: Vec<Port> = ["/r1", "/r2"]
            .iter()
            .map(|name| {
                let p = Port::with_network(&net);
                p.open(name).expect("open");
                out.add_output(name).expect("connect");
                p
            })
            .collect();
        out.write(&text("ping")).expect("write");
        for r in &readers {
            let got: Bottle = r.read(false).expect("read").expect("message");
            assert_eq!(got.to_string(), "ping");
        }
    }

    #[test]
    fn test_close_unblocks_reader() {
        let net = network();
        let port = Arc::new(Port::with_network(&net));
        port.open("/blocked").expect("open");
        let reader = {
            let port = Arc::clone(&port);
            thread::spawn(move || port.read::<Bottle>(true))
        };
        thread::sleep(Duration::from_millis(30));
        port.close();
        let result = reader.join().expect("join").expect("read");
        assert!(result.is_none());
    }

    #[test]
    fn test_closed_destination_stops_receiving() {
        let net = network();
        let out = Port::with_network(&net);
        out.open("/src").expect("open");
        let inp = Port::with_network(&net);
        inp.open("/dst").expect("open");
        out.add_output("/dst").expect("connect");
        inp.close();
        assert_eq!(out.output_count(), 0);
        out.write(&text("x")).expect("write");
        inp.open("/dst").expect("reopen");
        assert_eq!(inp.pending_reads(), 0);
    }

    #[test]
    fn test_disconnect() {
        let net = network();
        let out = Port::with_network(&net);
        out.open("/a").expect("open");
        let inp = Port::with_network(&net);
        inp.open("/b").expect("open");
        net.connect("/a", "/b").expect("connect");
        assert!(net.is_connected("/a", "/b"));
        net.disconnect("/a", "/b").expect("disconnect");
        assert!(!net.is_connected("/a", "/b"));
        assert_eq!(inp.input_count(), 0);
        assert!(matches!(net.disconnect("/a", "/b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_bounded_inbox_from_config() {
        let config = RuntimeConfig::new();
        let mut settings = config.network();
        settings.inbox_depth = 2;
        config.set_network(settings);
        let net = Network::new(config);
        net.initialize();

        let out = Port::with_network(&net);
        out.open("/w").expect("open");
        let inp = Port::with_network(&net);
        inp.open("/r").expect("open");
        out.add_output("/r").expect("connect");
        for n in 0..5 {
            let mut b = Bottle::new();
            b.add_int32(n);
            out.write(&b).expect("write");
        }
        assert_eq!(inp.pending_reads(), 2);
        assert_eq!(inp.dropped_count(), 3);
        let first: Bottle = inp.read(false).expect("read").expect("message");
        assert_eq!(first.get(0).and_then(|v| v.as_i64()), Some(3));
    }

    #[test]
    fn test_read_timeout_expires() {
        let net = network();
        let port = Port::with_network(&net);
        port.open("/idle").expect("open");
        let got: Option<Bottle> = port.read_timeout(Duration::from_millis(20)).expect("read");
        assert!(got.is_none());
    }

    #[test]
    fn test_read_timeout_accepts_max_duration() {
        let net = network();
        let a = Port::with_network(&net);
        let b = Port::with_network(&net);
        a.open("/max/a").expect("open");
        b.open("/max/b").expect("open");
        net.connect("/max/a", "/max/b").expect("connect");
        a.write(&text("ready")).expect("write");
        let got: Option<Bottle> = b.read_timeout(Duration::MAX).expect("read");
        assert_eq!(got.map(|m| m.to_string()).as_deref(), Some("ready"));
    }

    #[test]
    fn test_anonymous_open() {
        let net = network();
        let port = Port::with_network(&net);
        port.open_anonymous().expect("open");
        let name = port.name().expect("name");
        assert!(name.starts_with("/tmp/port/"));
        assert!(net.exists(&name));
    }

    #[test]
    fn test_binding_of_live_core_is_held() {
        let net = network();
        let core = Arc::new(PortCore::new("/held", InboxMode::Latest));
        let _handle = net
            .names()
            .register_endpoint("/held", Arc::downgrade(&core))
            .expect("register");

        // a registration racing with an open in progress must lose
        assert!(matches!(net.names().register("/held"), Err(Error::NameInUse(_))));
        let rival = Port::with_network(&net);
        assert!(matches!(rival.open("/held"), Err(Error::NameInUse(_))));

        drop(core);
        rival.open("/held").expect("reclaim after the core is gone");
    }

    #[test]
    fn test_anonymous_opens_do_not_collide() {
        let net = network();
        let taken = net.names().register("/tmp/port/1").expect("register");
        let port = Port::with_network(&net);
        port.open_anonymous().expect("open");
        assert_ne!(port.name().as_deref(), Some(taken.name()));
    }

    #[test]
    fn test_reply_roundtrip() {
        let net = network();
        let client = Arc::new(Port::with_network(&net));
        let server = Port::with_network(&net);
        client.open("/rpc/client").expect("open");
        server.open("/rpc/server").expect("open");
        net.connect("/rpc/client", "/rpc/server").expect("connect");

        let caller = {
            let client = Arc::clone(&client);
            thread::spawn(move || client.write_with_reply::<Bottle, Bottle>(&text("ping 1")))
        };
        let (msg, replier) = server
            .read_with_reply::<Bottle>(true)
            .expect("read")
            .expect("message");
        assert_eq!(msg.to_string(), "ping 1");
        assert!(replier.expects_reply());
        assert!(replier.reply(&text("pong 1")).expect("reply"));

        let answer = caller.join().expect("join").expect("write");
        assert_eq!(answer.map(|b| b.to_string()).as_deref(), Some("pong 1"));
    }

    #[test]
    fn test_reply_without_outputs_is_none() {
        let net = network();
        let port = Port::with_network(&net);
        port.open("/rpc/alone").expect("open");
        let answer: Option<Bottle> = port.write_with_reply(&text("hello")).expect("write");
        assert!(answer.is_none());
    }

    #[test]
    fn test_plain_read_releases_reply_waiter() {
        let net = network();
        let client = Arc::new(Port::with_network(&net));
        let server = Port::with_network(&net);
        client.open("/rpc/c2").expect("open");
        server.open("/rpc/s2").expect("open");
        net.connect("/rpc/c2", "/rpc/s2").expect("connect");

        let caller = {
            let client = Arc::clone(&client);
            thread::spawn(move || client.write_with_reply::<Bottle, Bottle>(&text("ask")))
        };
        let msg: Bottle = server.read(true).expect("read").expect("message");
        assert_eq!(msg.to_string(), "ask");
        assert!(caller.join().expect("join").expect("write").is_none());
    }
}
