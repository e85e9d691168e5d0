// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # portlink - Named message ports for robotics software
//!
//! Named, connectable message ports: symbolic names resolve to endpoints,
//! directed connections join them, and typed messages ([`Bottle`]s and
//! [`Image`] frames) flow through them. Transport is in-process; every
//! message still travels in its serialized wire form.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portlink::{Bottle, BufferedPort, Network, Port, Result};
//!
//! fn main() -> Result<()> {
//!     Network::init();
//!
//!     let sender = Port::new();
//!     sender.open("/sender")?;
//!     let receiver = Port::new();
//!     receiver.open("/receiver")?;
//!     Network::global().connect("/sender", "/receiver")?;
//!
//!     let mut msg = Bottle::new();
//!     msg.add_float64(1.5).add_string("hello");
//!     sender.write(&msg)?;
//!
//!     if let Some(got) = receiver.read::<Bottle>(true)? {
//!         println!("received {}", got);
//!     }
//!
//!     // Streaming frames: readers only ever see the latest one
//!     let frames: BufferedPort<Bottle> = BufferedPort::new();
//!     frames.open("/frames")?;
//!     frames.prepare().add_int32(42);
//!     frames.write()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Port / BufferedPort<T>     open, write, read, prepare, callbacks    |
//! +---------------------------------------------------------------------+
//! |  Network                    init guard, connect / disconnect        |
//! |  NameRegistry               name -> Contact (+ live endpoint)       |
//! +---------------------------------------------------------------------+
//! |  Portable codecs            Bottle wire/text form, Image frames     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`bottle`] - Typed message values, wire codec, text form
//! - [`port`] - Ports, buffered ports, the [`Portable`] trait
//! - [`name`] - Name registry and contacts
//! - [`network`] - Init guard and connection management
//! - [`image`] - Image frames and plane-array marshalling
//! - [`dev`] - Device configuration, drivers and capability views
//! - [`config`] - Defaults, environment and YAML configuration

pub mod bottle;
pub mod config;
pub mod dev;
mod error;
pub mod image;
pub mod name;
pub mod network;
pub mod port;

pub use bottle::{Bottle, CodecError, Value, Vocab};
pub use config::{NetworkConfig, RuntimeConfig};
pub use error::{Error, Result};
pub use image::{Image, PixelFormat};
pub use name::{Contact, EndpointHandle, NameRegistry};
pub use network::{ConnectOptions, InitGuard, Network};
pub use port::{BufferedPort, Port, Portable, Prepared, Replier, Stamp};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
