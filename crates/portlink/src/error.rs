// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for portlink operations.
//!
//! Every failure here is recoverable: resolution and connection errors are
//! reported to the caller, who may retry or poll. A read that is interrupted
//! by a close is not an error at all, it returns `Ok(None)`.

use crate::bottle::CodecError;

/// Errors returned by portlink operations.
///
/// # Example
///
/// ```rust,no_run
/// use portlink::{Error, Network, Port};
///
/// Network::init();
/// let first = Port::new();
/// first.open("/camera/out")?;
///
/// let second = Port::new();
/// match second.open("/camera/out") {
///     Err(Error::NameInUse(name)) => println!("{} already taken", name),
///     Err(e) => println!("Other error: {}", e),
///     Ok(()) => println!("Opened"),
/// }
/// # Ok::<(), portlink::Error>(())
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Name Errors
    // ========================================================================
    /// The name is already bound to another live endpoint.
    NameInUse(String),
    /// The name (or connection) is not known to the registry.
    NotFound(String),
    /// The name is not a valid port name (must start with `/`, no whitespace).
    InvalidName(String),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The peer never resolved within the connect retry window.
    UnreachablePeer {
        /// Source port name.
        source: String,
        /// Destination port name.
        dest: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The process-wide network context has not been initialized.
    NotInitialized,
    /// The endpoint is closed; reopen it before writing.
    ClosedEndpoint,
    /// The staging frame is still held by a `Prepared` guard.
    FrameInUse,

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Message encoding or decoding failed.
    Codec(CodecError),

    // ========================================================================
    // Configuration / Device Errors
    // ========================================================================
    /// A configuration value is missing or malformed.
    InvalidConfig(String),
    /// No driver is registered under the requested device name.
    DeviceNotFound(String),
    /// The requested operation or capability is not supported.
    Unsupported,
    /// I/O error with underlying cause (config files).
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NameInUse(name) => write!(f, "Name already in use: {}", name),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::InvalidName(name) => write!(f, "Invalid port name: {:?}", name),
            Error::UnreachablePeer { source, dest } => {
                write!(f, "Unreachable peer: cannot connect {} -> {}", source, dest)
            }
            Error::NotInitialized => write!(f, "Network not initialized"),
            Error::ClosedEndpoint => write!(f, "Endpoint is closed"),
            Error::FrameInUse => write!(f, "Staging frame is still prepared"),
            Error::Codec(e) => write!(f, "Codec error: {}", e),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::DeviceNotFound(name) => write!(f, "Device not found: {}", name),
            Error::Unsupported => write!(f, "Unsupported operation"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Codec(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
