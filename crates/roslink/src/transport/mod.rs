// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming transport pipeline.
//!
//! ```text
//! publisher                                   subscriber
//! ---------                                   ----------
//! OutgoingMessageQueue                        IncomingMessageQueue
//!   | writer thread                             ^ deliver(payload)
//!   v                                           |
//! ChannelGroup --TcpChannel==== TCP ====receiver thread
//!                  ^                            ^
//!           publisher_accept            subscriber_connect
//!                  \___ ConnectionHeader ______/
//!                        handshake
//! ```
//!
//! - [`outgoing`]: bounded drop-oldest queue, one writer thread, latching
//! - [`incoming`]: decode-and-queue with blocking `take`
//! - [`handshake`]: TCPROS connection header exchange and checksum check
//! - [`tcp`]: framing, [`TcpChannel`] and connection setup helpers

mod channel;
mod circular;
pub mod handshake;
pub mod incoming;
pub mod outgoing;
pub mod tcp;

pub use channel::{next_channel_id, BroadcastOutcome, Channel, ChannelGroup, MemoryChannel};
pub use circular::CircularBlockingQueue;
pub use handshake::ConnectionHeader;
pub use incoming::IncomingMessageQueue;
pub use outgoing::{OutgoingMessageQueue, QueueMetricsSnapshot, QueueState};
pub use tcp::{publisher_accept, subscriber_connect, Subscription, TcpChannel};

use crate::schema::SchemaError;
use crate::wire::WireError;
use std::fmt;
use std::io;

/// Errors raised by the outgoing queue.
#[derive(Debug)]
pub enum QueueError {
    /// The queue is not in the `Running` state.
    NotRunning,
    /// The message could not be serialized.
    Serialize(WireError),
    /// The writer thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "outgoing queue is not running"),
            Self::Serialize(e) => write!(f, "failed to serialize message: {}", e),
            Self::Spawn(e) => write!(f, "failed to spawn writer thread: {}", e),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::NotRunning => None,
        }
    }
}

/// Errors raised while negotiating a connection.
#[derive(Debug)]
pub enum HandshakeError {
    /// The peer's type checksum does not match ours.
    IncompatibleType {
        expected_type: String,
        expected_md5: String,
        got_type: String,
        got_md5: String,
    },
    /// A required header field is absent.
    MissingField(&'static str),
    /// The header bytes are not a valid connection header.
    Malformed(String),
    /// The peer refused the connection (`error=` field).
    Rejected(String),
    /// The local type checksum could not be computed.
    Schema(SchemaError),
    /// Socket failure during the exchange.
    Io(io::Error),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleType {
                expected_type,
                expected_md5,
                got_type,
                got_md5,
            } => write!(
                f,
                "incompatible type: expected {}/{}, got {}/{}",
                expected_type, expected_md5, got_type, got_md5
            ),
            Self::MissingField(key) => write!(f, "connection header missing `{}`", key),
            Self::Malformed(msg) => write!(f, "malformed connection header: {}", msg),
            Self::Rejected(msg) => write!(f, "connection rejected by peer: {}", msg),
            Self::Schema(e) => write!(f, "schema error: {}", e),
            Self::Io(e) => write!(f, "handshake I/O error: {}", e),
        }
    }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HandshakeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
