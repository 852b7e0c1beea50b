// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-level error type.

use crate::config::ConfigError;
use crate::message::FieldError;
use crate::schema::SchemaError;
use crate::transport::{HandshakeError, QueueError};
use crate::wire::WireError;
use std::fmt;

/// Any error raised by this crate.
#[derive(Debug)]
pub enum Error {
    /// Unknown or malformed message definition.
    Schema(SchemaError),
    /// Truncated or inconsistent wire data.
    Wire(WireError),
    /// Invalid field access on a message.
    Field(FieldError),
    /// Connection header negotiation failed.
    Handshake(HandshakeError),
    /// Outgoing queue misuse.
    Queue(QueueError),
    /// Invalid configuration.
    Config(ConfigError),
    /// Socket or thread failure.
    Io(std::io::Error),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "{}", e),
            Self::Wire(e) => write!(f, "{}", e),
            Self::Field(e) => write!(f, "{}", e),
            Self::Handshake(e) => write!(f, "{}", e),
            Self::Queue(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::Field(e) => Some(e),
            Self::Handshake(e) => Some(e),
            Self::Queue(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

macro_rules! impl_from_error {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(e: $source) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

impl_from_error! {
    SchemaError => Schema,
    WireError => Wire,
    FieldError => Field,
    HandshakeError => Handshake,
    QueueError => Queue,
    ConfigError => Config,
    std::io::Error => Io,
}
