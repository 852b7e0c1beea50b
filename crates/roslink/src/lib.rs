// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # roslink - ROS1 client core
//!
//! Dynamic message types and the TCPROS streaming pipeline, without
//! generated per-type code.
//!
//! ## Quick Start
//!
//! ```rust
//! use roslink::schema::MapDefinitionProvider;
//! use roslink::MessageFactory;
//! use std::sync::Arc;
//!
//! let provider = MapDefinitionProvider::new()
//!     .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
//!     .with("std_msgs/String", "string data");
//! let factory = MessageFactory::new(Arc::new(provider));
//!
//! let mut msg = factory.create_message("std_msgs/String")?;
//! msg.set("data", "hello")?;
//! let bytes = msg.to_bytes()?;
//! assert_eq!(bytes.len(), 9);
//!
//! let back = factory.deserialize_message("std_msgs/String", &bytes)?;
//! assert_eq!(back, msg);
//! # Ok::<(), roslink::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  MessageFactory  (create / deserialize / services / headers)  |
//! +---------------------------------------------------------------+
//! |  Message + MessageInterface        |  OutgoingMessageQueue    |
//! |  (typed access, to/from bytes)     |  IncomingMessageQueue    |
//! +------------------------------------+  ConnectionHeader        |
//! |  wire codec (little-endian TCPROS) |  TcpChannel / framing    |
//! +------------------------------------+--------------------------+
//! |  schema (parse, resolve, cache, md5sum)                       |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`schema`] - definition parsing, resolution and checksums
//! - [`wire`] - binary encoding
//! - [`message`] - dynamic instances and typed views
//! - [`factory`] - type-name driven construction
//! - [`transport`] - queues, handshake, TCP
//! - [`config`] - transport settings

/// Transport settings and YAML loading.
pub mod config;
mod error;
/// Type-name driven message and service construction.
pub mod factory;
/// Dynamic message instances and typed interfaces.
pub mod message;
/// Message definition parsing, resolution and checksums.
pub mod schema;
/// Outgoing/incoming queues, connection handshake and TCP plumbing.
pub mod transport;
/// ROS1 binary wire codec.
pub mod wire;

pub use config::TransportConfig;
pub use error::{Error, Result};
pub use factory::MessageFactory;
pub use message::{FieldError, FieldValue, Message, MessageClassRegistry, MessageInterface};
pub use schema::{MessageDefinitionProvider, MessageSchema, SchemaError, SchemaResolver};
pub use transport::{
    ConnectionHeader, HandshakeError, IncomingMessageQueue, OutgoingMessageQueue, QueueError,
};
pub use wire::WireError;
