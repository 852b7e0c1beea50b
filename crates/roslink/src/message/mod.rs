// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic message instances.
//!
//! A [`Message`] is a generic value container shaped by a
//! [`MessageSchema`](crate::schema::MessageSchema): no per-type code is
//! generated, yet every access is checked against the declared field type.
//!
//! # Example
//!
//! ```rust
//! use roslink::message::Message;
//! use roslink::schema::{MapDefinitionProvider, SchemaResolver};
//! use std::sync::Arc;
//!
//! let provider = MapDefinitionProvider::new().with("std_msgs/String", "string data");
//! let resolver = SchemaResolver::new(Arc::new(provider));
//! let schema = resolver.resolve("std_msgs/String").unwrap();
//!
//! let mut msg = Message::new(&schema).unwrap();
//! msg.set("data", "hello").unwrap();
//! assert_eq!(msg.to_bytes().unwrap(), b"\x05\x00\x00\x00hello");
//! ```

mod instance;
mod interface;
mod value;


pub use instance::{FieldKey, Message};
pub use interface::{validate_interface, InterfaceInfo, MessageClassRegistry, MessageInterface};
pub use value::{Duration, FieldValue, FromFieldValue, IntoFieldValue, Time};

use std::fmt;

/// Errors raised by field access on a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The schema has no field with this name.
    NoSuchField { type_name: String, field: String },
    /// The value does not match the declared field type.
    TypeMismatch {
        type_name: String,
        field: String,
        expected: String,
        got: String,
    },
    /// Constants cannot be written.
    ImmutableField { type_name: String, field: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchField { type_name, field } => {
                write!(f, "{} has no field `{}`", type_name, field)
            }
            Self::TypeMismatch {
                type_name,
                field,
                expected,
                got,
            } => write!(
                f,
                "{}.{}: type mismatch, expected {}, got {}",
                type_name, field, expected, got
            ),
            Self::ImmutableField { type_name, field } => {
                write!(f, "{}.{} is a constant", type_name, field)
            }
        }
    }
}

impl std::error::Error for FieldError {}
