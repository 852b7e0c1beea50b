// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ROS1 wire codec.
//!
//! ```text
//! primitive      native width, little-endian, no padding
//! string         u32 length | bytes (no terminator)
//! T[]            u32 count  | count x T
//! T[N]           N x T (no prefix)
//! nested msg     fields inline, no prefix
//! constant       never on the wire
//! ```
//!
//! Decoding is stateless: every call starts from a fresh cursor, so the same
//! bytes always decode to the same values.

mod codec;
mod cursor;

pub use codec::{deserialize, serialize, MAX_EMPTY_ELEMENTS, MAX_NESTING_DEPTH};
pub use cursor::{WireReader, WireWriter};

pub(crate) use codec::{decode_fields, encode_fields};

use crate::message::Message;
use crate::schema::{MessageSchema, SchemaError};
use std::fmt;
use std::sync::Arc;

/// Errors raised while encoding or decoding wire data.
#[derive(Debug, Clone, PartialEq)]
pub enum WireError {
    /// Not enough bytes for the next declared field.
    BufferUnderrun { offset: usize, need: usize, have: usize },
    /// String bytes are not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// A stored value does not match its declared field type.
    ValueMismatch {
        field: String,
        expected: String,
        got: String,
    },
    /// A fixed-length array holds the wrong number of elements.
    FixedArrayLength {
        field: String,
        expected: usize,
        got: usize,
    },
    /// A string or array is too long for a 32-bit length prefix.
    LengthOverflow(usize),
    /// A nested schema could not be resolved.
    Schema(SchemaError),
    /// Nested messages go deeper than the decoder allows.
    NestingTooDeep { limit: usize },
    /// A variable array of zero-size elements claims too many items.
    TooManyElements {
        field: String,
        count: usize,
        limit: usize,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferUnderrun { offset, need, have } => write!(
                f,
                "buffer underrun at offset {}: need {} bytes, have {}",
                offset, need, have
            ),
            Self::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 string at offset {}", offset),
            Self::ValueMismatch {
                field,
                expected,
                got,
            } => write!(f, "field `{}`: expected {}, got {}", field, expected, got),
            Self::FixedArrayLength {
                field,
                expected,
                got,
            } => write!(
                f,
                "field `{}`: fixed array needs {} elements, got {}",
                field, expected, got
            ),
            Self::LengthOverflow(len) => write!(f, "length {} exceeds u32 prefix", len),
            Self::Schema(e) => write!(f, "schema error: {}", e),
            Self::NestingTooDeep { limit } => {
                write!(f, "nested messages exceed depth limit {}", limit)
            }
            Self::TooManyElements {
                field,
                count,
                limit,
            } => write!(
                f,
                "field `{}`: {} empty elements exceed limit {}",
                field, count, limit
            ),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for WireError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

/// Turns a message into its wire bytes.
pub trait MessageSerializer<T>: Send + Sync {
    fn serialize(&self, message: &T) -> Result<Vec<u8>, WireError>;
}

/// Turns wire bytes back into a message.
pub trait MessageDeserializer<T>: Send + Sync {
    fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError>;
}

impl<T, F> MessageSerializer<T> for F
where
    F: Fn(&T) -> Result<Vec<u8>, WireError> + Send + Sync,
{
    fn serialize(&self, message: &T) -> Result<Vec<u8>, WireError> {
        self(message)
    }
}

/// Serializer for dynamic [`Message`]s (each carries its own schema).
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicSerializer;

impl MessageSerializer<Message> for DynamicSerializer {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, WireError> {
        message.to_bytes()
    }
}

/// Deserializer bound to one expected message type.
#[derive(Debug, Clone)]
pub struct DynamicDeserializer {
    schema: Arc<MessageSchema>,
}

impl DynamicDeserializer {
    pub fn new(schema: Arc<MessageSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<MessageSchema> {
        &self.schema
    }
}

impl MessageDeserializer<Message> for DynamicDeserializer {
    fn deserialize(&self, bytes: &[u8]) -> Result<Message, WireError> {
        Message::from_bytes(&self.schema, bytes)
    }
}
