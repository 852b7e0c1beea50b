// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message and service factory.
//!
//! Resolves schemas by type name and hands out ready-to-use [`Message`]s.
//! Every header created through a factory gets the next value of a
//! process-wide sequence counter.

use crate::message::{Message, MessageClassRegistry, MessageInterface};
use crate::schema::{
    ElementType, MessageDefinitionProvider, PrimitiveKind, SchemaError, SchemaResolver, HEADER_TYPE,
};
use crate::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Name of the sequence field in `std_msgs/Header`.
pub const HEADER_SEQ_FIELD: &str = "seq";

static SEQUENCE_NUMBER: AtomicU32 = AtomicU32::new(0);

/// Take the next header sequence number (the first call returns 1).
pub fn next_sequence_number() -> u32 {
    SEQUENCE_NUMBER.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

/// Creates messages and services from type names.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    resolver: SchemaResolver,
    registry: Arc<MessageClassRegistry>,
}

impl MessageFactory {
    pub fn new(provider: Arc<dyn MessageDefinitionProvider>) -> Self {
        Self::with_registry(SchemaResolver::new(provider), Arc::new(MessageClassRegistry::new()))
    }

    pub fn with_registry(resolver: SchemaResolver, registry: Arc<MessageClassRegistry>) -> Self {
        Self { resolver, registry }
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<MessageClassRegistry> {
        &self.registry
    }

    /// Create an empty message of `type_name`.
    ///
    /// Headers (top-level or as a direct field) receive a fresh sequence number.
    pub fn create_message(&self, type_name: &str) -> std::result::Result<Message, SchemaError> {
        let schema = self.resolver.resolve(type_name)?;
        let mut message = Message::new(&schema)?;
        assign_sequence(&mut message);
        Ok(message)
    }

    /// Create a message of `type_name` and decode `bytes` into it.
    pub fn deserialize_message(&self, type_name: &str, bytes: &[u8]) -> Result<Message> {
        let mut message = self.create_message(type_name)?;
        message.decode_into(bytes)?;
        Ok(message)
    }

    /// Create an empty (request, response) pair for a service type.
    pub fn create_service(&self, type_name: &str) -> std::result::Result<(Message, Message), SchemaError> {
        let service = self.resolver.resolve_service(type_name)?;
        let request = Message::new(&service.request)?;
        let response = Message::new(&service.response)?;
        Ok((request, response))
    }

    /// Create a message wrapped in its typed interface.
    pub fn create_interface<I: MessageInterface>(&self) -> Result<I> {
        let message = self.create_message(I::TYPE_NAME)?;
        Ok(self.registry.wrap::<I>(message)?)
    }

    /// Decode `bytes` into a typed interface.
    pub fn deserialize_interface<I: MessageInterface>(&self, bytes: &[u8]) -> Result<I> {
        let message = self.deserialize_message(I::TYPE_NAME, bytes)?;
        Ok(self.registry.wrap::<I>(message)?)
    }
}

/// Stamp every header of `message`; returns how many were stamped.
fn assign_sequence(message: &mut Message) -> usize {
    if message.schema().is_header() {
        return usize::from(stamp_header(message));
    }
    let header_fields: Vec<String> = message
        .fields()
        .filter(|(field, _)| {
            !field.field_type.is_array()
                && field.field_type.element == ElementType::Message(HEADER_TYPE.to_string())
        })
        .map(|(field, _)| field.name.clone())
        .collect();
    let mut stamped = 0;
    for name in header_fields {
        if let Ok(header) = message.get_message_mut(&name) {
            stamped += usize::from(stamp_header(header));
        }
    }
    stamped
}

/// Set `seq` on a header. Headers without a scalar `uint32 seq` are left
/// alone and do not consume a sequence number.
fn stamp_header(header: &mut Message) -> bool {
    let has_seq = header.schema().field(HEADER_SEQ_FIELD).is_some_and(|field| {
        !field.is_constant()
            && !field.field_type.is_array()
            && field.field_type.element == ElementType::Primitive(PrimitiveKind::UInt32)
    });
    if !has_seq {
        log::debug!(
            "[MessageFactory] {} has no `uint32 {}`, not stamped",
            header.type_name(),
            HEADER_SEQ_FIELD
        );
        return false;
    }
    header.set(HEADER_SEQ_FIELD, next_sequence_number()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MapDefinitionProvider;
    use crate::Error;
    use std::collections::HashSet;

    fn factory() -> MessageFactory {
        let provider = MapDefinitionProvider::new()
            .with("std_msgs/String", "string data")
            .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
            .with("sensor_msgs/Temperature", "Header header\nfloat64 temperature\nfloat64 variance")
            .with("roscpp_tutorials/TwoInts", "int64 a\nint64 b\n---\nint64 sum");
        MessageFactory::new(Arc::new(provider))
    }

    fn header_seq(message: &Message) -> u32 {
        if message.schema().is_header() {
            return message.get::<u32>(HEADER_SEQ_FIELD).unwrap();
        }
        message
            .get_message("header")
            .unwrap()
            .get::<u32>(HEADER_SEQ_FIELD)
            .unwrap()
    }

    #[test]
    fn test_create_message() {
        let f = factory();
        let msg = f.create_message("std_msgs/String").unwrap();
        assert_eq!(msg.type_name(), "std_msgs/String");
        assert_eq!(msg.get::<String>("data").unwrap(), "");
        assert!(matches!(
            f.create_message("std_msgs/Missing"),
            Err(SchemaError::UnknownType(_))
        ));
    }

    #[test]
    fn test_header_sequence_increases() {
        let f = factory();
        let a = header_seq(&f.create_message("std_msgs/Header").unwrap());
        let b = header_seq(&f.create_message("sensor_msgs/Temperature").unwrap());
        assert!(a >= 1);
        assert!(b > a);
    }

    #[test]
    fn test_header_without_seq_is_not_stamped() {
        let provider = MapDefinitionProvider::new()
            .with("std_msgs/Header", "time stamp\nstring frame_id")
            .with("sensor_msgs/Temperature", "Header header\nfloat64 temperature");
        let f = MessageFactory::new(Arc::new(provider));

        let mut msg = f.create_message("sensor_msgs/Temperature").unwrap();
        assert!(msg.get_message("header").unwrap().get_value("seq").is_err());
        assert_eq!(assign_sequence(&mut msg), 0);

        let mut header = f.create_message("std_msgs/Header").unwrap();
        assert_eq!(assign_sequence(&mut header), 0);

        let mut stamped = factory().create_message("sensor_msgs/Temperature").unwrap();
        assert_eq!(assign_sequence(&mut stamped), 1);
    }

    #[test]
    fn test_header_sequence_concurrent() {
        let f = factory();
        let per_thread = 200;
        let threads = 8;
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let f = f.clone();
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| header_seq(&f.create_message("sensor_msgs/Temperature").unwrap()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let seqs = handle.join().unwrap();
            // Each producer observes strictly increasing values.
            assert!(seqs.windows(2).all(|w| w[0] < w[1]));
            for seq in seqs {
                assert!(seen.insert(seq), "duplicate sequence {}", seq);
            }
        }
        assert_eq!(seen.len(), threads * per_thread);
    }

    #[test]
    fn test_deserialize_message() {
        let f = factory();
        let msg = f
            .deserialize_message("std_msgs/String", b"\x05\x00\x00\x00hello")
            .unwrap();
        assert_eq!(msg.get::<String>("data").unwrap(), "hello");

        let err = f.deserialize_message("std_msgs/String", b"\x05\x00\x00\x00hel").unwrap_err();
        assert!(matches!(err, Error::Wire(_)));
        let err = f.deserialize_message("nope/Nope", b"").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::UnknownType(_))));
    }

    #[test]
    fn test_create_service() {
        let f = factory();
        let (mut request, response) = f.create_service("roscpp_tutorials/TwoInts").unwrap();
        assert_eq!(request.type_name(), "roscpp_tutorials/TwoIntsRequest");
        assert_eq!(response.type_name(), "roscpp_tutorials/TwoIntsResponse");
        request.set("a", 1i64).unwrap();
        request.set("b", 2i64).unwrap();
        assert_eq!(request.to_bytes().unwrap().len(), 16);
        assert!(response.get::<i64>("a").is_err());
        assert_eq!(response.get::<i64>("sum").unwrap(), 0);

        assert!(f.create_service("std_msgs/String").is_err());
    }

    crate::message_interface! {
        struct StringMsg("std_msgs/String") {
            data, set_data: String => "string";
        }
    }

    #[test]
    fn test_create_interface() {
        let f = factory();
        let mut msg: StringMsg = f.create_interface().unwrap();
        msg.set_data("typed".to_string()).unwrap();
        let bytes = msg.to_bytes().unwrap();

        let back: StringMsg = f.deserialize_interface(&bytes).unwrap();
        assert_eq!(back.data().unwrap(), "typed");
        assert!(f.registry().is_registered::<StringMsg>());
    }
}
