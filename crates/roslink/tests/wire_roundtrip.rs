// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::float_cmp)] // Exact round-trip assertions
#![allow(clippy::unreadable_literal)] // Test constants

//! Wire-level behaviour of dynamic messages against known byte layouts.

use roslink::schema::MapDefinitionProvider;
use roslink::transport::IncomingMessageQueue;
use roslink::wire::{DynamicDeserializer, WireError, MAX_EMPTY_ELEMENTS, MAX_NESTING_DEPTH};
use roslink::{FieldValue, Message, MessageFactory};
use std::sync::Arc;
use std::thread;

fn factory() -> MessageFactory {
    let provider = MapDefinitionProvider::new()
        .with("std_msgs/String", "string data")
        .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
        .with("std_msgs/Empty", "")
        .with("test_msgs/Bag", "std_msgs/Empty[] items")
        .with("test_msgs/Node", "Node[] children")
        .with(
            "test_msgs/Mode",
            "uint8 IDLE=0\nuint8 ACTIVE=1\nuint8 mode\nstring label",
        )
        .with(
            "test_msgs/Sample",
            "Header header\n\
             int8 a\nuint16 b\nint32 c\nuint64 d\n\
             float32 e\nfloat64 f\nbool flag\n\
             string name\nint16[] values\nfloat64[3] fixed\n\
             duration elapsed",
        );
    MessageFactory::new(Arc::new(provider))
}

#[test]
fn test_string_layout() {
    let f = factory();
    let mut msg = f.create_message("std_msgs/String").unwrap();
    msg.set("data", "hello").unwrap();

    let bytes = msg.to_bytes().unwrap();
    assert_eq!(bytes, [5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o']);

    let back = f.deserialize_message("std_msgs/String", &bytes).unwrap();
    assert_eq!(back.get::<String>("data").unwrap(), "hello");
}

#[test]
fn test_constants_are_not_encoded() {
    let f = factory();
    let mut msg = f.create_message("test_msgs/Mode").unwrap();
    msg.set("mode", 1u8).unwrap();
    msg.set("label", "on").unwrap();

    // mode (1) + label (4 + 2)
    let bytes = msg.to_bytes().unwrap();
    assert_eq!(bytes, [1, 2, 0, 0, 0, b'o', b'n']);

    // Constants stay readable and never change.
    assert_eq!(msg.get::<u8>("ACTIVE").unwrap(), 1);
    assert!(msg.set("ACTIVE", 7u8).is_err());
    let back = f.deserialize_message("test_msgs/Mode", &bytes).unwrap();
    assert_eq!(back.get::<u8>("IDLE").unwrap(), 0);
    assert_eq!(back, msg);
}

#[test]
fn test_randomized_roundtrip() {
    let f = factory();
    let mut rng = fastrand::Rng::with_seed(0x5eed);

    for _ in 0..64 {
        let mut msg = f.create_message("test_msgs/Sample").unwrap();
        msg.set("a", rng.i8(..)).unwrap();
        msg.set("b", rng.u16(..)).unwrap();
        msg.set("c", rng.i32(..)).unwrap();
        msg.set("d", rng.u64(..)).unwrap();
        msg.set("e", rng.f32()).unwrap();
        msg.set("f", rng.f64() * 1e6).unwrap();
        msg.set("flag", rng.bool()).unwrap();

        let name: String = (0..rng.usize(0..24)).map(|_| rng.alphanumeric()).collect();
        msg.set("name", name.clone()).unwrap();

        let values: Vec<i16> = (0..rng.usize(0..16)).map(|_| rng.i16(..)).collect();
        msg.set("values", values.clone()).unwrap();
        msg.set("fixed", vec![rng.f64(), rng.f64(), rng.f64()]).unwrap();

        let bytes = msg.to_bytes().unwrap();
        assert_eq!(bytes.len(), msg.serialized_len().unwrap());

        let back = f.deserialize_message("test_msgs/Sample", &bytes).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.get::<String>("name").unwrap(), name);
        assert_eq!(back.get::<Vec<i16>>("values").unwrap(), values);
    }
}

#[test]
fn test_truncated_buffer_leaves_queue_unchanged() {
    let f = factory();
    let schema = f.resolver().resolve("std_msgs/String").unwrap();
    let queue = IncomingMessageQueue::new(DynamicDeserializer::new(schema.clone()));

    let mut msg = Message::new(&schema).unwrap();
    msg.set("data", "hello").unwrap();
    let bytes = msg.to_bytes().unwrap();

    queue.deliver(&bytes).unwrap();
    let err = queue.deliver(&bytes[..bytes.len() - 2]).unwrap_err();
    assert!(matches!(err, WireError::BufferUnderrun { .. }), "{:?}", err);

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.dropped_count(), 1);
    let taken = queue.try_take().unwrap();
    assert_eq!(taken.get::<String>("data").unwrap(), "hello");
    assert!(queue.try_take().is_none());
}

#[test]
fn test_nested_header_defaults() {
    let f = factory();
    let msg = f.create_message("test_msgs/Sample").unwrap();

    let header = msg.get_message("header").unwrap();
    assert!(header.get::<u32>("seq").unwrap() > 0);
    assert_eq!(header.get::<String>("frame_id").unwrap(), "");
    assert_eq!(
        msg.get_value("fixed").unwrap(),
        &FieldValue::Array(vec![FieldValue::Float64(0.0); 3])
    );
    assert_eq!(msg.get::<Vec<i16>>("values").unwrap(), Vec::<i16>::new());
}

/// `n` nodes each holding exactly one child, ending in a leaf.
fn node_chain(n: usize) -> Vec<u8> {
    let mut bytes = [1u8, 0, 0, 0].repeat(n);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}

#[test]
fn test_nesting_depth_limit() {
    let f = factory();
    let node = f.resolver().resolve("test_msgs/Node").unwrap();

    let deepest = Message::from_bytes(&node, &node_chain(MAX_NESTING_DEPTH)).unwrap();
    assert_eq!(deepest.to_bytes().unwrap(), node_chain(MAX_NESTING_DEPTH));

    let err = Message::from_bytes(&node, &node_chain(MAX_NESTING_DEPTH + 1)).unwrap_err();
    assert_eq!(
        err,
        WireError::NestingTooDeep {
            limit: MAX_NESTING_DEPTH
        }
    );
}

#[test]
fn test_deep_payload_rejected_on_small_stack() {
    let f = factory();
    let node = f.resolver().resolve("test_msgs/Node").unwrap();
    let queue = Arc::new(IncomingMessageQueue::new(DynamicDeserializer::new(node)));

    // Same stack size as a receiver thread.
    let worker = Arc::clone(&queue);
    let result = thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || worker.deliver(&[1u8, 0, 0, 0].repeat(10_000)))
        .unwrap()
        .join()
        .unwrap();

    assert!(matches!(result, Err(WireError::NestingTooDeep { .. })), "{:?}", result);
    assert!(queue.is_empty());
    assert_eq!(queue.dropped_count(), 1);
}

#[test]
fn test_empty_element_count_is_capped() {
    let f = factory();
    let bag = f.resolver().resolve("test_msgs/Bag").unwrap();

    let ok = Message::from_bytes(&bag, &3u32.to_le_bytes()).unwrap();
    assert_eq!(ok.get::<Vec<Message>>("items").unwrap().len(), 3);

    let count = MAX_EMPTY_ELEMENTS as u32 + 1;
    let err = Message::from_bytes(&bag, &count.to_le_bytes()).unwrap_err();
    assert!(
        matches!(err, WireError::TooManyElements { ref field, limit, .. }
            if field == "items" && limit == MAX_EMPTY_ELEMENTS),
        "{:?}",
        err
    );
    assert!(Message::from_bytes(&bag, &u32::MAX.to_le_bytes()).is_err());
}
