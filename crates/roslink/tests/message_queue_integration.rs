// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability over pedantic
#![allow(clippy::items_after_statements)] // Test helpers

//! End-to-end publisher/subscriber pipeline over loopback TCP.

use roslink::schema::MapDefinitionProvider;
use roslink::transport::handshake::{LATCHING, MD5SUM};
use roslink::transport::{publisher_accept, subscriber_connect, tcp::bind_listener, MemoryChannel};
use roslink::wire::{DynamicDeserializer, DynamicSerializer};
use roslink::{
    ConnectionHeader, Error, HandshakeError, IncomingMessageQueue, Message, MessageFactory,
    OutgoingMessageQueue, TransportConfig,
};
use std::collections::HashSet;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn factory() -> MessageFactory {
    let provider = MapDefinitionProvider::new()
        .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
        .with("std_msgs/String", "string data")
        .with("std_msgs/Int32", "int32 data")
        .with("geometry_msgs/Point", "float64 x\nfloat64 y\nfloat64 z")
        .with("geometry_msgs/PointStamped", "Header header\nPoint point");
    MessageFactory::new(Arc::new(provider))
}

fn listener() -> (TcpListener, SocketAddr) {
    let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn string_msg(f: &MessageFactory, text: &str) -> Message {
    let mut msg = f.create_message("std_msgs/String").unwrap();
    msg.set("data", text).unwrap();
    msg
}

#[test]
fn test_tcp_publish_subscribe() {
    let f = factory();
    let schema = f.resolver().resolve("std_msgs/String").unwrap();
    let config = TransportConfig::default().with_caller_id("/talker");

    let outgoing = Arc::new(OutgoingMessageQueue::with_config(DynamicSerializer, &config));
    outgoing.start().unwrap();

    let (listener, addr) = listener();
    let pub_header = ConnectionHeader::for_topic("/talker", "/chatter", &schema).unwrap();
    let accept = {
        let outgoing = outgoing.clone();
        let config = config.clone();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            publisher_accept(stream, &outgoing, &pub_header, &config).unwrap()
        })
    };

    let incoming = Arc::new(IncomingMessageQueue::new(DynamicDeserializer::new(schema.clone())));
    let sub_header = ConnectionHeader::for_topic("/listener", "/chatter", &schema).unwrap();
    let mut subscription =
        subscriber_connect(addr, &sub_header, incoming.clone(), &TransportConfig::default()).unwrap();
    let seen_by_publisher = accept.join().unwrap();

    assert_eq!(seen_by_publisher.get("callerid"), Some("/listener"));
    assert_eq!(subscription.peer_header().get(LATCHING), Some("0"));
    assert_eq!(
        subscription.peer_header().get(MD5SUM),
        Some("992ce8a1687cec8c8bd883ec73ca41d1")
    );
    assert_eq!(outgoing.number_of_channels(), 1);

    for text in ["one", "two", "three"] {
        outgoing.put(&string_msg(&f, text)).unwrap();
    }
    let received: Vec<String> = (0..3)
        .map(|_| incoming.take_timeout(TIMEOUT).expect("message"))
        .map(|m| m.get::<String>("data").unwrap())
        .collect();
    assert_eq!(received, ["one", "two", "three"]);

    outgoing.shutdown();
    subscription.close();
    assert!(subscription.is_finished());
    assert_eq!(subscription.malformed_count(), 0);
}

#[test]
fn test_tcp_md5_mismatch_rejected() {
    let f = factory();
    let published = f.resolver().resolve("std_msgs/String").unwrap();
    let expected = f.resolver().resolve("std_msgs/Int32").unwrap();
    let config = TransportConfig::default();

    let outgoing = Arc::new(OutgoingMessageQueue::with_config(DynamicSerializer, &config));
    outgoing.start().unwrap();

    let (listener, addr) = listener();
    let pub_header = ConnectionHeader::for_topic("/talker", "/chatter", &published).unwrap();
    let accept = {
        let outgoing = outgoing.clone();
        let config = config.clone();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            publisher_accept(stream, &outgoing, &pub_header, &config)
        })
    };

    let incoming = Arc::new(IncomingMessageQueue::new(DynamicDeserializer::new(expected.clone())));
    let sub_header = ConnectionHeader::for_topic("/listener", "/chatter", &expected).unwrap();
    let sub_err = subscriber_connect(addr, &sub_header, incoming, &config).unwrap_err();
    let pub_err = accept.join().unwrap().unwrap_err();

    assert!(
        matches!(pub_err, Error::Handshake(HandshakeError::IncompatibleType { .. })),
        "{:?}",
        pub_err
    );
    assert!(
        matches!(sub_err, Error::Handshake(HandshakeError::Rejected(_))),
        "{:?}",
        sub_err
    );
    assert_eq!(outgoing.number_of_channels(), 0);
}

#[test]
fn test_wildcard_subscriber_accepted() {
    let f = factory();
    let schema = f.resolver().resolve("std_msgs/String").unwrap();
    let config = TransportConfig::default();

    let outgoing = Arc::new(OutgoingMessageQueue::with_config(DynamicSerializer, &config));
    outgoing.start().unwrap();

    let (listener, addr) = listener();
    let pub_header = ConnectionHeader::for_topic("/talker", "/chatter", &schema).unwrap();
    let accept = {
        let outgoing = outgoing.clone();
        let config = config.clone();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            publisher_accept(stream, &outgoing, &pub_header, &config).unwrap()
        })
    };

    let incoming = Arc::new(IncomingMessageQueue::new(DynamicDeserializer::new(schema.clone())));
    let sub_header = ConnectionHeader::new()
        .with("callerid", "/rostopic")
        .with("topic", "/chatter")
        .with("type", "*")
        .with(MD5SUM, "*");
    let _subscription = subscriber_connect(addr, &sub_header, incoming.clone(), &config).unwrap();
    accept.join().unwrap();

    outgoing.put(&string_msg(&f, "any")).unwrap();
    let msg = incoming.take_timeout(TIMEOUT).expect("message");
    assert_eq!(msg.get::<String>("data").unwrap(), "any");
}

#[test]
fn test_latched_message_replayed_to_late_subscriber() {
    let f = factory();
    let config = TransportConfig::default().with_queue_capacity(1).with_latch(true);
    let queue = OutgoingMessageQueue::with_config(DynamicSerializer, &config);
    assert!(queue.is_latch_mode());
    queue.start().unwrap();

    let early = MemoryChannel::new();
    assert!(queue.add_channel(early.clone()));
    queue.put(&string_msg(&f, "A")).unwrap();
    queue.put(&string_msg(&f, "B")).unwrap();

    // The early channel may or may not see A, but always ends with B.
    let deadline = Instant::now() + TIMEOUT;
    while early.received().last().map(Vec::as_slice) != Some(&b"\x01\x00\x00\x00B"[..]) {
        assert!(Instant::now() < deadline, "early channel never saw B");
        thread::sleep(Duration::from_millis(2));
    }

    let late = MemoryChannel::new();
    assert!(queue.add_channel(late.clone()));
    assert_eq!(late.wait_for(1, TIMEOUT), vec![b"\x01\x00\x00\x00B".to_vec()]);

    queue.shutdown();
    assert!(!queue.add_channel(MemoryChannel::new()));
}

#[test]
fn test_concurrent_header_sequence_numbers() {
    let f = Arc::new(factory());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let f = f.clone();
            thread::spawn(move || {
                (0..100)
                    .map(|_| {
                        let msg = f.create_message("geometry_msgs/PointStamped").unwrap();
                        msg.get_message("header").unwrap().get::<u32>("seq").unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let seqs = handle.join().unwrap();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        all.extend(seqs);
    }
    assert_eq!(all.len(), 400);
    assert!(!all.contains(&0));
}
