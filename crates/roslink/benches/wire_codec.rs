// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire Codec Benchmark
//!
//! Measures dynamic message encode/decode cost for:
//! - Variable-length primitive arrays (64B to 64KB)
//! - A nested stamped message with a header
//!
//! No network I/O; only the codec and schema lookups.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use roslink::schema::MapDefinitionProvider;
use roslink::{Message, MessageFactory};
use std::hint::black_box as bb;
use std::sync::Arc;

fn factory() -> MessageFactory {
    let provider = MapDefinitionProvider::new()
        .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
        .with("bench_msgs/Blob", "Header header\nuint8[] data")
        .with("geometry_msgs/Point", "float64 x\nfloat64 y\nfloat64 z")
        .with(
            "geometry_msgs/Quaternion",
            "float64 x\nfloat64 y\nfloat64 z\nfloat64 w",
        )
        .with("geometry_msgs/Pose", "Point position\nQuaternion orientation")
        .with("geometry_msgs/PoseStamped", "Header header\nPose pose");
    MessageFactory::new(Arc::new(provider))
}

fn blob(f: &MessageFactory, size: usize) -> Message {
    let mut msg = f.create_message("bench_msgs/Blob").expect("blob");
    msg.set("data", vec![0xABu8; size]).expect("set data");
    msg
}

/// Encode and decode cost by payload size
fn bench_blob_sizes(c: &mut Criterion) {
    let f = factory();
    let mut group = c.benchmark_group("wire_blob");

    for size in [64, 1024, 4096, 65536] {
        let msg = blob(&f, size);
        let bytes = msg.to_bytes().expect("encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &msg, |b, msg| {
            b.iter(|| bb(msg.to_bytes().expect("encode")));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| bb(Message::from_bytes(msg.schema(), bb(bytes)).expect("decode")));
        });
    }

    group.finish();
}

/// Nested message round-trip through the factory
fn bench_pose_stamped(c: &mut Criterion) {
    let f = factory();
    let mut msg = f.create_message("geometry_msgs/PoseStamped").expect("pose");
    {
        let pose = msg.get_message_mut("pose").expect("pose field");
        let position = pose.get_message_mut("position").expect("position");
        position.set("x", 1.5f64).expect("x");
        position.set("y", -2.0f64).expect("y");
    }
    let bytes = msg.to_bytes().expect("encode");

    c.bench_function("wire_pose_stamped_encode", |b| {
        b.iter(|| bb(msg.to_bytes().expect("encode")));
    });
    c.bench_function("wire_pose_stamped_factory_decode", |b| {
        b.iter(|| {
            bb(f.deserialize_message("geometry_msgs/PoseStamped", bb(&bytes))
                .expect("decode"))
        });
    });
}

criterion_group!(benches, bench_blob_sizes, bench_pose_stamped);
criterion_main!(benches);
