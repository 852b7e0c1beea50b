// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use roslink::schema::MapDefinitionProvider;
use roslink::{Message, MessageFactory};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let provider = MapDefinitionProvider::new()
        .with("std_msgs/Header", "uint32 seq\ntime stamp\nstring frame_id")
        .with(
            "fuzz_msgs/Mixed",
            "Header header\nint8 a\nfloat64 b\nstring name\nint16[] values\nfloat32[2] pair\nduration d",
        );
    let factory = MessageFactory::new(Arc::new(provider));
    let Ok(schema) = factory.resolver().resolve("fuzz_msgs/Mixed") else {
        return;
    };

    // Fuzz dynamic message decoder, then re-encode what it accepted
    if let Ok(msg) = Message::from_bytes(&schema, data) {
        let _ = msg.to_bytes();
    }
});
