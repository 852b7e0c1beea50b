// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use roslink::schema::{parse_definition, split_service};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Fuzz .msg and .srv definition parsers
    let _ = parse_definition("fuzz_msgs/Input", text);
    let _ = split_service("fuzz_msgs/Input", text);
});
