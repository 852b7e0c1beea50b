// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use roslink::ConnectionHeader;

fuzz_target!(|data: &[u8]| {
    // Fuzz TCPROS connection header parser
    if let Ok(header) = ConnectionHeader::decode(data) {
        let _ = header.encode();
    }
});
