// Copyright (c) 2026
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;
use syncspirit_rs::core::device_id::DeviceId;

fuzz_target!(|data: &[u8]| {
    // Best-effort: the string->DeviceId parser must never panic on
    // arbitrary input, valid UTF-8 or not.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = DeviceId::from_string(s);
    }
});
