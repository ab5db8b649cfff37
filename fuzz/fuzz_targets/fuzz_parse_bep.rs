// Copyright (c) 2026
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;
use syncspirit_rs::core::bytes::BytesView;
use syncspirit_rs::proto::parse_bep;

fuzz_target!(|data: &[u8]| {
    // Best-effort: the streaming parser must never panic on arbitrary
    // bytes, complete or truncated.
    let _ = parse_bep(BytesView::new(data), None);
});
