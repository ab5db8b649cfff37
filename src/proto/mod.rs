// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! The sync protocol (BEP): message definitions and the frame codec.

#![allow(missing_docs)]

/// Hand-authored stand-in for `prost-build`'s codegen output (see
/// `build.rs`): message and enum types for every BEP frame variant.
pub mod bep;
/// Framing, compression, and the streaming parser/serializer.
pub mod codec;

pub use codec::{make_hello, parse_bep, serialize, Compression, Frame, WrappedMessage, MAGIC};
