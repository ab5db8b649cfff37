// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Shared-buffer byte primitives used throughout the wire stack.

use bytes::Bytes as InnerBytes;

/// An owned, cheaply-cloneable byte buffer.
///
/// Backed by `bytes::Bytes`: cloning is a refcount bump, not a copy, which
/// matters for frame bodies handed between a connection's read loop and
/// whatever consumes parsed messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytes(InnerBytes);

impl Bytes {
    /// Wrap an owned `Vec<u8>`.
    pub fn from_vec(v: Vec<u8>) -> Self {
        Self(InnerBytes::from(v))
    }

    /// Copy a borrowed slice into an owned buffer.
    pub fn copy_from_slice(s: &[u8]) -> Self {
        Self(InnerBytes::copy_from_slice(s))
    }

    /// Borrow as a plain slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// A read-only view into a byte buffer, used by streaming parsers that must
/// never copy the bytes they haven't consumed yet.
///
/// `BytesView` never owns data; it borrows a window `[..]` of a caller-held
/// buffer and only ever shrinks as bytes are consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BytesView<'a> {
    data: &'a [u8],
}

impl<'a> BytesView<'a> {
    /// Wrap a borrowed slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Remaining bytes.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Remaining length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if there are no bytes left.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split off the first `n` bytes, returning `(head, rest)`.
    ///
    /// Returns `None` if fewer than `n` bytes remain (the caller should
    /// treat this as "incomplete input", never as an error).
    pub fn split_at(&self, n: usize) -> Option<(&'a [u8], BytesView<'a>)> {
        if self.data.len() < n {
            return None;
        }
        let (head, tail) = self.data.split_at(n);
        Some((head, BytesView::new(tail)))
    }

    /// Advance the view by `n` bytes without returning the consumed slice.
    pub fn advance(&self, n: usize) -> Option<BytesView<'a>> {
        self.split_at(n).map(|(_, rest)| rest)
    }
}

impl<'a> From<&'a [u8]> for BytesView<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}
