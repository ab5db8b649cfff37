// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Luhn mod-32 check digit, used to validate base32-encoded device ids.

use crate::core::base32;
use crate::error::{Result, SyncError};

const N: i32 = 32;

fn code_point(c: u8) -> Result<i32> {
    match c {
        b'A'..=b'Z' => Ok((c - b'A') as i32),
        b'2'..=b'7' => Ok((c - b'2') as i32 + 26),
        _ => Err(SyncError::Base32DecodingFailure),
    }
}

fn calc(input: &str) -> Result<u8> {
    let mut factor = 1;
    let mut sum = 0i32;

    for &c in input.as_bytes() {
        let cp = code_point(c)?;
        let mut addend = factor * cp;
        factor = if factor == 2 { 1 } else { 2 };
        addend = (addend / N) + (addend % N);
        sum += addend;
    }

    let remainder = sum.rem_euclid(N);
    let check_index = (N - remainder).rem_euclid(N) as usize;
    Ok(base32::ALPHABET_BYTE[check_index])
}

/// Compute the Luhn mod-32 check character for `input`.
pub fn calculate(input: &str) -> u8 {
    calc(input).expect("calculate is only ever called on valid base32 text")
}

/// True if the last character of `input` is the correct check digit for the
/// rest of the string. Empty input is rejected.
pub fn validate(input: &str) -> bool {
    if input.is_empty() {
        return false;
    }
    let (body, last) = input.split_at(input.len() - 1);
    match calc(body) {
        Ok(expected) => last.as_bytes()[0] == expected,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculate_fixtures() {
        assert_eq!(calculate("WG2IWWALPC2HZ") as char, 'H');
        assert_eq!(calculate("KHQNO2S5QSILR") as char, 'K');
    }

    #[test]
    fn validate_fixtures() {
        assert!(validate("KHQNO2S5QSILRK"));
        assert!(!validate("KHQNO2S5QSILR"));
    }

    #[test]
    fn rejects_empty() {
        assert!(!validate(""));
    }
}
