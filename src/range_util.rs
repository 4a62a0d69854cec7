// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! Resolves an open-ended `(start, end)` key pair to the concrete
//! half-open byte range the underlying engine's range operations expect
//! (spec.md §4.1).

/// A concrete range to hand to the underlying engine, or `Empty` when
/// there is no live key to anchor an open-ended bound against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRange {
    Empty,
    Bounds { start: Vec<u8>, end_exclusive: Vec<u8> },
}

/// Increments the final byte of `key` by one, converting the inclusive
/// upper bound of `[start, end]` into the exclusive upper bound of
/// `[start, end')`.
///
/// Open question (spec.md §9): if the final byte is `0xFF` this wraps to
/// `0x00` without carrying into the preceding byte. That limitation is
/// preserved deliberately rather than guessed away — callers must not
/// pass end keys terminated in `0xFF`.
pub fn increment_last_byte(key: &[u8]) -> Vec<u8> {
    let mut out = key.to_vec();
    if let Some(last) = out.last_mut() {
        *last = last.wrapping_add(1);
    }
    out
}

/// Resolves `(raw_start, raw_end)` against the live key set. `first_key`
/// and `last_key` are closures the caller (the MVCC engine) supplies to
/// look up the current first/last live key, invoked only when the
/// corresponding bound is `None`.
pub fn resolve(
    raw_start: Option<&[u8]>,
    raw_end: Option<&[u8]>,
    first_key: impl FnOnce() -> Option<Vec<u8>>,
    last_key: impl FnOnce() -> Option<Vec<u8>>,
) -> ResolvedRange {
    let start = match raw_start {
        Some(s) => s.to_vec(),
        None => match first_key() {
            Some(k) => k,
            None => return ResolvedRange::Empty,
        },
    };
    let end = match raw_end {
        Some(e) => e.to_vec(),
        None => match last_key() {
            Some(k) => k,
            None => return ResolvedRange::Empty,
        },
    };
    ResolvedRange::Bounds { start, end_exclusive: increment_last_byte(&end) }
}
