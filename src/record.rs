// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! The per-key MVCC metadata record (spec.md §3, §4.2).
//!
//! Wire layout, big-endian throughout so the format is portable across
//! implementations:
//!
//! ```text
//! create_rev: i64
//! mod_rev:    i64
//! version:    i64
//! value_len:  i32
//! value:      [u8; value_len]
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 8 + 8 + 8 + 4;

/// One live incarnation of a key. The store holds exactly one of these per
/// live key; there is no historical chain (spec.md §1 non-goals).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MVCCRecord {
    pub create_rev: i64,
    pub mod_rev: i64,
    pub version: i64,
    pub value: Bytes,
}

impl MVCCRecord {
    pub fn created_at(rev: i64, value: Bytes) -> Self {
        MVCCRecord { create_rev: rev, mod_rev: rev, version: 0, value }
    }

    /// Applies a put at `rev` to an existing record, per invariant 2.
    /// Caller must already have checked `self.mod_rev < rev`.
    pub fn modified_at(&self, rev: i64, value: Bytes) -> Self {
        MVCCRecord {
            create_rev: self.create_rev,
            mod_rev: rev,
            version: self.version + 1,
            value,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.value.len());
        buf.write_i64::<BigEndian>(self.create_rev).unwrap();
        buf.write_i64::<BigEndian>(self.mod_rev).unwrap();
        buf.write_i64::<BigEndian>(self.version).unwrap();
        buf.write_i32::<BigEndian>(self.value.len() as i32).unwrap();
        buf.extend_from_slice(&self.value);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Corrupt(format!(
                "record header truncated: have {} bytes, need {HEADER_LEN}",
                bytes.len()
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let create_rev = cursor.read_i64::<BigEndian>()?;
        let mod_rev = cursor.read_i64::<BigEndian>()?;
        let version = cursor.read_i64::<BigEndian>()?;
        let value_len = cursor.read_i32::<BigEndian>()?;
        if value_len < 0 {
            return Err(Error::Corrupt(format!("negative value_len {value_len}")));
        }
        let value_len = value_len as usize;
        let remaining = &bytes[HEADER_LEN..];
        if value_len > remaining.len() {
            return Err(Error::Corrupt(format!(
                "value_len {value_len} exceeds remaining {} bytes",
                remaining.len()
            )));
        }
        Ok(MVCCRecord {
            create_rev,
            mod_rev,
            version,
            value: Bytes::copy_from_slice(&remaining[..value_len]),
        })
    }
}
