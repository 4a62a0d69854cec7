// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! Pluggable byte codecs for the store's `K` and `V` type parameters.
//!
//! The engine manipulates encoded bytes exclusively (spec.md §9); callers
//! supply a `Codec<T>` when opening a store so the store never has to know
//! how application keys/values are represented.

use crate::error::{Error, Result};

pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Identity codec: `T = Vec<u8>`.
#[derive(Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string codec: `T = String`.
#[derive(Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_codec_round_trips() {
        let c = BytesCodec;
        let v = vec![1u8, 2, 3, 255, 0];
        assert_eq!(c.decode(&c.encode(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn string_codec_round_trips() {
        let c = StringCodec;
        let s = "hello-mvcc".to_string();
        assert_eq!(c.decode(&c.encode(&s).unwrap()).unwrap(), s);
    }

    #[test]
    fn string_codec_rejects_invalid_utf8() {
        let c = StringCodec;
        assert!(c.decode(&[0xff, 0xfe]).is_err());
    }
}
