// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! Store construction parameters (spec.md §6).

use std::path::PathBuf;

use crate::codec::Codec;

/// Parameters the caller supplies to `Store::init`. Generic over the
/// application's key/value types and the codecs that turn them into
/// bytes, so one `Store` type serves any `K`/`V` pair a caller brings.
pub struct StoreSpec<K, V, KC, VC>
where
    KC: Codec<K>,
    VC: Codec<V>,
{
    pub name: String,
    pub key_coder: KC,
    pub val_coder: VC,
    /// Directory the embedded engine persists to. Created (including
    /// parents) on `Store::init` if it does not already exist.
    pub local_state_store_dir: PathBuf,
    /// Whether watch-style change notification is enabled. Carried in
    /// the spec's external interface; this crate has no watch
    /// subsystem, so `Store::init` rejects `stream: true` with
    /// `Error::InvalidState`.
    pub stream: bool,
    _marker: std::marker::PhantomData<(K, V)>,
}

impl<K, V, KC, VC> StoreSpec<K, V, KC, VC>
where
    KC: Codec<K>,
    VC: Codec<V>,
{
    pub fn new(name: impl Into<String>, key_coder: KC, val_coder: VC, local_state_store_dir: impl Into<PathBuf>) -> Self {
        StoreSpec {
            name: name.into(),
            key_coder,
            val_coder,
            local_state_store_dir: local_state_store_dir.into(),
            stream: false,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::BytesCodec;

    #[test]
    fn builder_defaults_stream_off() {
        let spec = StoreSpec::new("demo", BytesCodec, BytesCodec, "/tmp/demo");
        assert!(!spec.stream);
        assert_eq!(spec.name, "demo");
    }
}
