// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! Discriminated result objects returned to callers (spec.md §4.4).
//!
//! Results are handed out by a `ResultFactory` and must be explicitly
//! `recycle()`-d by the caller to return their internal buffers. Per the
//! design note in spec.md §9 ("In systems languages this maps to explicit
//! ownership transfer on return"), `recycle()` consumes the result by
//! value: once recycled, the type system makes it impossible for the
//! engine (or anyone else) to touch it again.

use crate::error::Code;

/// A decoded key/value pair with its MVCC metadata, as returned to
/// callers (not the wire-level `MVCCRecord`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
    pub create_revision: i64,
    pub mod_revision: i64,
    pub version: i64,
}

#[derive(Debug)]
pub struct PutResult<K, V> {
    pub code: Code,
    pub revision: i64,
    pub prev_kv: Option<KeyValue<K, V>>,
}

impl<K, V> PutResult<K, V> {
    /// Returns internal buffers to the pool. No-op beyond dropping `self`
    /// today (the reference engine has no buffer pool to return to) but
    /// kept as an explicit call so callers honor the discipline the spec
    /// requires regardless of what a given `Engine` implementation pools.
    pub fn recycle(self) {}
}

#[derive(Debug)]
pub struct DeleteResult<K, V> {
    pub code: Code,
    pub revision: i64,
    pub prev_kvs: Vec<KeyValue<K, V>>,
    pub num_deleted: i64,
}

impl<K, V> DeleteResult<K, V> {
    pub fn recycle(self) {}
}

#[derive(Debug)]
pub struct RangeResult<K, V> {
    pub code: Code,
    pub revision: i64,
    pub kvs: Vec<KeyValue<K, V>>,
    pub count: usize,
    pub has_more: bool,
}

impl<K, V> RangeResult<K, V> {
    pub fn recycle(self) {}
}

#[derive(Debug)]
pub enum OpResult<K, V> {
    Put(PutResult<K, V>),
    Delete(DeleteResult<K, V>),
    Range(RangeResult<K, V>),
}

impl<K, V> OpResult<K, V> {
    pub fn recycle(self) {
        match self {
            OpResult::Put(r) => r.recycle(),
            OpResult::Delete(r) => r.recycle(),
            OpResult::Range(r) => r.recycle(),
        }
    }
}

#[derive(Debug)]
pub struct TxnResult<K, V> {
    pub code: Code,
    pub revision: i64,
    pub success: bool,
    pub results: Vec<OpResult<K, V>>,
}

impl<K, V> TxnResult<K, V> {
    pub fn recycle(self) {
        for r in self.results {
            r.recycle();
        }
    }
}

/// Constructs results. A thin factory today (the teacher pools results
/// from a real object pool; here each `new_*` just allocates), kept as
/// the single construction point so a pooled implementation can be
/// dropped in behind it without touching call sites.
#[derive(Copy, Clone, Default)]
pub struct ResultFactory;

impl ResultFactory {
    pub fn new() -> Self {
        ResultFactory
    }

    pub fn put<K, V>(&self, code: Code, revision: i64, prev_kv: Option<KeyValue<K, V>>) -> PutResult<K, V> {
        PutResult { code, revision, prev_kv }
    }

    pub fn delete<K, V>(
        &self,
        code: Code,
        revision: i64,
        prev_kvs: Vec<KeyValue<K, V>>,
        num_deleted: i64,
    ) -> DeleteResult<K, V> {
        DeleteResult { code, revision, prev_kvs, num_deleted }
    }

    pub fn range<K, V>(
        &self,
        code: Code,
        revision: i64,
        kvs: Vec<KeyValue<K, V>>,
        has_more: bool,
    ) -> RangeResult<K, V> {
        let count = kvs.len();
        RangeResult { code, revision, kvs, count, has_more }
    }

    pub fn txn<K, V>(&self, code: Code, revision: i64, success: bool, results: Vec<OpResult<K, V>>) -> TxnResult<K, V> {
        TxnResult { code, revision, success, results }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_result_count_matches_kvs_len() {
        let f = ResultFactory::new();
        let kvs = vec![
            KeyValue { key: b"a".to_vec(), value: b"1".to_vec(), create_revision: 1, mod_revision: 1, version: 0 },
            KeyValue { key: b"b".to_vec(), value: b"2".to_vec(), create_revision: 1, mod_revision: 1, version: 0 },
        ];
        let r = f.range(Code::Ok, 1, kvs, false);
        assert_eq!(r.count, 2);
        assert!(!r.has_more);
        r.recycle();
    }

    #[test]
    fn put_result_prev_kv_absent_when_not_requested() {
        let f = ResultFactory::new();
        let r: PutResult<Vec<u8>, Vec<u8>> = f.put(Code::Ok, 5, None);
        assert!(r.prev_kv.is_none());
    }
}
