// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! Value-typed operation descriptors and the fluent factory that builds
//! them (spec.md §4.3). Descriptors are immutable once `build()` returns;
//! the engine dispatches on the `Op` variant by pattern match.

use crate::error::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompareTarget {
    Mod,
    Create,
    Version,
    Value,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompareResult {
    Less,
    Equal,
    Greater,
    NotEqual,
}

#[derive(Clone, Debug)]
pub struct PutOp<K, V> {
    pub key: K,
    pub value: V,
    pub revision: i64,
    pub prev_kv: bool,
}

#[derive(Clone, Debug)]
pub struct DeleteOp<K> {
    pub key: Option<K>,
    pub end_key: Option<K>,
    pub is_range: bool,
    pub revision: i64,
    pub prev_kv: bool,
}

/// "No constraint" sentinel for `RangeOp`'s min-revision filters.
pub const NO_MIN_REV: i64 = 0;
/// "No constraint" sentinel for `RangeOp`'s max-revision filters.
pub const NO_MAX_REV: i64 = i64::MAX;

#[derive(Clone, Debug)]
pub struct RangeOp<K> {
    pub key: Option<K>,
    pub end_key: Option<K>,
    pub is_range: bool,
    pub limit: usize,
    pub revision: i64,
    pub min_mod_rev: i64,
    pub max_mod_rev: i64,
    pub min_create_rev: i64,
    pub max_create_rev: i64,
}

#[derive(Clone, Debug)]
pub struct CompareOp<K, V> {
    pub key: K,
    pub target: CompareTarget,
    pub result: CompareResult,
    pub revision: Option<i64>,
    pub value: Option<V>,
}

#[derive(Clone, Debug)]
pub struct TxnOp<K, V> {
    pub revision: i64,
    pub compares: Vec<CompareOp<K, V>>,
    pub success_ops: Vec<Op<K, V>>,
    pub failure_ops: Vec<Op<K, V>>,
}

#[derive(Clone, Debug)]
pub enum Op<K, V> {
    Put(PutOp<K, V>),
    Delete(DeleteOp<K>),
    Range(RangeOp<K>),
    Txn(TxnOp<K, V>),
}

/// Zero-sized entry point for the builders below. `OpFactory::new().put()`
/// etc. mirrors the "factory yields builders" language of spec.md §4.3.
#[derive(Copy, Clone, Default)]
pub struct OpFactory;

impl OpFactory {
    pub fn new() -> Self {
        OpFactory
    }

    pub fn put<K, V>(&self) -> PutOpBuilder<K, V> {
        PutOpBuilder { key: None, value: None, revision: None, prev_kv: false }
    }

    pub fn delete<K>(&self) -> DeleteOpBuilder<K> {
        DeleteOpBuilder { key: None, end_key: None, is_range: false, revision: None, prev_kv: false }
    }

    pub fn range<K>(&self) -> RangeOpBuilder<K> {
        RangeOpBuilder {
            key: None,
            end_key: None,
            is_range: false,
            limit: 0,
            revision: 0,
            min_mod_rev: NO_MIN_REV,
            max_mod_rev: NO_MAX_REV,
            min_create_rev: NO_MIN_REV,
            max_create_rev: NO_MAX_REV,
        }
    }

    pub fn compare<K, V>(&self) -> CompareOpBuilder<K, V> {
        CompareOpBuilder { key: None, target: None, result: None, revision: None, value: None }
    }

    pub fn txn<K, V>(&self) -> TxnOpBuilder<K, V> {
        TxnOpBuilder { revision: None, compares: Vec::new(), success_ops: Vec::new(), failure_ops: Vec::new() }
    }
}

pub struct PutOpBuilder<K, V> {
    key: Option<K>,
    value: Option<V>,
    revision: Option<i64>,
    prev_kv: bool,
}

impl<K, V> PutOpBuilder<K, V> {
    pub fn key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn prev_kv(mut self, prev_kv: bool) -> Self {
        self.prev_kv = prev_kv;
        self
    }

    pub fn build(self) -> Result<PutOp<K, V>, Error> {
        Ok(PutOp {
            key: self.key.ok_or_else(|| Error::Internal("PutOp requires a key".into()))?,
            value: self.value.ok_or_else(|| Error::Internal("PutOp requires a value".into()))?,
            revision: self.revision.ok_or_else(|| Error::Internal("PutOp requires a revision".into()))?,
            prev_kv: self.prev_kv,
        })
    }
}

pub struct DeleteOpBuilder<K> {
    key: Option<K>,
    end_key: Option<K>,
    is_range: bool,
    revision: Option<i64>,
    prev_kv: bool,
}

impl<K> DeleteOpBuilder<K> {
    pub fn key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn end_key(mut self, end_key: K) -> Self {
        self.end_key = Some(end_key);
        self.is_range = true;
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn prev_kv(mut self, prev_kv: bool) -> Self {
        self.prev_kv = prev_kv;
        self
    }

    pub fn build(self) -> Result<DeleteOp<K>, Error> {
        Ok(DeleteOp {
            key: self.key,
            end_key: self.end_key,
            is_range: self.is_range,
            revision: self.revision.ok_or_else(|| Error::Internal("DeleteOp requires a revision".into()))?,
            prev_kv: self.prev_kv,
        })
    }
}

pub struct RangeOpBuilder<K> {
    key: Option<K>,
    end_key: Option<K>,
    is_range: bool,
    limit: usize,
    revision: i64,
    min_mod_rev: i64,
    max_mod_rev: i64,
    min_create_rev: i64,
    max_create_rev: i64,
}

impl<K> RangeOpBuilder<K> {
    pub fn key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn nullable_key(mut self, key: Option<K>) -> Self {
        self.key = key;
        self
    }

    pub fn end_key(mut self, end_key: K) -> Self {
        self.end_key = Some(end_key);
        self.is_range = true;
        self
    }

    pub fn nullable_end_key(mut self, end_key: Option<K>) -> Self {
        if end_key.is_some() {
            self.is_range = true;
        }
        self.end_key = end_key;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    pub fn min_mod_rev(mut self, v: i64) -> Self {
        self.min_mod_rev = v;
        self
    }

    pub fn max_mod_rev(mut self, v: i64) -> Self {
        self.max_mod_rev = v;
        self
    }

    pub fn min_create_rev(mut self, v: i64) -> Self {
        self.min_create_rev = v;
        self
    }

    pub fn max_create_rev(mut self, v: i64) -> Self {
        self.max_create_rev = v;
        self
    }

    pub fn build(self) -> Result<RangeOp<K>, Error> {
        Ok(RangeOp {
            key: self.key,
            end_key: self.end_key,
            is_range: self.is_range,
            limit: self.limit,
            revision: self.revision,
            min_mod_rev: self.min_mod_rev,
            max_mod_rev: self.max_mod_rev,
            min_create_rev: self.min_create_rev,
            max_create_rev: self.max_create_rev,
        })
    }
}

pub struct CompareOpBuilder<K, V> {
    key: Option<K>,
    target: Option<CompareTarget>,
    result: Option<CompareResult>,
    revision: Option<i64>,
    value: Option<V>,
}

impl<K, V> CompareOpBuilder<K, V> {
    pub fn key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn target(mut self, target: CompareTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn result(mut self, result: CompareResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    pub fn build(self) -> Result<CompareOp<K, V>, Error> {
        Ok(CompareOp {
            key: self.key.ok_or_else(|| Error::Internal("CompareOp requires a key".into()))?,
            target: self.target.ok_or_else(|| Error::Internal("CompareOp requires a target".into()))?,
            result: self.result.ok_or_else(|| Error::Internal("CompareOp requires a result".into()))?,
            revision: self.revision,
            value: self.value,
        })
    }
}

pub struct TxnOpBuilder<K, V> {
    revision: Option<i64>,
    compares: Vec<CompareOp<K, V>>,
    success_ops: Vec<Op<K, V>>,
    failure_ops: Vec<Op<K, V>>,
}

impl<K, V> TxnOpBuilder<K, V> {
    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn compare(mut self, compare: CompareOp<K, V>) -> Self {
        self.compares.push(compare);
        self
    }

    pub fn on_success(mut self, op: Op<K, V>) -> Self {
        self.success_ops.push(op);
        self
    }

    pub fn on_failure(mut self, op: Op<K, V>) -> Self {
        self.failure_ops.push(op);
        self
    }

    pub fn build(self) -> Result<TxnOp<K, V>, Error> {
        Ok(TxnOp {
            revision: self.revision.ok_or_else(|| Error::Internal("TxnOp requires a revision".into()))?,
            compares: self.compares,
            success_ops: self.success_ops,
            failure_ops: self.failure_ops,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_builder_requires_fields() {
        let f = OpFactory::new();
        assert!(f.put::<Vec<u8>, Vec<u8>>().build().is_err());
        let op = f.put::<Vec<u8>, Vec<u8>>().key(b"a".to_vec()).value(b"b".to_vec()).revision(1).build().unwrap();
        assert_eq!(op.key, b"a".to_vec());
        assert_eq!(op.revision, 1);
        assert!(!op.prev_kv);
    }

    #[test]
    fn range_builder_defaults_are_unconstrained() {
        let f = OpFactory::new();
        let op = f.range::<Vec<u8>>().build().unwrap();
        assert_eq!(op.min_mod_rev, NO_MIN_REV);
        assert_eq!(op.max_mod_rev, NO_MAX_REV);
        assert!(!op.is_range);
    }

    #[test]
    fn range_builder_end_key_sets_is_range() {
        let f = OpFactory::new();
        let op = f.range::<Vec<u8>>().key(b"a".to_vec()).end_key(b"z".to_vec()).build().unwrap();
        assert!(op.is_range);
    }

    #[test]
    fn txn_builder_collects_ops() {
        let f = OpFactory::new();
        let put = f.put::<Vec<u8>, Vec<u8>>().key(b"a".to_vec()).value(b"b".to_vec()).revision(2).build().unwrap();
        let cmp = f.compare::<Vec<u8>, Vec<u8>>().key(b"a".to_vec()).target(CompareTarget::Mod).result(CompareResult::Equal).revision(1).build().unwrap();
        let txn = f.txn::<Vec<u8>, Vec<u8>>().revision(2).compare(cmp).on_success(Op::Put(put)).build().unwrap();
        assert_eq!(txn.compares.len(), 1);
        assert_eq!(txn.success_ops.len(), 1);
        assert!(txn.failure_ops.is_empty());
    }
}
