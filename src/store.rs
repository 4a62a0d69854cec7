// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! The MVCC engine (spec.md §4.5): dispatches `put`/`delete`/`range`/`txn`
//! against a pluggable [`Engine`], enforcing the single live-record-per-key
//! invariant and the single store-wide writer lock (§5 — no snapshot
//! isolation, no suspension within a call).

use std::marker::PhantomData;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::codec::Codec;
use crate::config::StoreSpec;
use crate::engine::{Engine, EngineIterator, WriteBatch};
use crate::error::{Code, Error, Result};
use crate::iterator::RangeIterator;
use crate::ops::{CompareOp, CompareResult, CompareTarget, DeleteOp, Op, PutOp, RangeOp, TxnOp, NO_MAX_REV, NO_MIN_REV};
use crate::range_util::{self, ResolvedRange};
use crate::record::MVCCRecord;
use crate::result::{DeleteResult, KeyValue, OpResult, PutResult, RangeResult, ResultFactory, TxnResult};

enum State<E> {
    Open { engine: E, revision: i64 },
    Closed,
}

/// An MVCC store layered on engine `E`, over application types `K`/`V`
/// via codecs `KC`/`VC`. There is no `Uninitialized` value of this type:
/// a `Store` only exists once `init` has opened its engine, so the
/// "uninitialized" lifecycle state of spec.md §4.5 is represented by not
/// holding a `Store` at all rather than by a runtime flag.
pub struct Store<E, K, V, KC, VC>
where
    E: Engine,
    KC: Codec<K>,
    VC: Codec<V>,
{
    key_coder: KC,
    val_coder: VC,
    state: Mutex<State<E>>,
    _marker: PhantomData<(K, V)>,
}

impl<E, K, V, KC, VC> Store<E, K, V, KC, VC>
where
    E: Engine,
    K: Clone,
    V: Clone,
    KC: Codec<K>,
    VC: Codec<V>,
{
    /// Opens `spec.local_state_store_dir` through `E` and recovers the
    /// revision counter from the highest `mod_rev` already on disk, so a
    /// reopened store continues its revision sequence rather than
    /// restarting it at zero.
    pub fn init(spec: StoreSpec<K, V, KC, VC>) -> Result<Self> {
        if spec.stream {
            return Err(Error::InvalidState(format!(
                "store {:?}: watch-style streaming is not supported by this engine",
                spec.name
            )));
        }
        std::fs::create_dir_all(&spec.local_state_store_dir)?;
        let engine = E::open(&spec.local_state_store_dir)?;
        let revision = Self::recover_revision(&engine)?;
        log::info!("store {:?} opened at revision {revision}", spec.name);
        Ok(Store {
            key_coder: spec.key_coder,
            val_coder: spec.val_coder,
            state: Mutex::new(State::Open { engine, revision }),
            _marker: PhantomData,
        })
    }

    fn recover_revision(engine: &E) -> Result<i64> {
        let mut it = engine.new_iterator();
        it.seek_to_first();
        let mut max_rev = 0;
        while it.is_valid() {
            let record = MVCCRecord::decode(it.value())?;
            max_rev = max_rev.max(record.mod_rev);
            it.next();
        }
        Ok(max_rev)
    }

    /// The store's current revision: the highest revision any mutation
    /// has committed so far.
    pub fn current_revision(&self) -> Result<i64> {
        let mut guard = self.state.lock();
        let (_engine, revision) = Self::require_open(&mut guard)?;
        Ok(*revision)
    }

    /// Closes the underlying engine. Idempotent; further operations on a
    /// closed store fail with `Error::InvalidState`.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Closed) {
            State::Open { engine, .. } => engine.close(),
            State::Closed => Ok(()),
        }
    }

    fn require_open<'a>(state: &'a mut State<E>) -> Result<(&'a E, &'a mut i64)> {
        match state {
            State::Open { engine, revision } => Ok((engine, revision)),
            State::Closed => Err(Error::InvalidState("store is closed".into())),
        }
    }

    fn record_to_kv(&self, key: K, record: &MVCCRecord) -> Result<KeyValue<K, V>> {
        let value = self.val_coder.decode(&record.value)?;
        Ok(KeyValue {
            key,
            value,
            create_revision: record.create_rev,
            mod_revision: record.mod_rev,
            version: record.version,
        })
    }

    fn first_key(engine: &E) -> Option<Vec<u8>> {
        let mut it = engine.new_iterator();
        it.seek_to_first();
        if it.is_valid() {
            Some(it.key().to_vec())
        } else {
            None
        }
    }

    fn last_key(engine: &E) -> Option<Vec<u8>> {
        let mut it = engine.new_iterator();
        it.seek_to_last();
        if it.is_valid() {
            Some(it.key().to_vec())
        } else {
            None
        }
    }

    fn passes_filters(op: &RangeOp<K>, record: &MVCCRecord) -> bool {
        if op.min_mod_rev != NO_MIN_REV && record.mod_rev < op.min_mod_rev {
            return false;
        }
        if op.max_mod_rev != NO_MAX_REV && record.mod_rev > op.max_mod_rev {
            return false;
        }
        if op.min_create_rev != NO_MIN_REV && record.create_rev < op.min_create_rev {
            return false;
        }
        if op.max_create_rev != NO_MAX_REV && record.create_rev > op.max_create_rev {
            return false;
        }
        // No historical versions are retained (spec.md non-goals), so an
        // as-of `revision` cannot resurrect an older value; it can only
        // hide keys touched after it.
        if op.revision > 0 && record.mod_rev > op.revision {
            return false;
        }
        true
    }

    /// Stages `key`'s new record into `batch` at `op.revision` if it is
    /// newer than whatever is currently stored, rejecting with
    /// `Code::SmallerRevision` otherwise (invariant 2) without touching
    /// `batch`. Does not write `batch` and does not take the store lock
    /// itself; callers already hold the lock and own the batch's lifetime
    /// (see `put`, and `txn`'s op dispatch) so that a whole txn branch
    /// commits through a single `engine.write`.
    fn put_locked(&self, engine: &E, batch: &mut WriteBatch, key: &K, value: &V, revision: i64, want_prev_kv: bool) -> Result<PutResult<K, V>> {
        let key_bytes = self.key_coder.encode(key)?;
        let existing = engine.get(&key_bytes)?;
        let existing_record = existing.as_deref().map(MVCCRecord::decode).transpose()?;

        if let Some(rec) = &existing_record {
            if rec.mod_rev >= revision {
                return Ok(ResultFactory::new().put(Code::SmallerRevision, rec.mod_rev, None));
            }
        }

        let value_bytes = self.val_coder.encode(value)?;
        let new_record = match &existing_record {
            Some(rec) => rec.modified_at(revision, Bytes::from(value_bytes)),
            None => MVCCRecord::created_at(revision, Bytes::from(value_bytes)),
        };
        batch.put(key_bytes, new_record.encode());

        let prev_kv = if want_prev_kv {
            existing_record.map(|rec| self.record_to_kv(key.clone(), &rec)).transpose()?
        } else {
            None
        };
        Ok(ResultFactory::new().put(Code::Ok, revision, prev_kv))
    }

    pub fn put(&self, op: PutOp<K, V>) -> Result<PutResult<K, V>> {
        let mut guard = self.state.lock();
        let (engine, revision) = Self::require_open(&mut guard)?;
        let mut batch = WriteBatch::new();
        let result = self.put_locked(engine, &mut batch, &op.key, &op.value, op.revision, op.prev_kv)?;
        if result.code == Code::Ok {
            engine.write(batch)?;
            *revision = op.revision;
        }
        Ok(result)
    }

    /// Stages `key`'s removal into `batch`, if it exists. `spec.md`'s
    /// `delete` contract has no revision-rejection path (unlike `put`), so
    /// a point delete always proceeds once the key is found.
    fn delete_point_locked(&self, engine: &E, batch: &mut WriteBatch, key: &K, want_prev_kv: bool) -> Result<(Option<KeyValue<K, V>>, i64)> {
        let key_bytes = self.key_coder.encode(key)?;
        let existing = engine.get(&key_bytes)?;
        let Some(bytes) = existing else {
            return Ok((None, 0));
        };
        let record = MVCCRecord::decode(&bytes)?;
        batch.remove(key_bytes);
        let prev_kv = if want_prev_kv { Some(self.record_to_kv(key.clone(), &record)?) } else { None };
        Ok((prev_kv, 1))
    }

    /// Stages a delete of everything in `[start, end_exclusive)` into
    /// `batch`, enumerating `prev_kvs` from the same resolved bounds so the
    /// enumerated set and the deleted set cannot diverge (open question 2).
    fn delete_range_locked(&self, engine: &E, batch: &mut WriteBatch, start: &[u8], end_exclusive: &[u8], want_prev_kv: bool) -> Result<(Vec<KeyValue<K, V>>, i64)> {
        let mut prev_kvs = Vec::new();
        let mut num_deleted = 0i64;
        let mut it = engine.new_iterator();
        it.seek(start);
        while it.is_valid() && it.key() < end_exclusive {
            let record = MVCCRecord::decode(it.value())?;
            if want_prev_kv {
                let key = self.key_coder.decode(it.key())?;
                prev_kvs.push(self.record_to_kv(key, &record)?);
            }
            num_deleted += 1;
            it.next();
        }
        if num_deleted > 0 {
            batch.delete_range(start.to_vec(), end_exclusive.to_vec());
        }
        Ok((prev_kvs, num_deleted))
    }

    pub fn delete(&self, op: DeleteOp<K>) -> Result<DeleteResult<K, V>> {
        let mut guard = self.state.lock();
        let (engine, revision) = Self::require_open(&mut guard)?;
        let mut batch = WriteBatch::new();

        if !op.is_range {
            let key = op.key.as_ref().ok_or_else(|| Error::InvalidState("DeleteOp requires a key for a point delete".into()))?;
            let (prev_kv, num_deleted) = self.delete_point_locked(engine, &mut batch, key, op.prev_kv)?;
            if num_deleted > 0 {
                engine.write(batch)?;
                *revision = op.revision;
            }
            let prev_kvs = prev_kv.into_iter().collect();
            return Ok(ResultFactory::new().delete(Code::Ok, op.revision, prev_kvs, num_deleted));
        }

        let raw_start = op.key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
        let raw_end = op.end_key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
        let resolved = range_util::resolve(raw_start.as_deref(), raw_end.as_deref(), || Self::first_key(engine), || Self::last_key(engine));
        let (start, end_exclusive) = match resolved {
            ResolvedRange::Empty => return Ok(ResultFactory::new().delete(Code::Ok, *revision, Vec::new(), 0)),
            ResolvedRange::Bounds { start, end_exclusive } => (start, end_exclusive),
        };
        let (prev_kvs, num_deleted) = self.delete_range_locked(engine, &mut batch, &start, &end_exclusive, op.prev_kv)?;
        if num_deleted > 0 {
            engine.write(batch)?;
            *revision = op.revision;
        }
        Ok(ResultFactory::new().delete(Code::Ok, op.revision, prev_kvs, num_deleted))
    }

    fn range_locked(&self, engine: &E, op: &RangeOp<K>, current_revision: i64) -> Result<RangeResult<K, V>> {
        if !op.is_range {
            let key = op.key.clone().ok_or_else(|| Error::InvalidState("RangeOp requires a key for a point lookup".into()))?;
            let key_bytes = self.key_coder.encode(&key)?;
            let kvs = match engine.get(&key_bytes)? {
                Some(bytes) => {
                    let record = MVCCRecord::decode(&bytes)?;
                    if Self::passes_filters(op, &record) {
                        vec![self.record_to_kv(key, &record)?]
                    } else {
                        Vec::new()
                    }
                }
                None => Vec::new(),
            };
            return Ok(ResultFactory::new().range(Code::Ok, current_revision, kvs, false));
        }

        let raw_start = op.key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
        let raw_end = op.end_key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
        let resolved = range_util::resolve(raw_start.as_deref(), raw_end.as_deref(), || Self::first_key(engine), || Self::last_key(engine));
        let (start, end_exclusive) = match resolved {
            ResolvedRange::Empty => return Ok(ResultFactory::new().range(Code::Ok, current_revision, Vec::new(), false)),
            ResolvedRange::Bounds { start, end_exclusive } => (start, end_exclusive),
        };

        let mut kvs = Vec::new();
        let mut has_more = false;
        let mut it = engine.new_iterator();
        it.seek(&start);
        while it.is_valid() && it.key() < end_exclusive.as_slice() {
            let record = MVCCRecord::decode(it.value())?;
            if Self::passes_filters(op, &record) {
                if op.limit > 0 && kvs.len() == op.limit {
                    has_more = true;
                    break;
                }
                let key = self.key_coder.decode(it.key())?;
                kvs.push(self.record_to_kv(key, &record)?);
            }
            it.next();
        }
        Ok(ResultFactory::new().range(Code::Ok, current_revision, kvs, has_more))
    }

    pub fn range(&self, op: RangeOp<K>) -> Result<RangeResult<K, V>> {
        let mut guard = self.state.lock();
        let (engine, revision) = Self::require_open(&mut guard)?;
        let current_revision = *revision;
        self.range_locked(engine, &op, current_revision)
    }

    /// Opens a paged cursor over `[key, end_key]`, for scans too large to
    /// fetch with a single `range()` call.
    pub fn range_iterator<'s>(&'s self, key: Option<&K>, end_key: Option<&K>) -> Result<RangeIterator<'s, E, K, V, KC, VC>> {
        RangeIterator::new(self, key, end_key)
    }

    /// Resolves `(key, end_key)` to concrete byte bounds against the live
    /// key set, for `RangeIterator` to page over. Exposed crate-internally
    /// so the iterator never has to duplicate the store's range-resolution
    /// logic.
    pub(crate) fn resolve_bounds(&self, key: Option<&K>, end_key: Option<&K>) -> Result<ResolvedRange> {
        let mut guard = self.state.lock();
        let (engine, _revision) = Self::require_open(&mut guard)?;
        let raw_start = key.map(|k| self.key_coder.encode(k)).transpose()?;
        let raw_end = end_key.map(|k| self.key_coder.encode(k)).transpose()?;
        Ok(range_util::resolve(raw_start.as_deref(), raw_end.as_deref(), || Self::first_key(engine), || Self::last_key(engine)))
    }

    /// Fetches one page of up to `limit` records from `[start,
    /// end_exclusive)`, returning the raw bytes of the last key seen so
    /// the caller can advance its cursor past it without re-decoding.
    pub(crate) fn scan_page(&self, start: &[u8], end_exclusive: &[u8], limit: usize) -> Result<(Vec<KeyValue<K, V>>, Option<Vec<u8>>, bool, i64)> {
        let mut guard = self.state.lock();
        let (engine, revision) = Self::require_open(&mut guard)?;
        let current_revision = *revision;
        let mut kvs = Vec::new();
        let mut last_raw_key = None;
        let mut has_more = false;
        let mut it = engine.new_iterator();
        it.seek(start);
        while it.is_valid() && it.key() < end_exclusive {
            if limit > 0 && kvs.len() == limit {
                has_more = true;
                break;
            }
            let record = MVCCRecord::decode(it.value())?;
            let key = self.key_coder.decode(it.key())?;
            last_raw_key = Some(it.key().to_vec());
            kvs.push(self.record_to_kv(key, &record)?);
            it.next();
        }
        Ok((kvs, last_raw_key, has_more, current_revision))
    }

    /// Evaluates one `CompareOp` against the store's current state. A
    /// compare whose key does not exist raises `Error::KeyNotFound` rather
    /// than resolving to a false comparison (open question 3).
    fn eval_compare(&self, engine: &E, cmp: &CompareOp<K, V>) -> Result<bool> {
        let key_bytes = self.key_coder.encode(&cmp.key)?;
        let bytes = engine.get(&key_bytes)?.ok_or_else(|| Error::KeyNotFound(key_bytes.clone()))?;
        let record = MVCCRecord::decode(&bytes)?;

        let ordering = match cmp.target {
            CompareTarget::Mod => record.mod_rev.cmp(&cmp.revision.unwrap_or(0)),
            CompareTarget::Create => record.create_rev.cmp(&cmp.revision.unwrap_or(0)),
            CompareTarget::Version => record.version.cmp(&cmp.revision.unwrap_or(0)),
            CompareTarget::Value => {
                let want = match &cmp.value {
                    Some(v) => self.val_coder.encode(v)?,
                    None => Vec::new(),
                };
                record.value.as_ref().cmp(want.as_slice())
            }
        };

        Ok(match cmp.result {
            CompareResult::Less => ordering.is_lt(),
            CompareResult::Equal => ordering.is_eq(),
            CompareResult::Greater => ordering.is_gt(),
            CompareResult::NotEqual => ordering.is_ne(),
        })
    }

    /// Stages one sub-op of a txn branch into the branch's shared `batch`.
    /// Nothing here writes to `engine`: the whole branch commits through a
    /// single `engine.write` call once every sub-op has staged cleanly, so a
    /// runtime failure partway through the branch (a `?` below) discards
    /// `batch` along with it rather than leaving earlier sub-ops persisted.
    fn apply_op(&self, engine: &E, batch: &mut WriteBatch, revision: &mut i64, op: Op<K, V>) -> Result<OpResult<K, V>> {
        match op {
            Op::Put(put_op) => {
                let result = self.put_locked(engine, batch, &put_op.key, &put_op.value, put_op.revision, put_op.prev_kv)?;
                if result.code == Code::Ok {
                    *revision = put_op.revision;
                }
                Ok(OpResult::Put(result))
            }
            Op::Delete(delete_op) => {
                if !delete_op.is_range {
                    let key = delete_op.key.as_ref().ok_or_else(|| Error::InvalidState("DeleteOp requires a key for a point delete".into()))?;
                    let (prev_kv, num_deleted) = self.delete_point_locked(engine, batch, key, delete_op.prev_kv)?;
                    if num_deleted > 0 {
                        *revision = delete_op.revision;
                    }
                    let prev_kvs = prev_kv.into_iter().collect();
                    return Ok(OpResult::Delete(ResultFactory::new().delete(Code::Ok, delete_op.revision, prev_kvs, num_deleted)));
                }
                let raw_start = delete_op.key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
                let raw_end = delete_op.end_key.as_ref().map(|k| self.key_coder.encode(k)).transpose()?;
                let resolved = range_util::resolve(raw_start.as_deref(), raw_end.as_deref(), || Self::first_key(engine), || Self::last_key(engine));
                let (start, end_exclusive) = match resolved {
                    ResolvedRange::Empty => return Ok(OpResult::Delete(ResultFactory::new().delete(Code::Ok, *revision, Vec::new(), 0))),
                    ResolvedRange::Bounds { start, end_exclusive } => (start, end_exclusive),
                };
                let (prev_kvs, num_deleted) = self.delete_range_locked(engine, batch, &start, &end_exclusive, delete_op.prev_kv)?;
                if num_deleted > 0 {
                    *revision = delete_op.revision;
                }
                Ok(OpResult::Delete(ResultFactory::new().delete(Code::Ok, delete_op.revision, prev_kvs, num_deleted)))
            }
            Op::Range(range_op) => Ok(OpResult::Range(self.range_locked(engine, &range_op, *revision)?)),
            Op::Txn(_) => Err(Error::InvalidState("nested Txn ops are not supported".into())),
        }
    }

    /// Evaluates `op.compares` and runs the success branch if all pass, the
    /// failure branch otherwise, staging every sub-op of the chosen branch
    /// into one `WriteBatch` and committing it with a single `engine.write`
    /// once the whole branch has staged without error (spec.md §4.7,
    /// §5's "either all sub-op batch writes commit or none"). A runtime
    /// failure mid-branch propagates via `?` before `engine.write` is ever
    /// called, so the batch, and every op already staged into it, is simply
    /// dropped rather than partially persisted.
    pub fn txn(&self, op: TxnOp<K, V>) -> Result<TxnResult<K, V>> {
        let mut guard = self.state.lock();
        let (engine, revision) = Self::require_open(&mut guard)?;

        let mut success = true;
        for cmp in &op.compares {
            if !self.eval_compare(engine, cmp)? {
                success = false;
                break;
            }
        }

        let branch = if success { op.success_ops } else { op.failure_ops };
        let mut batch = WriteBatch::new();
        let mut results = Vec::with_capacity(branch.len());
        for sub_op in branch {
            results.push(self.apply_op(engine, &mut batch, revision, sub_op)?);
        }
        engine.write(batch)?;

        Ok(ResultFactory::new().txn(Code::Ok, *revision, success, results))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::BytesCodec;
    use crate::engine::LogEngine;
    use crate::ops::OpFactory;

    type TestStore = Store<LogEngine, Vec<u8>, Vec<u8>, BytesCodec, BytesCodec>;

    fn open_store() -> (TestStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let spec = StoreSpec::new("test", BytesCodec, BytesCodec, dir.path());
        (TestStore::init(spec).unwrap(), dir)
    }

    #[test]
    fn put_then_range_round_trips() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        let put = f.put().key(b"k".to_vec()).value(b"v".to_vec()).revision(1).build().unwrap();
        let put_result = store.put(put).unwrap();
        assert_eq!(put_result.code, Code::Ok);

        let range = f.range().key(b"k".to_vec()).build().unwrap();
        let range_result = store.range(range).unwrap();
        assert_eq!(range_result.count, 1);
        assert_eq!(range_result.kvs[0].value, b"v".to_vec());
        assert_eq!(range_result.kvs[0].version, 0);
        assert_eq!(range_result.kvs[0].create_revision, 1);
    }

    #[test]
    fn smaller_revision_put_is_rejected_without_mutation() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        store.put(f.put().key(b"k".to_vec()).value(b"v1".to_vec()).revision(5).build().unwrap()).unwrap();
        let rejected = store.put(f.put().key(b"k".to_vec()).value(b"v2".to_vec()).revision(3).build().unwrap()).unwrap();
        assert_eq!(rejected.code, Code::SmallerRevision);

        let range_result = store.range(f.range().key(b"k".to_vec()).build().unwrap()).unwrap();
        assert_eq!(range_result.kvs[0].value, b"v1".to_vec());
    }

    #[test]
    fn delete_then_get_is_absent() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        store.put(f.put().key(b"k".to_vec()).value(b"v".to_vec()).revision(1).build().unwrap()).unwrap();
        let del = store.delete(f.delete().key(b"k".to_vec()).revision(2).build().unwrap()).unwrap();
        assert_eq!(del.num_deleted, 1);

        let range_result = store.range(f.range().key(b"k".to_vec()).build().unwrap()).unwrap();
        assert_eq!(range_result.count, 0);
    }

    #[test]
    fn txn_success_branch_applies_and_reports_prev_kv() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        store.put(f.put().key(b"k".to_vec()).value(b"v1".to_vec()).revision(1).build().unwrap()).unwrap();

        let cmp = f.compare().key(b"k".to_vec()).target(CompareTarget::Create).result(CompareResult::Equal).revision(1).build().unwrap();
        let put = f.put().key(b"k".to_vec()).value(b"v2".to_vec()).revision(2).prev_kv(true).build().unwrap();
        let txn = f.txn().revision(2).compare(cmp).on_success(Op::Put(put)).build().unwrap();

        let txn_result = store.txn(txn).unwrap();
        assert!(txn_result.success);
        match &txn_result.results[0] {
            OpResult::Put(r) => {
                assert_eq!(r.code, Code::Ok);
                assert_eq!(r.prev_kv.as_ref().unwrap().value, b"v1".to_vec());
            }
            _ => panic!("expected a put result"),
        }
    }

    #[test]
    fn txn_failure_branch_runs_when_compare_fails() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        store.put(f.put().key(b"k".to_vec()).value(b"v1".to_vec()).revision(1).build().unwrap()).unwrap();

        let cmp = f.compare().key(b"k".to_vec()).target(CompareTarget::Create).result(CompareResult::Equal).revision(99).build().unwrap();
        let delete = f.delete().key(b"k".to_vec()).revision(2).build().unwrap();
        let txn = f.txn().revision(2).compare(cmp).on_failure(Op::Delete(delete)).build().unwrap();

        let txn_result = store.txn(txn).unwrap();
        assert!(!txn_result.success);
        match &txn_result.results[0] {
            OpResult::Delete(r) => assert_eq!(r.num_deleted, 1),
            _ => panic!("expected a delete result"),
        }
    }

    #[test]
    fn compare_against_missing_key_raises_key_not_found() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        let cmp = f.compare().key(b"missing".to_vec()).target(CompareTarget::Create).result(CompareResult::Equal).revision(0).build().unwrap();
        let txn = f.txn().revision(1).compare(cmp).build().unwrap();
        let err = store.txn(txn).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[test]
    fn range_over_many_keys_honors_limit_and_has_more() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        for i in 0..100u32 {
            let key = format!("key{i:04}").into_bytes();
            store.put(f.put().key(key).value(b"v".to_vec()).revision(i as i64 + 1).build().unwrap()).unwrap();
        }
        let full = store.range(f.range().key(b"key0000".to_vec()).end_key(b"key0059".to_vec()).build().unwrap()).unwrap();
        assert_eq!(full.count, 60);
        assert!(!full.has_more);

        let limited = store.range(f.range().key(b"key0000".to_vec()).end_key(b"key0059".to_vec()).limit(10).build().unwrap()).unwrap();
        assert_eq!(limited.count, 10);
        assert!(limited.has_more);
    }

    #[test]
    fn delete_range_removes_only_the_resolved_bounds() {
        let (store, _dir) = open_store();
        let f = OpFactory::new();
        for i in 0..100u32 {
            let key = format!("key{i:04}").into_bytes();
            store.put(f.put().key(key).value(b"v".to_vec()).revision(i as i64 + 1).build().unwrap()).unwrap();
        }
        let del = store
            .delete(f.delete().key(b"key0010".to_vec()).end_key(b"key0030".to_vec()).revision(200).build().unwrap())
            .unwrap();
        assert_eq!(del.num_deleted, 21);

        let remaining = store.range(f.range().key(b"key0000".to_vec()).end_key(b"key0099".to_vec()).build().unwrap()).unwrap();
        assert_eq!(remaining.count, 79);
    }

    #[test]
    fn closed_store_rejects_further_operations() {
        let (store, _dir) = open_store();
        store.close().unwrap();
        let f = OpFactory::new();
        let err = store.range(f.range().key(b"k".to_vec()).build().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
