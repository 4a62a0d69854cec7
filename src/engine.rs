// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! The ordered key-value engine the MVCC store is layered on (spec.md
//! §6). `spec.md` treats this as an external collaborator and specifies
//! only its interface; `Engine`/`EngineIterator`/`WriteBatch` are that
//! interface expressed as Rust traits, and `LogEngine` is the one
//! reference implementation this crate ships so it builds and runs
//! standalone.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A single staged mutation inside a `WriteBatch`.
enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Remove(Vec<u8>),
    DeleteRange(Vec<u8>, Vec<u8>),
}

/// A set of mutations committed atomically by `Engine::write`.
#[derive(Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch { ops: Vec::new() }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put(key, value));
    }

    pub fn remove(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Remove(key));
    }

    /// Half-open `[start, end_exclusive)`.
    pub fn delete_range(&mut self, start: Vec<u8>, end_exclusive: Vec<u8>) {
        self.ops.push(BatchOp::DeleteRange(start, end_exclusive));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// A forward, byte-lexicographic iterator over an engine's key space.
pub trait EngineIterator {
    fn seek(&mut self, key: &[u8]);
    fn seek_to_first(&mut self);
    fn seek_to_last(&mut self);
    fn is_valid(&self) -> bool;
    fn key(&self) -> &[u8];
    fn value(&self) -> &[u8];
    fn next(&mut self);
}

/// One column family's worth of ordered byte storage, atomically
/// writable in batches.
pub trait Engine: Send + Sync {
    type Iter<'a>: EngineIterator + 'a
    where
        Self: 'a;

    fn open(dir: &Path) -> Result<Self>
    where
        Self: Sized;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn new_iterator(&self) -> Self::Iter<'_>;

    fn write(&self, batch: WriteBatch) -> Result<()>;

    fn close(&self) -> Result<()>;
}

/// A reference-implementation ordered engine: an in-memory `BTreeMap`
/// behind a single lock, with an append-only replay log under
/// `local_state_store_dir` for crash recovery on `open`. Reuses the
/// `tag/len/bytes` framing style of the big-endian record codec in
/// record.rs rather than inventing a second format.
pub struct LogEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    log: RwLock<File>,
}

const TAG_PUT: u8 = 0;
const TAG_REMOVE: u8 = 1;
const TAG_DELETE_RANGE: u8 = 2;

fn write_frame(w: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    w.write_u32::<BigEndian>(bytes.len() as u32)?;
    w.write_all(bytes)
}

fn read_frame(r: &mut impl Read) -> std::io::Result<Option<Vec<u8>>> {
    let len = match r.read_u32::<BigEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(Some(buf))
}

impl LogEngine {
    fn replay(path: &PathBuf, map: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let mut reader = BufReader::new(File::open(path)?);
        loop {
            let mut tag = [0u8; 1];
            match reader.read_exact(&mut tag) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(Error::Io(e)),
            }
            match tag[0] {
                TAG_PUT => {
                    let key = read_frame(&mut reader)?.ok_or_else(|| Error::Corrupt("truncated put key".into()))?;
                    let value = read_frame(&mut reader)?.ok_or_else(|| Error::Corrupt("truncated put value".into()))?;
                    map.insert(key, value);
                }
                TAG_REMOVE => {
                    let key = read_frame(&mut reader)?.ok_or_else(|| Error::Corrupt("truncated remove key".into()))?;
                    map.remove(&key);
                }
                TAG_DELETE_RANGE => {
                    let start = read_frame(&mut reader)?.ok_or_else(|| Error::Corrupt("truncated delete_range start".into()))?;
                    let end = read_frame(&mut reader)?.ok_or_else(|| Error::Corrupt("truncated delete_range end".into()))?;
                    let to_remove: Vec<Vec<u8>> = map.range(start..end).map(|(k, _)| k.clone()).collect();
                    for k in to_remove {
                        map.remove(&k);
                    }
                }
                other => return Err(Error::Corrupt(format!("unknown WAL tag {other}"))),
            }
        }
        Ok(())
    }

    fn append_locked(log: &mut File, op: &BatchOp) -> std::io::Result<()> {
        match op {
            BatchOp::Put(k, v) => {
                log.write_all(&[TAG_PUT])?;
                write_frame(log, k)?;
                write_frame(log, v)?;
            }
            BatchOp::Remove(k) => {
                log.write_all(&[TAG_REMOVE])?;
                write_frame(log, k)?;
            }
            BatchOp::DeleteRange(s, e) => {
                log.write_all(&[TAG_DELETE_RANGE])?;
                write_frame(log, s)?;
                write_frame(log, e)?;
            }
        }
        Ok(())
    }
}

impl Engine for LogEngine {
    type Iter<'a> = LogEngineIterator;

    fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log_path = dir.join("engine.log");
        let mut map = BTreeMap::new();
        Self::replay(&log_path, &mut map)?;
        log::info!("LogEngine opened at {:?}, {} live keys replayed", dir, map.len());
        let log = OpenOptions::new().create(true).append(true).open(&log_path)?;
        Ok(LogEngine { map: RwLock::new(map), log: RwLock::new(log) })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn new_iterator(&self) -> Self::Iter<'_> {
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self.map.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        LogEngineIterator { entries: snapshot, pos: None }
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut log = self.log.write();
        for op in &batch.ops {
            Self::append_locked(&mut log, op)?;
        }
        log.flush()?;
        drop(log);

        let mut map = self.map.write();
        for op in batch.ops {
            match op {
                BatchOp::Put(k, v) => {
                    map.insert(k, v);
                }
                BatchOp::Remove(k) => {
                    map.remove(&k);
                }
                BatchOp::DeleteRange(s, e) => {
                    let to_remove: Vec<Vec<u8>> = map.range(s..e).map(|(k, _)| k.clone()).collect();
                    for k in to_remove {
                        map.remove(&k);
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.log.write().flush()?;
        Ok(())
    }
}

pub struct LogEngineIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
}

impl EngineIterator for LogEngineIterator {
    fn seek(&mut self, key: &[u8]) {
        self.pos = match self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(i) => Some(i),
            Err(i) if i < self.entries.len() => Some(i),
            Err(_) => None,
        };
    }

    fn seek_to_first(&mut self) {
        self.pos = if self.entries.is_empty() { None } else { Some(0) };
    }

    fn seek_to_last(&mut self) {
        self.pos = if self.entries.is_empty() { None } else { Some(self.entries.len() - 1) };
    }

    fn is_valid(&self) -> bool {
        self.pos.is_some()
    }

    fn key(&self) -> &[u8] {
        &self.entries[self.pos.expect("key() called on invalid iterator")].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos.expect("value() called on invalid iterator")].1
    }

    fn next(&mut self) {
        self.pos = match self.pos {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            _ => None,
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LogEngine::open(dir.path()).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        engine.write(batch).unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"missing").unwrap(), None);
    }

    #[test]
    fn delete_range_is_half_open() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LogEngine::open(dir.path()).unwrap();
        let mut batch = WriteBatch::new();
        for k in [b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()] {
            batch.put(k.clone(), k);
        }
        engine.write(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete_range(b"b".to_vec(), b"d".to_vec());
        engine.write(batch).unwrap();

        assert_eq!(engine.get(b"a").unwrap(), Some(b"a".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), None);
        assert_eq!(engine.get(b"c").unwrap(), None);
        assert_eq!(engine.get(b"d").unwrap(), Some(b"d".to_vec()));
    }

    #[test]
    fn iterator_walks_in_byte_lex_order() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LogEngine::open(dir.path()).unwrap();
        let mut batch = WriteBatch::new();
        for k in [b"c".to_vec(), b"a".to_vec(), b"b".to_vec()] {
            batch.put(k.clone(), k);
        }
        engine.write(batch).unwrap();

        let mut it = engine.new_iterator();
        it.seek_to_first();
        let mut seen = Vec::new();
        while it.is_valid() {
            seen.push(it.key().to_vec());
            it.next();
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn replays_log_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = LogEngine::open(dir.path()).unwrap();
            let mut batch = WriteBatch::new();
            batch.put(b"persisted".to_vec(), b"yes".to_vec());
            engine.write(batch).unwrap();
            engine.close().unwrap();
        }
        let engine = LogEngine::open(dir.path()).unwrap();
        assert_eq!(engine.get(b"persisted").unwrap(), Some(b"yes".to_vec()));
    }
}
