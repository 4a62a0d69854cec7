// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess

/// Operation-level status carried on a result object. Non-fatal: the
/// caller's request was rejected on its own terms, not because the store
/// malfunctioned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Code {
    Ok,
    SmallerRevision,
    KeyNotFound,
    IllegalOp,
    UnsupportedOp,
}

impl Default for Code {
    fn default() -> Self {
        Code::Ok
    }
}

/// A raised failure: fatal to the current call. Any write batch in
/// flight is discarded before this propagates, per the commit policy in
/// store.rs.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("key not found: {0:?}")]
    KeyNotFound(Vec<u8>),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
