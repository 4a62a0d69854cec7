// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Benjamin Chess
//! A small command-line client exercising `put`/`range`/`delete`/`txn`
//! against a `LogEngine`-backed store, in place of the network service
//! this crate does not implement.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mvcc_kv::codec::BytesCodec;
use mvcc_kv::config::StoreSpec;
use mvcc_kv::engine::LogEngine;
use mvcc_kv::ops::{CompareResult, CompareTarget, Op, OpFactory};
use mvcc_kv::store::Store;

type DemoStore = Store<LogEngine, Vec<u8>, Vec<u8>, BytesCodec, BytesCodec>;

#[derive(Parser, Debug)]
#[command(name = "mvcc-kv", version, about = "Etcd-style MVCC key-value store", long_about = None)]
struct Cli {
    /// Directory the embedded engine persists its log to.
    #[arg(long = "data-dir", env = "MVCC_KV_DATA_DIR", default_value = "./mvcc-kv-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a key unconditionally.
    Put { key: String, value: String },
    /// Read a single key.
    Get { key: String },
    /// Read every key in `[start, end]`.
    Range { start: String, end: String },
    /// Delete a single key.
    Delete { key: String },
    /// Delete every key in `[start, end]`.
    DeleteRange { start: String, end: String },
    /// Write a key only if its current version matches `expect_version`.
    CasPut { key: String, expect_version: i64, value: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let spec = StoreSpec::new("cli", BytesCodec, BytesCodec, cli.data_dir.clone());
    let store: DemoStore = Store::init(spec)?;
    let f = OpFactory::new();

    match cli.command {
        Command::Put { key, value } => {
            let revision = store.current_revision()? + 1;
            let op = f.put().key(key.into_bytes()).value(value.into_bytes()).revision(revision).build()?;
            let result = store.put(op)?;
            println!("{:?} at revision {}", result.code, result.revision);
        }
        Command::Get { key } => {
            let op = f.range().key(key.into_bytes()).build()?;
            let result = store.range(op)?;
            match result.kvs.first() {
                Some(kv) => println!("{} (create_rev={}, mod_rev={}, version={})", String::from_utf8_lossy(&kv.value), kv.create_revision, kv.mod_revision, kv.version),
                None => println!("(not found)"),
            }
        }
        Command::Range { start, end } => {
            let op = f.range().key(start.into_bytes()).end_key(end.into_bytes()).build()?;
            let result = store.range(op)?;
            for kv in &result.kvs {
                println!("{} = {}", String::from_utf8_lossy(&kv.key), String::from_utf8_lossy(&kv.value));
            }
            println!("{} key(s){}", result.count, if result.has_more { " (truncated)" } else { "" });
        }
        Command::Delete { key } => {
            let revision = store.current_revision()? + 1;
            let op = f.delete().key(key.into_bytes()).revision(revision).build()?;
            let result = store.delete(op)?;
            println!("{:?}, {} key(s) deleted", result.code, result.num_deleted);
        }
        Command::DeleteRange { start, end } => {
            let revision = store.current_revision()? + 1;
            let op = f.delete().key(start.into_bytes()).end_key(end.into_bytes()).revision(revision).build()?;
            let result = store.delete(op)?;
            println!("{:?}, {} key(s) deleted", result.code, result.num_deleted);
        }
        Command::CasPut { key, expect_version, value } => {
            let revision = store.current_revision()? + 1;
            let cmp = f
                .compare()
                .key(key.clone().into_bytes())
                .target(CompareTarget::Version)
                .result(CompareResult::Equal)
                .revision(expect_version)
                .build()?;
            let put = f.put().key(key.into_bytes()).value(value.into_bytes()).revision(revision).prev_kv(true).build()?;
            let txn = f.txn().revision(revision).compare(cmp).on_success(Op::Put(put)).build()?;
            let result = store.txn(txn)?;
            println!("success={} at revision {}", result.success, result.revision);
        }
    }

    store.close()?;
    Ok(())
}
