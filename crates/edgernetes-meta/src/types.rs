use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("empty key")]
    EmptyKey,

    #[error("store is closed")]
    Closed,

    #[error("wal could not be rolled back after a failed write; reopen the store")]
    Poisoned,

    #[error("create data dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("open wal {path}: {source}")]
    OpenWal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read wal line {line}: {source}")]
    ReadWal {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("decode wal record at line {line}: {source}")]
    DecodeRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("decode wal value at line {line}: {source}")]
    DecodeValue {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("unknown wal op {op:?} at line {line}")]
    UnknownOp { line: usize, op: String },

    #[error("encode wal record: {0}")]
    EncodeRecord(#[source] serde_json::Error),

    #[error("write wal: {0}")]
    Write(#[source] io::Error),

    #[error("sync wal: {0}")]
    Sync(#[source] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flat string-keyed byte store shared by every registry and the heartbeat loop.
///
/// Values handed out are copies; callers never observe internal state.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Snapshot of every key, in key order.
    async fn keys(&self) -> Vec<String>;

    /// Releases durable resources. Mutations fail afterwards, reads keep
    /// serving the last committed state. Safe to call more than once.
    async fn close(&self) -> StoreResult<()>;

    /// Snapshot of every `(key, value)` whose key starts with `prefix`.
    async fn list_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let mut out = Vec::new();
        for key in self.keys().await {
            if !key.starts_with(prefix) {
                continue;
            }
            // a concurrent delete between keys() and get() just drops the entry
            if let Some(value) = self.get(&key).await {
                out.push((key, value));
            }
        }
        out
    }
}
