use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;

use crate::types::{MetaStore, StoreError, StoreResult};

pub const WAL_FILE_NAME: &str = "store.wal";

const OP_PUT: &str = "put";
const OP_DELETE: &str = "delete";

/// Values are base64 (standard alphabet, padded) on disk.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    op: &'static str,
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Deserialize)]
struct WalRecord {
    op: String,
    key: String,
    #[serde(default)]
    value: Option<String>,
}

/// Single-node, disk-backed key-value store.
///
/// Every mutation is appended to `store.wal` as one JSON line and synced to
/// disk before it becomes visible in memory. Opening a directory replays the
/// log in order, so the map after `open` is exactly the net effect of every
/// committed `put`/`delete`.
///
/// A record that fails to append is cut back off the log. If that cut fails
/// too, the store refuses further writes until it is reopened.
#[derive(Debug)]
pub struct WalStore {
    path: PathBuf,
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    wal: Option<File>,
    /// Length of the log up to the last committed record.
    committed_len: u64,
    poisoned: bool,
}

impl WalStore {
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(WAL_FILE_NAME);
        let data = replay(&path).await?;

        let open_err = |source| StoreError::OpenWal {
            path: path.clone(),
            source,
        };
        let wal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(open_err)?;
        let committed_len = wal.metadata().await.map_err(open_err)?.len();

        tracing::debug!(path=%path.display(), keys = data.len(), bytes = committed_len, "wal replayed");

        Ok(Self {
            path,
            inner: RwLock::new(Inner {
                data,
                wal: Some(wal),
                committed_len,
                poisoned: false,
            }),
        })
    }

    pub fn wal_path(&self) -> &Path {
        &self.path
    }
}

async fn replay(path: &Path) -> StoreResult<BTreeMap<String, Vec<u8>>> {
    let mut data = BTreeMap::new();

    let file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(data),
        Err(source) => {
            return Err(StoreError::OpenWal {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    loop {
        line_no += 1;
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(source) => {
                return Err(StoreError::ReadWal {
                    line: line_no,
                    source,
                })
            }
        };
        apply_record(&mut data, &line, line_no)?;
    }

    Ok(data)
}

fn apply_record(
    data: &mut BTreeMap<String, Vec<u8>>,
    line: &str,
    line_no: usize,
) -> StoreResult<()> {
    let rec: WalRecord =
        serde_json::from_str(line).map_err(|source| StoreError::DecodeRecord {
            line: line_no,
            source,
        })?;

    match rec.op.as_str() {
        OP_PUT => {
            let value = match rec.value {
                Some(encoded) => {
                    STANDARD
                        .decode(encoded)
                        .map_err(|source| StoreError::DecodeValue {
                            line: line_no,
                            source,
                        })?
                }
                None => Vec::new(),
            };
            data.insert(rec.key, value);
        }
        OP_DELETE => {
            data.remove(&rec.key);
        }
        _ => {
            return Err(StoreError::UnknownOp {
                line: line_no,
                op: rec.op,
            })
        }
    }
    Ok(())
}

async fn write_synced(wal: &mut File, buf: &[u8]) -> StoreResult<()> {
    wal.write_all(buf).await.map_err(StoreError::Write)?;
    wal.flush().await.map_err(StoreError::Write)?;
    wal.sync_data().await.map_err(StoreError::Sync)?;
    Ok(())
}

impl Inner {
    /// Appends one record and syncs it. Nothing of a failed record survives
    /// in the log.
    async fn append(&mut self, rec: &WalRecordRef<'_>) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::Poisoned);
        }
        let mut buf = serde_json::to_vec(rec).map_err(StoreError::EncodeRecord)?;
        buf.push(b'\n');

        let wal = self.wal.as_mut().ok_or(StoreError::Closed)?;
        let written = write_synced(wal, &buf).await;
        match written {
            Ok(()) => {
                self.committed_len += buf.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }

    /// Truncates the log back to the last committed record.
    async fn rollback(&mut self) {
        let Some(wal) = self.wal.as_mut() else {
            return;
        };
        let len = self.committed_len;
        let cut = match wal.set_len(len).await {
            Ok(()) => wal.sync_data().await,
            Err(e) => Err(e),
        };
        if let Err(e) = cut {
            tracing::error!(error=%e, committed_len = len, "failed to roll back wal, refusing further writes");
            self.wal = None;
            self.poisoned = true;
        }
    }
}

#[async_trait]
impl MetaStore for WalStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let mut inner = self.inner.write().await;
        inner
            .append(&WalRecordRef {
                op: OP_PUT,
                key,
                value: Some(STANDARD.encode(&value)),
            })
            .await?;

        inner.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.read().await;
        inner.data.get(key).cloned()
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let mut inner = self.inner.write().await;
        inner
            .append(&WalRecordRef {
                op: OP_DELETE,
                key,
                value: None,
            })
            .await?;

        inner.data.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.data.keys().cloned().collect()
    }

    async fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(mut wal) = inner.wal.take() {
            wal.flush().await.map_err(StoreError::Write)?;
            wal.sync_all().await.map_err(StoreError::Sync)?;
            tracing::debug!(path=%self.path.display(), "wal closed");
        }
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let inner = self.inner.read().await;
        inner
            .data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
