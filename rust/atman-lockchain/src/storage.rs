// rust/atman-lockchain/src/storage.rs
// On-disk chain layout: length-prefixed canonical receipts in an
// append-only log, a tip.ptr advanced by atomic rename, and a sled
// sidecar index mapping tx ids to log offsets

use crate::receipt::Receipt;
use crate::{LockchainError, LockchainResult};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const LOG_FILE: &str = "receipts.log";
const TIP_FILE: &str = "tip.ptr";
const INDEX_DIR: &str = "index";

/// Sidecar index record for one receipt
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct IndexEntry {
    offset: u64,
    length: u32,
}

/// Persistent chain storage. The receipt record is written and flushed
/// before the tip pointer advances, so a reader observing the tip can
/// always fetch the matching receipt.
pub struct LockchainStorage {
    dir: PathBuf,
    log: File,
    index: sled::Db,
    len: u64,
}

impl LockchainStorage {
    /// Open (or create) chain storage under a directory
    pub fn open(dir: impl AsRef<Path>) -> LockchainResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))?;
        let index = sled::open(dir.join(INDEX_DIR))?;
        let len = Self::count_records(&dir)?;
        Ok(Self {
            dir,
            log,
            index,
            len,
        })
    }

    /// Append one receipt: length-prefixed canonical JSON record,
    /// sidecar index entries, then the tip pointer
    pub fn append(&mut self, receipt: &Receipt) -> LockchainResult<u64> {
        let bytes = receipt.canonical_json()?.into_bytes();
        let offset = self.log.seek(SeekFrom::End(0))?;
        self.log.write_all(&(bytes.len() as u32).to_be_bytes())?;
        self.log.write_all(&bytes)?;
        self.log.flush()?;

        let entry = IndexEntry {
            offset,
            length: bytes.len() as u32,
        };
        let encoded = bincode::serialize(&entry)?;
        self.index
            .insert(tx_key(&receipt.tx_id), encoded.clone())?;
        self.index.insert(seq_key(self.len), encoded)?;
        self.index.flush()?;

        self.advance_tip(&receipt.merkle_root)?;
        self.len += 1;
        Ok(offset)
    }

    /// Current tip, if any receipt has been appended
    pub fn tip(&self) -> LockchainResult<Option<String>> {
        let path = self.dir.join(TIP_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let tip = std::fs::read_to_string(path)?;
        Ok(Some(tip.trim().to_string()))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fetch by chain position
    pub fn get(&self, index: u64) -> LockchainResult<Option<Receipt>> {
        match self.index.get(seq_key(index))? {
            Some(encoded) => {
                let entry: IndexEntry = bincode::deserialize(&encoded)?;
                Ok(Some(self.read_at(entry)?))
            }
            None => Ok(None),
        }
    }

    /// Fetch by transaction id through the sidecar index
    pub fn get_by_tx(&self, tx_id: &Uuid) -> LockchainResult<Option<Receipt>> {
        match self.index.get(tx_key(tx_id))? {
            Some(encoded) => {
                let entry: IndexEntry = bincode::deserialize(&encoded)?;
                Ok(Some(self.read_at(entry)?))
            }
            None => Ok(None),
        }
    }

    /// Scan the full log in append order
    pub fn read_all(&self) -> LockchainResult<Vec<Receipt>> {
        let mut file = File::open(self.dir.join(LOG_FILE))?;
        let mut receipts = Vec::new();
        let mut offset = 0u64;
        loop {
            let mut len_buf = [0u8; 4];
            match file.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let length = u32::from_be_bytes(len_buf) as usize;
            let mut bytes = vec![0u8; length];
            file.read_exact(&mut bytes)
                .map_err(|e| LockchainError::CorruptRecord {
                    offset,
                    detail: format!("truncated record: {e}"),
                })?;
            receipts.push(Receipt::from_canonical_json(&bytes).map_err(|e| {
                LockchainError::CorruptRecord {
                    offset,
                    detail: e.to_string(),
                }
            })?);
            offset += 4 + length as u64;
        }
        Ok(receipts)
    }

    fn read_at(&self, entry: IndexEntry) -> LockchainResult<Receipt> {
        let mut file = File::open(self.dir.join(LOG_FILE))?;
        file.seek(SeekFrom::Start(entry.offset + 4))?;
        let mut bytes = vec![0u8; entry.length as usize];
        file.read_exact(&mut bytes)?;
        Receipt::from_canonical_json(&bytes).map_err(|e| LockchainError::CorruptRecord {
            offset: entry.offset,
            detail: e.to_string(),
        })
    }

    /// Advance tip.ptr via write-to-temp + atomic rename
    fn advance_tip(&self, merkle_root: &str) -> LockchainResult<()> {
        let tmp = self.dir.join(format!("{TIP_FILE}.tmp"));
        let mut file = File::create(&tmp)?;
        file.write_all(merkle_root.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, self.dir.join(TIP_FILE))?;
        Ok(())
    }

    fn count_records(dir: &Path) -> LockchainResult<u64> {
        let path = dir.join(LOG_FILE);
        if !path.exists() {
            return Ok(0);
        }
        let mut file = File::open(path)?;
        let mut count = 0u64;
        loop {
            let mut len_buf = [0u8; 4];
            match file.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let length = u32::from_be_bytes(len_buf) as i64;
            file.seek(SeekFrom::Current(length))?;
            count += 1;
        }
        Ok(count)
    }
}

impl std::fmt::Debug for LockchainStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockchainStorage")
            .field("dir", &self.dir)
            .field("len", &self.len)
            .finish()
    }
}

fn tx_key(tx_id: &Uuid) -> Vec<u8> {
    format!("tx:{tx_id}").into_bytes()
}

fn seq_key(index: u64) -> Vec<u8> {
    format!("seq:{index:020}").into_bytes()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::receipt::{ReceiptBuilder, ReceiptKind};
    use atman_store::{Node, Object, Triple};

    fn receipt(n: usize, prev: &str) -> Receipt {
        ReceiptBuilder::new(ReceiptKind::Mutation, Uuid::new_v4(), "tester")
            .prev_hash(prev)
            .additions(vec![Triple::new(
                Node::iri(format!("http://example.org/s{n}")),
                "http://example.org/p",
                Object::literal(format!("v{n}")),
            )])
            .committed(true)
            .build()
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = LockchainStorage::open(dir.path()).unwrap();

        let r1 = receipt(1, &"0".repeat(64));
        let r2 = receipt(2, &r1.merkle_root);
        storage.append(&r1).unwrap();
        storage.append(&r2).unwrap();

        assert_eq!(storage.len(), 2);
        let all = storage.read_all().unwrap();
        assert_eq!(all, vec![r1.clone(), r2.clone()]);
        assert_eq!(storage.get(0).unwrap(), Some(r1));
        assert_eq!(storage.get(1).unwrap(), Some(r2));
    }

    #[test]
    fn test_tip_tracks_last_merkle_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = LockchainStorage::open(dir.path()).unwrap();
        assert_eq!(storage.tip().unwrap(), None);

        let r1 = receipt(1, &"0".repeat(64));
        storage.append(&r1).unwrap();
        assert_eq!(storage.tip().unwrap(), Some(r1.merkle_root.clone()));

        let r2 = receipt(2, &r1.merkle_root);
        storage.append(&r2).unwrap();
        assert_eq!(storage.tip().unwrap(), Some(r2.merkle_root));
    }

    #[test]
    fn test_tx_id_sidecar_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = LockchainStorage::open(dir.path()).unwrap();
        let r = receipt(1, &"0".repeat(64));
        storage.append(&r).unwrap();

        let found = storage.get_by_tx(&r.tx_id).unwrap();
        assert_eq!(found, Some(r));
        assert_eq!(storage.get_by_tx(&Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_reopen_recovers_length_and_tip() {
        let dir = tempfile::tempdir().unwrap();
        let r1 = receipt(1, &"0".repeat(64));
        let r2 = receipt(2, &r1.merkle_root);
        {
            let mut storage = LockchainStorage::open(dir.path()).unwrap();
            storage.append(&r1).unwrap();
            storage.append(&r2).unwrap();
        }

        let storage = LockchainStorage::open(dir.path()).unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.tip().unwrap(), Some(r2.merkle_root.clone()));
        assert_eq!(storage.get(1).unwrap(), Some(r2));
    }
}
