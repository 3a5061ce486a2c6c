//! The engine proper: in-memory bucket image plus transaction surface.
//!
//! Concurrency discipline:
//!
//! - `view` takes the image read lock for the duration of the closure, so
//!   any number of readers run in parallel against a consistent snapshot.
//! - `update` holds the log mutex for the duration of the closure, so
//!   read-write transactions are serialized. Mutations are buffered in the
//!   transaction, appended as one fsynced commit frame, and only then
//!   applied to the image under a brief write lock. Readers therefore see
//!   either none or all of a commit, never a partial state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard};
use std::time::Duration;

use super::errors::{EngineError, EngineResult};
use super::frame::{CommitFrame, LogOp};
use super::lock::DataDirLock;
use super::log::{self, LogWriter};

const DB_FILE: &str = "echo.db";
const LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// One named keyspace: ordered entries plus a sequence counter.
#[derive(Debug, Default)]
struct Bucket {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

/// The replayed in-memory image of the log.
#[derive(Debug, Default)]
struct Image {
    buckets: HashMap<String, Bucket>,
}

impl Image {
    fn apply(&mut self, op: &LogOp) {
        match op {
            LogOp::CreateBucket { bucket } => {
                self.buckets.entry(bucket.clone()).or_default();
            }
            LogOp::Put { bucket, key, value } => {
                self.buckets
                    .entry(bucket.clone())
                    .or_default()
                    .entries
                    .insert(key.clone(), value.clone());
            }
            LogOp::Delete { bucket, key } => {
                if let Some(b) = self.buckets.get_mut(bucket) {
                    b.entries.remove(key);
                }
            }
            LogOp::SetSequence { bucket, seq } => {
                let b = self.buckets.entry(bucket.clone()).or_default();
                // Counters never rewind, even on replay.
                b.sequence = b.sequence.max(*seq);
            }
        }
    }
}

/// File-backed ordered key-value engine.
///
/// One instance exclusively owns its data directory for its whole lifetime;
/// the OS file lock is released when the engine drops.
pub struct Engine {
    image: RwLock<Image>,
    log: Mutex<LogWriter>,
    db_path: PathBuf,
    _lock: DataDirLock,
}

impl Engine {
    /// Open (or create) the engine in `data_dir`.
    ///
    /// Acquires the directory lock with a bounded timeout, replays the
    /// commit log into memory, and trims any torn tail. Any failure here
    /// means the engine cannot be used at all.
    pub fn open(data_dir: &Path) -> EngineResult<Self> {
        let dir_lock = DataDirLock::acquire(data_dir, LOCK_TIMEOUT)?;
        let db_path = data_dir.join(DB_FILE);

        let (frames, valid_len) = log::replay(&db_path)?;
        let mut image = Image::default();
        for frame in &frames {
            for op in &frame.ops {
                image.apply(op);
            }
        }

        let writer = LogWriter::open(&db_path, valid_len)?;

        Ok(Self {
            image: RwLock::new(image),
            log: Mutex::new(writer),
            db_path,
            _lock: dir_lock,
        })
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a read-only transaction.
    ///
    /// The closure observes a consistent snapshot; concurrent `view` calls
    /// proceed in parallel.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<EngineError>,
        F: FnOnce(&ReadTx<'_>) -> Result<T, E>,
    {
        let guard = self.image.read().map_err(|_| EngineError::Poisoned)?;
        let tx = ReadTx { image: guard };
        f(&tx)
    }

    /// Run a read-write transaction.
    ///
    /// Mutations are buffered; if the closure returns Err nothing is
    /// written (rollback). On Ok, all buffered ops are committed as one
    /// durable frame, then applied to the image atomically.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<EngineError>,
        F: FnOnce(&mut WriteTx<'_>) -> Result<T, E>,
    {
        // Serializes read-write transactions for the whole closure, so
        // sequence allocation cannot race.
        let mut log = self.log.lock().map_err(|_| EngineError::Poisoned)?;

        let mut tx = WriteTx {
            image: &self.image,
            ops: Vec::new(),
            sequences: HashMap::new(),
            new_buckets: HashSet::new(),
        };
        let out = f(&mut tx)?;

        if !tx.ops.is_empty() {
            let frame = CommitFrame::new(tx.ops);
            log.append(&frame).map_err(E::from)?;

            let mut image = self.image.write().map_err(|_| EngineError::Poisoned)?;
            for op in &frame.ops {
                image.apply(op);
            }
        }

        Ok(out)
    }
}

/// A read-only transaction: a held snapshot of the image.
pub struct ReadTx<'a> {
    image: RwLockReadGuard<'a, Image>,
}

impl ReadTx<'_> {
    /// Borrow a bucket for reading.
    pub fn bucket(&self, name: &str) -> EngineResult<BucketView<'_>> {
        self.image
            .buckets
            .get(name)
            .map(|bucket| BucketView { bucket })
            .ok_or_else(|| EngineError::BucketNotFound(name.to_string()))
    }
}

/// Read access to one bucket inside a read-only transaction.
pub struct BucketView<'a> {
    bucket: &'a Bucket,
}

impl BucketView<'_> {
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.bucket.entries.get(key).map(Vec::as_slice)
    }

    /// Entries in ascending byte order of keys.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.bucket
            .entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.bucket.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.entries.is_empty()
    }

    /// Last allocated sequence value.
    pub fn sequence(&self) -> u64 {
        self.bucket.sequence
    }
}

/// A read-write transaction: buffered ops over the current image.
pub struct WriteTx<'a> {
    image: &'a RwLock<Image>,
    ops: Vec<LogOp>,
    sequences: HashMap<String, u64>,
    new_buckets: HashSet<String>,
}

impl WriteTx<'_> {
    /// Ensure a bucket exists. Idempotent.
    pub fn create_bucket_if_missing(&mut self, bucket: &str) -> EngineResult<()> {
        if self.bucket_exists(bucket)? {
            return Ok(());
        }
        self.new_buckets.insert(bucket.to_string());
        self.ops.push(LogOp::CreateBucket {
            bucket: bucket.to_string(),
        });
        Ok(())
    }

    /// Allocate the next value of the bucket's monotonic counter.
    ///
    /// The allocation is durable only once the transaction commits; an
    /// aborted transaction leaves the counter untouched.
    pub fn next_sequence(&mut self, bucket: &str) -> EngineResult<u64> {
        let base = match self.sequences.get(bucket) {
            Some(&seq) => seq,
            None => self.committed_sequence(bucket)?,
        };
        let next = base + 1;
        self.sequences.insert(bucket.to_string(), next);
        self.ops.push(LogOp::SetSequence {
            bucket: bucket.to_string(),
            seq: next,
        });
        Ok(next)
    }

    /// Read a key, observing this transaction's own pending writes.
    pub fn get(&self, bucket: &str, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if !self.bucket_exists(bucket)? {
            return Err(EngineError::BucketNotFound(bucket.to_string()));
        }

        for op in self.ops.iter().rev() {
            match op {
                LogOp::Put {
                    bucket: b,
                    key: k,
                    value,
                } if b == bucket && k == key => return Ok(Some(value.clone())),
                LogOp::Delete { bucket: b, key: k } if b == bucket && k == key => {
                    return Ok(None)
                }
                _ => {}
            }
        }

        let image = self.image.read().map_err(|_| EngineError::Poisoned)?;
        Ok(image
            .buckets
            .get(bucket)
            .and_then(|b| b.entries.get(key))
            .cloned())
    }

    /// Buffer an insert or overwrite.
    pub fn put(&mut self, bucket: &str, key: Vec<u8>, value: Vec<u8>) -> EngineResult<()> {
        if !self.bucket_exists(bucket)? {
            return Err(EngineError::BucketNotFound(bucket.to_string()));
        }
        self.ops.push(LogOp::Put {
            bucket: bucket.to_string(),
            key,
            value,
        });
        Ok(())
    }

    /// Buffer a key removal. Removing an absent key is not an error here;
    /// existence policy belongs to the caller.
    pub fn delete(&mut self, bucket: &str, key: Vec<u8>) -> EngineResult<()> {
        if !self.bucket_exists(bucket)? {
            return Err(EngineError::BucketNotFound(bucket.to_string()));
        }
        self.ops.push(LogOp::Delete {
            bucket: bucket.to_string(),
            key,
        });
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> EngineResult<bool> {
        if self.new_buckets.contains(bucket) {
            return Ok(true);
        }
        let image = self.image.read().map_err(|_| EngineError::Poisoned)?;
        Ok(image.buckets.contains_key(bucket))
    }

    fn committed_sequence(&self, bucket: &str) -> EngineResult<u64> {
        if self.new_buckets.contains(bucket) {
            return Ok(0);
        }
        let image = self.image.read().map_err(|_| EngineError::Poisoned)?;
        image
            .buckets
            .get(bucket)
            .map(|b| b.sequence)
            .ok_or_else(|| EngineError::BucketNotFound(bucket.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_engine(dir: &TempDir) -> Engine {
        Engine::open(dir.path()).unwrap()
    }

    #[test]
    fn create_bucket_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.create_bucket_if_missing("messages"))
            .unwrap();
        engine
            .update(|tx| tx.create_bucket_if_missing("messages"))
            .unwrap();

        engine
            .view(|tx| {
                assert!(tx.bucket("messages").unwrap().is_empty());
                Ok::<_, EngineError>(())
            })
            .unwrap();
    }

    #[test]
    fn missing_bucket_is_an_error() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        let result: Result<(), EngineError> = engine.view(|tx| {
            tx.bucket("nope")?;
            Ok(())
        });
        assert!(matches!(result, Err(EngineError::BucketNotFound(_))));
    }

    #[test]
    fn put_get_delete_within_and_across_transactions() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| {
                tx.create_bucket_if_missing("b")?;
                tx.put("b", b"k".to_vec(), b"v1".to_vec())?;
                // Own write is visible inside the transaction.
                assert_eq!(tx.get("b", b"k")?, Some(b"v1".to_vec()));
                tx.delete("b", b"k".to_vec())?;
                assert_eq!(tx.get("b", b"k")?, None);
                tx.put("b", b"k".to_vec(), b"v2".to_vec())?;
                Ok::<_, EngineError>(())
            })
            .unwrap();

        engine
            .view(|tx| {
                assert_eq!(tx.bucket("b")?.get(b"k"), Some(b"v2".as_slice()));
                Ok::<_, EngineError>(())
            })
            .unwrap();
    }

    #[test]
    fn iteration_is_in_ascending_key_order() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| {
                tx.create_bucket_if_missing("b")?;
                for id in [3u64, 1, 2] {
                    tx.put("b", id.to_be_bytes().to_vec(), vec![id as u8])?;
                }
                Ok::<_, EngineError>(())
            })
            .unwrap();

        let keys: Vec<Vec<u8>> = engine
            .view(|tx| {
                Ok::<_, EngineError>(
                    tx.bucket("b")?.iter().map(|(k, _)| k.to_vec()).collect(),
                )
            })
            .unwrap();

        assert_eq!(
            keys,
            vec![
                1u64.to_be_bytes().to_vec(),
                2u64.to_be_bytes().to_vec(),
                3u64.to_be_bytes().to_vec(),
            ]
        );
    }

    #[test]
    fn sequence_is_monotonic_within_and_across_transactions() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.create_bucket_if_missing("b"))
            .unwrap();

        let (a, b): (u64, u64) = engine
            .update(|tx| Ok::<_, EngineError>((tx.next_sequence("b")?, tx.next_sequence("b")?)))
            .unwrap();
        let c: u64 = engine.update(|tx| tx.next_sequence("b")).unwrap();

        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn failed_closure_rolls_back() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.create_bucket_if_missing("b"))
            .unwrap();

        let result: Result<(), EngineError> = engine.update(|tx| {
            tx.put("b", b"k".to_vec(), b"v".to_vec())?;
            let _ = tx.next_sequence("b")?;
            Err(EngineError::BucketNotFound("forced abort".to_string()))
        });
        assert!(result.is_err());

        engine
            .view(|tx| {
                let bucket = tx.bucket("b")?;
                assert!(bucket.is_empty());
                assert_eq!(bucket.sequence(), 0);
                Ok::<_, EngineError>(())
            })
            .unwrap();
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let engine = open_engine(&dir);
            engine
                .update(|tx| {
                    tx.create_bucket_if_missing("b")?;
                    let seq = tx.next_sequence("b")?;
                    tx.put("b", seq.to_be_bytes().to_vec(), b"hello".to_vec())
                })
                .unwrap();
        }

        let engine = open_engine(&dir);
        engine
            .view(|tx| {
                let bucket = tx.bucket("b")?;
                assert_eq!(bucket.sequence(), 1);
                assert_eq!(bucket.get(&1u64.to_be_bytes()), Some(b"hello".as_slice()));
                Ok::<_, EngineError>(())
            })
            .unwrap();
    }
}
