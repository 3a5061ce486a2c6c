//! Engine durability and atomicity tests.
//!
//! - A committed transaction survives close and reopen.
//! - Sequence counters persist across restarts and never rewind.
//! - A torn final write is discarded as an unfinished commit.
//! - Interior corruption refuses to open rather than skipping data.
//! - A transaction commits all of its ops or none of them.

use std::fs;

use echodb::kv::{Engine, EngineError};
use tempfile::TempDir;

const BUCKET: &str = "messages";

fn open(dir: &TempDir) -> Engine {
    Engine::open(dir.path()).expect("engine should open")
}

fn with_bucket(dir: &TempDir) -> Engine {
    let engine = open(dir);
    engine
        .update(|tx| tx.create_bucket_if_missing(BUCKET))
        .unwrap();
    engine
}

#[test]
fn committed_writes_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let engine = with_bucket(&dir);
        engine
            .update(|tx| {
                tx.put(BUCKET, b"alpha".to_vec(), b"1".to_vec())?;
                tx.put(BUCKET, b"beta".to_vec(), b"2".to_vec())
            })
            .unwrap();
    }

    let engine = open(&dir);
    engine
        .view(|tx| {
            let bucket = tx.bucket(BUCKET)?;
            assert_eq!(bucket.get(b"alpha"), Some(b"1".as_slice()));
            assert_eq!(bucket.get(b"beta"), Some(b"2".as_slice()));
            Ok::<_, EngineError>(())
        })
        .unwrap();
}

#[test]
fn deletes_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let engine = with_bucket(&dir);
        engine
            .update(|tx| tx.put(BUCKET, b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        engine
            .update(|tx| tx.delete(BUCKET, b"k".to_vec()))
            .unwrap();
    }

    let engine = open(&dir);
    engine
        .view(|tx| {
            assert_eq!(tx.bucket(BUCKET)?.get(b"k"), None);
            Ok::<_, EngineError>(())
        })
        .unwrap();
}

#[test]
fn sequence_counter_never_rewinds_across_restarts() {
    let dir = TempDir::new().unwrap();

    {
        let engine = with_bucket(&dir);
        for _ in 0..3 {
            engine.update(|tx| tx.next_sequence(BUCKET)).unwrap();
        }
        // Delete the highest-keyed record; the counter must not care.
        engine
            .update(|tx| tx.delete(BUCKET, 3u64.to_be_bytes().to_vec()))
            .unwrap();
    }

    let engine = open(&dir);
    let next: u64 = engine.update(|tx| tx.next_sequence(BUCKET)).unwrap();
    assert_eq!(next, 4);
}

#[test]
fn torn_final_write_is_discarded_on_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("echo.db");

    {
        let engine = with_bucket(&dir);
        engine
            .update(|tx| tx.put(BUCKET, b"good".to_vec(), b"v".to_vec()))
            .unwrap();
    }

    // Append garbage that looks like the start of a frame but ends early.
    let mut contents = fs::read(&db_path).unwrap();
    let intact_len = contents.len() as u64;
    contents.extend_from_slice(&[0x40, 0x00, 0x00, 0x00, 0x01]);
    fs::write(&db_path, &contents).unwrap();

    let engine = open(&dir);
    engine
        .view(|tx| {
            assert_eq!(tx.bucket(BUCKET)?.get(b"good"), Some(b"v".as_slice()));
            Ok::<_, EngineError>(())
        })
        .unwrap();

    // The tail was trimmed off the file.
    assert_eq!(fs::metadata(&db_path).unwrap().len(), intact_len);
}

#[test]
fn interior_corruption_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("echo.db");

    {
        let engine = with_bucket(&dir);
        engine
            .update(|tx| tx.put(BUCKET, b"k".to_vec(), b"v".to_vec()))
            .unwrap();
        engine
            .update(|tx| tx.put(BUCKET, b"k2".to_vec(), b"v2".to_vec()))
            .unwrap();
    }

    let mut contents = fs::read(&db_path).unwrap();
    contents[8] ^= 0xFF;
    fs::write(&db_path, &contents).unwrap();

    match Engine::open(dir.path()) {
        Err(EngineError::Corruption { .. }) => {}
        other => panic!("expected corruption error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn aborted_transaction_leaves_no_trace_on_disk() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("echo.db");

    let before;
    {
        let engine = with_bucket(&dir);
        before = fs::metadata(&db_path).unwrap().len();

        let result: Result<(), EngineError> = engine.update(|tx| {
            tx.put(BUCKET, b"k".to_vec(), b"v".to_vec())?;
            Err(EngineError::BucketNotFound("abort".to_string()))
        });
        assert!(result.is_err());
    }

    assert_eq!(fs::metadata(&db_path).unwrap().len(), before);
}

#[test]
fn second_engine_cannot_open_a_locked_directory() {
    let dir = TempDir::new().unwrap();
    let held = open(&dir);

    // Lock acquisition retries for its full timeout before giving up, so
    // this takes a few seconds by design.
    match Engine::open(dir.path()) {
        Err(EngineError::Locked(_)) => {}
        other => panic!("expected lock contention, got {:?}", other.map(|_| ())),
    }

    drop(held);
    assert!(Engine::open(dir.path()).is_ok());
}
