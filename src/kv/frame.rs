//! Commit frame encoding.
//!
//! Every committed read-write transaction appends exactly one frame:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, includes length and checksum)
//! +------------------+
//! | Op Count         | (u32 LE)
//! +------------------+
//! | Ops              | (tagged, length-prefixed fields)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over all preceding bytes)
//! +------------------+
//! ```
//!
//! Grouping a whole transaction into one checksummed frame is what makes
//! commits all-or-nothing on disk: replay either applies every op in the
//! frame or none of them.

use std::io::{self, Read};

const TAG_CREATE_BUCKET: u8 = 1;
const TAG_PUT: u8 = 2;
const TAG_DELETE: u8 = 3;
const TAG_SET_SEQUENCE: u8 = 4;

/// Minimum frame size: length + op count + checksum.
pub(crate) const MIN_FRAME_SIZE: usize = 4 + 4 + 4;

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    /// Ensure a bucket exists. Idempotent on replay.
    CreateBucket { bucket: String },
    /// Insert or overwrite one key.
    Put {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    /// Remove one key.
    Delete { bucket: String, key: Vec<u8> },
    /// Advance a bucket's sequence counter. Counters never rewind.
    SetSequence { bucket: String, seq: u64 },
}

/// Why a frame could not be decoded.
///
/// `Truncated` means the buffer ended mid-frame; the replay path treats it
/// as a torn final write and discards the tail. Anything else is corruption.
#[derive(Debug)]
pub enum FrameDecodeError {
    Truncated,
    Corrupt(String),
}

/// A frame whose encoding exceeds what the u32 length prefix can carry.
///
/// Returned instead of letting an oversized length silently truncate into
/// a corrupt frame.
#[derive(Debug)]
pub struct FrameSizeError {
    pub size: u64,
}

fn checked_frame_len(body_len: usize) -> Result<u32, FrameSizeError> {
    let total = 4 + body_len as u64 + 4;
    if total > u32::MAX as u64 {
        return Err(FrameSizeError { size: total });
    }
    Ok(total as u32)
}

/// The unit of commit: all ops of one read-write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFrame {
    pub ops: Vec<LogOp>,
}

impl CommitFrame {
    pub fn new(ops: Vec<LogOp>) -> Self {
        Self { ops }
    }

    /// Serialize the frame, checksum included.
    ///
    /// Fails if the encoding cannot fit the u32 length prefix; nothing of
    /// an oversized frame is ever emitted.
    pub fn serialize(&self) -> Result<Vec<u8>, FrameSizeError> {
        let mut body = Vec::new();
        body.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());
        for op in &self.ops {
            encode_op(&mut body, op);
        }

        let frame_len = checked_frame_len(body.len())?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&frame_len.to_le_bytes());
        hasher.update(&body);
        let checksum = hasher.finalize();

        let mut frame = Vec::with_capacity(frame_len as usize);
        frame.extend_from_slice(&frame_len.to_le_bytes());
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&checksum.to_le_bytes());
        Ok(frame)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> Result<(Self, usize), FrameDecodeError> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(FrameDecodeError::Truncated);
        }

        let frame_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if frame_len < MIN_FRAME_SIZE {
            return Err(FrameDecodeError::Corrupt(format!(
                "frame length {} below minimum",
                frame_len
            )));
        }
        if data.len() < frame_len {
            return Err(FrameDecodeError::Truncated);
        }

        let checksum_offset = frame_len - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = crc32fast::hash(&data[..checksum_offset]);
        if computed != stored {
            return Err(FrameDecodeError::Corrupt(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            )));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);
        let op_count = read_u32(&mut cursor)?;
        let mut ops = Vec::with_capacity(op_count as usize);
        for _ in 0..op_count {
            ops.push(decode_op(&mut cursor)?);
        }

        Ok((Self { ops }, frame_len))
    }
}

fn encode_op(buf: &mut Vec<u8>, op: &LogOp) {
    match op {
        LogOp::CreateBucket { bucket } => {
            buf.push(TAG_CREATE_BUCKET);
            encode_bytes(buf, bucket.as_bytes());
        }
        LogOp::Put { bucket, key, value } => {
            buf.push(TAG_PUT);
            encode_bytes(buf, bucket.as_bytes());
            encode_bytes(buf, key);
            encode_bytes(buf, value);
        }
        LogOp::Delete { bucket, key } => {
            buf.push(TAG_DELETE);
            encode_bytes(buf, bucket.as_bytes());
            encode_bytes(buf, key);
        }
        LogOp::SetSequence { bucket, seq } => {
            buf.push(TAG_SET_SEQUENCE);
            encode_bytes(buf, bucket.as_bytes());
            buf.extend_from_slice(&seq.to_le_bytes());
        }
    }
}

fn decode_op<R: Read>(reader: &mut R) -> Result<LogOp, FrameDecodeError> {
    let mut tag = [0u8; 1];
    reader
        .read_exact(&mut tag)
        .map_err(|_| FrameDecodeError::Corrupt("op tag missing".to_string()))?;

    match tag[0] {
        TAG_CREATE_BUCKET => Ok(LogOp::CreateBucket {
            bucket: read_string(reader)?,
        }),
        TAG_PUT => Ok(LogOp::Put {
            bucket: read_string(reader)?,
            key: read_bytes(reader)?,
            value: read_bytes(reader)?,
        }),
        TAG_DELETE => Ok(LogOp::Delete {
            bucket: read_string(reader)?,
            key: read_bytes(reader)?,
        }),
        TAG_SET_SEQUENCE => {
            let bucket = read_string(reader)?;
            let mut seq_buf = [0u8; 8];
            reader
                .read_exact(&mut seq_buf)
                .map_err(|_| FrameDecodeError::Corrupt("sequence value missing".to_string()))?;
            Ok(LogOp::SetSequence {
                bucket,
                seq: u64::from_le_bytes(seq_buf),
            })
        }
        other => Err(FrameDecodeError::Corrupt(format!("unknown op tag {}", other))),
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, FrameDecodeError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| FrameDecodeError::Corrupt("unexpected end of frame body".to_string()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameDecodeError> {
    let len = read_u32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| FrameDecodeError::Corrupt("field shorter than its length prefix".to_string()))?;
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, FrameDecodeError> {
    let bytes = read_bytes(reader)?;
    String::from_utf8(bytes)
        .map_err(|e| FrameDecodeError::Corrupt(format!("bucket name not UTF-8: {}", e)))
}
