//! Append-only commit log.
//!
//! The log is the single durable artifact of the engine. Writes go through
//! `LogWriter::append`, which fsyncs before returning; recovery goes through
//! `replay`, which decodes every committed frame in file order.
//!
//! A checksum-invalid frame anywhere in the file is corruption and refuses
//! to open. A truncated frame at the very end is an unfinished commit from
//! a torn final write; it is discarded and the file is trimmed back to the
//! last complete frame on open.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::errors::{EngineError, EngineResult};
use super::frame::{CommitFrame, FrameDecodeError};
use crate::observability::{Logger, Severity};

/// Appends commit frames with fsync after every write.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    offset: u64,
    // Set when a failed append could not be rolled back; the writer then
    // refuses all further appends.
    poisoned: bool,
}

impl LogWriter {
    /// Open the log for appending, trimming any torn tail past `valid_len`.
    ///
    /// `valid_len` comes from `replay`: the byte offset just past the last
    /// complete frame.
    pub fn open(path: &Path, valid_len: u64) -> EngineResult<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| EngineError::io(format!("open log {}", path.display()), e))?;

        let actual_len = file
            .metadata()
            .map_err(|e| EngineError::io("read log metadata", e))?
            .len();

        if actual_len > valid_len {
            file.set_len(valid_len)
                .map_err(|e| EngineError::io("trim torn log tail", e))?;
            file.sync_all()
                .map_err(|e| EngineError::io("fsync after trimming log tail", e))?;
            Logger::log(
                Severity::Warn,
                "log_tail_discarded",
                &[
                    ("path", &path.display().to_string()),
                    ("discarded_bytes", &(actual_len - valid_len).to_string()),
                ],
            );
        }

        file.seek(SeekFrom::Start(valid_len))
            .map_err(|e| EngineError::io("seek to log end", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: valid_len,
            poisoned: false,
        })
    }

    /// Current end-of-log offset.
    #[cfg(test)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Append one commit frame and fsync.
    ///
    /// The frame is not visible to readers until the caller applies it to
    /// the in-memory image, which must happen only after this returns Ok.
    ///
    /// A failed append leaves no trace: whatever bytes reached the file
    /// are trimmed back off before the error is returned, so a commit
    /// that was never acknowledged cannot be resurrected by a later
    /// replay, and the next append starts from a clean tail. If even the
    /// trim fails, the writer poisons itself and refuses further appends.
    pub fn append(&mut self, frame: &CommitFrame) -> EngineResult<u64> {
        if self.poisoned {
            return Err(EngineError::LogPoisoned);
        }

        let serialized = frame
            .serialize()
            .map_err(|e| EngineError::FrameTooLarge { size: e.size })?;
        let offset = self.offset;

        let written = self
            .file
            .write_all(&serialized)
            .map_err(|e| {
                EngineError::io(format!("append commit to {}", self.path.display()), e)
            })
            .and_then(|()| {
                // fsync is mandatory: a commit is durable before it is
                // visible.
                self.file
                    .sync_all()
                    .map_err(|e| EngineError::io("fsync after commit", e))
            });

        if let Err(err) = written {
            if self.restore_tail().is_err() {
                self.poisoned = true;
            }
            return Err(err);
        }

        self.offset += serialized.len() as u64;
        Ok(offset)
    }

    /// Trim the file back to the last acknowledged commit and reposition
    /// the cursor there.
    fn restore_tail(&mut self) -> io::Result<()> {
        self.file.set_len(self.offset)?;
        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.sync_all()
    }
}

/// Decode every complete frame in the log.
///
/// Returns the frames in commit order plus the offset past the last
/// complete frame. A missing file is an empty log.
pub fn replay(path: &Path) -> EngineResult<(Vec<CommitFrame>, u64)> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(EngineError::io(format!("read log {}", path.display()), e)),
    };

    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        match CommitFrame::deserialize(&data[offset..]) {
            Ok((frame, consumed)) => {
                frames.push(frame);
                offset += consumed;
            }
            // Incomplete final frame: a commit that never finished. The
            // caller trims it on the next writer open.
            Err(FrameDecodeError::Truncated) => break,
            Err(FrameDecodeError::Corrupt(reason)) => {
                return Err(EngineError::corruption(offset as u64, reason));
            }
        }
    }

    Ok((frames, offset as u64))
}
