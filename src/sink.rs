//! Destination artifacts: random-access byte sinks written at absolute offsets.
//!
//! Chunks arrive in completion order, not planning order, so every write names its
//! absolute offset. Writes to different offsets are independent of one another.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A random-access byte sink supporting "write N bytes at offset O".
pub trait ArtifactSink: Send + Sync {
    /// Write all of `buf` starting at absolute byte `offset`
    fn write_at(&self, offset: u64, buf: &[u8]) -> std::io::Result<()>;

    /// Make written data durable
    fn sync(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Cross-platform positional file write.
///
/// Writes `buf` to `file` at the given byte `offset`, equivalent to Unix `pwrite`.
#[cfg(unix)]
fn write_all_at(file: &std::fs::File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

/// Cross-platform positional file write.
///
/// Writes `buf` to `file` at the given byte `offset`, equivalent to Unix `pwrite`.
#[cfg(windows)]
fn write_all_at(file: &std::fs::File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut written = 0;
    while written < buf.len() {
        let n = file.seek_write(&buf[written..], offset + written as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "failed to write whole buffer",
            ));
        }
        written += n;
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn write_all_at(_file: &std::fs::File, _buf: &[u8], _offset: u64) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "positional writes not supported on this platform",
    ))
}

/// File-backed sink using positional writes (`pwrite` / `seek_write`).
///
/// Positional writes take `&self`, so the file handle needs no lock.
#[derive(Debug)]
pub struct FileSink {
    file: std::fs::File,
    path: PathBuf,
}

impl FileSink {
    /// Create (or truncate) `path`, optionally pre-sizing it to `size` bytes
    ///
    /// Pre-sizing produces a sparse file on filesystems that support it.
    pub fn create(path: &Path, size: Option<u64>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        if let Some(size) = size {
            file.set_len(size)?;
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing artifact for writing without truncating it
    pub fn open_existing(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().write(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSink for FileSink {
    fn write_at(&self, offset: u64, buf: &[u8]) -> std::io::Result<()> {
        write_all_at(&self.file, buf, offset)
    }

    fn sync(&self) -> std::io::Result<()> {
        self.file.sync_all()
    }
}

/// Growable in-memory sink
///
/// Gaps left by out-of-order writes are zero-filled until written.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Mutex<Vec<u8>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-sized to `size` zero bytes
    pub fn with_size(size: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; size]),
        }
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        match self.data.lock() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ArtifactSink for MemorySink {
    fn write_at(&self, offset: u64, buf: &[u8]) -> std::io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("offset {offset} does not fit in memory"),
            )
        })?;
        let end = start + buf.len();

        let mut data = self
            .data
            .lock()
            .map_err(|_| std::io::Error::other("memory sink lock poisoned"))?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }
}
