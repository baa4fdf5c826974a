//! Inputs that can hand out independent, seekable read handles.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A byte source that can be opened several times, one handle per worker.
pub trait ChunkSource {
    /// Handle type moved into a worker thread.
    type Reader: Read + Seek + Send + 'static;

    /// Opens a fresh handle positioned at offset 0.
    fn open(&self) -> io::Result<Self::Reader>;

    /// Total size of the source in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Filesystem path backing the source, used for error context.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Wraps the file at `path`. Nothing is opened until [`ChunkSource::open`].
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ChunkSource for FileSource {
    type Reader = File;

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn size(&self) -> io::Result<u64> {
        fs::metadata(&self.path).map(|metadata| metadata.len())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Shared in-memory bytes; every handle is a cursor over the same buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    /// Copies `bytes` into a shared buffer.
    pub fn new<B: AsRef<[u8]>>(bytes: B) -> Self {
        Self {
            bytes: Arc::from(bytes.as_ref()),
        }
    }
}

impl ChunkSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn open(&self) -> io::Result<Self::Reader> {
        Ok(Cursor::new(Arc::clone(&self.bytes)))
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.bytes.len() as u64)
    }
}
