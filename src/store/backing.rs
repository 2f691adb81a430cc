//! Random-access byte source shared by every entity of one message.
//!
//! Entities are queried in arbitrary order, so every read is an absolute
//! range request. Buffers hand out borrowed slices; streams
//! seek before each read and return an owned copy.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{EntityError, Result};

/// Anything we can seek in and read from, boxed behind the stream variant.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

enum Source {
    Buffer(Vec<u8>),
    Stream(Mutex<Box<dyn ReadSeek>>),
}

/// The raw bytes of a whole message.
///
/// One store exists per message; entities borrow it and never own it.
/// The stream variant serializes access through a mutex, so a store can be
/// shared across threads regardless of its backing.
pub struct BackingStore {
    path: PathBuf,
    len: u64,
    source: Source,
}

impl BackingStore {
    /// Wrap a fully received message held in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            path: PathBuf::from("<memory>"),
            len: bytes.len() as u64,
            source: Source::Buffer(bytes),
        }
    }

    /// Wrap an arbitrary seekable reader.
    pub fn from_reader<R>(mut reader: R) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            path: PathBuf::from("<stream>"),
            len,
            source: Source::Stream(Mutex::new(Box::new(reader))),
        })
    }

    /// Open a message file for seek-and-read access.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = open_file(&path)?;
        let len = file
            .seek(SeekFrom::End(0))
            .map_err(|e| EntityError::io(&path, e))?;
        Ok(Self {
            path,
            len,
            source: Source::Stream(Mutex::new(Box::new(file))),
        })
    }

    /// Total size of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// `true` if the source holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the underlying file, or a placeholder for memory and streams.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the half-open range `[start, end)`.
    ///
    /// An empty or inverted range yields no bytes. Ranges running past the
    /// end of the source are clamped to it.
    pub fn read_range(&self, start: u64, end: u64) -> Result<Cow<'_, [u8]>> {
        let end = end.min(self.len);
        if start >= end {
            return Ok(Cow::Borrowed(&[]));
        }

        match &self.source {
            Source::Buffer(bytes) => Ok(Cow::Borrowed(&bytes[start as usize..end as usize])),
            Source::Stream(stream) => {
                debug!(start, end, path = %self.path.display(), "Reading range from stream");
                let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                stream
                    .seek(SeekFrom::Start(start))
                    .map_err(|e| EntityError::io(&self.path, e))?;
                let mut buf = vec![0u8; (end - start) as usize];
                stream
                    .read_exact(&mut buf)
                    .map_err(|e| EntityError::io(&self.path, e))?;
                Ok(Cow::Owned(buf))
            }
        }
    }

    /// Read the whole source.
    pub fn read_all(&self) -> Result<Cow<'_, [u8]>> {
        self.read_range(0, self.len)
    }
}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.source {
            Source::Buffer(_) => "buffer",
            Source::Stream(_) => "stream",
        };
        f.debug_struct("BackingStore")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("kind", &kind)
            .finish()
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EntityError::FileNotFound(path.to_path_buf())
        } else {
            EntityError::io(path, e)
        }
    })
}
