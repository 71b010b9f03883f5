//! MBOX store: reads individual messages by offset with LRU caching.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::debug;

use crate::error::{MboxError, Result};
use crate::model::mail::MessageRecord;

/// Default number of raw messages to keep in the LRU cache.
pub const DEFAULT_CACHE_SIZE: usize = 32;

/// Reads messages from an mbox file using index offsets.
///
/// The file is opened read-only. Recently shown messages are kept in an
/// LRU cache so that paging back and forth does not hit the disk again.
pub struct MboxStore {
    path: PathBuf,
    file: File,
    cache: LruCache<u64, Vec<u8>>,
}

impl MboxStore {
    /// Open an mbox file for random-access reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_cache_size(path, DEFAULT_CACHE_SIZE)
    }

    /// Open with a specific cache capacity (at least one entry).
    pub fn with_cache_size(path: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| MboxError::io(&path, e))?;
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            path,
            file,
            cache: LruCache::new(cache_size),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw bytes of a message (delimiter line included). Cached.
    pub fn get_raw_message(&mut self, record: &MessageRecord) -> Result<&[u8]> {
        if !self.cache.contains(&record.offset) {
            let raw = self.read_raw(record)?;
            self.cache.put(record.offset, raw);
        }
        self.cache
            .get(&record.offset)
            .map(Vec::as_slice)
            .ok_or_else(|| MboxError::InvalidArgument("message cache is empty".to_string()))
    }

    /// Raw bytes of a message, read straight from disk without caching.
    pub fn read_message(&mut self, record: &MessageRecord) -> Result<Vec<u8>> {
        self.read_raw(record)
    }

    /// Stream a message's exact byte range into `out` without caching it.
    ///
    /// Returns the number of bytes copied.
    pub fn copy_message<W: Write>(&mut self, record: &MessageRecord, out: &mut W) -> Result<u64> {
        self.seek_to(record)?;
        let copied = std::io::copy(&mut (&mut self.file).take(record.length), out)
            .map_err(|e| MboxError::io(&self.path, e))?;
        if copied != record.length {
            return Err(MboxError::io(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "message at offset {} is truncated ({copied} of {} bytes)",
                        record.offset, record.length
                    ),
                ),
            ));
        }
        Ok(copied)
    }

    fn seek_to(&mut self, record: &MessageRecord) -> Result<()> {
        debug!(
            offset = record.offset,
            length = record.length,
            "Reading message from MBOX"
        );
        self.file
            .seek(SeekFrom::Start(record.offset))
            .map_err(|e| MboxError::io(&self.path, e))?;
        Ok(())
    }

    /// Low-level: seek to offset and read `length` bytes.
    fn read_raw(&mut self, record: &MessageRecord) -> Result<Vec<u8>> {
        self.seek_to(record)?;
        let mut buf = vec![0u8; record.length as usize];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| MboxError::io(&self.path, e))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::{Headers, NormalizedDate};

    fn record(offset: u64, length: u64) -> MessageRecord {
        MessageRecord {
            index: 0,
            offset,
            length,
            headers: Headers::default(),
            date: NormalizedDate::Unparsed,
        }
    }

    #[test]
    fn test_raw_read_and_copy() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"0123456789abcdef").unwrap();
        f.flush().unwrap();

        let mut store = MboxStore::with_cache_size(f.path(), 0).unwrap();
        assert_eq!(store.get_raw_message(&record(4, 6)).unwrap(), b"456789");
        // Served from cache the second time
        assert_eq!(store.get_raw_message(&record(4, 6)).unwrap(), b"456789");

        let mut out = Vec::new();
        assert_eq!(store.copy_message(&record(10, 6), &mut out).unwrap(), 6);
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn test_truncated_source_is_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"short").unwrap();
        f.flush().unwrap();

        let mut store = MboxStore::open(f.path()).unwrap();
        let mut out = Vec::new();
        assert!(store.copy_message(&record(2, 10), &mut out).is_err());
        assert!(store.get_raw_message(&record(2, 10)).is_err());
    }
}
