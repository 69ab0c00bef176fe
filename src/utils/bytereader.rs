use std::cmp::min;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

use crate::utils::error::{PngError, PngResult};
use crate::utils::traits::GrowBuffer;

/// Byte-oriented reader over a seekable stream that never holds more than a fixed
/// window of the stream in memory.
///
/// The window ("cache") is refilled whenever the last cached byte is consumed, so the
/// reader can walk files far larger than the configured cap.
#[derive(Debug)]
pub struct ByteReader<R: Read + Seek> {
    source: Option<R>,
    open_path: Option<PathBuf>,
    cache: Vec<u8>,
    cache_pos: usize,
    cache_limit: usize,
    file_pos: u64,
    file_total: u64,
    eof: bool,
}

impl<R: Read + Seek> Default for ByteReader<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteReader<File> {
    /// Opens the file at `path` and performs the initial cache fill.
    ///
    /// # Parameters
    /// - `path`: The file to read
    /// - `max_buffer_size`: Cache cap in bytes, `0` caches the whole file
    ///
    /// # Returns
    /// - `PngError::AlreadyOpen` if a file is already open
    /// - `PngError::FileOpenFailed` if the OS refuses the path
    pub fn open<P: AsRef<Path>>(&mut self, path: P, max_buffer_size: usize) -> PngResult<()> {
        if self.is_open() {
            return Err(PngError::AlreadyOpen);
        }

        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PngError::FileOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        self.attach(file, max_buffer_size)?;
        self.open_path = Some(path.to_path_buf());

        debug!(
            "Opened {} ({} bytes, cache of {} bytes)",
            path.display(),
            self.file_total,
            self.cache.len()
        );

        Ok(())
    }
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new() -> Self {
        ByteReader {
            source: None,
            open_path: None,
            cache: Vec::new(),
            cache_pos: 0,
            cache_limit: 0,
            file_pos: 0,
            file_total: 0,
            eof: false,
        }
    }

    /// Takes ownership of `source` and reads it from its first byte.
    ///
    /// Works like [`ByteReader::open`] for streams that are already open, such as
    /// in-memory cursors.
    ///
    /// # Parameters
    /// - `source`: The stream to read
    /// - `max_buffer_size`: Cache cap in bytes, `0` caches the whole stream
    pub fn attach(&mut self, mut source: R, max_buffer_size: usize) -> PngResult<()> {
        if self.is_open() {
            return Err(PngError::AlreadyOpen);
        }

        let file_total = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let cache_size = if max_buffer_size == 0 {
            file_total
        } else {
            min(max_buffer_size as u64, file_total)
        };
        let cache_size = usize::try_from(cache_size).map_err(|_| {
            PngError::Unsupported(format!("stream of {} bytes cannot be cached whole", file_total))
        })?;

        self.source = Some(source);
        self.cache = vec![0; cache_size];
        self.cache_pos = 0;
        self.cache_limit = 0;
        self.file_pos = 0;
        self.file_total = file_total;
        self.eof = false;

        if let Err(e) = self.refill() {
            self.reset();
            return Err(e);
        }

        Ok(())
    }

    /// Closes the underlying stream and resets all state.
    pub fn close(&mut self) -> PngResult<()> {
        self.ensure_open()?;

        if let Some(path) = &self.open_path {
            debug!("Closing {}", path.display());
        }

        self.reset();

        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn open_path(&self) -> Option<&Path> {
        self.open_path.as_deref()
    }

    /// Returns `true` once the last byte of the stream has been consumed.
    pub fn eof(&self) -> PngResult<bool> {
        self.ensure_open()?;
        Ok(self.eof)
    }

    /// Returns the number of bytes still readable from the current position.
    pub fn remaining(&self) -> PngResult<u64> {
        self.ensure_open()?;
        Ok(self.file_total - self.file_pos + (self.cache_limit - self.cache_pos) as u64)
    }

    pub fn file_size(&self) -> PngResult<u64> {
        self.ensure_open()?;
        Ok(self.file_total)
    }

    /// Returns the offset of the next byte to be read.
    pub fn position(&self) -> PngResult<u64> {
        self.ensure_open()?;
        Ok(self.file_pos - self.cache_limit as u64 + self.cache_pos as u64)
    }

    /// Reads a single byte.
    ///
    /// # Returns
    /// - The byte read
    /// - `PngError::EndOfStream` if every byte has been consumed
    pub fn read_u8(&mut self) -> PngResult<u8> {
        self.ensure_open()?;

        if self.eof {
            return Err(PngError::EndOfStream);
        }

        let byte = self.cache[self.cache_pos];
        self.cache_pos += 1;

        if self.cache_pos == self.cache_limit {
            self.refill()?;
        }

        Ok(byte)
    }

    pub fn read_u16_be(&mut self) -> PngResult<u16> {
        self.read_be(2).map(|v| v as u16)
    }

    pub fn read_u16_le(&mut self) -> PngResult<u16> {
        self.read_le(2).map(|v| v as u16)
    }

    /// Reads three bytes, zero-extended into the high byte of the result.
    pub fn read_u24_be(&mut self) -> PngResult<u32> {
        self.read_be(3).map(|v| v as u32)
    }

    pub fn read_u24_le(&mut self) -> PngResult<u32> {
        self.read_le(3).map(|v| v as u32)
    }

    pub fn read_u32_be(&mut self) -> PngResult<u32> {
        self.read_be(4).map(|v| v as u32)
    }

    pub fn read_u32_le(&mut self) -> PngResult<u32> {
        self.read_le(4).map(|v| v as u32)
    }

    pub fn read_u64_be(&mut self) -> PngResult<u64> {
        self.read_be(8)
    }

    pub fn read_u64_le(&mut self) -> PngResult<u64> {
        self.read_le(8)
    }

    /// Appends exactly `n` bytes to `buffer`.
    /// Nothing is consumed if fewer than `n` bytes remain.
    ///
    /// # Parameters
    /// - `buffer`: Destination, grown as needed
    /// - `n`: The number of bytes to read
    pub fn read_bytes_into(&mut self, buffer: &mut Vec<u8>, n: usize) -> PngResult<()> {
        self.require(n as u64)?;
        buffer.grow_to_fit(buffer.len() + n);

        let mut left = n;
        while left > 0 {
            let take = min(self.cache_limit - self.cache_pos, left);
            buffer.extend_from_slice(&self.cache[self.cache_pos..self.cache_pos + take]);

            self.cache_pos += take;
            left -= take;

            if self.cache_pos == self.cache_limit {
                self.refill()?;
            }
        }

        Ok(())
    }

    /// Advances the position by `n` bytes without copying them.
    /// Seeks the underlying stream when the target lies past the cached window.
    pub fn skip(&mut self, n: u64) -> PngResult<()> {
        self.require(n)?;

        let cached = (self.cache_limit - self.cache_pos) as u64;
        if n < cached {
            self.cache_pos += n as usize;
            return Ok(());
        }

        let target = self.position()? + n;
        let source = self.source.as_mut().ok_or(PngError::NoOpenFile)?;
        source.seek(SeekFrom::Start(target))?;

        self.file_pos = target;
        self.refill()
    }

    fn read_be(&mut self, n: usize) -> PngResult<u64> {
        self.require(n as u64)?;

        let mut value = 0u64;
        for i in 0..n {
            value |= (self.read_u8()? as u64) << (8 * (n - 1 - i));
        }

        Ok(value)
    }

    fn read_le(&mut self, n: usize) -> PngResult<u64> {
        self.require(n as u64)?;

        let mut value = 0u64;
        for i in 0..n {
            value |= (self.read_u8()? as u64) << (8 * i);
        }

        Ok(value)
    }

    fn require(&self, n: u64) -> PngResult<()> {
        if self.remaining()? < n {
            return Err(PngError::EndOfStream);
        }

        Ok(())
    }

    fn refill(&mut self) -> PngResult<()> {
        let source = self.source.as_mut().ok_or(PngError::NoOpenFile)?;
        let want = min(self.cache.len() as u64, self.file_total - self.file_pos) as usize;

        self.cache_pos = 0;
        self.cache_limit = want;

        if want == 0 {
            self.eof = true;
            return Ok(());
        }

        source.read_exact(&mut self.cache[..want])?;
        self.file_pos += want as u64;

        Ok(())
    }

    fn ensure_open(&self) -> PngResult<()> {
        if self.source.is_none() {
            return Err(PngError::NoOpenFile);
        }

        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
