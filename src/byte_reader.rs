//! Positioned reads over the raw block device.
//!
//! Exposes absolute seek, relative seek and bounded reads into a
//! caller-provided buffer. Every operation fails with `NtfsError::Io` on an
//! underlying OS error, and a read that returns fewer bytes than requested
//! is treated as `NtfsError::ShortRead` rather than silently truncated —
//! the device is assumed not to be a stream.

use crate::error::{NtfsError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub struct DeviceReader {
    file: File,
}

impl DeviceReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::Current(0))?)
    }

    pub fn seek_absolute(&mut self, offset: u64) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::Start(offset))?)
    }

    pub fn seek_relative(&mut self, delta: i64) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::Current(delta))?)
    }

    /// Reads exactly `buf.len()` bytes at the current position. A short
    /// read (device ended early) is reported as `ShortRead`, never
    /// silently returned as a partial buffer.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let expected = buf.len();
        match self.file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(NtfsError::ShortRead { expected, got: 0 })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek_absolute(offset)?;
        self.read_exact(buf)
    }

    pub fn read_vec_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}
