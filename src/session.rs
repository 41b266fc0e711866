//! Owns the open device handle and exposes the
//! three external operations — list NTFS partitions, extract one partition's
//! `$MFT`, and scan a local copy into a catalogue — without resorting to the
//! process-global mutable state the reference tool used.

use crate::byte_reader::DeviceReader;
use crate::catalogue::Catalogue;
use crate::error::{NtfsError, Result};
use crate::mbr::{self, PartitionNode};
use crate::mft_extractor::{self, ExtractedMft};
use crate::mft_scanner::{self, ScanStats};
use std::path::Path;
use tracing::info;

pub struct Session {
    reader: DeviceReader,
    partitions: PartitionNode,
}

impl Session {
    pub fn open(device_path: &Path) -> Result<Self> {
        let mut reader = DeviceReader::open(device_path)?;
        let partitions = mbr::read_partition_table(&mut reader)?;
        Ok(Self { reader, partitions })
    }

    pub fn partition_table(&self) -> &PartitionNode {
        &self.partitions
    }

    pub fn ntfs_partition_offsets(&self) -> Vec<u64> {
        self.partitions.ntfs_partition_offsets()
    }

    /// Extracts the `$MFT` of the NTFS partition starting at
    /// `partition_start_bytes` (one of `ntfs_partition_offsets()`).
    pub fn extract_mft_of(&mut self, partition_start_bytes: u64) -> Result<ExtractedMft> {
        if !self
            .ntfs_partition_offsets()
            .contains(&partition_start_bytes)
        {
            return Err(NtfsError::NoNtfsPartitions);
        }
        info!(partition_start_bytes, "extracting $MFT");
        mft_extractor::extract_mft(&mut self.reader, partition_start_bytes)
    }

    /// Scans an already-extracted local `$MFT` copy into a catalogue.
    pub fn scan(&self, extracted: &ExtractedMft) -> Result<(Catalogue, ScanStats)> {
        mft_scanner::scan(&extracted.local_copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_on_disk_with_no_ntfs_partitions_yields_empty_list() {
        let mut disk = vec![0u8; crate::structures::PARTITION_TABLE_OFFSET + 64];
        disk.extend_from_slice(&[0x55, 0xAA]);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&disk).unwrap();
        f.flush().unwrap();

        let session = Session::open(f.path()).unwrap();
        assert!(session.ntfs_partition_offsets().is_empty());
    }

    #[test]
    fn extract_mft_of_unknown_offset_is_rejected() {
        let mut disk = vec![0u8; crate::structures::PARTITION_TABLE_OFFSET + 64];
        disk.extend_from_slice(&[0x55, 0xAA]);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&disk).unwrap();
        f.flush().unwrap();

        let mut session = Session::open(f.path()).unwrap();
        let result = session.extract_mft_of(999_999);
        assert!(matches!(result, Err(NtfsError::NoNtfsPartitions)));
    }
}
