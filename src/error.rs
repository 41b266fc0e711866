//! Error taxonomy for the core (partition table, boot sector, MFT extraction and scan).
//!
//! Mirrors the reference tool's failure modes but replaces `panic!`/`.expect()`
//! with typed, propagated errors so a caller can distinguish "no NTFS here"
//! from "disk looks corrupt" from "short read on the device".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NtfsError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    #[error("malformed boot sector: {0}")]
    MalformedBootSector(String),

    #[error("malformed data run list: {0}")]
    MalformedRunList(String),

    #[error("attribute at cursor {cursor} overflows record (full_length={full_length}, record_size={record_size})")]
    BadAttribute {
        cursor: usize,
        full_length: u32,
        record_size: usize,
    },

    #[error("unexpected MFT layout: record 0 is not $MFT ({reason})")]
    UnexpectedMftLayout { reason: String },

    #[error("corrupt local MFT copy: unrecognised signature {signature:?} at slot {slot}")]
    CorruptMft { signature: [u8; 4], slot: usize },

    #[error("No NTFS partitions found (please check user privileges)")]
    NoNtfsPartitions,
}

pub type Result<T> = std::result::Result<T, NtfsError>;
