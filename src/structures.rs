//! Maps fixed-layout byte ranges onto the named
//! on-disk records. Pure, no I/O — every `decode_*` consumes exactly the
//! structure's on-disk size from the head of a byte slice.

use crate::cursor::{decode_utf16le, ByteCursor};
use crate::error::{NtfsError, Result};

pub const SECTOR_SIZE: u64 = 512;
pub const MFT_RECORD_SIZE: usize = 1024;
pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;
pub const PARTITION_ENTRY_SIZE: usize = 16;
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const NTFS_PARTITION_TYPE: u8 = 0x07;
pub const BOOTABLE_FLAG: u8 = 0x80;

/// A single entry of the four-entry primary DOS partition table.
#[derive(Debug, Clone, Copy)]
pub struct PartitionEntry {
    pub boot_indicator: u8,
    pub partition_type: u8,
    pub starting_chs: [u8; 3],
    pub ending_chs: [u8; 3],
    pub relative_sector: u32,
    pub sector_count: u32,
}

impl PartitionEntry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let boot_indicator = c.read_u8()?;
        let starting_chs = c.read_array::<3>()?;
        let partition_type = c.read_u8()?;
        let ending_chs = c.read_array::<3>()?;
        let relative_sector = c.read_u32()?;
        let sector_count = c.read_u32()?;
        Ok(Self {
            boot_indicator,
            partition_type,
            starting_chs,
            ending_chs,
            relative_sector,
            sector_count,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.sector_count == 0
    }

    pub fn is_ntfs(&self) -> bool {
        self.partition_type == NTFS_PARTITION_TYPE
    }

    pub fn is_extended(&self) -> bool {
        self.partition_type == 0x05 || self.partition_type == 0x0F
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_indicator == BOOTABLE_FLAG
    }

    pub fn start_bytes(&self) -> u64 {
        self.relative_sector as u64 * SECTOR_SIZE
    }
}

/// The NTFS boot sector's BPB fields relevant to locating the $MFT.
#[derive(Debug, Clone, Copy)]
pub struct BootSector {
    pub oem_id: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub total_sectors: u64,
    pub mft_start_lcn: u64,
    pub mft_mirror_lcn: u64,
    pub mft_record_size_code: i8,
    pub index_block_size_code: i8,
    pub volume_serial: u64,
}

impl BootSector {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let _jump_instruction = c.read_array::<3>()?;
        let oem_id = c.read_array::<8>()?;
        let bytes_per_sector = c.read_u16()?;
        let sectors_per_cluster = c.read_u8()?;
        c.skip(7)?; // reserved sectors + two always-zero BPB fields (NTFS doesn't use FAT's layout here)
        c.skip(1)?; // media descriptor
        c.skip(2)?; // unused
        c.skip(2)?; // sectors per track
        c.skip(2)?; // number of heads
        c.skip(4)?; // hidden sectors
        c.skip(4)?; // unused
        c.skip(4)?; // unused (0x80 00 80 00 typically)
        let total_sectors = c.read_u64()?;
        let mft_start_lcn = c.read_u64()?;
        let mft_mirror_lcn = c.read_u64()?;
        let mft_record_size_code = c.read_i8()?;
        c.skip(3)?;
        let index_block_size_code = c.read_i8()?;
        c.skip(3)?;
        let volume_serial = c.read_u64()?;

        if bytes_per_sector == 0
            || !bytes_per_sector.is_power_of_two()
            || bytes_per_sector < 512
            || bytes_per_sector > 4096
        {
            return Err(NtfsError::MalformedBootSector(format!(
                "bytes_per_sector {bytes_per_sector} is not a power of two in [512, 4096]"
            )));
        }

        Ok(Self {
            oem_id,
            bytes_per_sector,
            sectors_per_cluster,
            total_sectors,
            mft_start_lcn,
            mft_mirror_lcn,
            mft_record_size_code,
            index_block_size_code,
            volume_serial,
        })
    }

    pub fn oem_id_str(&self) -> String {
        String::from_utf8_lossy(&self.oem_id).trim().to_string()
    }

    pub fn is_ntfs(&self) -> bool {
        self.oem_id_str() == "NTFS"
    }

    /// `bytes_per_sector * sectors_per_cluster`. Zero is rejected by callers.
    pub fn bytes_per_cluster(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    /// The MFT record size encoding: positive = clusters per
    /// record, negative = log2 of the record size in bytes.
    pub fn mft_record_size_bytes(&self) -> u32 {
        if self.mft_record_size_code < 0 {
            1u32 << self.mft_record_size_code.unsigned_abs()
        } else {
            self.mft_record_size_code as u32 * self.bytes_per_cluster() as u32
        }
    }

    pub fn index_block_size_bytes(&self) -> u32 {
        if self.index_block_size_code < 0 {
            1u32 << self.index_block_size_code.unsigned_abs()
        } else {
            self.index_block_size_code as u32 * self.bytes_per_cluster() as u32
        }
    }
}

/// First 48 bytes of every MFT record (real `FILE0` or synthetic `FRAG`).
#[derive(Debug, Clone, Copy)]
pub struct MftRecordHeader {
    pub signature: [u8; 4],
    pub update_seq_offset: u16,
    pub update_seq_size: u16,
    pub lsn: u64,
    pub sequence_number: u16,
    pub hard_link_count: u16,
    pub first_attribute_offset: u16,
    pub flags: u16,
    pub used_size: u32,
    pub allocated_size: u32,
    pub base_record_reference: u64,
    pub next_attribute_id: u16,
    pub record_number: u32,
}

pub const MFT_SIGNATURE: [u8; 4] = *b"FILE";
pub const FRAGMENT_SIGNATURE: [u8; 4] = *b"FRAG";

/// Record flag bits.
pub const MFT_FLAG_IN_USE: u16 = 0x0001;
pub const MFT_FLAG_DIRECTORY: u16 = 0x0002;

impl MftRecordHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let signature = c.read_array::<4>()?;
        let update_seq_offset = c.read_u16()?;
        let update_seq_size = c.read_u16()?;
        let lsn = c.read_u64()?;
        let sequence_number = c.read_u16()?;
        let hard_link_count = c.read_u16()?;
        let first_attribute_offset = c.read_u16()?;
        let flags = c.read_u16()?;
        let used_size = c.read_u32()?;
        let allocated_size = c.read_u32()?;
        let base_record_reference = c.read_u64()?;
        let next_attribute_id = c.read_u16()?;
        // Some NTFS versions insert a 2-byte alignment pad then a 4-byte
        // record number here; we tolerate either layout by reading the
        // record number from the last 4 bytes of the fixed header region
        // when available, defaulting to 0 for minimal 42-byte headers.
        let record_number = if c.remaining() >= 4 {
            c.skip(c.remaining().min(2))?;
            if c.remaining() >= 4 {
                c.read_u32()?
            } else {
                0
            }
        } else {
            0
        };

        Ok(Self {
            signature,
            update_seq_offset,
            update_seq_size,
            lsn,
            sequence_number,
            hard_link_count,
            first_attribute_offset,
            flags,
            used_size,
            allocated_size,
            base_record_reference,
            next_attribute_id,
            record_number,
        })
    }

    pub fn is_file_record(&self) -> bool {
        self.signature == MFT_SIGNATURE
    }

    pub fn in_use(&self) -> bool {
        self.flags & MFT_FLAG_IN_USE != 0
    }

    pub fn is_directory(&self) -> bool {
        self.flags & MFT_FLAG_DIRECTORY != 0
    }
}

/// NTFS attribute type codes the core recognises (classified, not all parsed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    StandardInformation,
    AttributeList,
    FileName,
    ObjectId,
    SecurityDescriptor,
    VolumeName,
    VolumeInformation,
    Data,
    IndexRoot,
    IndexAllocation,
    Bitmap,
    ReparsePoint,
    EaInformation,
    Ea,
    LoggedUtilityStream,
    Other(u32),
    EndOfAttributes,
}

impl AttributeType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x10 => Self::StandardInformation,
            0x20 => Self::AttributeList,
            0x30 => Self::FileName,
            0x40 => Self::ObjectId,
            0x50 => Self::SecurityDescriptor,
            0x60 => Self::VolumeName,
            0x70 => Self::VolumeInformation,
            0x80 => Self::Data,
            0x90 => Self::IndexRoot,
            0xA0 => Self::IndexAllocation,
            0xB0 => Self::Bitmap,
            0xC0 => Self::ReparsePoint,
            0xD0 => Self::EaInformation,
            0xE0 => Self::Ea,
            0x100 => Self::LoggedUtilityStream,
            0xFFFF_FFFF => Self::EndOfAttributes,
            other => Self::Other(other),
        }
    }
}

/// Fields common to every attribute, resident or not.
#[derive(Debug, Clone)]
pub struct CommonAttributeHeader {
    pub attribute_type: u32,
    pub full_length: u32,
    pub non_resident: bool,
    pub name_length: u8,
    pub name_offset: u16,
    pub flags: u16,
    pub attribute_id: u16,
}

impl CommonAttributeHeader {
    pub const SIZE: usize = 16;

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let attribute_type = c.read_u32()?;
        let full_length = c.read_u32()?;
        let non_resident = c.read_u8()? != 0;
        let name_length = c.read_u8()?;
        let name_offset = c.read_u16()?;
        let flags = c.read_u16()?;
        let attribute_id = c.read_u16()?;
        Ok(Self {
            attribute_type,
            full_length,
            non_resident,
            name_length,
            name_offset,
            flags,
            attribute_id,
        })
    }

    pub fn kind(&self) -> AttributeType {
        AttributeType::from_code(self.attribute_type)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResidentAttributeHeader {
    pub content_length: u32,
    pub content_offset: u16,
    pub indexed_flag: u8,
}

impl ResidentAttributeHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let content_length = c.read_u32()?;
        let content_offset = c.read_u16()?;
        let indexed_flag = c.read_u8()?;
        c.skip(1)?; // padding byte
        Ok(Self {
            content_length,
            content_offset,
            indexed_flag,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NonResidentAttributeHeader {
    pub starting_vcn: u64,
    pub ending_vcn: u64,
    pub data_run_offset: u16,
    pub compression_unit: u16,
    pub allocated_size: u64,
    pub real_size: u64,
    pub initialised_size: u64,
}

impl NonResidentAttributeHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let starting_vcn = c.read_u64()?;
        let ending_vcn = c.read_u64()?;
        let data_run_offset = c.read_u16()?;
        let compression_unit = c.read_u16()?;
        c.skip(4)?; // padding
        let allocated_size = c.read_u64()?;
        let real_size = c.read_u64()?;
        let initialised_size = c.read_u64()?;
        Ok(Self {
            starting_vcn,
            ending_vcn,
            data_run_offset,
            compression_unit,
            allocated_size,
            real_size,
            initialised_size,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AttributeBody {
    Resident(ResidentAttributeHeader),
    NonResident(NonResidentAttributeHeader),
}

/// A fully decoded attribute: common header, resident/non-resident body,
/// optional name, and its byte span within the owning record (used by the
/// scanner/extractor to bound `cursor += full_length`).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub common: CommonAttributeHeader,
    pub body: AttributeBody,
    pub name: Option<String>,
}

impl Attribute {
    /// Decodes one attribute starting at `record[offset..]`. `record` is the
    /// full 1024-byte record buffer; `offset` is the byte offset of the
    /// attribute header within it. Fails `BadAttribute` if `full_length`
    /// would run past the record.
    pub fn decode_at(record: &[u8], offset: usize) -> Result<Self> {
        if offset + CommonAttributeHeader::SIZE > record.len() {
            return Err(NtfsError::BadAttribute {
                cursor: offset,
                full_length: 0,
                record_size: record.len(),
            });
        }
        let common = CommonAttributeHeader::decode(&record[offset..offset + CommonAttributeHeader::SIZE])?;
        if common.full_length as usize > record.len().saturating_sub(offset) {
            return Err(NtfsError::BadAttribute {
                cursor: offset,
                full_length: common.full_length,
                record_size: record.len(),
            });
        }

        if (common.full_length as usize) < CommonAttributeHeader::SIZE {
            return Err(NtfsError::BadAttribute {
                cursor: offset,
                full_length: common.full_length,
                record_size: record.len(),
            });
        }

        let body_start = offset + CommonAttributeHeader::SIZE;
        let attribute_end = offset + common.full_length as usize;
        let body_bytes = &record[body_start..attribute_end];

        let body = if common.non_resident {
            AttributeBody::NonResident(NonResidentAttributeHeader::decode(body_bytes)?)
        } else {
            AttributeBody::Resident(ResidentAttributeHeader::decode(body_bytes)?)
        };

        let name = if common.name_length > 0 {
            let name_start = offset + common.name_offset as usize;
            let name_end = name_start + common.name_length as usize * 2;
            if name_start < body_start || name_end > attribute_end || name_end > record.len() {
                return Err(NtfsError::BadAttribute {
                    cursor: offset,
                    full_length: common.full_length,
                    record_size: record.len(),
                });
            }
            Some(decode_utf16le(&record[name_start..name_end]))
        } else {
            None
        };

        Ok(Self { common, body, name })
    }

    pub fn data_run_offset(&self) -> Option<u16> {
        match self.body {
            AttributeBody::NonResident(h) => Some(h.data_run_offset),
            AttributeBody::Resident(_) => None,
        }
    }

    pub fn allocated_size(&self) -> Option<u64> {
        match self.body {
            AttributeBody::NonResident(h) => Some(h.allocated_size),
            AttributeBody::Resident(_) => None,
        }
    }
}

/// $FILE_NAME attribute content: parent reference, four
/// timestamps, sizes, permission flags, namespace byte and the UCS-2 name.
#[derive(Debug, Clone)]
pub struct FileNameAttribute {
    pub parent_reference: u64,
    pub created: u64,
    pub modified: u64,
    pub mft_modified: u64,
    pub accessed: u64,
    pub allocated_size: u64,
    pub real_size: u64,
    pub flags: u32,
    pub reparse_or_ea: u32,
    pub namespace: u8,
    pub name: String,
}

impl FileNameAttribute {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(bytes);
        let parent_reference = c.read_u64()?;
        let created = c.read_u64()?;
        let modified = c.read_u64()?;
        let mft_modified = c.read_u64()?;
        let accessed = c.read_u64()?;
        let allocated_size = c.read_u64()?;
        let real_size = c.read_u64()?;
        let flags = c.read_u32()?;
        let reparse_or_ea = c.read_u32()?;
        let name_length_units = c.read_u8()?;
        let namespace = c.read_u8()?;
        let name_bytes = c.read_bytes(name_length_units as usize * 2)?;
        let name = decode_utf16le(name_bytes);
        Ok(Self {
            parent_reference,
            created,
            modified,
            mft_modified,
            accessed,
            allocated_size,
            real_size,
            flags,
            reparse_or_ea,
            namespace,
            name,
        })
    }
}
