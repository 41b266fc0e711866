//! Finds `$MFT`'s own DATA attribute and materialises
//! every extent of the real, on-disk `$MFT` into a local byte stream, each
//! extent preceded by a fragment marker recording its absolute device
//! offset.

use crate::byte_reader::DeviceReader;
use crate::error::{NtfsError, Result};
use crate::structures::{
    Attribute, AttributeType, BootSector, MftRecordHeader, MFT_RECORD_SIZE, SECTOR_SIZE,
};
use tracing::{debug, info, warn};

/// Synthetic marker this system inserts into the local MFT copy; never
/// appears on the source device. Padded to a full 1024-byte slot so the
/// scanner's fixed-stride dispatch stays aligned with real records.
pub const FRAGMENT_SLOT_SIZE: usize = MFT_RECORD_SIZE;

pub struct FragmentMarker {
    pub absolute_offset: u64,
}

impl FragmentMarker {
    pub fn encode_padded(&self) -> [u8; FRAGMENT_SLOT_SIZE] {
        let mut slot = [0u8; FRAGMENT_SLOT_SIZE];
        slot[0..4].copy_from_slice(b"FRAG");
        slot[4..12].copy_from_slice(&self.absolute_offset.to_le_bytes());
        slot
    }

    pub fn decode(slot: &[u8]) -> Result<Self> {
        if slot.len() < 12 || &slot[0..4] != b"FRAG" {
            return Err(NtfsError::MalformedStructure(
                "not a fragment marker".into(),
            ));
        }
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&slot[4..12]);
        Ok(Self {
            absolute_offset: u64::from_le_bytes(offset_bytes),
        })
    }
}

/// Result of extracting one partition's `$MFT`: the reconstructed local
/// copy (fragment-marker-prefixed extents) plus the cluster size needed to
/// interpret it.
pub struct ExtractedMft {
    pub local_copy: Vec<u8>,
    pub bytes_per_cluster: u64,
}

/// Runs the full extraction procedure for one NTFS
/// partition starting at `partition_start_bytes`.
pub fn extract_mft(reader: &mut DeviceReader, partition_start_bytes: u64) -> Result<ExtractedMft> {
    let saved_position = reader.position()?;
    let result = extract_mft_inner(reader, partition_start_bytes);
    // The extractor must not leave side effects on
    // the device cursor, success or failure.
    reader.seek_absolute(saved_position)?;
    result
}

fn extract_mft_inner(reader: &mut DeviceReader, partition_start_bytes: u64) -> Result<ExtractedMft> {
    // Step 1: decode the boot sector.
    let boot_bytes = reader.read_vec_at(partition_start_bytes, 512)?;
    let boot = BootSector::decode(&boot_bytes)?;
    if !boot.is_ntfs() {
        return Err(NtfsError::MalformedBootSector(format!(
            "OEM id {:?} is not NTFS",
            boot.oem_id_str()
        )));
    }

    // Step 2: compute bytes-per-cluster and the MFT's device offset.
    let bytes_per_cluster = boot.bytes_per_cluster();
    if bytes_per_cluster == 0 {
        return Err(NtfsError::MalformedBootSector(
            "bytes_per_cluster is 0".into(),
        ));
    }
    let device_size_bytes = boot.total_sectors * boot.bytes_per_sector as u64;
    let mft_device_offset = partition_start_bytes + boot.mft_start_lcn * bytes_per_cluster;
    if mft_device_offset > partition_start_bytes + device_size_bytes {
        return Err(NtfsError::MalformedBootSector(format!(
            "computed MFT offset {mft_device_offset} exceeds the volume"
        )));
    }
    debug!(mft_device_offset, bytes_per_cluster, "located $MFT record 0");

    // Step 3: read MFT record 0 ($MFT itself).
    let record0 = reader.read_vec_at(mft_device_offset, MFT_RECORD_SIZE)?;
    let header = MftRecordHeader::decode(&record0)?;
    if !header.is_file_record() {
        return Err(NtfsError::UnexpectedMftLayout {
            reason: format!("record 0 signature is {:?}, not FILE0", header.signature),
        });
    }

    // Step 4: walk record 0's attributes looking for $FILE_NAME and $DATA.
    let mut cursor = header.first_attribute_offset as usize;
    let mut saw_mft_name = false;
    let mut data_attribute: Option<(usize, Attribute)> = None;
    while cursor + 8 < header.used_size as usize && cursor < MFT_RECORD_SIZE {
        let attribute = Attribute::decode_at(&record0, cursor)?;
        let attribute_start = cursor;
        match attribute.common.kind() {
            AttributeType::EndOfAttributes => break,
            AttributeType::FileName => {
                if attribute.name.as_deref() == Some("$MFT") {
                    saw_mft_name = true;
                }
            }
            AttributeType::Data => {
                data_attribute = Some((attribute_start, attribute.clone()));
            }
            _ => {}
        }
        let advance = attribute.common.full_length as usize;
        if advance == 0 {
            break;
        }
        cursor += advance;
    }

    if !saw_mft_name {
        return Err(NtfsError::UnexpectedMftLayout {
            reason: "MFT record 0 has no $FILE_NAME attribute naming $MFT".into(),
        });
    }

    let (attribute_start, data_attribute) =
        data_attribute.ok_or_else(|| NtfsError::UnexpectedMftLayout {
            reason: "MFT record 0 has no non-resident $DATA attribute".into(),
        })?;

    // Step 5: decode the run list. `data_run_offset` is relative to the
    // start of the attribute header, not its body.
    let abs_run_offset = data_attribute
        .data_run_offset()
        .ok_or_else(|| NtfsError::UnexpectedMftLayout {
            reason: "$DATA attribute on record 0 is resident".into(),
        })? as usize;
    let run_bytes_start = attribute_start + abs_run_offset;
    let run_bytes_end = attribute_start + data_attribute.common.full_length as usize;
    let run_list = crate::run_list::RunList::decode(&record0[run_bytes_start..run_bytes_end])?;

    info!(run_count = run_list.runs.len(), "decoded $MFT run list");

    // Step 6: materialise every run, fragment-marker first.
    let mut local_copy = Vec::new();
    let lcns = run_list.absolute_lcns();
    for (run, lcn) in run_list.runs.iter().zip(lcns) {
        if run.sparse {
            warn!(length = run.length, "sparse run in $MFT data runs, skipping");
            continue;
        }
        let absolute_offset = partition_start_bytes + lcn * bytes_per_cluster;
        let size = run.length * bytes_per_cluster;
        let extent = reader.read_vec_at(absolute_offset, size as usize)?;

        let marker = FragmentMarker { absolute_offset };
        local_copy.extend_from_slice(&marker.encode_padded());
        local_copy.extend_from_slice(&extent);
        debug!(absolute_offset, size, "extracted $MFT fragment");
    }

    Ok(ExtractedMft {
        local_copy,
        bytes_per_cluster,
    })
}

pub const BYTES_PER_SECTOR: u64 = SECTOR_SIZE;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};

    /// A 512-byte boot sector: 512 bytes/sector, 1 sector/cluster (so
    /// `bytes_per_cluster() == 512`), `$MFT` record 0 at LCN 4.
    fn build_boot_sector() -> Vec<u8> {
        let mut boot = vec![0u8; 512];
        boot[3..11].copy_from_slice(b"NTFS    ");
        boot[11..13].copy_from_slice(&512u16.to_le_bytes()); // bytes_per_sector
        boot[13] = 1; // sectors_per_cluster
        boot[40..48].copy_from_slice(&100_000u64.to_le_bytes()); // total_sectors
        boot[48..56].copy_from_slice(&4u64.to_le_bytes()); // mft_start_lcn
        boot
    }

    fn file_name_attribute_bytes(name: &str) -> Vec<u8> {
        let name_utf16: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let mut content = Vec::new();
        content.extend_from_slice(&0u64.to_le_bytes()); // parent_reference
        content.extend_from_slice(&0u64.to_le_bytes()); // created
        content.extend_from_slice(&0u64.to_le_bytes()); // modified
        content.extend_from_slice(&0u64.to_le_bytes()); // mft_modified
        content.extend_from_slice(&0u64.to_le_bytes()); // accessed
        content.extend_from_slice(&0u64.to_le_bytes()); // allocated_size
        content.extend_from_slice(&0u64.to_le_bytes()); // real_size
        content.extend_from_slice(&0u32.to_le_bytes()); // flags
        content.extend_from_slice(&0u32.to_le_bytes()); // reparse_or_ea
        content.push(name.encode_utf16().count() as u8);
        content.push(1u8); // namespace: POSIX
        content.extend_from_slice(&name_utf16);
        content
    }

    /// Record 0: a resident `$FILE_NAME` naming `$MFT`, followed by a
    /// non-resident `$DATA` whose run list is the two-run sequence also
    /// exercised in `run_list`'s tests (length=0x30/offset=+0x2000, then
    /// length=0x68/offset=+0x43).
    fn build_mft_record0() -> Vec<u8> {
        let mut record = vec![0u8; MFT_RECORD_SIZE];
        record[0..4].copy_from_slice(b"FILE");
        record[20..22].copy_from_slice(&42u16.to_le_bytes()); // first_attribute_offset
        record[22..24].copy_from_slice(&0x0001u16.to_le_bytes()); // flags: in use
        record[44..48].copy_from_slice(&0u32.to_le_bytes()); // record_number

        // $FILE_NAME, resident, at offset 42.
        let content = file_name_attribute_bytes("$MFT");
        let name_full_length = (16 + 8 + content.len()) as u32;
        let name_start = 42usize;
        record[name_start..name_start + 4].copy_from_slice(&0x30u32.to_le_bytes());
        record[name_start + 4..name_start + 8].copy_from_slice(&name_full_length.to_le_bytes());
        record[name_start + 8] = 0; // resident
        record[name_start + 16..name_start + 20].copy_from_slice(&(content.len() as u32).to_le_bytes());
        record[name_start + 20..name_start + 22].copy_from_slice(&24u16.to_le_bytes()); // content_offset
        let content_start = name_start + 24;
        record[content_start..content_start + content.len()].copy_from_slice(&content);

        // $DATA, non-resident, right after $FILE_NAME.
        let data_start = name_start + name_full_length as usize;
        let run_bytes = [0x21u8, 0x30, 0x00, 0x20, 0x11, 0x68, 0x43, 0x00];
        let data_full_length = (16 + 48 + run_bytes.len()) as u32;
        record[data_start..data_start + 4].copy_from_slice(&0x80u32.to_le_bytes());
        record[data_start + 4..data_start + 8].copy_from_slice(&data_full_length.to_le_bytes());
        record[data_start + 8] = 1; // non-resident
        let subheader_start = data_start + 16;
        record[subheader_start + 16..subheader_start + 18].copy_from_slice(&64u16.to_le_bytes()); // data_run_offset
        record[subheader_start + 24..subheader_start + 32]
            .copy_from_slice(&77_824u64.to_le_bytes()); // allocated_size
        record[subheader_start + 32..subheader_start + 40].copy_from_slice(&77_824u64.to_le_bytes()); // real_size
        record[subheader_start + 40..subheader_start + 48]
            .copy_from_slice(&77_824u64.to_le_bytes()); // initialised_size
        let run_list_start = data_start + 64;
        record[run_list_start..run_list_start + run_bytes.len()].copy_from_slice(&run_bytes);

        let data_end = data_start + data_full_length as usize;
        record[24..28].copy_from_slice(&(data_end as u32).to_le_bytes()); // used_size
        record[data_end..data_end + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

        record
    }

    #[test]
    fn extract_mft_round_trips_two_run_data_runs() {
        let boot = build_boot_sector();
        let record0 = build_mft_record0();

        let run0_offset = 8192u64 * 512; // LCN 0x2000
        let run0_len = 0x30usize * 512;
        let run1_offset = (8192 + 0x43) * 512; // cumulative LCN 0x2043
        let run1_len = 0x68usize * 512;

        let mut f = tempfile::NamedTempFile::new().unwrap();
        {
            let file = f.as_file_mut();
            file.write_all(&boot).unwrap();
            file.seek(SeekFrom::Start(2048)).unwrap();
            file.write_all(&record0).unwrap();
            file.seek(SeekFrom::Start(run0_offset)).unwrap();
            file.write_all(&vec![0xABu8; run0_len]).unwrap();
            file.seek(SeekFrom::Start(run1_offset)).unwrap();
            file.write_all(&vec![0xCDu8; run1_len]).unwrap();
            file.flush().unwrap();
        }

        let mut reader = DeviceReader::open(f.path()).unwrap();
        let before = reader.position().unwrap();
        let extracted = extract_mft(&mut reader, 0).unwrap();
        let after = reader.position().unwrap();
        assert_eq!(before, after, "device cursor must be restored");

        assert_eq!(extracted.bytes_per_cluster, 512);
        assert_eq!(
            extracted.local_copy.len(),
            FRAGMENT_SLOT_SIZE + run0_len + FRAGMENT_SLOT_SIZE + run1_len
        );

        let marker0 = FragmentMarker::decode(&extracted.local_copy[0..FRAGMENT_SLOT_SIZE]).unwrap();
        assert_eq!(marker0.absolute_offset, run0_offset);
        let extent0_start = FRAGMENT_SLOT_SIZE;
        assert!(extracted.local_copy[extent0_start..extent0_start + run0_len]
            .iter()
            .all(|&b| b == 0xAB));

        let marker1_start = extent0_start + run0_len;
        let marker1 =
            FragmentMarker::decode(&extracted.local_copy[marker1_start..marker1_start + FRAGMENT_SLOT_SIZE])
                .unwrap();
        assert_eq!(marker1.absolute_offset, run1_offset);
        let extent1_start = marker1_start + FRAGMENT_SLOT_SIZE;
        assert!(extracted.local_copy[extent1_start..extent1_start + run1_len]
            .iter()
            .all(|&b| b == 0xCD));
    }
}
