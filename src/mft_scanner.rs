//! Walks the local MFT copy produced by the extractor in
//! fixed 1024-byte slots, distinguishing synthetic fragment markers from real
//! `FILE0` records, and emits one catalogue entry per record.

use crate::catalogue::Catalogue;
use crate::error::{NtfsError, Result};
use crate::structures::{
    Attribute, AttributeType, FileNameAttribute, MftRecordHeader, FRAGMENT_SIGNATURE,
    MFT_RECORD_SIZE, MFT_SIGNATURE,
};
use crate::mft_extractor::FragmentMarker;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    pub files: u64,
    pub directories: u64,
    pub deleted: u64,
    pub other: u64,
    pub bad_attribute: u64,
    pub names_seen: u64,
    pub fragment_markers: u64,
}

/// Scans `local_copy` (the extractor's fragment-marker-prefixed byte stream)
/// and returns the resulting catalogue plus scan statistics.
pub fn scan(local_copy: &[u8]) -> Result<(Catalogue, ScanStats)> {
    let mut catalogue = Catalogue::new();
    let mut stats = ScanStats::default();
    let mut current_fragment_offset: u64 = 0;
    let mut bytes_since_marker: u64 = 0;

    let mut slot_start = 0usize;
    while slot_start + MFT_RECORD_SIZE <= local_copy.len() {
        let slot = &local_copy[slot_start..slot_start + MFT_RECORD_SIZE];
        let signature: [u8; 4] = slot[0..4].try_into().unwrap();

        if signature == FRAGMENT_SIGNATURE {
            let marker = FragmentMarker::decode(slot)?;
            current_fragment_offset = marker.absolute_offset;
            bytes_since_marker = 0;
            stats.fragment_markers += 1;
            slot_start += MFT_RECORD_SIZE;
            continue;
        }

        if signature != MFT_SIGNATURE {
            return Err(NtfsError::CorruptMft {
                signature,
                slot: slot_start / MFT_RECORD_SIZE,
            });
        }

        let absolute_record_offset = current_fragment_offset + bytes_since_marker;

        match scan_record(slot) {
            Ok(Some((name, record_number, is_directory, deleted))) => {
                if deleted {
                    stats.deleted += 1;
                } else if is_directory {
                    stats.directories += 1;
                } else {
                    stats.files += 1;
                }
                if name.is_some() {
                    stats.names_seen += 1;
                }
                catalogue.append(name, absolute_record_offset, record_number);
            }
            Ok(None) => {
                stats.other += 1;
            }
            Err(NtfsError::BadAttribute { .. }) => {
                // Local recovery: abandon this record, keep scanning.
                stats.bad_attribute += 1;
                warn!(slot = slot_start / MFT_RECORD_SIZE, "bad attribute, abandoning record");
            }
            Err(e) => return Err(e),
        }

        bytes_since_marker += MFT_RECORD_SIZE as u64;
        slot_start += MFT_RECORD_SIZE;
    }

    debug!(?stats, "scan complete");
    Ok((catalogue, stats))
}

/// Decodes one `FILE0` record, returning `(name, record_number, is_directory, deleted)`
/// for records worth cataloguing, or `None` for records classified as "other"
/// (neither in-use file nor directory — e.g. an unused slot).
fn scan_record(record: &[u8]) -> Result<Option<(Option<String>, u32, bool, bool)>> {
    let header = MftRecordHeader::decode(record)?;
    if !header.is_file_record() {
        return Ok(None);
    }

    let deleted = !header.in_use();
    let is_directory = header.is_directory();

    let mut cursor = header.first_attribute_offset as usize;
    let mut last_name: Option<String> = None;
    while cursor + 8 < header.used_size as usize && cursor < MFT_RECORD_SIZE {
        let attribute = Attribute::decode_at(record, cursor)?;
        if attribute.common.kind() == AttributeType::EndOfAttributes {
            break;
        }
        if attribute.common.kind() == AttributeType::FileName {
            if let Some(name) = decode_file_name_content(record, cursor, &attribute)? {
                last_name = Some(name);
            }
        }
        let advance = attribute.common.full_length as usize;
        if advance == 0 {
            break;
        }
        cursor += advance;
    }

    Ok(Some((last_name, header.record_number, is_directory, deleted)))
}

fn decode_file_name_content(
    record: &[u8],
    attribute_offset: usize,
    attribute: &Attribute,
) -> Result<Option<String>> {
    match attribute.body {
        crate::structures::AttributeBody::Resident(body) => {
            let start = attribute_offset + body.content_offset as usize;
            let end = start + body.content_length as usize;
            if end > record.len() {
                return Ok(None);
            }
            let file_name = FileNameAttribute::decode(&record[start..end])?;
            Ok(Some(file_name.name))
        }
        // $FILE_NAME is always resident; a non-resident one is unusual and
        // not worth chasing into the run list just for a display name.
        crate::structures::AttributeBody::NonResident(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mft_extractor::FragmentMarker;

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
        content.push((name.encode_utf16().count()) as u8);
        content.push(1u8); // namespace: POSIX
        content.extend_from_slice(&name_utf16);
        content
    }

    fn build_minimal_file_record(record_number: u32, flags: u16, name: &str) -> Vec<u8> {
        let content = file_name_attribute_bytes(name);
        let attr_header_size = 16;
        let full_length = (attr_header_size + 8 + content.len()) as u32;

        let mut record = vec![0u8; MFT_RECORD_SIZE];
        record[0..4].copy_from_slice(b"FILE");
        record[20..22].copy_from_slice(&42u16.to_le_bytes()); // first_attribute_offset
        record[22..24].copy_from_slice(&flags.to_le_bytes());
        record[24..28].copy_from_slice(&((42 + full_length) as u32).to_le_bytes()); // used_size
        record[44..48].copy_from_slice(&record_number.to_le_bytes());

        let mut cursor = 42usize;
        record[cursor..cursor + 4].copy_from_slice(&0x30u32.to_le_bytes()); // FileName type
        record[cursor + 4..cursor + 8].copy_from_slice(&full_length.to_le_bytes());
        record[cursor + 8] = 0; // resident
        // content_offset is right after the 8-byte resident sub-header.
        record[cursor + 16..cursor + 20].copy_from_slice(&(content.len() as u32).to_le_bytes());
        record[cursor + 20..cursor + 22].copy_from_slice(&24u16.to_le_bytes());
        cursor += 24;
        record[cursor..cursor + content.len()].copy_from_slice(&content);

        // End-of-attributes marker.
        let end_offset = 42 + full_length as usize;
        record[end_offset..end_offset + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

        record
    }

    #[test]
    fn scans_fragment_marker_then_file_record() {
        let marker = FragmentMarker {
            absolute_offset: 0x10_0000,
        };
        let mut local_copy = marker.encode_padded().to_vec();
        local_copy.extend_from_slice(&build_minimal_file_record(5, 0x0001, "hello.txt"));

        let (catalogue, stats) = scan(&local_copy).unwrap();
        assert_eq!(stats.fragment_markers, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(catalogue.len(), 1);
        let entry = catalogue.iter().next().unwrap();
        assert_eq!(entry.name.as_deref(), Some("hello.txt"));
        assert_eq!(entry.record_number, 5);
        assert_eq!(entry.fragment_offset, 0x10_0000);
    }

    #[test]
    fn classifies_deleted_and_directory_records() {
        let mut local_copy = Vec::new();
        local_copy.extend_from_slice(&build_minimal_file_record(1, 0x0000, "deleted.txt"));
        local_copy.extend_from_slice(&build_minimal_file_record(2, 0x0003, "a_dir"));

        let (_, stats) = scan(&local_copy).unwrap();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.directories, 1);
    }

    #[test]
    fn unrecognised_signature_is_corrupt() {
        let local_copy = vec![0xAAu8; MFT_RECORD_SIZE];
        let result = scan(&local_copy);
        assert!(matches!(result, Err(NtfsError::CorruptMft { .. })));
    }
}
