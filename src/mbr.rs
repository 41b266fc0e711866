//! Partition table walk: locates
//! every NTFS primary partition by reading the DOS/MBR partition table, and
//! follows the EBR chain into extended partitions so logical NTFS volumes
//! are found too.

use crate::byte_reader::DeviceReader;
use crate::error::Result;
use crate::structures::{PartitionEntry, PARTITION_ENTRY_SIZE, PARTITION_TABLE_OFFSET, SECTOR_SIZE};
use prettytable::{row, Row, Table};

#[derive(Debug, Default)]
pub struct PartitionNode {
    entry: Option<PartitionEntry>,
    pub children: Vec<PartitionNode>,
    image_offset_sectors: u64,
}

impl PartitionNode {
    fn new(entry: PartitionEntry, image_offset_sectors: u64) -> Self {
        Self {
            entry: Some(entry),
            children: Vec::new(),
            image_offset_sectors,
        }
    }

    fn is_extended(&self) -> bool {
        self.entry.as_ref().is_some_and(|e| e.is_extended())
    }

    fn table_row(&self, show_chs: bool) -> Row {
        let Some(entry) = &self.entry else {
            return row![];
        };
        let partition_start_lba = self.image_offset_sectors + entry.relative_sector as u64;
        let size = entry.sector_count as u64;
        let type_cell = format!(
            "{:#04x} :: {}",
            entry.partition_type,
            lookup_partition_type(entry.partition_type)
        );
        if show_chs {
            row![
                if entry.is_bootable() { "Yes" } else { "No" },
                partition_start_lba,
                format!("{:?}", entry.starting_chs),
                partition_start_lba + size.saturating_sub(1),
                format!("{:?}", entry.ending_chs),
                size,
                type_cell,
            ]
        } else {
            row![
                if entry.is_bootable() { "Yes" } else { "No" },
                partition_start_lba,
                partition_start_lba + size.saturating_sub(1),
                size,
                type_cell,
            ]
        }
    }

    /// All NTFS partitions in this subtree, as absolute byte offsets from
    /// the start of the device.
    pub fn ntfs_partition_offsets(&self) -> Vec<u64> {
        let mut offsets = Vec::new();
        self.collect_ntfs_offsets(&mut offsets);
        offsets
    }

    fn collect_ntfs_offsets(&self, out: &mut Vec<u64>) {
        if let Some(entry) = &self.entry {
            if entry.is_ntfs() {
                let start_sector = self.image_offset_sectors + entry.relative_sector as u64;
                out.push(start_sector * SECTOR_SIZE);
            }
        }
        for child in &self.children {
            child.collect_ntfs_offsets(out);
        }
    }
}

fn print_nodes(table: &mut Table, node: &PartitionNode, show_chs: bool, is_first: bool) {
    if node.children.is_empty() {
        if node.entry.is_some() {
            table.add_row(node.table_row(show_chs));
        }
        return;
    }
    for child in &node.children {
        if child.is_extended() && is_first {
            table.add_row(child.table_row(show_chs));
        }
        print_nodes(table, child, show_chs, false);
    }
}

/// Reads the four primary partition-table entries at `image_offset_sector`
/// (an EBR, or the MBR itself when `image_offset_sector == 0`), descending
/// into any extended partition found. Stops at the first empty entry.
fn read_sector(
    reader: &mut DeviceReader,
    is_first: bool,
    image_offset_sector: u64,
    first_ebr_sector: u64,
) -> Result<Vec<PartitionNode>> {
    let table_bytes = reader.read_vec_at(
        image_offset_sector * SECTOR_SIZE + PARTITION_TABLE_OFFSET as u64,
        PARTITION_ENTRY_SIZE * 4,
    )?;

    let mut children = Vec::new();
    for i in 0..4 {
        let entry_bytes = &table_bytes[i * PARTITION_ENTRY_SIZE..(i + 1) * PARTITION_ENTRY_SIZE];
        let entry = PartitionEntry::decode(entry_bytes)?;
        if entry.is_empty() {
            break;
        }

        let mut node = PartitionNode::new(entry, image_offset_sector);
        if entry.is_extended() {
            let start_sector = entry.relative_sector as u64;
            let (next_offset, next_first_ebr) = if is_first {
                (start_sector, start_sector)
            } else {
                (first_ebr_sector + start_sector, first_ebr_sector)
            };
            node.children = read_sector(reader, false, next_offset, next_first_ebr)?;
        }
        children.push(node);
    }
    Ok(children)
}

fn lookup_partition_type(partition_type: u8) -> &'static str {
    match partition_type {
        0x0 => "Empty",
        0x1 => "FAT12",
        0x4 => "FAT16 <32M",
        0x5 => "Extended",
        0x6 => "FAT16",
        0x7 => "HPFS/NTFS/exFAT",
        0xb => "W95 FAT32",
        0xc => "W95 FAT32 (LBA)",
        0xe => "W95 FAT16 (LBA)",
        0xf => "W95 Ext'd (LBA)",
        0x82 => "Linux swap / Solaris",
        0x83 => "Linux",
        0x86 => "NTFS volume set",
        0x87 => "NTFS volume set",
        0x8e => "Linux LVM",
        0xa5 => "FreeBSD",
        0xa6 => "OpenBSD",
        0xaf => "HFS / HFS+",
        0xee => "GPT",
        0xef => "EFI (FAT-12/16/32)",
        0xfd => "Linux raid autodetect",
        _ => "Unknown Partition Type",
    }
}

/// Walks the partition table of the device open behind `reader`, returning
/// the root's children (each a primary table entry, descending into any
/// extended partition chain).
pub fn read_partition_table(reader: &mut DeviceReader) -> Result<PartitionNode> {
    let children = read_sector(reader, true, 0, 0)?;
    Ok(PartitionNode {
        entry: None,
        children,
        image_offset_sectors: 0,
    })
}

pub fn display_partition_table(root: &PartitionNode, show_chs: bool) {
    let mut table = Table::new();
    let header = if show_chs {
        row![
            "Bootable",
            "LBA Starting Sector",
            "Starting CHS",
            "LBA Ending Sector",
            "Ending CHS",
            "Total Sectors",
            "Partition Type"
        ]
    } else {
        row![
            "Bootable",
            "LBA Starting Sector",
            "LBA Ending Sector",
            "Total Sectors",
            "Partition Type"
        ]
    };
    table.add_row(header);
    print_nodes(&mut table, root, show_chs, true);
    table.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mbr_entry_bytes(boot: u8, ptype: u8, lba: u32, sectors: u32) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0] = boot;
        bytes[4] = ptype;
        bytes[8..12].copy_from_slice(&lba.to_le_bytes());
        bytes[12..16].copy_from_slice(&sectors.to_le_bytes());
        bytes
    }

    fn synthetic_disk_with_one_ntfs_partition() -> tempfile::NamedTempFile {
        let mut disk = vec![0u8; PARTITION_TABLE_OFFSET];
        disk.extend_from_slice(&mbr_entry_bytes(0x80, 0x07, 2048, 1_000_000));
        disk.extend_from_slice(&[0u8; 16 * 3]);
        disk.extend_from_slice(&[0x55, 0xAA]);

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&disk).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn finds_single_ntfs_partition() {
        let f = synthetic_disk_with_one_ntfs_partition();
        let mut reader = DeviceReader::open(f.path()).unwrap();
        let root = read_partition_table(&mut reader).unwrap();
        let offsets = root.ntfs_partition_offsets();
        assert_eq!(offsets, vec![2048 * SECTOR_SIZE]);
    }

    #[test]
    fn empty_table_yields_no_partitions() {
        let mut disk = vec![0u8; PARTITION_TABLE_OFFSET + 64];
        disk.extend_from_slice(&[0x55, 0xAA]);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&disk).unwrap();
        f.flush().unwrap();

        let mut reader = DeviceReader::open(f.path()).unwrap();
        let root = read_partition_table(&mut reader).unwrap();
        assert!(root.ntfs_partition_offsets().is_empty());
    }
}
