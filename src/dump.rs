//! Human-readable dumps: `prettytable` renderings
//! of the partition table, boot sector and catalogue for someone reading the
//! tool's output directly rather than consuming the in-memory catalogue.

use crate::catalogue::Catalogue;
use crate::structures::BootSector;
use prettytable::{row, Table};

pub use crate::mbr::display_partition_table;

pub fn dump_boot_sector(boot: &BootSector) {
    let mut table = Table::new();
    table.add_row(row!["Field", "Value"]);
    table.add_row(row!["OEM ID", boot.oem_id_str()]);
    table.add_row(row!["Bytes per sector", boot.bytes_per_sector]);
    table.add_row(row!["Sectors per cluster", boot.sectors_per_cluster]);
    table.add_row(row!["Bytes per cluster", boot.bytes_per_cluster()]);
    table.add_row(row!["Total sectors", boot.total_sectors]);
    table.add_row(row!["$MFT start LCN", boot.mft_start_lcn]);
    table.add_row(row!["$MFT mirror LCN", boot.mft_mirror_lcn]);
    table.add_row(row!["$MFT record size (bytes)", boot.mft_record_size_bytes()]);
    table.add_row(row!["Index block size (bytes)", boot.index_block_size_bytes()]);
    table.add_row(row!["Volume serial", format!("{:#x}", boot.volume_serial)]);
    table.printstd();
}

pub fn dump_catalogue(catalogue: &Catalogue) {
    let mut table = Table::new();
    table.add_row(row!["Record #", "Name", "Fragment Offset"]);
    for entry in catalogue.iter() {
        table.add_row(row![
            entry.record_number,
            entry.name.as_deref().unwrap_or("(unnamed)"),
            format!("{:#x}", entry.fragment_offset),
        ]);
    }
    table.printstd();
    println!("{} entries total", catalogue.len());
}
