//! CLI entry point: opens a device, locates NTFS partitions, extracts and
//! scans each `$MFT`, and either prints a one-shot summary or drops into the
//! interactive command loop.

mod byte_reader;
mod catalogue;
mod cursor;
mod dump;
mod error;
mod mbr;
mod mft_extractor;
mod mft_scanner;
mod repl;
mod run_list;
mod session;
mod structures;

use anyhow::Context;
use clap::Parser;
use error::NtfsError;
use session::Session;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Locate NTFS partitions and catalogue their $MFT")]
struct Arguments {
    /// Path to the raw block device or disk image.
    device_path: PathBuf,

    /// Show CHS addressing in the partition table dump.
    #[arg(long)]
    show_chs: bool,

    /// Print the partition table and exit, without touching the MFT.
    #[arg(long)]
    partitions_only: bool,

    /// Drop into the interactive command loop after cataloguing.
    #[arg(long)]
    interactive: bool,

    /// Write the catalogue of the first NTFS partition to this CSV path.
    #[arg(long)]
    csv_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();

    match run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let mut session =
        Session::open(&args.device_path).with_context(|| format!("opening {:?}", args.device_path))?;

    if args.partitions_only {
        dump::display_partition_table(session.partition_table(), args.show_chs);
        return Ok(());
    }

    let offsets = session.ntfs_partition_offsets();
    if offsets.is_empty() {
        return Err(NtfsError::NoNtfsPartitions.into());
    }
    println!("{} NTFS partitions located.", offsets.len());
    info!(count = offsets.len(), "NTFS partitions located");

    let first_offset = offsets[0];
    let extracted = session
        .extract_mft_of(first_offset)
        .context("extracting $MFT")?;
    let (catalogue, stats) = session.scan(&extracted).context("scanning $MFT")?;

    info!(?stats, "scan complete");
    println!(
        "{} files, {} directories, {} deleted, {} other, {} bad attribute records",
        stats.files, stats.directories, stats.deleted, stats.other, stats.bad_attribute
    );

    if let Some(csv_path) = &args.csv_out {
        let file = std::fs::File::create(csv_path)
            .with_context(|| format!("creating {csv_path:?}"))?;
        catalogue
            .write_csv(file)
            .with_context(|| format!("writing {csv_path:?}"))?;
    }

    if args.interactive {
        repl::run(&catalogue)?;
    } else {
        dump::dump_catalogue(&catalogue);
    }

    Ok(())
}
