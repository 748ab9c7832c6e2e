//! rawvmdk CLI - raw-device descriptor generation
//!
//! Reads a device's partition table and generates a VMware descriptor
//! exposing the selected partitions to a virtual machine. The process
//! must already be able to read the device; privilege management is the
//! caller's concern.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rawvmdk_core::TargetPlatform;
use rawvmdk_descriptor::{
    build_extents, resolve_all, resolve_bootable_slot, ArtifactWriter, Descriptor,
};
use rawvmdk_tables::PartitionTable;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rawvmdk")]
#[command(about = "Expose raw device partitions to a virtual machine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a descriptor and side files for selected partitions
    Create {
        /// Source block device (or disk image)
        device: PathBuf,

        /// Partition to expose, by number or name (repeatable)
        #[arg(short = 'p', long = "partition")]
        partitions: Vec<String>,

        /// Partition to mark active in the exported MBR
        #[arg(long)]
        bootable: Option<String>,

        /// Partition addressing convention of the target platform
        #[arg(long, value_enum, default_value_t = PlatformArg::Generic)]
        platform: PlatformArg,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Base name of the descriptor file
        #[arg(long, default_value = "rawdisk")]
        name: String,
    },

    /// Print the partition table of a device
    Info {
        /// Source block device (or disk image)
        device: PathBuf,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    /// Whole-device references with block offsets
    Generic,
    /// /dev/diskNsM slice device nodes
    Macos,
}

impl From<PlatformArg> for TargetPlatform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Generic => TargetPlatform::Generic,
            PlatformArg::Macos => TargetPlatform::MacOs,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .init();

    match cli.command {
        Command::Create {
            device,
            partitions,
            bootable,
            platform,
            out,
            name,
        } => cmd_create(
            &device,
            &partitions,
            bootable.as_deref(),
            platform.into(),
            &out,
            &name,
        ),
        Command::Info { device, json } => cmd_info(&device, json),
    }
}

fn parse_device(device: &Path) -> Result<PartitionTable> {
    let mut file =
        File::open(device).with_context(|| format!("cannot open {}", device.display()))?;
    PartitionTable::parse(&mut file)
        .with_context(|| format!("cannot read the partition table of {}", device.display()))
}

fn cmd_create(
    device: &Path,
    identifiers: &[String],
    bootable: Option<&str>,
    platform: TargetPlatform,
    out: &Path,
    name: &str,
) -> Result<()> {
    let table = parse_device(device)?;
    let partitions = table.partitions();

    let selected = resolve_all(&partitions, identifiers)?;
    let active_slot = bootable
        .map(|ident| resolve_bootable_slot(&partitions, ident))
        .transpose()?;

    let extents = build_extents(&table, &selected, platform);
    let descriptor = Descriptor::new(extents, device, platform);

    let writer = ArtifactWriter::new(out, name);
    let path = writer.write(&table, &descriptor, active_slot)?;

    println!("Wrote {}", path.display());
    println!(
        "Exposed {} of {} partitions ({} blocks total)",
        selected.len(),
        partitions.len(),
        table.device_blocks()
    );

    Ok(())
}

fn cmd_info(device: &Path, json: bool) -> Result<()> {
    let table = parse_device(device)?;
    let partitions = table.partitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&partitions)?);
        return Ok(());
    }

    println!("=== Partition Table ===");
    println!("Path:   {}", device.display());
    println!(
        "Type:   {}",
        if table.is_gpt() {
            "GUID Partition Table"
        } else {
            "Master Boot Record"
        }
    );
    if let Some(gpt) = table.gpt() {
        println!("GUID:   {}", gpt.disk_guid());
    }
    println!("Size:   {} blocks", table.device_blocks());
    println!();

    if partitions.is_empty() {
        println!("No partitions found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<15} {:<15} {:<10} {:<20}",
        "Num", "Offset", "Size", "Active", "Name"
    );
    println!("{}", "-".repeat(70));
    for part in &partitions {
        println!(
            "{:<5} {:<15} {:<15} {:<10} {:<20}",
            part.num,
            format_bytes(part.byte_offset()),
            format_bytes(part.size * 512),
            match part.active {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            },
            part.name.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    }
}
