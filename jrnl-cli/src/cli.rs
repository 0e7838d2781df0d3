//! Journal store CLI tool.
//!
//! Formats and inspects journal-backed volumes, and can run a single write transaction
//! against one for ad hoc testing.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use jrnl_block::BlockDevice;
use jrnl_core::{JournalConfig, JournalRegistry};
use jrnl_platform::{FileBlockDevice, MemoryBlockDevice};

const DEFAULT_SECTOR_SIZE: u32 = 512;

/// Journal store CLI tool.
#[derive(Parser, Debug)]
#[command(author, version, about = "Format, inspect, and exercise jrnl journal stores")]
pub struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new volume image and format a journal store at its tail.
    Create {
        /// Path for the new volume image.
        image: PathBuf,

        /// Total size of the image (e.g. "1M", "64K", "10G").
        #[arg(short, long)]
        size: String,

        /// Sectors reserved for the journal store.
        #[arg(short = 'j', long, default_value_t = 16)]
        store_sectors: u32,

        /// Sector size in bytes.
        #[arg(long, default_value_t = DEFAULT_SECTOR_SIZE)]
        sector_size: u32,
    },

    /// Mount an existing image and print its master record and sizing.
    Info {
        /// Path to the volume image.
        image: PathBuf,

        /// Sectors reserved for the journal store (must match how it was created).
        #[arg(short = 'j', long, default_value_t = 16)]
        store_sectors: u32,
    },

    /// Write one sector inside a transaction, then commit or cancel it.
    Write {
        /// Path to the volume image.
        image: PathBuf,

        /// Sectors reserved for the journal store (must match how it was created).
        #[arg(short = 'j', long, default_value_t = 16)]
        store_sectors: u32,

        /// Target sector, relative to the file-system area.
        sector: u32,

        /// Byte value to fill the sector with.
        #[arg(long, default_value_t = 0xAA)]
        fill: u8,

        /// Cancel the transaction instead of committing it.
        #[arg(long)]
        cancel: bool,
    },

    /// Read one sector and print its first bytes.
    Read {
        /// Path to the volume image.
        image: PathBuf,

        /// Sectors reserved for the journal store (must match how it was created).
        #[arg(short = 'j', long, default_value_t = 16)]
        store_sectors: u32,

        /// Sector to read, relative to the file-system area.
        sector: u32,
    },

    /// Reproduce a crash mid-commit by loading the image into memory, committing with a
    /// fault injected after a fixed number of device operations, and writing whatever
    /// torn state results back to the image.
    ///
    /// Not part of the normal workflow: this exists to generate fixtures for exercising
    /// recovery (`jrnl info` / `jrnl write` afterward) against a genuinely interrupted
    /// commit instead of a hand-edited image.
    #[command(hide = true)]
    SimulateCrash {
        /// Path to the volume image.
        image: PathBuf,

        /// Sectors reserved for the journal store (must match how it was created).
        #[arg(short = 'j', long, default_value_t = 16)]
        store_sectors: u32,

        /// Target sector for the interrupted write.
        sector: u32,

        /// Number of device operations (erase/write calls) to let through before the
        /// next one fails.
        #[arg(long)]
        abort_at: usize,
    },
}

/// Parse a size string like "32M", "1G", "512K" into a byte count.
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let (num_str, multiplier) = if let Some(prefix) = s.strip_suffix('K') {
        (prefix, 1024u64)
    } else if let Some(prefix) = s.strip_suffix('M') {
        (prefix, 1024 * 1024)
    } else if let Some(prefix) = s.strip_suffix('G') {
        (prefix, 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1u64)
    };
    let num: u64 = num_str.parse().context("invalid size number")?;
    Ok(num * multiplier)
}

pub fn run(cli: Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Create { image, size, store_sectors, sector_size } => {
            cmd_create(&image, &size, store_sectors, sector_size)
        }
        Command::Info { image, store_sectors } => cmd_info(&image, store_sectors),
        Command::Write { image, store_sectors, sector, fill, cancel } => {
            cmd_write(&image, store_sectors, sector, fill, cancel)
        }
        Command::Read { image, store_sectors, sector } => cmd_read(&image, store_sectors, sector),
        Command::SimulateCrash { image, store_sectors, sector, abort_at } => {
            cmd_simulate_crash(&image, store_sectors, sector, abort_at)
        }
    }
}

fn cmd_create(image: &std::path::Path, size: &str, store_sectors: u32, sector_size: u32) -> Result<()> {
    let total_size = parse_size(size)?;
    let device = FileBlockDevice::create(image, sector_size, total_size)
        .with_context(|| format!("failed to create {}", image.display()))?;

    let registry: JournalRegistry<FileBlockDevice> = JournalRegistry::new();
    let handle = registry
        .mount(device, JournalConfig::new(store_sectors).force_format(true))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to format journal store")?;

    println!("created {} ({total_size} bytes, {sector_size}-byte sectors)", image.display());
    let sector_count = registry.query_sector_count(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("file-system area: {sector_count} sectors");
    registry.unmount(handle).ok();
    Ok(())
}

fn cmd_info(image: &std::path::Path, store_sectors: u32) -> Result<()> {
    let device = FileBlockDevice::open(image, DEFAULT_SECTOR_SIZE)
        .with_context(|| format!("failed to open {}", image.display()))?;

    let registry: JournalRegistry<FileBlockDevice> = JournalRegistry::new();
    let handle = registry
        .mount(device, JournalConfig::new(store_sectors))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to mount journal store")?;

    let sector_count = registry.query_sector_count(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
    let sector_size = registry.query_sector_size(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("file-system area: {sector_count} sectors");
    println!("sector size: {sector_size} bytes");
    registry.unmount(handle).ok();
    Ok(())
}

fn cmd_write(image: &std::path::Path, store_sectors: u32, sector: u32, fill: u8, cancel: bool) -> Result<()> {
    let device = FileBlockDevice::open(image, DEFAULT_SECTOR_SIZE)
        .with_context(|| format!("failed to open {}", image.display()))?;

    let registry: JournalRegistry<FileBlockDevice> = JournalRegistry::new();
    let handle = registry
        .mount(device, JournalConfig::new(store_sectors))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to mount journal store")?;

    let sector_size = registry.query_sector_size(handle).map_err(|e| anyhow::anyhow!("{e}"))? as usize;
    registry.set_direct_io(handle, false).map_err(|e| anyhow::anyhow!("{e}"))?;
    registry.transaction_begin(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
    registry.write(handle, sector, &vec![fill; sector_size], 1).map_err(|e| anyhow::anyhow!("{e}"))?;
    registry.transaction_end(handle, !cancel).map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{} sector {sector}", if cancel { "cancelled write to" } else { "committed write to" });
    registry.unmount(handle).ok();
    Ok(())
}

fn cmd_read(image: &std::path::Path, store_sectors: u32, sector: u32) -> Result<()> {
    let device = FileBlockDevice::open(image, DEFAULT_SECTOR_SIZE)
        .with_context(|| format!("failed to open {}", image.display()))?;

    let registry: JournalRegistry<FileBlockDevice> = JournalRegistry::new();
    let handle = registry
        .mount(device, JournalConfig::new(store_sectors))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to mount journal store")?;

    let sector_size = registry.query_sector_size(handle).map_err(|e| anyhow::anyhow!("{e}"))? as usize;
    let mut buf = vec![0u8; sector_size];
    registry.read(handle, sector, &mut buf, 1).map_err(|e| anyhow::anyhow!("{e}"))?;

    let preview_len = buf.len().min(32);
    print!("sector {sector}: ");
    for byte in &buf[..preview_len] {
        print!("{byte:02x}");
    }
    println!();
    registry.unmount(handle).ok();
    Ok(())
}

fn cmd_simulate_crash(image: &std::path::Path, store_sectors: u32, sector: u32, abort_at: usize) -> Result<()> {
    let bytes = std::fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    if bytes.len() % DEFAULT_SECTOR_SIZE as usize != 0 {
        bail!("image size is not a multiple of the sector size");
    }
    let total_sectors = (bytes.len() / DEFAULT_SECTOR_SIZE as usize) as u32;
    let mut device = MemoryBlockDevice::new(DEFAULT_SECTOR_SIZE, total_sectors);
    // Seed the in-memory device from the image's current contents before injecting:
    // these writes must not themselves consume the countdown set below.
    let mut offset = 0u64;
    for chunk in bytes.chunks(DEFAULT_SECTOR_SIZE as usize) {
        device.write(offset, chunk).map_err(|e| anyhow::anyhow!("{e}"))?;
        offset += chunk.len() as u64;
    }

    // `abort_at` counts device operations from this mount onward, including the two
    // (erase + write) spent on mount's own master-record bookkeeping — pick a value
    // large enough to survive those, or mount itself will fail with the image
    // unrecoverable.
    device.fail_after(abort_at);

    let registry: JournalRegistry<MemoryBlockDevice> = JournalRegistry::new();
    let handle = registry
        .mount(device, JournalConfig::new(store_sectors))
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("mount itself absorbed the fault; raise --abort-at")?;

    let sector_size = registry.query_sector_size(handle).map_err(|e| anyhow::anyhow!("{e}"))? as usize;
    let setup_result: Result<(), anyhow::Error> = (|| {
        registry.set_direct_io(handle, false).map_err(|e| anyhow::anyhow!("{e}"))?;
        registry.transaction_begin(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
        registry.write(handle, sector, &vec![0x5Au8; sector_size], 1).map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(())
    })();
    let commit_result = if setup_result.is_ok() { registry.transaction_end(handle, true) } else { Ok(()) };

    let device = registry.unmount(handle).map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut out = std::fs::File::create(image).with_context(|| format!("failed to rewrite {}", image.display()))?;
    out.write_all(device.bytes())?;

    match (setup_result, commit_result) {
        (Ok(()), Ok(())) => println!("commit completed before the injected fault could fire"),
        _ => println!("crash injected (run `jrnl info`/`jrnl write` afterward to observe recovery)"),
    }
    Ok(())
}
