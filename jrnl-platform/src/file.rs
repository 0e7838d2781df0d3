//! File-backed block device for the CLI demo.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use jrnl_block::BlockDevice;

/// A [`BlockDevice`] backed by a plain file.
///
/// Erase is simulated by writing `0xFF` over the range, matching how NOR/NAND flash
/// reads after an erase cycle. This device does no wear-levelling and is not meant to
/// model a real flash translation layer — it exists so the CLI and its demos have
/// something concrete to mount.
pub struct FileBlockDevice {
    file: File,
    sector_size: u32,
    total_size: u64,
}

impl FileBlockDevice {
    /// Create a new backing file of `total_size` bytes (zero-filled) at `path`, truncating
    /// any existing file.
    pub fn create(path: impl AsRef<Path>, sector_size: u32, total_size: u64) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path)?;
        file.set_len(total_size)?;
        Ok(Self { file, sector_size, total_size })
    }

    /// Open an existing backing file at `path`.
    pub fn open(path: impl AsRef<Path>, sector_size: u32) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let total_size = file.metadata()?.len();
        Ok(Self { file, sector_size, total_size })
    }
}

impl BlockDevice for FileBlockDevice {
    type Error = io::Error;

    fn read(&mut self, offset_bytes: u64, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.file.seek(SeekFrom::Start(offset_bytes))?;
        self.file.read_exact(buf)
    }

    fn write(&mut self, offset_bytes: u64, buf: &[u8]) -> Result<(), Self::Error> {
        self.file.seek(SeekFrom::Start(offset_bytes))?;
        self.file.write_all(buf)
    }

    fn erase_range(&mut self, offset_bytes: u64, len: usize) -> Result<(), Self::Error> {
        self.file.seek(SeekFrom::Start(offset_bytes))?;
        let chunk = [0xFFu8; 4096];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.file.write_all(&chunk[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn total_size(&self) -> u64 {
        self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn erase_then_write_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut dev = FileBlockDevice::create(&path, 512, 512 * 8).unwrap();
        dev.erase_range(512, 512).unwrap();
        let mut buf = [0u8; 512];
        dev.read(512, &mut buf).unwrap();
        assert_eq!(buf, [0xFFu8; 512]);

        dev.write(512, &[0x42u8; 512]).unwrap();
        dev.read(512, &mut buf).unwrap();
        assert_eq!(buf, [0x42u8; 512]);
    }

    #[test]
    fn reopen_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("disk.img");
        {
            let mut dev = FileBlockDevice::create(&path, 512, 512 * 8).unwrap();
            dev.write(0, &[0x7Au8; 512]).unwrap();
        }
        let mut dev = FileBlockDevice::open(&path, 512).unwrap();
        assert_eq!(dev.total_size(), 512 * 8);
        let mut buf = [0u8; 512];
        dev.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0x7Au8; 512]);
    }
}
