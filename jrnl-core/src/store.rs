//! Sector-addressed I/O relative to the journal store, the reserved range at the tail
//! of the volume.

use jrnl_block::{BlockDevice, erase_then_write};

use crate::error::Error;

/// The reserved sector range at the tail of a volume, addressed relative to its own start.
///
/// Carries no device reference of its own — every method takes the device explicitly, so
/// the transaction engine keeps sole ownership of it. No locking happens at this layer;
/// that's the transaction engine's job.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JournalStore {
    store_offset_sector: u32,
    store_size_sectors: u32,
    sector_size: u32,
}

impl JournalStore {
    pub fn new(store_offset_sector: u32, store_size_sectors: u32, sector_size: u32) -> Self {
        Self { store_offset_sector, store_size_sectors, sector_size }
    }

    fn byte_offset(&self, store_sector: u32) -> u64 {
        u64::from(self.store_offset_sector + store_sector) * u64::from(self.sector_size)
    }

    fn check_bounds<E>(&self, store_sector: u32, count: u32) -> Result<(), Error<E>> {
        if count == 0 || store_sector.checked_add(count).is_none_or(|end| end > self.store_size_sectors) {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    /// Read `count` sectors starting at `store_sector` into `buf`.
    pub fn read<D: BlockDevice>(
        &self,
        device: &mut D,
        store_sector: u32,
        buf: &mut [u8],
        count: u32,
    ) -> Result<(), Error<D::Error>> {
        self.check_bounds(store_sector, count)?;
        device.read(self.byte_offset(store_sector), buf).map_err(Error::Device)
    }

    /// Erase then write `count` sectors worth of `buf` starting at `store_sector`.
    pub fn write<D: BlockDevice>(
        &self,
        device: &mut D,
        store_sector: u32,
        buf: &[u8],
        count: u32,
    ) -> Result<(), Error<D::Error>> {
        self.check_bounds(store_sector, count)?;
        erase_then_write(device, self.byte_offset(store_sector), buf).map_err(Error::Device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jrnl_platform::MemoryBlockDevice;

    #[test]
    fn rejects_out_of_range_sectors() {
        let mut device = MemoryBlockDevice::new(512, 32);
        let store = JournalStore::new(16, 16, 512);
        let buf = [0u8; 512];
        let err = store.write(&mut device, 16, &buf, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument));
    }

    #[test]
    fn round_trips_within_bounds() {
        let mut device = MemoryBlockDevice::new(512, 32);
        let store = JournalStore::new(16, 16, 512);
        store.write(&mut device, 0, &[0x42u8; 512], 1).unwrap();
        let mut out = [0u8; 512];
        store.read(&mut device, 0, &mut out, 1).unwrap();
        assert_eq!(out, [0x42u8; 512]);
    }
}
