//! The handle-based instance registry: a fixed-size table of mounted journal engines.
//!
//! A single mutex (`alloc_lock`) serialises table membership changes (`mount`/`unmount`);
//! every other call only locks the one slot it touches, so a long-running commit on one
//! handle never blocks `mount`/`unmount` of an unrelated one.

use std::sync::Mutex;

use jrnl_block::BlockDevice;

use crate::config::JournalConfig;
use crate::engine::JournalEngine;
use crate::error::Error;

/// A fixed-size table of mounted journal instances, addressed by handle.
///
/// `MAX_HANDLES` must be at least [`crate::MIN_HANDLES`] to meet the public API's
/// guarantee of simultaneously mounted instances; nothing here enforces that at the
/// type level, so pick it deliberately.
pub struct Registry<D: BlockDevice, const MAX_HANDLES: usize> {
    alloc_lock: Mutex<()>,
    slots: [Mutex<Option<JournalEngine<D>>>; MAX_HANDLES],
}

impl<D: BlockDevice, const MAX_HANDLES: usize> Registry<D, MAX_HANDLES> {
    /// An empty registry with no mounted instances.
    pub fn new() -> Self {
        Self { alloc_lock: Mutex::new(()), slots: std::array::from_fn(|_| Mutex::new(None)) }
    }

    /// Mount `device` with `config`, returning the handle of the new instance.
    ///
    /// Handles are never negative; `-1` is reserved to mean "no handle" at the caller's
    /// discretion and is never returned here.
    pub fn mount(&self, device: D, config: JournalConfig) -> Result<i32, Error<D::Error>> {
        let _guard = self.alloc_lock.lock().unwrap();
        let index = self
            .slots
            .iter()
            .position(|slot| slot.lock().unwrap().is_none())
            .ok_or(Error::NoMemory)?;
        let engine = JournalEngine::mount(device, config)?;
        *self.slots[index].lock().unwrap() = Some(engine);
        Ok(index as i32)
    }

    /// Unmount `handle`, freeing its slot and handing the underlying device back to the
    /// caller. Does not flush or replay anything; a caller with an OPEN transaction should
    /// `transaction_end(handle, false)` first.
    pub fn unmount(&self, handle: i32) -> Result<D, Error<D::Error>> {
        let _guard = self.alloc_lock.lock().unwrap();
        let slot = self.slot(handle)?;
        let mut guard = slot.lock().unwrap();
        let engine = guard.take().ok_or(Error::NotFound)?;
        Ok(engine.into_device())
    }

    /// Begin a transaction on `handle`.
    pub fn transaction_begin(&self, handle: i32) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, JournalEngine::begin)
    }

    /// End the open transaction on `handle`, committing (and replaying) if `commit`, else
    /// discarding the buffered operations.
    pub fn transaction_end(&self, handle: i32, commit: bool) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, |engine| engine.end(commit))
    }

    /// Write `count` sectors worth of `buf` to `target_sector` on `handle`.
    pub fn write(&self, handle: i32, target_sector: u32, buf: &[u8], count: u32) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, |engine| engine.write(target_sector, buf, count))
    }

    /// Read `count` sectors starting at `target_sector` on `handle` into `buf`.
    pub fn read(&self, handle: i32, target_sector: u32, buf: &mut [u8], count: u32) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, |engine| engine.read(target_sector, buf, count))
    }

    /// Toggle direct (unbuffered) I/O on `handle`.
    pub fn set_direct_io(&self, handle: i32, on: bool) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, |engine| engine.set_direct_io(on))
    }

    /// Run recovery on `handle` on demand, outside of mount.
    pub fn recover(&self, handle: i32) -> Result<(), Error<D::Error>> {
        self.with_engine(handle, JournalEngine::recover)
    }

    /// The file-system-visible sector count on `handle`.
    pub fn query_sector_count(&self, handle: i32) -> Result<u32, Error<D::Error>> {
        self.with_engine(handle, |engine| Ok(engine.query_sector_count()))
    }

    /// The sector size, in bytes, on `handle`.
    pub fn query_sector_size(&self, handle: i32) -> Result<u32, Error<D::Error>> {
        self.with_engine(handle, |engine| Ok(engine.query_sector_size()))
    }

    fn slot(&self, handle: i32) -> Result<&Mutex<Option<JournalEngine<D>>>, Error<D::Error>> {
        if handle < 0 {
            return Err(Error::InvalidArgument);
        }
        self.slots.get(handle as usize).ok_or(Error::InvalidArgument)
    }

    fn with_engine<T>(
        &self,
        handle: i32,
        f: impl FnOnce(&mut JournalEngine<D>) -> Result<T, Error<D::Error>>,
    ) -> Result<T, Error<D::Error>> {
        let slot = self.slot(handle)?;
        let mut guard = slot.lock().unwrap();
        let engine = guard.as_mut().ok_or(Error::NotFound)?;
        f(engine)
    }
}

impl<D: BlockDevice, const MAX_HANDLES: usize> Default for Registry<D, MAX_HANDLES> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jrnl_platform::MemoryBlockDevice;

    fn config() -> JournalConfig {
        JournalConfig::new(4)
    }

    #[test]
    fn mount_assigns_increasing_handles_and_unmount_frees_them() {
        let registry: Registry<MemoryBlockDevice, 8> = Registry::new();
        let a = registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        let b = registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        assert_ne!(a, b);
        registry.unmount(a).unwrap();
        let c = registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        assert_eq!(c, a, "freed slot should be reused");
        registry.unmount(b).unwrap();
        registry.unmount(c).unwrap();
    }

    #[test]
    fn unknown_handle_is_not_found() {
        let registry: Registry<MemoryBlockDevice, 8> = Registry::new();
        let err = registry.write(0, 0, &[0u8; 512], 1).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn negative_handle_is_invalid_argument() {
        let registry: Registry<MemoryBlockDevice, 8> = Registry::new();
        let err = registry.unmount(-1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument));
    }

    #[test]
    fn registry_reports_no_memory_once_full() {
        let registry: Registry<MemoryBlockDevice, 2> = Registry::new();
        registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        let err = registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap_err();
        assert!(matches!(err, Error::NoMemory));
    }

    #[test]
    fn full_transaction_round_trips_through_the_registry() {
        let registry: Registry<MemoryBlockDevice, 8> = Registry::new();
        let handle = registry.mount(MemoryBlockDevice::new(512, 64), config()).unwrap();
        registry.set_direct_io(handle, false).unwrap();
        registry.transaction_begin(handle).unwrap();
        registry.write(handle, 3, &[0x5Au8; 512], 1).unwrap();
        registry.transaction_end(handle, true).unwrap();
        let mut out = [0u8; 512];
        registry.read(handle, 3, &mut out, 1).unwrap();
        assert_eq!(out, [0x5Au8; 512]);
    }
}
