//! Core block-device abstraction for the `jrnl` crash-consistent journaling engine.
//!
//! This crate provides the fundamental [`BlockDevice`] trait that defines how the
//! journal engine talks to the storage it is mounted on. It deliberately says nothing
//! about wear-levelling, filesystem layout, or journaling itself — those live in
//! `jrnl-core` and above. A `BlockDevice` is just three operations plus two accessors.
//!
//! # Example
//!
//! ```ignore
//! use jrnl_block::BlockDevice;
//!
//! struct MyDevice { sector_size: u32, data: Vec<u8> }
//!
//! impl BlockDevice for MyDevice {
//!     type Error = std::io::Error;
//!
//!     fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::Error> {
//!         buf.copy_from_slice(&self.data[offset as usize..offset as usize + buf.len()]);
//!         Ok(())
//!     }
//!
//!     fn write(&mut self, offset: u64, buf: &[u8]) -> Result<(), Self::Error> {
//!         self.data[offset as usize..offset as usize + buf.len()].copy_from_slice(buf);
//!         Ok(())
//!     }
//!
//!     fn erase_range(&mut self, offset: u64, len: usize) -> Result<(), Self::Error> {
//!         self.data[offset as usize..offset as usize + len].fill(0xFF);
//!         Ok(())
//!     }
//!
//!     fn sector_size(&self) -> u32 { self.sector_size }
//!     fn total_size(&self) -> u64 { self.data.len() as u64 }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

use core::fmt::{Debug, Display};

/// A trait for block devices that back a journal instance.
///
/// All offsets and lengths passed to [`read`](BlockDevice::read), [`write`](BlockDevice::write),
/// and [`erase_range`](BlockDevice::erase_range) are multiples of [`sector_size`](BlockDevice::sector_size).
/// Addressing is always in bytes, not sector indices — callers that think in sectors
/// (the journal store, the transaction engine) are responsible for the multiplication.
///
/// Implementations must not retry failed operations; failures propagate verbatim to the
/// caller, who decides whether and how to recover (see the journal engine's crash-recovery
/// protocol for the one place retries actually happen).
///
/// This trait is synchronous by design: every operation may block for as long as an
/// erase cycle takes, and callers (the transaction engine) hold a mutex across a full
/// commit, so there is no benefit to modeling this as `async`.
pub trait BlockDevice {
    /// The error type returned by this device's operations.
    type Error: Debug + Display;

    /// Read `buf.len()` bytes starting at `offset_bytes` into `buf`.
    ///
    /// `offset_bytes` and `buf.len()` must both be multiples of [`sector_size`](BlockDevice::sector_size).
    fn read(&mut self, offset_bytes: u64, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `buf` starting at `offset_bytes`.
    ///
    /// `offset_bytes` and `buf.len()` must both be multiples of [`sector_size`](BlockDevice::sector_size).
    /// Callers must have erased the target range first; this trait does not enforce it.
    fn write(&mut self, offset_bytes: u64, buf: &[u8]) -> Result<(), Self::Error>;

    /// Erase `len` bytes starting at `offset_bytes`.
    ///
    /// `offset_bytes` and `len` must both be multiples of [`sector_size`](BlockDevice::sector_size).
    fn erase_range(&mut self, offset_bytes: u64, len: usize) -> Result<(), Self::Error>;

    /// The device's sector size in bytes. Constant for the device's lifetime.
    fn sector_size(&self) -> u32;

    /// The device's total size in bytes. Always a multiple of [`sector_size`](BlockDevice::sector_size).
    fn total_size(&self) -> u64;
}

/// Erase then write `buf` at `offset_bytes`, the flash-write discipline every layer
/// above the block device follows: a write is always preceded by an `erase_range` over
/// the same region, since flash cells can only be reset to their erased state in bulk.
pub fn erase_then_write<D: BlockDevice>(
    device: &mut D,
    offset_bytes: u64,
    buf: &[u8],
) -> Result<(), D::Error> {
    device.erase_range(offset_bytes, buf.len())?;
    device.write(offset_bytes, buf)
}

/// Total sectors a device exposes, derived from `total_size / sector_size`.
///
/// Panics if `total_size` is not an exact multiple of `sector_size` — that invariant is
/// the volume descriptor's responsibility to uphold, not this function's to paper over.
pub fn total_sectors<D: BlockDevice>(device: &D) -> u32 {
    let sector_size = u64::from(device.sector_size());
    let total = device.total_size();
    assert_eq!(total % sector_size, 0, "total_size is not a multiple of sector_size");
    (total / sector_size) as u32
}
