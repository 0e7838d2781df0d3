//! A crash-consistent write journal interposed between a file-system driver and a flash
//! [`BlockDevice`](jrnl_block::BlockDevice).
//!
//! Writes made inside a transaction are buffered into a reserved store at the tail of the
//! volume before they ever touch their real destination; `transaction_end(true)` replays
//! them into place. If power is lost mid-replay, the next mount finds the buffered copy
//! still intact (each entry carries its own CRC-32) and finishes the replay before the
//! file system sees the volume again.
//!
//! [`Registry`] is the handle-based entry point most callers want; [`JournalConfig`] and
//! [`VolumeDescriptor`] configure a mount.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod config;
mod crc;
mod engine;
mod entry;
mod error;
mod master;
#[cfg(feature = "std")]
mod registry;
mod store;

pub use config::{JournalConfig, VolumeDescriptor};
pub use error::{Error, Result};
#[cfg(feature = "std")]
pub use registry::Registry;

/// Minimum number of simultaneously mounted instances the public API guarantees.
pub const MIN_HANDLES: usize = 8;

/// A [`Registry`] sized to [`MIN_HANDLES`], the minimum the public API guarantees.
#[cfg(feature = "std")]
pub type JournalRegistry<D> = Registry<D, MIN_HANDLES>;
