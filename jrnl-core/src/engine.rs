//! The transaction engine: the state machine that intercepts writes, buffers them into
//! the journal store, and replays them to their final addresses.

use alloc::vec;
use alloc::vec::Vec;

use jrnl_block::{BlockDevice, erase_then_write};

use crate::config::{JournalConfig, VolumeDescriptor};
use crate::entry::OperationHeader;
use crate::error::Error;
use crate::master::{MasterRecord, PersistedStatus};
use crate::store::JournalStore;

/// In-memory state of the transaction engine.
///
/// INIT and READY both persist as [`PersistedStatus::Ready`]: the distinction only
/// matters for which write path is legal (direct passthrough vs. buffered-and-replayed)
/// and for which states `begin` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Init,
    Ready,
    Open,
    Commit,
}

fn persisted_status_for(mode: Mode) -> PersistedStatus {
    match mode {
        Mode::Init | Mode::Ready => PersistedStatus::Ready,
        Mode::Open => PersistedStatus::Open,
        Mode::Commit => PersistedStatus::Commit,
    }
}

/// One mounted journal instance: a device, the master record describing its store, and
/// the in-memory mode that tracks which write path is currently legal.
///
/// Not `Sync` by itself — the registry wraps each instance in its own mutex to get the
/// per-instance serialisation the registry promises.
pub struct JournalEngine<D: BlockDevice> {
    device: D,
    store: JournalStore,
    master: MasterRecord,
    mode: Mode,
}

impl<D: BlockDevice> JournalEngine<D> {
    /// Run the mount sequence over `device` with `config`.
    pub(crate) fn mount(mut device: D, config: JournalConfig) -> Result<Self, Error<D::Error>> {
        if !config.is_valid() {
            return Err(Error::InvalidArgument);
        }
        let volume = VolumeDescriptor { total_size: device.total_size(), sector_size: device.sector_size() };
        if !volume.is_valid() {
            return Err(Error::InvalidArgument);
        }
        let total_sectors = volume.total_sectors();
        if config.store_size_sectors >= total_sectors {
            return Err(Error::InvalidArgument);
        }
        let store_offset_sector = total_sectors - config.store_size_sectors;
        let store = JournalStore::new(store_offset_sector, config.store_size_sectors, volume.sector_size);

        if config.overwrite_existing || config.force_format {
            let master = MasterRecord::fresh(volume, config.store_size_sectors, store_offset_sector);
            let mut engine = Self { device, store, master, mode: Mode::Init };
            engine.persist_master()?;
            #[cfg(feature = "log")]
            log::debug!("formatted fresh journal store ({} sectors)", config.store_size_sectors);
            return Ok(engine);
        }

        let master_sector = config.store_size_sectors - 1;
        let mut buf = vec![0u8; volume.sector_size as usize];
        let candidate =
            store.read(&mut device, master_sector, &mut buf, 1).ok().and_then(|()| MasterRecord::deserialize(&buf));

        let mut engine = match candidate {
            Some(master) => {
                if master.volume != volume || master.store_size_sectors != config.store_size_sectors {
                    return Err(Error::InconsistentState);
                }
                let mut engine = Self { device, store, master, mode: Mode::Init };
                if config.replay_after_mount {
                    engine.recover()?;
                }
                engine
            }
            None => {
                let master = MasterRecord::fresh(volume, config.store_size_sectors, store_offset_sector);
                Self { device, store, master, mode: Mode::Init }
            }
        };

        // Mount step 7: always leave the instance ready for the file-system adapter's
        // own format/mount phase, regardless of which branch above produced `engine`.
        engine.mode = Mode::Init;
        engine.master.next_free_sector = 0;
        engine.persist_master()?;
        Ok(engine)
    }

    /// Recovery: resolve whatever the persisted status says was in flight.
    pub fn recover(&mut self) -> Result<(), Error<D::Error>> {
        match self.master.status {
            PersistedStatus::Ready => Ok(()),
            PersistedStatus::Open => {
                #[cfg(feature = "log")]
                log::debug!("discarding an incomplete transaction found at mount");
                self.master.next_free_sector = 0;
                self.mode = Mode::Ready;
                self.persist_master()
            }
            PersistedStatus::Commit => {
                #[cfg(feature = "log")]
                log::warn!(
                    "resuming an interrupted commit found at mount, replaying {} buffered sector(s)",
                    self.master.next_free_sector
                );
                self.mode = Mode::Commit;
                self.replay()
            }
        }
    }

    /// Open a new transaction.
    pub fn begin(&mut self) -> Result<(), Error<D::Error>> {
        if self.mode != Mode::Ready {
            return Err(Error::InvalidState);
        }
        self.mode = Mode::Open;
        self.master.next_free_sector = 0;
        self.persist_master()
    }

    /// Write a sector. INIT is a direct passthrough; OPEN appends a buffered operation
    /// entry.
    pub fn write(&mut self, target_sector: u32, buf: &[u8], count: u32) -> Result<(), Error<D::Error>> {
        if buf.is_empty() || count == 0 {
            return Err(Error::InvalidArgument);
        }
        let sector_size = u64::from(self.sector_size());
        if buf.len() as u64 != u64::from(count) * sector_size {
            return Err(Error::InvalidArgument);
        }
        match self.mode {
            Mode::Init => {
                let offset = u64::from(target_sector) * sector_size;
                erase_then_write(&mut self.device, offset, buf).map_err(Error::Device)
            }
            Mode::Open => self.append_operation(target_sector, buf, count),
            Mode::Ready | Mode::Commit => Err(Error::InvalidState),
        }
    }

    fn append_operation(&mut self, target_sector: u32, buf: &[u8], count: u32) -> Result<(), Error<D::Error>> {
        let next = self.master.next_free_sector;
        let store_size = self.master.store_size_sectors;
        // Strict `<`, not `<=`: the last sector of the store is always reserved for the
        // master record itself, never for buffered operation data.
        if !(u64::from(next) + 1 + u64::from(count) < u64::from(store_size) - 1) {
            return Err(Error::NoMemory);
        }

        let header = OperationHeader::new(target_sector, count, buf);
        let mut header_buf = vec![0u8; self.sector_size() as usize];
        header.serialize(&mut header_buf);

        self.store.write(&mut self.device, next, &header_buf, 1)?;
        self.store.write(&mut self.device, next + 1, buf, count)?;

        self.master.next_free_sector = next + 1 + count;
        self.persist_master()
    }

    /// End the open transaction. `commit = false` cancels; `commit = true` replays.
    pub fn end(&mut self, commit: bool) -> Result<(), Error<D::Error>> {
        if commit {
            if self.mode != Mode::Open {
                return Err(Error::InvalidState);
            }
            self.mode = Mode::Commit;
            self.persist_master()?;
            self.replay()
        } else {
            match self.mode {
                Mode::Open => {
                    self.master.next_free_sector = 0;
                    self.mode = Mode::Ready;
                    self.persist_master()
                }
                Mode::Ready => Ok(()),
                Mode::Init | Mode::Commit => Err(Error::InvalidState),
            }
        }
    }

    /// The replay algorithm, shared by `end(commit = true)` and recovery of a COMMIT-state
    /// store. Idempotent: re-running it against a store whose operations were already
    /// applied re-erases and re-writes the same bytes at the same addresses.
    fn replay(&mut self) -> Result<(), Error<D::Error>> {
        let sector_size = self.sector_size() as usize;
        let next_free = self.master.next_free_sector;
        let mut header_buf = vec![0u8; sector_size];
        let mut cursor = 0u32;

        while cursor < next_free {
            self.store.read(&mut self.device, cursor, &mut header_buf, 1)?;
            let header = OperationHeader::deserialize(&header_buf).ok_or(Error::InvalidChecksum)?;
            if !header.header_crc_is_valid() {
                return Err(Error::InvalidChecksum);
            }

            let mut payload: Vec<u8> = vec![0u8; header.sector_count as usize * sector_size];
            self.store.read(&mut self.device, cursor + 1, &mut payload, header.sector_count)?;
            if !header.data_crc_is_valid(&payload) {
                return Err(Error::InvalidChecksum);
            }

            let target_offset = u64::from(header.target_sector) * sector_size as u64;
            erase_then_write(&mut self.device, target_offset, &payload).map_err(Error::Device)?;

            cursor += 1 + header.sector_count;
        }

        self.mode = Mode::Ready;
        self.master.next_free_sector = 0;
        self.persist_master()
    }

    /// Toggle direct I/O mode.
    pub fn set_direct_io(&mut self, on: bool) -> Result<(), Error<D::Error>> {
        match self.mode {
            Mode::Init | Mode::Ready => {
                self.mode = if on { Mode::Init } else { Mode::Ready };
                self.persist_master()
            }
            Mode::Open | Mode::Commit => Err(Error::InvalidState),
        }
    }

    /// Read a sector. Bounds-checked passthrough; never consults the store.
    pub fn read(&mut self, target_sector: u32, buf: &mut [u8], count: u32) -> Result<(), Error<D::Error>> {
        if buf.is_empty() || count == 0 {
            return Err(Error::InvalidArgument);
        }
        let sector_size = u64::from(self.sector_size());
        if buf.len() as u64 != u64::from(count) * sector_size {
            return Err(Error::InvalidArgument);
        }
        let end = target_sector.checked_add(count).ok_or(Error::InvalidArgument)?;
        if end > self.master.store_offset_sector {
            return Err(Error::InvalidArgument);
        }
        let offset = u64::from(target_sector) * sector_size;
        self.device.read(offset, buf).map_err(Error::Device)
    }

    /// The file-system-visible sector count: `total_sectors - store_size_sectors`.
    pub fn query_sector_count(&self) -> u32 {
        self.master.store_offset_sector
    }

    /// The sector size in bytes.
    pub fn query_sector_size(&self) -> u32 {
        self.master.volume.sector_size
    }

    fn sector_size(&self) -> u32 {
        self.master.volume.sector_size
    }

    /// Unwrap the instance, handing the underlying device back to the caller.
    pub(crate) fn into_device(self) -> D {
        self.device
    }

    fn persist_master(&mut self) -> Result<(), Error<D::Error>> {
        self.master.status = persisted_status_for(self.mode);
        let mut buf = vec![0u8; self.sector_size() as usize];
        self.master.serialize(&mut buf);
        let master_sector = self.master.store_size_sectors - 1;
        self.store.write(&mut self.device, master_sector, &buf, 1)
    }
}
