//! Operation entries: one header sector plus `sector_count` data sectors describing one
//! intercepted block write (or contiguous group of writes).

use crate::crc::crc32;

/// Length of the serialized header fields, before zero-padding to a full sector.
pub const HEADER_LEN: usize = 16;

/// The header sector of one operation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationHeader {
    /// Destination sector in the file-system area.
    pub target_sector: u32,
    /// Number of contiguous target sectors (1 or more).
    pub sector_count: u32,
    /// CRC-32 of the full data payload.
    pub crc32_data: u32,
    /// CRC-32 of `target_sector`, `sector_count`, and `crc32_data`, in that order.
    pub crc32_header: u32,
}

impl OperationHeader {
    /// Build a header for `payload` destined for `target_sector`, computing both CRCs.
    pub fn new(target_sector: u32, sector_count: u32, payload: &[u8]) -> Self {
        let crc32_data = crc32(payload);
        let mut header = Self { target_sector, sector_count, crc32_data, crc32_header: 0 };
        header.crc32_header = header.compute_header_crc();
        header
    }

    /// Recompute the CRC over `target_sector`, `sector_count`, and `crc32_data`,
    /// excluding `crc32_header` itself.
    pub fn compute_header_crc(&self) -> u32 {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.target_sector.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.sector_count.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.crc32_data.to_le_bytes());
        crc32(&bytes)
    }

    /// Whether the stored `crc32_header` matches the recomputed value.
    pub fn header_crc_is_valid(&self) -> bool {
        self.crc32_header == self.compute_header_crc()
    }

    /// Whether `payload`'s CRC matches the stored `crc32_data`.
    pub fn data_crc_is_valid(&self, payload: &[u8]) -> bool {
        self.crc32_data == crc32(payload)
    }

    /// Serialize into `buf`, which must be at least [`HEADER_LEN`] bytes (typically a full
    /// sector); any remaining bytes are zeroed.
    pub fn serialize(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_LEN);
        buf.fill(0);
        buf[0..4].copy_from_slice(&self.target_sector.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sector_count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.crc32_data.to_le_bytes());
        buf[12..16].copy_from_slice(&self.crc32_header.to_le_bytes());
    }

    /// Parse a header out of `buf`.
    pub fn deserialize(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            target_sector: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            sector_count: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            crc32_data: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            crc32_header: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_validates() {
        let payload = [0xABu8; 4096];
        let header = OperationHeader::new(20, 1, &payload);
        let mut buf = [0u8; 4096];
        header.serialize(&mut buf);
        let parsed = OperationHeader::deserialize(&buf).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.header_crc_is_valid());
        assert!(parsed.data_crc_is_valid(&payload));
    }

    #[test]
    fn detects_header_corruption() {
        let mut header = OperationHeader::new(20, 1, &[0xABu8; 4096]);
        header.target_sector = 21; // corrupt after the CRC was computed
        assert!(!header.header_crc_is_valid());
    }

    #[test]
    fn detects_payload_corruption() {
        let header = OperationHeader::new(20, 1, &[0xABu8; 4096]);
        let mut corrupted = [0xABu8; 4096];
        corrupted[0] = 0x00;
        assert!(!header.data_crc_is_valid(&corrupted));
    }
}
