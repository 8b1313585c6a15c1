//! CRC32 checksum for object records
//!
//! Covers the length prefix and the body; every decode verifies it before
//! parsing anything.

use crc32fast::Hasher;

/// CRC32 (IEEE) over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"\"number\" [scalar int32] v1";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = compute_checksum(&data);
        data[2] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }

    #[test]
    fn test_known_value() {
        // CRC32/IEEE check value
        assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
    }
}
