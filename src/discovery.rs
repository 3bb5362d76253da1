//! The DISC_UNIQUE_BRANCH response encoding.
//!
//! A discovery response carries no standard header: up to seven `0xFE`
//! preamble bytes, the `0xAA` delimiter, then the uid and its checksum with
//! every byte doubled as `(byte | 0xAA)` followed by `(byte | 0x55)`. The
//! doubling guarantees transitions on the wire while the receiver recovers
//! the original byte as the AND of each pair.

use crate::consts::{PREAMBLE_BYTE, RDM_MAX_DISCOVERY_RESPONSE_SIZE, SEPARATOR_BYTE};
use crate::unique_identifier::Uid;
use crate::utils::calculate_checksum;

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EuidDecodeError {
    /// Fewer bytes than the shortest possible response (17).
    BufferTooSmall,
    /// No delimiter within the first 8 bytes.
    SeparatorNotFound,
    /// The doubled checksum does not match the doubled uid bytes; on a
    /// shared bus this is how overlapping responses usually surface.
    WrongChecksum,
}

impl core::fmt::Display for EuidDecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EuidDecodeError::BufferTooSmall => write!(f, "buffer too small"),
            EuidDecodeError::SeparatorNotFound => write!(f, "separator byte not found"),
            EuidDecodeError::WrongChecksum => write!(f, "checksum is incorrect"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EuidDecodeError {}

/// Result of soliciting a uid range with DISC_UNIQUE_BRANCH.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryOption {
    /// No device responded; the range is empty.
    NoDevice,
    /// The response could not be decoded; more than one unmuted device
    /// lives in the range.
    Collision,
    /// Exactly one unmuted device responded.
    Found(Uid),
}

/// Encodes `uid` as a discovery response with the requested preamble length
/// (clamped to 7). Returns the number of bytes written.
///
/// The destination must hold [RDM_MAX_DISCOVERY_RESPONSE_SIZE] bytes.
pub fn encode_euid(destination: &mut [u8], uid: &Uid, preamble_len: usize) -> usize {
    let preamble_len = preamble_len.min(7);

    destination[..preamble_len].fill(PREAMBLE_BYTE);
    destination[preamble_len] = SEPARATOR_BYTE;

    let euid = &mut destination[preamble_len + 1..preamble_len + 17];
    for (pair, byte) in euid[..12].chunks_exact_mut(2).zip(uid.to_bytes()) {
        pair[0] = byte | 0xAA;
        pair[1] = byte | 0x55;
    }

    let checksum = calculate_checksum(&euid[..12]);
    let [hi, lo] = checksum.to_be_bytes();
    euid[12] = hi | 0xAA;
    euid[13] = hi | 0x55;
    euid[14] = lo | 0xAA;
    euid[15] = lo | 0x55;

    preamble_len + 17
}

/// Decodes a discovery response, returning the uid and the number of bytes
/// consumed (`preamble_len + 17`).
pub fn decode_euid(source: &[u8]) -> Result<(Uid, usize), EuidDecodeError> {
    if source.len() < 17 {
        return Err(EuidDecodeError::BufferTooSmall);
    }

    let preamble_len = source
        .iter()
        .take(8)
        .position(|&byte| byte == SEPARATOR_BYTE)
        .ok_or(EuidDecodeError::SeparatorNotFound)?;
    if source.len() < preamble_len + 17 {
        return Err(EuidDecodeError::BufferTooSmall);
    }

    let euid = &source[preamble_len + 1..preamble_len + 17];

    let mut uid_bytes = [0u8; 6];
    decode_pairs(&euid[..12], &mut uid_bytes);
    let mut checksum_bytes = [0u8; 2];
    decode_pairs(&euid[12..16], &mut checksum_bytes);

    if calculate_checksum(&euid[..12]) != u16::from_be_bytes(checksum_bytes) {
        return Err(EuidDecodeError::WrongChecksum);
    }

    Ok((Uid::from_bytes(&uid_bytes), preamble_len + 17))
}

/// Each output byte is the AND of one doubled pair.
fn decode_pairs(source: &[u8], destination: &mut [u8]) {
    for (byte, pair) in destination.iter_mut().zip(source.chunks_exact(2)) {
        *byte = pair[0] & pair[1];
    }
}
