// src/common/checksum.rs

use super::error::XerxesError;

/// Sums a byte slice modulo 256.
///
/// For a complete, valid frame (START through CHK) this is always zero.
#[inline]
pub fn residue(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Calculates the checksum byte for the given frame prefix.
///
/// The checksum is the two's complement of the byte sum: take the sum of all
/// bytes, complement it, add one, keep the low eight bits. Appending the
/// result to `data` makes the total byte sum zero modulo 256.
///
/// # Arguments
///
/// * `data`: Every frame byte preceding the checksum, starting with START.
///
/// # Returns
///
/// The checksum byte to append.
#[inline]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    (residue(data) ^ 0xFF).wrapping_add(1)
}

/// Verifies a complete frame including its trailing checksum byte.
///
/// # Returns
///
/// * `Ok(())` if the byte sum is zero.
/// * `Err(XerxesError::MessageIncomplete)` if the buffer is empty.
/// * `Err(XerxesError::Checksum)` with the non-zero residue otherwise.
pub fn verify_checksum<E>(frame: &[u8]) -> Result<(), XerxesError<E>>
where
    E: core::fmt::Debug,
{
    if frame.is_empty() {
        return Err(XerxesError::MessageIncomplete);
    }
    match residue(frame) {
        0 => Ok(()),
        residue => Err(XerxesError::Checksum { residue }),
    }
}
