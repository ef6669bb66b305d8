// src/common/address.rs

use super::error::XerxesError;
use core::convert::TryFrom;
use core::fmt;

/// Single-byte bus address. Every leaf has one, and so does the master.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XerxesAddr(u8);

impl XerxesAddr {
    /// Default address of the bus master.
    pub const MASTER: XerxesAddr = XerxesAddr(0x00);
    /// Every leaf listens to this one; nobody replies to it.
    pub const BROADCAST: XerxesAddr = XerxesAddr(0xFF);

    /// Creates an address from an integer, rejecting anything outside `0..=255`.
    pub fn new(value: i32) -> Result<Self, XerxesError> {
        u8::try_from(value)
            .map(XerxesAddr)
            .map_err(|_| XerxesError::AddressRange(value))
    }

    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        XerxesAddr(byte)
    }

    #[inline]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Big-endian single byte representation, as it goes on the wire.
    #[inline]
    pub const fn to_bytes(&self) -> [u8; 1] {
        [self.0]
    }

    #[inline]
    pub const fn is_broadcast(&self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl Default for XerxesAddr {
    fn default() -> Self {
        Self::MASTER
    }
}

impl From<u8> for XerxesAddr {
    fn from(value: u8) -> Self {
        XerxesAddr(value)
    }
}

impl TryFrom<i32> for XerxesAddr {
    type Error = XerxesError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&[u8]> for XerxesAddr {
    type Error = XerxesError;

    /// Exactly one byte; anything longer does not fit an address.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            [byte] => Ok(XerxesAddr(*byte)),
            _ => Err(XerxesError::DecodeShape { expected: 1, got: value.len() }),
        }
    }
}

impl From<XerxesAddr> for u8 {
    fn from(value: XerxesAddr) -> Self {
        value.0
    }
}

impl fmt::Display for XerxesAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert_eq!(XerxesAddr::new(0).unwrap().as_u8(), 0);
        assert_eq!(XerxesAddr::new(255).unwrap().as_u8(), 255);
        assert_eq!(XerxesAddr::new(0x1f).unwrap(), XerxesAddr::from_byte(0x1f));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(matches!(XerxesAddr::new(-1), Err(XerxesError::AddressRange(-1))));
        assert!(matches!(XerxesAddr::new(256), Err(XerxesError::AddressRange(256))));
        assert!(matches!(XerxesAddr::try_from(1000), Err(XerxesError::AddressRange(1000))));
    }

    #[test]
    fn test_byte_and_integer_agree() {
        assert_eq!(XerxesAddr::from(0x05u8), XerxesAddr::new(5).unwrap());
        assert_eq!(XerxesAddr::try_from(&[0x05u8][..]).unwrap(), XerxesAddr::new(5).unwrap());
        assert!(XerxesAddr::try_from(&[0x05u8, 0x06][..]).is_err());
    }

    #[test]
    fn test_round_trip_bytes() {
        for value in [0i32, 255] {
            let addr = XerxesAddr::new(value).unwrap();
            let bytes = addr.to_bytes();
            assert_eq!(XerxesAddr::try_from(&bytes[..]).unwrap(), addr);
            assert_eq!(i32::from(u8::from(addr)), value);
        }
    }

    #[test]
    fn test_hash_by_value() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(XerxesAddr::new(7).unwrap());
        assert!(set.contains(&XerxesAddr::from(7u8)));
    }

    #[test]
    fn test_display() {
        assert_eq!(std::format!("{}", XerxesAddr::BROADCAST), "0xff");
        assert!(XerxesAddr::BROADCAST.is_broadcast());
    }
}
