use core::fmt::Display;

use crate::error::{self, Error};

/// Size of the count space, counts wrap around at 2^32
pub const COUNT_MODULUS: u64 = 1 << 32;

/// Supported sequence number widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub enum SnWidth {
    Bits12,
    Bits18,
}

impl SnWidth {
    /// Number of bits the sequence number occupies on the wire
    pub const fn bits(self) -> u32 {
        match self {
            SnWidth::Bits12 => 12,
            SnWidth::Bits18 => 18,
        }
    }
}

impl TryFrom<u8> for SnWidth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            12 => Ok(SnWidth::Bits12),
            18 => Ok(SnWidth::Bits18),
            other => Err(error::unsupported_sn_width(other)),
        }
    }
}

impl From<SnWidth> for u8 {
    fn from(width: SnWidth) -> Self {
        width.bits() as u8
    }
}

impl Display for SnWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} bit", self.bits())
    }
}

/// The count space of one session. Splits a 32 bit count into its hyper frame number (the
/// high bits) and the sequence number carried on the wire (the low `W` bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSpace {
    width: SnWidth,
}

impl CountSpace {
    pub const fn new(width: SnWidth) -> Self {
        Self { width }
    }

    /// Build the count space from a raw bit width, fails for anything but 12 or 18 bits
    pub fn try_from_bits(bits: u8) -> Result<Self, Error> {
        Ok(Self::new(SnWidth::try_from(bits)?))
    }

    pub fn bits(&self) -> u32 {
        self.width.bits()
    }

    /// Number of distinct sequence numbers (2^W)
    pub fn modulus(&self) -> u32 {
        1 << self.bits()
    }

    pub fn max_sn(&self) -> u32 {
        self.modulus() - 1
    }

    /// Half of the sequence number space (2^(W-1))
    pub fn window_size(&self) -> u32 {
        1 << (self.bits() - 1)
    }

    pub fn is_valid_sn(&self, sn: u32) -> bool {
        sn <= self.max_sn()
    }

    /// Sequence number part of a count
    pub fn sn_of(&self, count: u32) -> u32 {
        count & self.max_sn()
    }

    /// Hyper frame number part of a count
    pub fn hfn_of(&self, count: u32) -> u32 {
        count >> self.bits()
    }

    /// Combine a (possibly negative or overflowing) hyper frame number with a sequence number.
    /// The result is normalized into the count space exactly once, here.
    pub fn reconstruct(&self, hfn: i64, sn: u32) -> u32 {
        let raw = (hfn << self.bits()) | i64::from(self.sn_of(sn));
        raw.rem_euclid(COUNT_MODULUS as i64) as u32
    }
}

impl From<SnWidth> for CountSpace {
    fn from(width: SnWidth) -> Self {
        Self::new(width)
    }
}

/// Next count, wrapping at 2^32
pub fn increment32(count: u32) -> u32 {
    count.wrapping_add(1)
}

/// Forward distance from `from` to `to` in the wrapping count space
pub fn distance(from: u32, to: u32) -> u32 {
    to.wrapping_sub(from)
}
