//! Value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// First-class value types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    I1,
    I8,
    I16,
    I32,
    I64,
    /// Opaque pointer, 64 bits wide.
    Ptr,
}

impl Type {
    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::I1 => 1,
            Self::I8 => 8,
            Self::I16 => 16,
            Self::I32 => 32,
            Self::I64 | Self::Ptr => 64,
        }
    }

    /// Mask selecting the low `bits()` bits.
    #[must_use]
    pub const fn mask(self) -> u64 {
        match self.bits() {
            64 => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }

    /// Truncate a raw value to this type's width.
    #[must_use]
    pub const fn truncate(self, value: u64) -> u64 {
        value & self.mask()
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_int(self) -> bool {
        !matches!(self, Self::Ptr)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ptr => f.write_str("ptr"),
            ty => write!(f, "i{}", ty.bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(Type::I1.mask(), 1);
        assert_eq!(Type::I8.mask(), 0xff);
        assert_eq!(Type::I16.truncate(0x1_2345), 0x2345);
        assert_eq!(Type::I64.mask(), u64::MAX);
        assert_eq!(Type::Ptr.mask(), u64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::I16.to_string(), "i16");
        assert_eq!(Type::Ptr.to_string(), "ptr");
    }
}
