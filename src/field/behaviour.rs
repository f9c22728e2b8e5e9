//! Behaviour flags for fields

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

bitflags! {
    /// Mode of a field.
    ///
    /// Flags combine freely. Bits above `READONLY` are reserved and dropped
    /// when coercing from untyped input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Behaviour: u8 {
        /// Effective default is read from another field
        const FALLBACK = 1;
        /// Field may resolve to nil
        const OPTIONAL = 1 << 1;
        /// Value writes are rejected
        const READONLY = 1 << 2;
    }
}

impl Behaviour {
    /// No flags set
    pub const DEFAULT: Self = Self::empty();

    /// Coerce an untyped behaviour indicator.
    ///
    /// Anything that is not an integer in `0..=255` becomes `DEFAULT`.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        value
            .as_u64()
            .and_then(|bits| u8::try_from(bits).ok())
            .map(Self::from_bits_truncate)
            .unwrap_or(Self::DEFAULT)
    }
}

// Serialized as the raw bitmask so it round-trips through untyped options
impl Serialize for Behaviour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for Behaviour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}
