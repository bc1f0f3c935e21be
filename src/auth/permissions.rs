//! Per-club officer capability set.
//!
//! Each officer entry on a club carries a small set of independent flags
//! controlling which parts of the club that officer can manage. The flags
//! are stored (in custom claims and in club documents) as a plain integer
//! bitmask, so the serde representation must stay numeric.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Management rights an officer holds over one club.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OfficerPermission: u32 {
        /// Manage the officer list itself
        const OFFICERS     = 1 << 0;
        /// Add and remove club members
        const MEMBERS      = 1 << 1;
        /// Schedule meetings, view attendance statistics
        const MEETINGS     = 1 << 2;
        /// Post club updates
        const MESSAGES     = 1 << 3;
        /// Manage linked forms
        const FORMS        = 1 << 4;
        /// Edit club name, description, signup settings
        const CLUB_DETAILS = 1 << 5;
    }
}

impl OfficerPermission {
    /// Every capability.
    pub const ALL: Self = Self::all();

    /// True if this set grants any of the required capabilities.
    pub fn allows(self, required: Self) -> bool {
        self.intersects(required)
    }
}

impl Default for OfficerPermission {
    fn default() -> Self {
        Self::empty()
    }
}

// Stored bitmask values must round-trip as integers; bits outside the
// known set are dropped on decode.
impl Serialize for OfficerPermission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for OfficerPermission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
