use std::fmt::{self, Display};
use std::str::FromStr;

/// Index of a key slot in a LUKS header.
///
/// Slot 0 is reserved for the independently managed bootstrap credential and
/// is never the target of a seal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeySlot(u32);

impl KeySlot {
    /// The slot holding the pre-existing credential used to authorize enrollment
    pub const RESERVED: KeySlot = KeySlot(0);

    pub const fn new(index: u32) -> Self {
        KeySlot(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }

    pub const fn is_reserved(self) -> bool {
        self.0 == Self::RESERVED.0
    }
}

impl From<u32> for KeySlot {
    fn from(index: u32) -> Self {
        KeySlot(index)
    }
}

impl Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeySlot {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(KeySlot)
    }
}
