//! Flag and handle types shared across the tree and the checker.

use std::fmt;

bitflags::bitflags! {
    /// Modifier flags on declarations and class members.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierFlags: u16 {
        const NONE      = 0;
        const EXPORT    = 1 << 0;
        const DECLARE   = 1 << 1;
        const PUBLIC    = 1 << 2;
        const PRIVATE   = 1 << 3;
        const PROTECTED = 1 << 4;
        const STATIC    = 1 << 5;
        const READONLY  = 1 << 6;
        const ABSTRACT  = 1 << 7;
        const ASYNC     = 1 << 8;
        const DEFAULT   = 1 << 9;

        const ACCESSIBILITY = Self::PUBLIC.bits() | Self::PRIVATE.bits() | Self::PROTECTED.bits();
    }
}

/// Lightweight handle to a type stored in the checker's type table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const INVALID: TypeId = TypeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Handle to an environment in the checker's scope arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EnvId(pub u32);

impl EnvId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
