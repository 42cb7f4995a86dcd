//! Type-safe index wrappers
//!
//! Newtype wrappers around indices so atom indices, bond indices, and frame
//! indices cannot be mixed up silently.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invalid index marker value
pub const INVALID_INDEX: u32 = u32::MAX;

/// Generates a type-safe index type with the shared trait implementations.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident, $debug_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new index
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Get the raw index value as usize
            #[inline]
            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }

            /// Get the raw u32 value
            #[inline]
            pub const fn as_u32(&self) -> u32 {
                self.0
            }

            /// Check if this is a valid index
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 != INVALID_INDEX
            }

            /// Create an invalid index
            #[inline]
            pub const fn invalid() -> Self {
                $name(INVALID_INDEX)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $debug_name, self.0)
                } else {
                    write!(f, "{}(INVALID)", $debug_name)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}", self.0)
                } else {
                    write!(f, "INVALID")
                }
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(index: u32) -> Self {
                $name(index)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                $name(index as u32)
            }
        }

        impl From<$name> for u32 {
            #[inline]
            fn from(index: $name) -> Self {
                index.0
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(index: $name) -> Self {
                index.0 as usize
            }
        }
    };
}

define_index!(
    /// Type-safe index into the collection-wide atom array
    AtomIndex, "AtomIndex"
);

define_index!(
    /// Type-safe index into the collection-wide bond array
    BondIndex, "BondIndex"
);

define_index!(
    /// Type-safe index identifying one atom set (frame/model) in a collection
    FrameIndex, "FrameIndex"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_index() {
        let idx = AtomIndex::new(42);
        assert_eq!(idx.as_usize(), 42);
        assert_eq!(idx.as_u32(), 42);
        assert!(idx.is_valid());

        let invalid = AtomIndex::invalid();
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_index_conversions() {
        let atom_idx: AtomIndex = 100u32.into();
        assert_eq!(u32::from(atom_idx), 100);

        let frame_idx: FrameIndex = 3usize.into();
        assert_eq!(usize::from(frame_idx), 3);
    }

    #[test]
    fn test_index_display() {
        assert_eq!(format!("{}", BondIndex::new(5)), "5");
        assert_eq!(format!("{:?}", BondIndex::invalid()), "BondIndex(INVALID)");
    }

    #[test]
    fn test_index_ordering() {
        assert!(AtomIndex::new(1) < AtomIndex::new(2));
    }
}
