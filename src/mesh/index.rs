//! Index types for mesh elements.
//!
//! Every table row (vertex, half-edge, face, cell) is addressed by a typed
//! wrapper around a `u32` row index, so a face id can never be used where a
//! vertex id is expected. Identifiers are stable until a removing operation
//! compacts the tables.

use std::fmt::{self, Debug};

const INVALID: u32 = u32::MAX;

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertId(u32);

/// A type-safe half-edge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

/// A type-safe face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

/// A type-safe cell index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct CellId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a row number.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < INVALID as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(INVALID)
            }

            /// Get the row number.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID
            }

            /// `Some(self)` for a valid index, `None` for the sentinel.
            #[inline]
            pub fn valid(self) -> Option<Self> {
                self.is_valid().then_some(self)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Debug::fmt(self, f)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertId, "V");
impl_index_type!(EdgeId, "E");
impl_index_type!(FaceId, "F");
impl_index_type!(CellId, "C");

/// Old-to-new row mapping produced by compaction.
///
/// Removed rows map to `None`; surviving rows keep their relative order.
#[derive(Debug, Clone)]
pub(crate) struct Remap {
    map: Vec<u32>,
    len: usize,
}

impl Remap {
    /// Build the mapping from a per-row "removed" mask.
    pub(crate) fn from_mask(removed: &[bool]) -> Self {
        let mut next = 0u32;
        let map = removed
            .iter()
            .map(|&dead| {
                if dead {
                    INVALID
                } else {
                    next += 1;
                    next - 1
                }
            })
            .collect();
        Self {
            map,
            len: next as usize,
        }
    }

    /// Number of surviving rows.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// New row of an old row, if it survived.
    #[inline]
    pub(crate) fn get(&self, old: usize) -> Option<usize> {
        match self.map.get(old) {
            Some(&i) if i != INVALID => Some(i as usize),
            _ => None,
        }
    }
}
