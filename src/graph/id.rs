//! Identity types for the brick graph runtime.
//!
//! `BrickId` is a generational index into `Registry` storage: the index gives
//! O(1) lookup and the generation makes a stale handle to a destroyed brick
//! resolve to nothing instead of to whichever brick reused the slot. This is
//! what edges hold, so an edge is a weak reference by construction.

use serde::Serialize;
use std::fmt;

/// Handle to a brick slot in a `Registry`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BrickId {
    index: u32,
    generation: u32,
}

impl BrickId {
    pub const INVALID: BrickId = BrickId {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "BrickId(INVALID)")
        } else {
            write!(f, "BrickId({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Graph handle, unique within one scheduler thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct GraphId(pub u32);

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Handle to a scheduler thread slot. Generational like `BrickId`, so a
/// handle kept past `destroy` never reaches a thread that reused the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ThreadId {
    index: u32,
    generation: u32,
}

impl ThreadId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
