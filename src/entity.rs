//! Entity identifiers and the generational id allocator.

use crate::sparse::{SparseIndex, SparseSet};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Number of bits in an entity id devoted to the slot index.
pub const INDEX_BITS: u32 = 22;

/// Mask selecting the index part of an entity id.
pub const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Number of bits in an entity id devoted to the generation.
pub const GENERATION_BITS: u32 = 10;

/// Mask selecting the generation part of an entity id (after shifting).
pub const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// An opaque identifier for an entity.
///
/// An id packs a 22-bit slot *index* and a 10-bit *generation* into a `u32`.
/// The index addresses per-entity storage; the generation distinguishes
/// successive entities recycled through the same slot, so a handle kept
/// across its entity's destruction compares unequal to the slot's next
/// occupant. The generation wraps modulo 2^10, which leaves a 1024-reuse
/// window in which a very stale handle could collide with a live id.
///
/// The all-zero id is reserved as [`NULL`](Self::NULL) and is never
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The reserved null id.
    pub const NULL: Entity = Entity(0);

    pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
        debug_assert!(index <= INDEX_MASK);
        debug_assert!(generation <= GENERATION_MASK);
        Entity(index | (generation << INDEX_BITS))
    }

    /// Reconstructs an entity from its raw bit representation.
    pub fn from_bits(bits: u32) -> Self {
        Entity(bits)
    }

    /// Returns the raw bit representation of this entity.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns the slot index encoded in this entity.
    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Returns the generation encoded in this entity.
    pub fn generation(self) -> u32 {
        (self.0 >> INDEX_BITS) & GENERATION_MASK
    }

    /// Returns `true` if this is the reserved null id.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index(), self.generation())
    }
}

impl SparseIndex for Entity {
    const MAX_CAPACITY: usize = (INDEX_MASK as usize) + 1;

    fn sparse_index(&self) -> usize {
        self.index() as usize
    }
}

/// Error returned when every entity index slot is in use or retired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("the entity index space is exhausted")]
pub struct EntityExhausted;

/// Allocates entity ids and tracks which are alive.
///
/// Freed indices are recycled in LIFO order with a bumped generation, so
/// handles to destroyed entities never match the slot's next occupant. The
/// id minted for a fresh index always carries generation zero, and index
/// zero is skipped entirely to keep the null id unallocated.
#[derive(Default)]
pub(crate) struct Entities {
    last_index: u32,
    free: Vec<Entity>,
    live: SparseSet<Entity>,
}

impl Entities {
    /// Allocates a new entity id, recycling a freed index if one exists.
    ///
    /// On failure nothing is consumed: the free list and index watermark are
    /// untouched.
    pub fn allocate(&mut self) -> Result<Entity, EntityExhausted> {
        if let Some(retired) = self.free.last().copied() {
            let generation = retired.generation().wrapping_add(1) & GENERATION_MASK;
            let entity = Entity::from_parts(retired.index(), generation);
            self.live.insert(entity);
            self.free.pop();
            return Ok(entity);
        }
        if self.last_index < INDEX_MASK {
            self.last_index += 1;
            let entity = Entity::from_parts(self.last_index, 0);
            self.live.insert(entity);
            return Ok(entity);
        }
        Err(EntityExhausted)
    }

    /// Releases an entity id, retiring its index for reuse.
    ///
    /// Returns `false` if the id is not alive, in which case the free list
    /// is untouched.
    pub fn release(&mut self, entity: Entity) -> bool {
        if self.live.remove(entity) {
            self.free.push(entity);
            true
        } else {
            false
        }
    }

    /// Returns `true` if the exact id, generation included, is alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.live.contains(entity)
    }

    /// Returns the full id of the live entity occupying an index slot.
    pub fn resolve(&self, index: u32) -> Option<Entity> {
        self.live.find_by_index(index as usize).copied()
    }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no entities are alive.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
