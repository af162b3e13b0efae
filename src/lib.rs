//! Cohort is a small entity-component-system registry built on sparse sets.
//!
//! A [`Registry`] stores plain-value components keyed by opaque [`Entity`]
//! handles and iterates efficiently over every entity that carries a chosen
//! set of component types. Entity ids recycle their index slots through a
//! generation counter, so stale handles held across a destruction are
//! detected rather than silently resolving to the slot's next occupant.
//!
//! Everything is backed by the sparse set: membership, insertion, and
//! erasure are O(1), and iteration walks contiguous memory. Joined
//! iteration drives from the first listed component type and probes the
//! rest, so listing the rarest type first keeps tight loops tight.
//!
//! # Examples
//!
//! ```
//! use cohort::Registry;
//!
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! struct Velocity {
//!     dx: f32,
//!     dy: f32,
//! }
//!
//! let mut registry = Registry::new();
//!
//! let entity = registry.create_entity().unwrap();
//! registry.assign_component(entity, Position { x: 0.0, y: 0.0 });
//! registry.assign_component(entity, Velocity { dx: 1.0, dy: 2.0 });
//!
//! registry.for_joined_components_mut::<(Position, Velocity), _>(|_entity, (position, velocity)| {
//!     position.x += velocity.dx;
//!     position.y += velocity.dy;
//! });
//!
//! assert_eq!(registry.get_component::<Position>(entity).unwrap().y, 2.0);
//! ```

pub mod entity;
pub mod registry;
pub mod sparse;
pub mod storage;
pub mod systems;

pub use crate::entity::{Entity, EntityExhausted};
pub use crate::registry::{ComponentError, ComponentTuple, Registry};
pub use crate::sparse::{SparseIndex, SparseMap, SparseSet};
pub use crate::storage::{Component, FamilyId};
pub use crate::systems::System;
