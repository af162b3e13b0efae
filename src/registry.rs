//! The registry: entity lifecycle, component dispatch, and joined
//! iteration.

use crate::entity::{Entities, Entity, EntityExhausted};
use crate::sparse::SparseMap;
use crate::storage::{Component, ComponentStorage, Families, FamilyId, UnknownComponentStorage};
use crate::systems::System;
use std::any::{type_name, TypeId};
use thiserror::Error;
use tracing::{debug, span, Level};

/// An error type which describes why an attempt to retrieve a component
/// failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentError {
    /// The component was not found on the entity.
    #[error("the component {component_name} was not found on the entity")]
    NotFound {
        /// The type name of the component.
        component_name: &'static str,
    },
}

fn not_found<T: Component>() -> ComponentError {
    ComponentError::NotFound {
        component_name: type_name::<T>(),
    }
}

/// A container of entities and the components attached to them.
///
/// The registry owns one dense storage per component type, created lazily
/// the first time that type is assigned. Entity handles are plain values;
/// holding one past its entity's destruction is harmless, and every
/// per-entity operation checks liveness first, so a stale handle can never
/// reach the components of whatever entity now occupies its index slot.
///
/// The registry is single-threaded: nothing in it synchronizes, and none of
/// its operations suspend.
///
/// # Examples
///
/// ```
/// use cohort::Registry;
///
/// struct Health(u32);
///
/// let mut registry = Registry::new();
/// let entity = registry.create_entity().unwrap();
/// registry.assign_component(entity, Health(10));
///
/// assert!(registry.exists_component::<Health>(entity));
/// registry.destroy_entity(entity);
/// assert!(!registry.exists_component::<Health>(entity));
/// ```
#[derive(Default)]
pub struct Registry {
    entities: Entities,
    families: Families,
    storages: SparseMap<FamilyId, Box<dyn UnknownComponentStorage>>,
    systems: Vec<Box<dyn System>>,
}

impl Registry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity.
    ///
    /// Freed index slots are recycled with a bumped generation before fresh
    /// indices are minted. Fails only when all 2^22 - 1 index slots are in
    /// use or retired, in which case nothing is consumed.
    pub fn create_entity(&mut self) -> Result<Entity, EntityExhausted> {
        self.entities.allocate()
    }

    /// Destroys an entity, removing every component attached to it.
    ///
    /// Returns `false` if the entity is not alive; a stale handle is a
    /// complete no-op and cannot disturb the entity currently occupying the
    /// same index slot.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.remove_components_at(entity.index());
        self.entities.release(entity)
    }

    /// Returns `true` if the entity is alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the registry contains no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Assigns a component to an entity, replacing any existing component
    /// of the same type.
    ///
    /// Returns `false` if the entity is not alive. This is the only
    /// operation that creates a component storage.
    pub fn assign_component<T: Component>(&mut self, entity: Entity, component: T) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.get_or_create_storage::<T>()
            .insert(entity.index(), component);
        true
    }

    /// Removes a component from an entity.
    ///
    /// Returns `false` if the entity is not alive or has no such component.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        match self.find_storage_mut::<T>() {
            Some(storage) => storage.remove(entity.index()),
            None => false,
        }
    }

    /// Returns `true` if the entity is alive and has a component of the
    /// given type.
    pub fn exists_component<T: Component>(&self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        let family = match self.families.find(TypeId::of::<T>()) {
            Some(family) => family,
            None => return false,
        };
        match self.storages.get(family) {
            Some(storage) => storage.contains(entity.index()),
            None => false,
        }
    }

    /// Returns a reference to an entity's component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if the entity is not alive or
    /// has no component of the given type.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, ComponentError> {
        self.find_component(entity).ok_or_else(not_found::<T>)
    }

    /// Returns a mutable reference to an entity's component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if the entity is not alive or
    /// has no component of the given type.
    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<&mut T, ComponentError> {
        self.find_component_mut(entity).ok_or_else(not_found::<T>)
    }

    /// Returns a reference to an entity's component, or `None` if the
    /// entity is not alive or has no such component.
    pub fn find_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.find_storage::<T>()?.get(entity.index())
    }

    /// Returns a mutable reference to an entity's component, or `None` if
    /// the entity is not alive or has no such component.
    pub fn find_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.find_storage_mut::<T>()?.get_mut(entity.index())
    }

    /// Returns references to several of an entity's components at once.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] naming the first component of
    /// the tuple that is missing.
    pub fn get_components<Q: ComponentTuple>(
        &self,
        entity: Entity,
    ) -> Result<Q::Refs<'_>, ComponentError> {
        Q::get(self, entity)
    }

    /// Returns mutable references to several of an entity's components at
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] naming the first component of
    /// the tuple that is missing.
    ///
    /// # Panics
    ///
    /// Panics if the tuple repeats a component type.
    pub fn get_components_mut<Q: ComponentTuple>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::MutRefs<'_>, ComponentError> {
        Q::get_mut(self, entity)
    }

    /// Returns references to several of an entity's components, or `None`
    /// if any of them is missing.
    pub fn find_components<Q: ComponentTuple>(&self, entity: Entity) -> Option<Q::Refs<'_>> {
        Q::find(self, entity)
    }

    /// Returns mutable references to several of an entity's components, or
    /// `None` if any of them is missing.
    ///
    /// # Panics
    ///
    /// Panics if the tuple repeats a component type.
    pub fn find_components_mut<Q: ComponentTuple>(
        &mut self,
        entity: Entity,
    ) -> Option<Q::MutRefs<'_>> {
        Q::find_mut(self, entity)
    }

    /// Removes every component attached to an entity, returning how many
    /// were removed.
    ///
    /// Returns zero if the entity is not alive.
    pub fn remove_all_components(&mut self, entity: Entity) -> usize {
        if !self.entities.is_alive(entity) {
            return 0;
        }
        self.remove_components_at(entity.index())
    }

    /// Visits every component of one type in dense storage order.
    pub fn for_each_component<T: Component, F>(&self, mut f: F)
    where
        F: FnMut(Entity, &T),
    {
        let storage = match self.find_storage::<T>() {
            Some(storage) => storage,
            None => return,
        };
        for (index, component) in storage.iter() {
            if let Some(entity) = self.entities.resolve(index) {
                f(entity, component);
            }
        }
    }

    /// Visits every component of one type in dense storage order, mutably.
    pub fn for_each_component_mut<T: Component, F>(&mut self, mut f: F)
    where
        F: FnMut(Entity, &mut T),
    {
        let family = match self.families.find(TypeId::of::<T>()) {
            Some(family) => family,
            None => return,
        };
        let Registry {
            storages, entities, ..
        } = self;
        let storage = match storages
            .get_mut(family)
            .and_then(|storage| storage.downcast_mut::<ComponentStorage<T>>())
        {
            Some(storage) => storage,
            None => return,
        };
        for (index, component) in storage.iter_mut() {
            if let Some(entity) = entities.resolve(index) {
                f(entity, component);
            }
        }
    }

    /// Visits every entity that has all of the components in `Q`.
    ///
    /// The walk is driven by the first type in the tuple: its storage is
    /// iterated in dense order and the remaining storages are probed for
    /// each candidate. Listing the rarest component first therefore bounds
    /// the cost. If any storage does not exist at all, the visitor is never
    /// invoked.
    pub fn for_joined_components<Q: ComponentTuple, F>(&self, f: F)
    where
        F: FnMut(Entity, Q::Refs<'_>),
    {
        Q::for_each(self, f)
    }

    /// Visits every entity that has all of the components in `Q`, with
    /// mutable access to each component.
    ///
    /// Visit order and cost follow [`for_joined_components`]. Because the
    /// registry is mutably borrowed for the whole walk, the visitor cannot
    /// create or destroy entities or add or remove components; the
    /// swap-and-pop iteration model is protected by construction.
    ///
    /// # Panics
    ///
    /// Panics if the tuple repeats a component type.
    ///
    /// [`for_joined_components`]: Self::for_joined_components
    pub fn for_joined_components_mut<Q: ComponentTuple, F>(&mut self, f: F)
    where
        F: FnMut(Entity, Q::MutRefs<'_>),
    {
        Q::for_each_mut(self, f)
    }

    /// Appends a system. Systems run in insertion order.
    pub fn add_system<S: System>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Runs every system once, in insertion order, against this registry.
    ///
    /// Systems registered while processing do not run until the next pass.
    pub fn process_systems(&mut self) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in systems.iter_mut() {
            let span = span!(Level::TRACE, "process_system");
            let _guard = span.enter();
            system.process(self);
        }
        let added = std::mem::replace(&mut self.systems, systems);
        self.systems.extend(added);
    }

    fn remove_components_at(&mut self, index: u32) -> usize {
        let mut removed = 0;
        for (_, storage) in self.storages.iter_mut() {
            if storage.remove(index) {
                removed += 1;
            }
        }
        removed
    }

    fn find_storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let family = self.families.find(TypeId::of::<T>())?;
        self.storages
            .get(family)?
            .downcast_ref::<ComponentStorage<T>>()
    }

    fn find_storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let family = self.families.find(TypeId::of::<T>())?;
        self.storages
            .get_mut(family)?
            .downcast_mut::<ComponentStorage<T>>()
    }

    fn get_or_create_storage<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let family = self.families.get_or_assign(TypeId::of::<T>());
        if !self.storages.contains(family) {
            debug!(component = type_name::<T>(), "created component storage");
            self.storages
                .insert(family, Box::new(ComponentStorage::<T>::new()));
        }
        self.storages
            .get_mut(family)
            .and_then(|storage| storage.downcast_mut::<ComponentStorage<T>>())
            .expect("storage table entry has the wrong component type")
    }
}

/// A tuple of component types that can be probed and joined together.
///
/// Implemented for tuples of one through eight component types. The first
/// type in the tuple drives joined iteration; see
/// [`Registry::for_joined_components`].
pub trait ComponentTuple {
    /// Shared references to each component in the tuple.
    type Refs<'a>;

    /// Mutable references to each component in the tuple.
    type MutRefs<'a>;

    #[doc(hidden)]
    fn get(registry: &Registry, entity: Entity) -> Result<Self::Refs<'_>, ComponentError>;

    #[doc(hidden)]
    fn get_mut(registry: &mut Registry, entity: Entity)
        -> Result<Self::MutRefs<'_>, ComponentError>;

    #[doc(hidden)]
    fn find(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>>;

    #[doc(hidden)]
    fn find_mut(registry: &mut Registry, entity: Entity) -> Option<Self::MutRefs<'_>>;

    #[doc(hidden)]
    fn for_each<F>(registry: &Registry, f: F)
    where
        F: FnMut(Entity, Self::Refs<'_>);

    #[doc(hidden)]
    fn for_each_mut<F>(registry: &mut Registry, f: F)
    where
        F: FnMut(Entity, Self::MutRefs<'_>);
}

fn assert_distinct(types: &[TypeId]) {
    for (i, a) in types.iter().enumerate() {
        assert!(
            !types[i + 1..].contains(a),
            "joined component types must be distinct"
        );
    }
}

macro_rules! component_tuple {
    ($head:ident) => {
        impl_component_tuple!($head);
    };
    ($head:ident, $( $tail:ident ),*) => {
        impl_component_tuple!($head, $( $tail ),*);
        component_tuple!($( $tail ),*);
    };
}

macro_rules! impl_component_tuple {
    ( $head:ident $(, $tail:ident )* ) => {
        impl<$head: Component $(, $tail: Component )*> ComponentTuple for ($head, $( $tail, )*) {
            type Refs<'a> = (&'a $head, $( &'a $tail, )*);
            type MutRefs<'a> = (&'a mut $head, $( &'a mut $tail, )*);

            fn get(
                registry: &Registry,
                entity: Entity,
            ) -> Result<Self::Refs<'_>, ComponentError> {
                Ok((
                    registry
                        .find_component::<$head>(entity)
                        .ok_or_else(not_found::<$head>)?,
                    $(
                        registry
                            .find_component::<$tail>(entity)
                            .ok_or_else(not_found::<$tail>)?,
                    )*
                ))
            }

            #[allow(non_snake_case)]
            fn get_mut(
                registry: &mut Registry,
                entity: Entity,
            ) -> Result<Self::MutRefs<'_>, ComponentError> {
                assert_distinct(&[TypeId::of::<$head>() $(, TypeId::of::<$tail>() )*]);
                if !registry.entities.is_alive(entity) {
                    return Err(not_found::<$head>());
                }
                let index = entity.index();
                let $head: *mut ComponentStorage<$head> = registry
                    .find_storage_mut::<$head>()
                    .ok_or_else(not_found::<$head>)?;
                $(
                    let $tail: *mut ComponentStorage<$tail> = registry
                        .find_storage_mut::<$tail>()
                        .ok_or_else(not_found::<$tail>)?;
                )*
                // SAFETY: the component types were checked to be distinct, so
                // every pointer targets a different boxed storage and the
                // returned references cannot alias.
                unsafe {
                    Ok((
                        (*$head).get_mut(index).ok_or_else(not_found::<$head>)?,
                        $( (*$tail).get_mut(index).ok_or_else(not_found::<$tail>)?, )*
                    ))
                }
            }

            fn find(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>> {
                Some((
                    registry.find_component::<$head>(entity)?,
                    $( registry.find_component::<$tail>(entity)?, )*
                ))
            }

            #[allow(non_snake_case)]
            fn find_mut(registry: &mut Registry, entity: Entity) -> Option<Self::MutRefs<'_>> {
                assert_distinct(&[TypeId::of::<$head>() $(, TypeId::of::<$tail>() )*]);
                if !registry.entities.is_alive(entity) {
                    return None;
                }
                let index = entity.index();
                let $head: *mut ComponentStorage<$head> = registry.find_storage_mut::<$head>()?;
                $(
                    let $tail: *mut ComponentStorage<$tail> =
                        registry.find_storage_mut::<$tail>()?;
                )*
                // SAFETY: as in `get_mut`, distinct component types mean
                // distinct storages, so the references cannot alias.
                unsafe {
                    Some((
                        (*$head).get_mut(index)?,
                        $( (*$tail).get_mut(index)?, )*
                    ))
                }
            }

            #[allow(non_snake_case)]
            fn for_each<Func>(registry: &Registry, mut f: Func)
            where
                Func: FnMut(Entity, Self::Refs<'_>),
            {
                let $head = match registry.find_storage::<$head>() {
                    Some(storage) => storage,
                    None => return,
                };
                $(
                    let $tail = match registry.find_storage::<$tail>() {
                        Some(storage) => storage,
                        None => return,
                    };
                )*
                for slot in 0..$head.len() {
                    let index = match $head.key_at(slot) {
                        Some(index) => index,
                        None => continue,
                    };
                    let entity = match registry.entities.resolve(index) {
                        Some(entity) => entity,
                        None => continue,
                    };
                    f(entity, (
                        match $head.value_at(slot) {
                            Some(component) => component,
                            None => continue,
                        },
                        $(
                            match $tail.get(index) {
                                Some(component) => component,
                                None => continue,
                            },
                        )*
                    ));
                }
            }

            #[allow(non_snake_case)]
            fn for_each_mut<Func>(registry: &mut Registry, mut f: Func)
            where
                Func: FnMut(Entity, Self::MutRefs<'_>),
            {
                assert_distinct(&[TypeId::of::<$head>() $(, TypeId::of::<$tail>() )*]);
                let $head: *mut ComponentStorage<$head> = match registry.find_storage_mut::<$head>() {
                    Some(storage) => storage,
                    None => return,
                };
                $(
                    let $tail: *mut ComponentStorage<$tail> =
                        match registry.find_storage_mut::<$tail>() {
                            Some(storage) => storage,
                            None => return,
                        };
                )*
                // SAFETY: the component types were checked to be distinct, so
                // every pointer targets a different boxed storage and no two
                // references handed to the visitor alias. The registry stays
                // mutably borrowed for the whole walk, so the visitor cannot
                // reach it to grow or shrink any storage; the driving
                // storage's length is fixed before iteration begins.
                unsafe {
                    let len = (*$head).len();
                    for slot in 0..len {
                        let index = match (*$head).key_at(slot) {
                            Some(index) => index,
                            None => continue,
                        };
                        let entity = match registry.entities.resolve(index) {
                            Some(entity) => entity,
                            None => continue,
                        };
                        f(entity, (
                            match (*$head).value_at_mut(slot) {
                                Some(component) => component,
                                None => continue,
                            },
                            $(
                                match (*$tail).get_mut(index) {
                                    Some(component) => component,
                                    None => continue,
                                },
                            )*
                        ));
                    }
                }
            }
        }
    };
}

component_tuple!(A, B, C, D, E, F, G, H);
