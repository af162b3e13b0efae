use cohort::{ComponentError, Entity, Registry};
use std::any::type_name;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pos(i32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Vel(i32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Tag;

#[test]
fn create_and_destroy() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    assert!(registry.is_alive(entity));
    assert_eq!(registry.len(), 1);

    assert!(registry.destroy_entity(entity));
    assert!(!registry.is_alive(entity));
    assert!(registry.is_empty());
}

#[test]
fn recycled_slot_bumps_generation() {
    let mut registry = Registry::new();

    let first = registry.create_entity().unwrap();
    assert!(registry.destroy_entity(first));

    let second = registry.create_entity().unwrap();
    assert_eq!(second.index(), first.index());
    assert_eq!(second.generation(), first.generation() + 1);
    assert!(!registry.is_alive(first));
    assert!(registry.is_alive(second));
}

#[test]
fn stale_handle_stays_dead_forever() {
    let mut registry = Registry::new();

    let first = registry.create_entity().unwrap();
    registry.destroy_entity(first);

    for _ in 0..16 {
        let recycled = registry.create_entity().unwrap();
        assert!(!registry.is_alive(first));
        registry.destroy_entity(recycled);
    }
    assert!(!registry.is_alive(first));
}

#[test]
fn repeated_recycling_through_one_slot() {
    let mut registry = Registry::new();

    let first = registry.create_entity().unwrap();
    registry.destroy_entity(first);

    let mut latest = first;
    for _ in 0..100 {
        latest = registry.create_entity().unwrap();
        assert_eq!(latest.index(), first.index());
        registry.destroy_entity(latest);
    }
    assert!(!registry.is_alive(first));
    assert!(!registry.is_alive(latest));

    let survivor = registry.create_entity().unwrap();
    assert!(registry.is_alive(survivor));
    assert!(!registry.is_alive(latest));
}

#[test]
fn destroy_rejects_stale_handles() {
    let mut registry = Registry::new();

    let first = registry.create_entity().unwrap();
    registry.destroy_entity(first);
    let second = registry.create_entity().unwrap();
    registry.assign_component(second, Pos(7));

    // Destroying through the stale handle must not touch the slot's new
    // occupant or its components.
    assert!(!registry.destroy_entity(first));
    assert!(registry.is_alive(second));
    assert_eq!(registry.find_component::<Pos>(second), Some(&Pos(7)));
}

#[test]
fn assign_requires_a_live_entity() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.destroy_entity(entity);

    assert!(!registry.assign_component(entity, Pos(1)));
    assert!(!registry.exists_component::<Pos>(entity));
}

#[test]
fn assign_overwrites() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    assert!(registry.assign_component(entity, Pos(1)));
    assert!(registry.assign_component(entity, Pos(2)));

    assert_eq!(registry.get_component::<Pos>(entity).unwrap(), &Pos(2));
    assert_eq!(registry.remove_all_components(entity), 1);
}

#[test]
fn zero_sized_components() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    assert!(registry.assign_component(entity, Tag));
    assert!(registry.assign_component(entity, Tag));

    assert!(registry.exists_component::<Tag>(entity));
    assert_eq!(registry.remove_all_components(entity), 1);
    assert!(!registry.exists_component::<Tag>(entity));
}

#[test]
fn remove_component() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    assert!(!registry.remove_component::<Pos>(entity));

    registry.assign_component(entity, Pos(3));
    assert!(registry.remove_component::<Pos>(entity));
    assert!(!registry.remove_component::<Pos>(entity));
    assert!(!registry.exists_component::<Pos>(entity));
}

#[test]
fn component_access_guards_on_liveness() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(5));
    registry.destroy_entity(entity);

    assert!(!registry.exists_component::<Pos>(entity));
    assert!(registry.find_component::<Pos>(entity).is_none());
    assert!(!registry.remove_component::<Pos>(entity));
    assert_eq!(registry.remove_all_components(entity), 0);
}

#[test]
fn components_die_with_their_entity() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));
    registry.assign_component(entity, Vel(2));
    registry.destroy_entity(entity);

    // The slot's next occupant starts with no components.
    let recycled = registry.create_entity().unwrap();
    assert_eq!(recycled.index(), entity.index());
    assert!(!registry.exists_component::<Pos>(recycled));
    assert!(!registry.exists_component::<Vel>(recycled));
}

#[test]
fn get_component_reports_the_missing_type() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));

    assert_eq!(
        registry.get_component::<Vel>(entity),
        Err(ComponentError::NotFound {
            component_name: type_name::<Vel>(),
        })
    );
    assert!(registry.get_component::<Pos>(entity).is_ok());
}

#[test]
fn get_component_mut_updates_in_place() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));

    registry.get_component_mut::<Pos>(entity).unwrap().0 = 9;
    assert_eq!(registry.get_component::<Pos>(entity).unwrap(), &Pos(9));
}

#[test]
fn tuple_get_and_find() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));
    registry.assign_component(entity, Vel(2));

    let (pos, vel) = registry.get_components::<(Pos, Vel)>(entity).unwrap();
    assert_eq!((pos, vel), (&Pos(1), &Vel(2)));

    assert!(registry.find_components::<(Pos, Vel)>(entity).is_some());
    assert!(registry.find_components::<(Pos, Vel, Tag)>(entity).is_none());

    assert_eq!(
        registry.get_components::<(Pos, Tag)>(entity),
        Err(ComponentError::NotFound {
            component_name: type_name::<Tag>(),
        })
    );
}

#[test]
fn tuple_find_mut_gives_disjoint_references() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));
    registry.assign_component(entity, Vel(10));

    let (pos, vel) = registry.find_components_mut::<(Pos, Vel)>(entity).unwrap();
    pos.0 += vel.0;
    vel.0 = 0;

    assert_eq!(registry.get_component::<Pos>(entity).unwrap(), &Pos(11));
    assert_eq!(registry.get_component::<Vel>(entity).unwrap(), &Vel(0));
}

#[test]
#[should_panic(expected = "distinct")]
fn tuple_find_mut_rejects_duplicate_types() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));

    let _ = registry.find_components_mut::<(Pos, Pos)>(entity);
}

#[test]
fn remove_all_counts_removed_components() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    let other = registry.create_entity().unwrap();
    registry.assign_component(entity, Pos(1));
    registry.assign_component(entity, Vel(2));
    registry.assign_component(entity, Tag);
    registry.assign_component(other, Pos(3));

    assert_eq!(registry.remove_all_components(entity), 3);
    assert_eq!(registry.remove_all_components(entity), 0);
    assert!(registry.is_alive(entity));
    assert_eq!(registry.find_component::<Pos>(other), Some(&Pos(3)));
}

#[test]
fn handles_are_value_equal() {
    let mut registry = Registry::new();

    let entity = registry.create_entity().unwrap();
    let copy = Entity::from_bits(entity.bits());
    assert_eq!(entity, copy);
    assert!(registry.is_alive(copy));

    registry.destroy_entity(copy);
    assert!(!registry.is_alive(entity));
}

#[test]
fn null_entity_is_never_alive() {
    let mut registry = Registry::new();
    assert!(!registry.is_alive(Entity::NULL));

    for _ in 0..8 {
        let entity = registry.create_entity().unwrap();
        assert!(!entity.is_null());
    }
    assert!(!registry.is_alive(Entity::NULL));
}
