use quarry::{
    childof, instanceof, type_contains, type_has_entity, EcsError, EntityType, SpawnError,
    TableEvent, World, INVALID_ENTITY,
};

const SIZED: usize = 8;

fn type_of(ids: &[u64]) -> EntityType {
    EntityType::from_ids(ids)
}

#[test]
fn types_canonicalise_and_support_positional_lookup() {
    let type_ = EntityType::from_ids(&[9, 3, 7, 3]);
    assert_eq!(type_.entries(), &[3, 7, 9]);
    assert_eq!(type_.index_of(7), Some(1));
    assert_eq!(type_.index_of(4), None);
    assert!(type_.has(9));

    let grown = type_.with(5);
    assert_eq!(grown.entries(), &[3, 5, 7, 9]);
    // Growth produces a new type; the source type is untouched.
    assert_eq!(type_.entries(), &[3, 7, 9]);
    assert_eq!(grown.with(5), grown);
}

#[test]
fn contains_reports_first_or_last_witness() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();
    let b = world.register_component(SIZED).unwrap();
    let c = world.register_component(SIZED).unwrap();

    let sup = type_of(&[a, b, c]);

    assert_eq!(type_contains(&world, &sup, &type_of(&[b, c]), true, false), c);
    assert_eq!(type_contains(&world, &sup, &type_of(&[b, c]), false, false), b);

    let missing = world.register_component(SIZED).unwrap();
    assert_eq!(
        type_contains(&world, &sup, &type_of(&[b, missing]), true, false),
        INVALID_ENTITY
    );
    assert_eq!(
        type_contains(&world, &sup, &type_of(&[missing, b]), false, false),
        b
    );
}

#[test]
fn containment_follows_inheritance_links_transitively() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();

    let base = world.spawn_prefab(&type_of(&[a])).unwrap();
    let middle = world.spawn(type_of(&[instanceof(base)])).unwrap();
    let leaf_type = type_of(&[instanceof(middle)]);

    assert!(type_has_entity(&world, &leaf_type, a, true));
    assert!(!type_has_entity(&world, &leaf_type, a, false));

    let base_table = world.table(world.get_record(base).unwrap().table);
    assert!(base_table.is_prefab_table());
    assert!(!base_table.is_disabled_table());
    assert_eq!(base_table.prefab(), INVALID_ENTITY);

    let middle_table = world.table(world.get_record(middle).unwrap().table);
    assert!(!middle_table.is_prefab_table());
    assert_eq!(middle_table.prefab(), base);
}

#[test]
fn tables_are_interned_per_type() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();
    let b = world.register_component(SIZED).unwrap();

    let first = world.spawn(type_of(&[a, b])).unwrap();
    let second = world.spawn(type_of(&[b, a])).unwrap();
    let other = world.spawn(type_of(&[a])).unwrap();

    let first = world.get_record(first).unwrap();
    let second = world.get_record(second).unwrap();
    let other = world.get_record(other).unwrap();

    assert_eq!(first.table, second.table);
    assert_ne!(first.table, other.table);
    assert_eq!(world.table_count(), 2);
    assert_eq!(second.row, 1);
}

#[test]
fn spawning_requires_registered_components() {
    let mut world = World::new();
    let err = world.spawn(type_of(&[77])).unwrap_err();
    assert_eq!(
        err,
        EcsError::Spawn(SpawnError::UnregisteredComponent { component: 77 })
    );
}

#[test]
fn despawn_compacts_rows_and_fixes_displaced_records() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();

    let first = world.spawn(type_of(&[a])).unwrap();
    let second = world.spawn(type_of(&[a])).unwrap();
    let third = world.spawn(type_of(&[a])).unwrap();

    world.despawn(first).unwrap();

    // The last row was swapped into the vacated slot.
    let third_record = world.get_record(third).unwrap();
    assert_eq!(third_record.row, 0);
    assert_eq!(world.table(third_record.table).entity_at(0), third);
    assert_eq!(world.table(third_record.table).row_count(), 2);
    assert_eq!(world.get_record(second).unwrap().row, 1);

    assert!(world.get_record(first).is_none());
    assert_eq!(
        world.despawn(first).unwrap_err(),
        EcsError::Spawn(SpawnError::StaleEntity { entity: first })
    );
}

#[test]
fn column_layout_reflects_component_sizes() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();
    let tag = world.register_tag().unwrap();

    let parent = world.spawn(type_of(&[a])).unwrap();
    let child = world
        .spawn(type_of(&[a, tag, childof(parent)]))
        .unwrap();

    let record = world.get_record(child).unwrap();
    let table = world.table(record.table);

    // Only the sized component contributes storage; the tag and the
    // relation entry produce tagless columns.
    assert_eq!(table.bytes_per_row(), SIZED);
    assert!(world.get_ptr(child, a).is_some());
    assert!(world.get_ptr(child, tag).is_none());

    assert!(world.components().info(tag).unwrap().is_tag());
    assert!(!world.components().info(a).unwrap().is_tag());
    assert!(world.components().info(childof(parent)).is_none());

    // Column 1 holds the sized component; the tag column after it is empty.
    assert!(table.column_ptr(1, 0).is_some());
    assert!(table.column_ptr(2, 0).is_none());

    let disabled = world
        .spawn(type_of(&[a, quarry::DISABLED_MARKER]))
        .unwrap();
    let disabled_table = world.table(world.get_record(disabled).unwrap().table);
    assert!(disabled_table.is_disabled_table());
}

#[test]
fn column_versions_move_on_reallocation_only() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();

    let first = world.spawn(type_of(&[a])).unwrap();
    let handle = world.get_ptr(first, a).unwrap();

    for _ in 0..512 {
        world.spawn(type_of(&[a])).unwrap();
    }

    let fresh = world.get_ptr(first, a).unwrap();
    assert!(fresh.version > handle.version);
    assert!(world.column_data(&handle).is_none());
    assert!(world.column_data(&fresh).is_some());

    // Swap-removes reuse the buffer in place and keep handles valid.
    let before = world.get_ptr(first, a).unwrap();
    let last = world.spawn(type_of(&[a])).unwrap();
    let after_spawn = world.get_ptr(first, a).unwrap();
    world.despawn(last).unwrap();
    assert_eq!(world.column_data(&after_spawn).is_some(), true);
    assert_eq!(before.version, after_spawn.version);
}

#[test]
fn structural_events_report_creation_and_population() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();

    let entity = world.spawn(type_of(&[a])).unwrap();
    let record = world.get_record(entity).unwrap();
    assert_eq!(
        world.drain_table_events(),
        vec![
            TableEvent::Created(record.table),
            TableEvent::Activated(record.table)
        ]
    );

    // A second row is not a transition.
    world.spawn(type_of(&[a])).unwrap();
    assert!(world.drain_table_events().is_empty());

    world.despawn(entity).unwrap();
    assert!(world.drain_table_events().is_empty());

    let survivor = world.table(record.table).entity_at(0);
    world.despawn(survivor).unwrap();
    assert_eq!(
        world.drain_table_events(),
        vec![TableEvent::Deactivated(record.table)]
    );
}

#[test]
#[should_panic(expected = "more than one prefab link")]
fn a_table_may_carry_at_most_one_prefab_link() {
    let mut world = World::new();
    let a = world.register_component(SIZED).unwrap();

    let base_a = world.spawn(type_of(&[a])).unwrap();
    let base_b = world.spawn(type_of(&[a])).unwrap();

    let _ = world.spawn(type_of(&[instanceof(base_a), instanceof(base_b)]));
}
