use quarry::{
    ColumnPlan, EntityType, QueryRegistry, SignatureBuilder, World, INVALID_ENTITY,
};

const SIZED: usize = 8;

fn type_of(ids: &[u64]) -> EntityType {
    EntityType::from_ids(ids)
}

#[test]
fn two_owned_components_resolve_to_direct_columns() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let vel = world.register_component(SIZED).unwrap();
    world.spawn(type_of(&[pos, vel])).unwrap();

    let sig = SignatureBuilder::new().term(pos).term(vel).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    assert_eq!(query.tables().len(), 1);

    let matched = &query.tables()[0];
    assert_eq!(matched.columns, vec![ColumnPlan::Column(1), ColumnPlan::Column(2)]);
    assert_eq!(matched.components, vec![pos, vel]);
    assert!(matched.references.is_empty());
    assert!(!query.has_refs());
}

#[test]
fn negated_component_rejects_owning_table() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let dead = world.register_tag().unwrap();
    world.spawn(type_of(&[pos, dead])).unwrap();

    let sig = SignatureBuilder::new().term(pos).without(dead).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    assert!(queries.get(query).unwrap().tables().is_empty());
}

#[test]
fn container_component_becomes_reference_to_parent() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let transform = world.register_component(SIZED).unwrap();

    let parent = world.spawn(type_of(&[transform])).unwrap();
    world.spawn_child(parent, &type_of(&[pos])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .from_container(transform)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    assert_eq!(query.tables().len(), 1);

    let matched = &query.tables()[0];
    assert_eq!(matched.columns, vec![ColumnPlan::Column(1), ColumnPlan::Reference(0)]);
    assert_eq!(matched.references.len(), 1);

    let reference = &matched.references[0];
    assert_eq!(reference.entity, parent);
    assert_eq!(reference.component, transform);
    assert_eq!(reference.cached, world.get_ptr(parent, transform));
    assert!(world.is_watched(parent));
    assert!(query.has_refs());
}

#[test]
fn inherited_component_becomes_reference_to_prefab() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let mesh = world.register_component(SIZED).unwrap();
    let prefab = world.spawn_prefab(&type_of(&[mesh])).unwrap();
    world.spawn_instance(prefab, &EntityType::new()).unwrap();

    let sig = SignatureBuilder::new().term(mesh).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    // The prefab's own table carries the prefab marker and is filtered out.
    assert_eq!(query.tables().len(), 1);

    let matched = &query.tables()[0];
    assert_eq!(matched.columns, vec![ColumnPlan::Reference(0)]);

    let reference = &matched.references[0];
    assert_eq!(reference.entity, prefab);
    assert_eq!(reference.component, mesh);
    assert!(reference.cached.is_some());
    assert!(world.is_watched(prefab));
}

#[test]
fn missing_optional_collapses_to_handle() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let a = world.register_component(SIZED).unwrap();
    let b = world.register_component(SIZED).unwrap();
    world.spawn(type_of(&[a])).unwrap();

    let sig = SignatureBuilder::new().term(a).optional(b).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    let matched = &queries.get(query).unwrap().tables()[0];
    assert_eq!(matched.columns, vec![ColumnPlan::Column(1), ColumnPlan::Handle]);
}

#[test]
fn or_group_resolves_witness_per_table() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let a = world.register_component(SIZED).unwrap();
    let b = world.register_component(SIZED).unwrap();
    let c = world.register_component(SIZED).unwrap();
    world.spawn(type_of(&[b, c])).unwrap();

    let sig = SignatureBuilder::new().one_of(&[a, b]).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    let matched = &queries.get(query).unwrap().tables()[0];
    assert_eq!(matched.components, vec![b]);
    assert_eq!(matched.columns, vec![ColumnPlan::Column(1)]);
}

#[test]
fn shared_component_requires_inheritance_and_rejects_ownership() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let armor = world.register_component(SIZED).unwrap();

    // Owns the component directly: owned overrides shared, no match.
    world.spawn(type_of(&[armor])).unwrap();

    // Inherits it from a prefab: matches, resolved as a reference.
    let prefab = world.spawn_prefab(&type_of(&[armor])).unwrap();
    world.spawn_instance(prefab, &EntityType::new()).unwrap();

    let sig = SignatureBuilder::new().shared(armor).build().unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    assert_eq!(query.tables().len(), 1);

    let matched = &query.tables()[0];
    assert_eq!(matched.columns, vec![ColumnPlan::Reference(0)]);
    assert_eq!(matched.references[0].entity, prefab);
}

#[test]
fn negated_shared_component_is_the_exact_dual() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let armor = world.register_component(SIZED).unwrap();
    let marker = world.register_tag().unwrap();

    let owning = world.spawn(type_of(&[armor, marker])).unwrap();
    let prefab = world.spawn_prefab(&type_of(&[armor])).unwrap();
    world
        .spawn_instance(prefab, &type_of(&[marker]))
        .unwrap();

    let sig = SignatureBuilder::new()
        .term(marker)
        .without_shared(armor)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    // The inheriting table is rejected; the owning table passes.
    let query = queries.get(query).unwrap();
    assert_eq!(query.tables().len(), 1);
    let matched_table = query.tables()[0].table;
    assert_eq!(matched_table, world.get_record(owning).unwrap().table);
}

#[test]
fn fixed_entity_term_gates_on_source_and_references_it() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let config = world.register_component(SIZED).unwrap();

    let settings = world.spawn(type_of(&[config])).unwrap();
    world.spawn(type_of(&[pos])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .from_entity(settings, config)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    assert_eq!(query.tables().len(), 1);

    let matched = &query.tables()[0];
    assert_eq!(matched.columns[0], ColumnPlan::Column(1));
    assert_eq!(matched.columns[1], ColumnPlan::Reference(0));
    assert_eq!(matched.references[0].entity, settings);
    assert!(world.is_watched(settings));
}

#[test]
fn fixed_entity_negation_rejects_while_source_owns_component() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let frozen = world.register_tag().unwrap();

    let controller = world.spawn(type_of(&[frozen])).unwrap();
    world.spawn(type_of(&[pos])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .without_entity(controller, frozen)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    assert!(queries.get(query).unwrap().tables().is_empty());
}

#[test]
fn system_term_references_the_owning_system() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let state = world.register_component(SIZED).unwrap();

    let system = world.spawn(type_of(&[state])).unwrap();
    world.spawn(type_of(&[pos])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .from_system(state)
        .build()
        .unwrap();
    let query = queries.new_query_for_system(&mut world, sig, system);

    let query = queries.get(query).unwrap();
    assert_eq!(query.system(), system);
    assert_eq!(query.system_components().entries(), &[state]);

    let matched = query
        .tables()
        .iter()
        .find(|matched| matched.components[0] == pos)
        .expect("the [pos] table must match");
    assert_eq!(matched.columns[1], ColumnPlan::Reference(0));
    assert_eq!(matched.references[0].entity, system);
}

#[test]
fn cascade_records_column_and_keeps_root_slot_empty() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let transform = world.register_component(SIZED).unwrap();

    let root = world.spawn(type_of(&[pos, transform])).unwrap();
    world.spawn_child(root, &type_of(&[pos, transform])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .cascade(transform)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    assert_eq!(query.cascade_by(), 2);
    assert_eq!(query.tables().len(), 2);

    let root_table = world.get_record(root).unwrap().table;
    for matched in query.tables() {
        assert_eq!(matched.columns[1], ColumnPlan::Reference(0));
        let reference = &matched.references[0];
        if matched.table == root_table {
            // Root tables keep the slot with no owner until reparented.
            assert_eq!(reference.entity, INVALID_ENTITY);
            assert!(reference.cached.is_none());
        } else {
            assert_eq!(reference.entity, root);
            assert!(reference.cached.is_some());
        }
    }
}

#[test]
fn optional_container_term_adapts_to_each_table() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let transform = world.register_component(SIZED).unwrap();

    let parent = world.spawn(type_of(&[transform])).unwrap();
    let child = world.spawn_child(parent, &type_of(&[pos])).unwrap();
    let orphan = world.spawn(type_of(&[pos])).unwrap();
    let self_sufficient = world.spawn(type_of(&[pos, transform])).unwrap();

    let sig = SignatureBuilder::new()
        .term(pos)
        .optional_container(transform)
        .build()
        .unwrap();
    let query = queries.new_query(&mut world, sig);

    let query = queries.get(query).unwrap();
    // Three of the four tables carry pos; the parent's table does not.
    assert_eq!(query.tables().len(), 3);

    let plan_for = |entity| {
        let table = world.get_record(entity).unwrap().table;
        query
            .tables()
            .iter()
            .find(|matched| matched.table == table)
            .unwrap()
            .columns[1]
    };

    // With a providing parent the term reads through a reference; without
    // one it falls back to the table's own column, or to no data at all.
    assert_eq!(plan_for(child), ColumnPlan::Reference(0));
    assert_eq!(plan_for(orphan), ColumnPlan::Handle);
    assert_eq!(plan_for(self_sufficient), ColumnPlan::Column(2));
}

#[test]
fn signature_validation_rejects_malformed_terms() {
    let mut world = World::new();

    let pos = world.register_component(SIZED).unwrap();

    let err = SignatureBuilder::new().term(pos).one_of(&[]).build().unwrap_err();
    assert_eq!(err, quarry::SignatureError::EmptyOrGroup { column: 1 });

    let err = SignatureBuilder::new()
        .from_entity(INVALID_ENTITY, pos)
        .build()
        .unwrap_err();
    assert_eq!(err, quarry::SignatureError::MissingSource { column: 0 });
}

#[test]
fn prefab_and_disabled_tables_require_opt_in() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    world.spawn_prefab(&type_of(&[pos])).unwrap();
    world
        .spawn(type_of(&[pos, quarry::DISABLED_MARKER]))
        .unwrap();

    let filtered = SignatureBuilder::new().term(pos).build().unwrap();
    let filtered = queries.new_query(&mut world, filtered);
    assert!(queries.get(filtered).unwrap().tables().is_empty());

    let opted_in = SignatureBuilder::new()
        .term(pos)
        .match_prefab()
        .match_disabled()
        .build()
        .unwrap();
    let opted_in = queries.new_query(&mut world, opted_in);
    assert_eq!(queries.get(opted_in).unwrap().tables().len(), 2);
}

#[test]
fn new_tables_match_incrementally_and_flip_active() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();
    let vel = world.register_component(SIZED).unwrap();

    let sig = SignatureBuilder::new().term(pos).build().unwrap();
    let query = queries.new_query(&mut world, sig);
    assert!(queries.get(query).unwrap().tables().is_empty());

    let entity = world.spawn(type_of(&[pos, vel])).unwrap();
    queries.sync(&mut world);

    {
        let query = queries.get(query).unwrap();
        assert_eq!(query.tables().len(), 1);
        assert!(query.tables()[0].active);
    }

    world.despawn(entity).unwrap();
    queries.sync(&mut world);
    assert!(!queries.get(query).unwrap().tables()[0].active);
}

#[test]
fn freed_queries_stop_matching_and_slots_are_reused() {
    let mut world = World::new();
    let mut queries = QueryRegistry::new();

    let pos = world.register_component(SIZED).unwrap();

    let first = SignatureBuilder::new().term(pos).build().unwrap();
    let first = queries.new_query(&mut world, first);
    assert_eq!(queries.len(), 1);

    assert!(queries.free_query(first));
    assert!(!queries.free_query(first));
    assert!(queries.is_empty());
    assert!(queries.get(first).is_none());
    assert!(queries.get_mut(first).is_none());

    let second = SignatureBuilder::new().term(pos).build().unwrap();
    let second = queries.new_query(&mut world, second);
    assert_eq!(second, first);
    assert!(queries.get_mut(second).is_some());
}
