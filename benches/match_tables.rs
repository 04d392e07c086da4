use criterion::*;
use std::hint::black_box;

use quarry::prelude::*;
use quarry::TableId;

const COMPONENT_POOL: usize = 8;
const TABLE_PATTERNS: usize = 256;

/// Builds a world whose tables cover every non-empty subset of the
/// component pool, yielding 255 distinct archetypes.
fn build_world() -> (World, Vec<EntityId>) {
    let mut world = World::new();

    let components: Vec<EntityId> = (0..COMPONENT_POOL)
        .map(|_| world.register_component(16).unwrap())
        .collect();

    for pattern in 1..TABLE_PATTERNS {
        let ids: Vec<EntityId> = components
            .iter()
            .enumerate()
            .filter(|(bit, _)| (pattern >> bit) & 1 == 1)
            .map(|(_, &component)| component)
            .collect();
        world.spawn(EntityType::from_ids(&ids)).unwrap();
    }

    (world, components)
}

fn match_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_tables");

    group.bench_function("new_query_over_255_tables", |b| {
        let (mut world, components) = build_world();
        let mut queries = QueryRegistry::new();

        b.iter(|| {
            let sig = SignatureBuilder::new()
                .term(components[0])
                .term(components[1])
                .optional(components[2])
                .without(components[7])
                .build()
                .unwrap();

            let query = queries.new_query(&mut world, sig);
            black_box(queries.get(query).unwrap().tables().len());
            queries.free_query(query);
        });
    });

    group.bench_function("match_predicate_over_255_tables", |b| {
        let (mut world, components) = build_world();
        let mut queries = QueryRegistry::new();

        let sig = SignatureBuilder::new()
            .one_of(&[components[0], components[3]])
            .term(components[1])
            .build()
            .unwrap();
        let query = queries.new_query(&mut world, sig);
        let query = queries.get(query).unwrap();

        b.iter(|| {
            let mut matched = 0usize;
            for table in 0..world.table_count() as TableId {
                if query.matches_table(&world, table) {
                    matched += 1;
                }
            }
            black_box(matched)
        });
    });

    group.bench_function("plan_container_references", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                let transform = world.register_component(16).unwrap();
                let local = world.register_component(16).unwrap();

                let mut parent = world.spawn(EntityType::from_ids(&[transform])).unwrap();
                for _ in 0..64 {
                    // Each level's CHILDOF entry makes the type distinct, so
                    // every child gets its own table.
                    let child = world
                        .spawn_child(parent, &EntityType::from_ids(&[local]))
                        .unwrap();
                    parent = child;
                }
                (world, local, transform)
            },
            |(mut world, local, transform)| {
                let mut queries = QueryRegistry::new();
                let sig = SignatureBuilder::new()
                    .term(local)
                    .cascade(transform)
                    .build()
                    .unwrap();
                let query = queries.new_query(&mut world, sig);
                black_box(queries.get(query).unwrap().has_refs());
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, match_benchmark);
criterion_main!(benches);
