//! Benchmarks for impulse2d
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use impulse2d::broadphase::brute_force_pairs;
use impulse2d::collision::collide;
use impulse2d::{BroadphaseKind, PhysicsWorld, RigidBody, Shape, Vec2, WorldConfig};

const DT: f32 = 1.0 / 60.0;

/// A ground box with a grid of alternating circles and boxes dropped on it.
fn pile(kind: BroadphaseKind, count: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::new(WorldConfig::default().with_broadphase(kind)).unwrap();
    world
        .add_body(RigidBody::new_static(
            Vec2::new(0.0, -0.5),
            Shape::rectangle(100.0, 0.5),
        ))
        .unwrap();
    let columns = 20;
    for i in 0..count {
        let x = (i % columns) as f32 * 1.1 - columns as f32 * 0.55;
        let y = 0.6 + (i / columns) as f32 * 1.1;
        let shape = if i % 2 == 0 {
            Shape::circle(0.5)
        } else {
            Shape::rectangle(0.5, 0.5)
        };
        world
            .add_body(RigidBody::new_dynamic(Vec2::new(x, y), 1.0, shape))
            .unwrap();
    }
    world
}

// ============================================================================
// World step benchmarks
// ============================================================================

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    group.bench_function("single_body_60_steps", |b| {
        b.iter(|| {
            let mut world = PhysicsWorld::default();
            let h = world
                .add_body(RigidBody::new_dynamic(
                    Vec2::new(0.0, 100.0),
                    1.0,
                    Shape::circle(0.5),
                ))
                .unwrap();
            for _ in 0..60 {
                world.update(black_box(DT)).unwrap();
            }
            world.body(h).map(|b| b.position)
        });
    });

    for kind in [
        BroadphaseKind::DynamicTree,
        BroadphaseKind::SweepAndPrune,
        BroadphaseKind::BruteForce,
    ] {
        let name = kind.build(0.0).name();
        group.bench_with_input(BenchmarkId::new("pile_200", name), &kind, |b, &kind| {
            let mut world = pile(kind, 200);
            // Let the pile settle into resting contact first
            for _ in 0..60 {
                world.update(DT).unwrap();
            }
            b.iter(|| world.update(black_box(DT)).unwrap());
        });
    }

    group.finish();
}

// ============================================================================
// Broadphase benchmarks
// ============================================================================

fn bench_broadphase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadphase");

    for count in [100usize, 1000] {
        let world = pile(BroadphaseKind::BruteForce, count);

        group.bench_with_input(BenchmarkId::new("brute_force_pairs", count), &world, |b, world| {
            b.iter(|| black_box(brute_force_pairs(world.bodies(), 0.2)));
        });

        for kind in [BroadphaseKind::DynamicTree, BroadphaseKind::SweepAndPrune] {
            let mut bp = kind.build(0.2);
            for body in world.bodies() {
                bp.add(body);
            }
            group.bench_function(BenchmarkId::new(bp.name(), count), |b| {
                b.iter(|| black_box(bp.candidate_pairs()));
            });
        }
    }

    let world = pile(BroadphaseKind::DynamicTree, 1000);
    group.bench_function("raycast_1000", |b| {
        b.iter(|| black_box(world.raycast(Vec2::new(-20.0, 30.0), Vec2::new(1.0, -1.0))));
    });

    group.finish();
}

// ============================================================================
// Narrow phase benchmarks
// ============================================================================

fn bench_narrow_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow_phase");

    let ground = RigidBody::new_static(Vec2::ZERO, Shape::rectangle(5.0, 0.5));
    let boxed = RigidBody::new_dynamic(Vec2::new(0.3, 0.95), 1.0, Shape::rectangle(0.5, 0.5))
        .with_angle(0.1);
    let ball = RigidBody::new_dynamic(Vec2::new(0.0, 0.95), 1.0, Shape::circle(0.5));

    group.bench_function("polygon_polygon", |bench| {
        bench.iter(|| black_box(collide(black_box(&ground), black_box(&boxed))));
    });

    group.bench_function("polygon_circle", |bench| {
        bench.iter(|| black_box(collide(black_box(&ground), black_box(&ball))));
    });

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_broadphase, bench_narrow_phase);
criterion_main!(benches);
