#![no_main]
use arbitrary::Arbitrary;
use impulse2d::{BroadphaseKind, PhysicsWorld, RigidBody, Shape, Vec2, WorldConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    /// Add a body: position, size, kind selector
    Add(i8, i8, u8, u8),
    /// Remove the n-th live body (modulo count)
    Remove(u8),
    /// Step with dt in 1/240ths of a second
    Step(u8),
    /// Ray from a point along a direction
    Raycast(i8, i8, i8, i8),
    ToggleBruteForce,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    broadphase: u8,
    ops: Vec<Op>,
}

// Fuzz the world with an arbitrary sequence of adds, removes, steps and
// raycasts. Must never panic, and removed bodies must leave no trace.
fuzz_target!(|input: FuzzInput| {
    let kind = match input.broadphase % 3 {
        0 => BroadphaseKind::DynamicTree,
        1 => BroadphaseKind::SweepAndPrune,
        _ => BroadphaseKind::BruteForce,
    };
    let Ok(mut world) = PhysicsWorld::new(WorldConfig::default().with_broadphase(kind)) else {
        return;
    };
    let mut live = Vec::new();

    for op in input.ops.into_iter().take(256) {
        match op {
            Op::Add(x, y, size, selector) => {
                let size = 0.1 + f32::from(size) / 64.0;
                let shape = if selector % 2 == 0 {
                    Shape::circle(size)
                } else {
                    Shape::rectangle(size, size * 0.5)
                };
                let position = Vec2::new(f32::from(x) * 0.25, f32::from(y) * 0.25);
                let body = if selector % 7 == 0 {
                    RigidBody::new_static(position, shape)
                } else {
                    RigidBody::new_dynamic(position, 1.0, shape)
                };
                if let Ok(h) = world.add_body(body) {
                    live.push(h);
                }
            }
            Op::Remove(n) => {
                if !live.is_empty() {
                    let h = live.remove(usize::from(n) % live.len());
                    assert!(world.remove_body(h).is_some());
                    assert!(world.remove_body(h).is_none());
                    assert!(!world.is_indexed(h));
                    assert!(world.manifolds().iter().all(|m| !m.key().involves(h)));
                }
            }
            Op::Step(ticks) => {
                let dt = f32::from(ticks.max(1)) / 240.0;
                let _ = world.update(dt);
            }
            Op::Raycast(ox, oy, dx, dy) => {
                let origin = Vec2::new(f32::from(ox), f32::from(oy));
                let _ = world.raycast(origin, Vec2::new(f32::from(dx), f32::from(dy)));
            }
            Op::ToggleBruteForce => {
                let brute_force = !world.config().brute_force;
                world.set_brute_force(brute_force);
            }
        }
    }

    assert_eq!(world.body_count(), live.len());
});
