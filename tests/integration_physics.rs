//! Integration tests for impulse2d
//!
//! These tests verify end-to-end behaviour of the physics engine using only the
//! public API re-exported from the crate root.

use impulse2d::{
    BodyHandle, BroadphaseKind, PhysicsError, PhysicsWorld, RigidBody, Shape, Vec2, WorldConfig,
};

const DT: f32 = 1.0 / 60.0;

// ============================================================================
// Helpers
// ============================================================================

/// Run a world for `steps` frames.
fn run_world(world: &mut PhysicsWorld, steps: usize) {
    for _ in 0..steps {
        world.update(DT).unwrap();
    }
}

fn zero_gravity() -> WorldConfig {
    WorldConfig::default().with_gravity(Vec2::ZERO)
}

fn ground() -> RigidBody {
    RigidBody::new_static(Vec2::new(0.0, -0.5), Shape::rectangle(20.0, 0.5))
}

/// Every body is indexed, and every manifold refers to two live bodies.
fn assert_registration(world: &PhysicsWorld) {
    for body in world.bodies() {
        assert!(world.is_indexed(body.handle()), "{} not indexed", body.handle());
    }
    for m in world.manifolds().iter() {
        assert!(m.key().a() < m.key().b());
        assert!(world.contains_body(m.key().a()));
        assert!(world.contains_body(m.key().b()));
    }
}

// ============================================================================
// Test 1: Free-fall determinism
// ============================================================================

/// Running the same scene twice must produce bit-identical state.
#[test]
fn test_scene_determinism() {
    fn simulate() -> Vec<(u32, u32, u32)> {
        let mut world = PhysicsWorld::default();
        world.add_body(ground()).unwrap();
        for i in 0..6 {
            let shape = if i % 2 == 0 {
                Shape::circle(0.4)
            } else {
                Shape::rectangle(0.4, 0.3)
            };
            world
                .add_body(
                    RigidBody::new_dynamic(Vec2::new(i as f32 * 0.35, 1.0 + i as f32), 1.0, shape)
                        .with_angle(i as f32 * 0.2),
                )
                .unwrap();
        }
        run_world(&mut world, 120);
        world
            .bodies()
            .iter()
            .map(|b| (b.position.x.to_bits(), b.position.y.to_bits(), b.angle.to_bits()))
            .collect()
    }

    assert_eq!(simulate(), simulate());
}

// ============================================================================
// Test 2: Restitution
// ============================================================================

/// Equal circles with restitution 1 exchange velocities in one step.
#[test]
fn test_elastic_head_on_exchange() {
    let mut world = PhysicsWorld::new(zero_gravity()).unwrap();
    let a = world
        .add_body(
            RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5))
                .with_velocity(Vec2::new(4.0, 0.0))
                .with_restitution(1.0),
        )
        .unwrap();
    let b = world
        .add_body(
            RigidBody::new_dynamic(Vec2::new(0.995, 0.0), 1.0, Shape::circle(0.5))
                .with_restitution(1.0),
        )
        .unwrap();

    world.update(DT).unwrap();

    let va = world.body(a).unwrap().velocity;
    let vb = world.body(b).unwrap().velocity;
    assert!(va.x.abs() < 1e-3, "va = {va:?}");
    assert!((vb.x - 4.0).abs() < 1e-3, "vb = {vb:?}");
    assert!(va.y.abs() < 1e-5 && vb.y.abs() < 1e-5);
}

/// Zero restitution: bodies leave the collision with a common normal velocity.
#[test]
fn test_inelastic_head_on() {
    let mut world = PhysicsWorld::new(zero_gravity()).unwrap();
    let a = world
        .add_body(
            RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5))
                .with_velocity(Vec2::new(4.0, 0.0)),
        )
        .unwrap();
    let b = world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.995, 0.0), 1.0, Shape::circle(0.5)))
        .unwrap();

    world.update(DT).unwrap();

    let va = world.body(a).unwrap().velocity.x;
    let vb = world.body(b).unwrap().velocity.x;
    assert!((va - 2.0).abs() < 1e-3 && (vb - 2.0).abs() < 1e-3, "{va} {vb}");
}

// ============================================================================
// Test 3: Resting contact
// ============================================================================

#[test]
fn test_box_rests_on_ground() {
    let mut world = PhysicsWorld::default();
    world.add_body(ground()).unwrap();
    let h = world
        .add_body(RigidBody::new_dynamic(
            Vec2::new(0.0, 2.0),
            1.0,
            Shape::rectangle(0.5, 0.5),
        ))
        .unwrap();

    run_world(&mut world, 240);

    let body = world.body(h).unwrap();
    assert!((body.position.y - 0.5).abs() < 0.05, "y = {}", body.position.y);
    assert!(body.velocity.length() < 0.05);
    assert!(body.angle.abs() < 1e-2);

    assert_eq!(world.manifold_count(), 1);
    let m = world.manifolds().iter().next().unwrap();
    assert!(m.is_colliding());
    assert_eq!(m.contacts().len(), 2);
    for c in m.contacts() {
        assert!(c.separation > -0.05, "penetration {}", c.separation);
    }
}

#[test]
fn test_static_bodies_never_move() {
    let mut world = PhysicsWorld::default();
    let g = world.add_body(ground()).unwrap();
    world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 0.6), 5.0, Shape::circle(0.5)))
        .unwrap();

    world.body_mut(g).unwrap().apply_force(Vec2::new(1000.0, 1000.0));
    world.body_mut(g).unwrap().apply_impulse(Vec2::new(50.0, 0.0));
    run_world(&mut world, 60);

    let g = world.body(g).unwrap();
    assert_eq!(g.position, Vec2::new(0.0, -0.5));
    assert_eq!(g.velocity, Vec2::ZERO);
    assert_eq!(g.angle, 0.0);
}

#[test]
fn test_kinematic_moves_at_constant_velocity() {
    let mut world = PhysicsWorld::default();
    let k = world
        .add_body(
            RigidBody::new_kinematic(Vec2::ZERO, Shape::rectangle(1.0, 0.2))
                .with_velocity(Vec2::new(1.0, 0.0)),
        )
        .unwrap();
    world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 0.65), 1.0, Shape::circle(0.45)))
        .unwrap();

    run_world(&mut world, 60);

    let k = world.body(k).unwrap();
    assert_eq!(k.velocity, Vec2::new(1.0, 0.0));
    assert!((k.position.x - 1.0).abs() < 1e-4);
    assert_eq!(k.position.y, 0.0);
}

// ============================================================================
// Test 4: Body management
// ============================================================================

#[test]
fn test_removal_is_idempotent() {
    let mut world = PhysicsWorld::default();
    world.add_body(ground()).unwrap();
    let h = world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 0.45), 1.0, Shape::circle(0.5)))
        .unwrap();
    run_world(&mut world, 2);
    assert_eq!(world.manifold_count(), 1);

    assert!(world.remove_body(h).is_some());
    let count = world.body_count();
    assert!(world.remove_body(h).is_none());
    assert_eq!(world.body_count(), count);
    assert_eq!(world.manifold_count(), 0);
    assert_registration(&world);

    // Stepping afterwards is fine
    run_world(&mut world, 2);
}

#[test]
fn test_registration_under_churn() {
    for kind in [
        BroadphaseKind::DynamicTree,
        BroadphaseKind::SweepAndPrune,
        BroadphaseKind::BruteForce,
    ] {
        let mut world = PhysicsWorld::new(WorldConfig::default().with_broadphase(kind)).unwrap();
        world.add_body(ground()).unwrap();
        let mut live: Vec<BodyHandle> = Vec::new();

        for i in 0..40u32 {
            let x = (i % 7) as f32 * 0.6 - 2.0;
            let y = 0.5 + (i % 5) as f32 * 0.7;
            live.push(
                world
                    .add_body(RigidBody::new_dynamic(Vec2::new(x, y), 1.0, Shape::circle(0.35)))
                    .unwrap(),
            );
            if i % 3 == 2 {
                let victim = live.remove((i as usize * 7) % live.len());
                assert!(world.remove_body(victim).is_some());
            }
            world.update(DT).unwrap();
            assert_registration(&world);
        }
        assert_eq!(world.body_count(), live.len() + 1);
    }
}

#[test]
fn test_invalid_input_rejected() {
    let mut world = PhysicsWorld::default();
    assert!(matches!(
        world.update(-DT),
        Err(PhysicsError::InvalidTimeStep { .. })
    ));
    assert!(Shape::polygon(&[Vec2::ZERO, Vec2::UNIT_X]).is_err());
    assert!(world
        .add_body(RigidBody::new_dynamic(Vec2::ZERO, 0.0, Shape::circle(1.0)))
        .is_err());
    assert!(world
        .add_body(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(-1.0)))
        .is_err());
    assert_eq!(world.body_count(), 0);
}

// ============================================================================
// Test 5: Raycasts
// ============================================================================

#[test]
fn test_raycast_hit_and_miss() {
    for kind in [
        BroadphaseKind::DynamicTree,
        BroadphaseKind::SweepAndPrune,
        BroadphaseKind::BruteForce,
    ] {
        let mut world = PhysicsWorld::new(zero_gravity().with_broadphase(kind)).unwrap();
        let near = world
            .add_body(RigidBody::new_static(Vec2::new(3.0, 0.0), Shape::circle(1.0)))
            .unwrap();
        let far = world
            .add_body(RigidBody::new_static(
                Vec2::new(10.0, 0.0),
                Shape::rectangle(1.0, 1.0),
            ))
            .unwrap();

        let hit = world.raycast(Vec2::ZERO, Vec2::UNIT_X).unwrap();
        assert_eq!(hit.body, near);
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.normal - Vec2::new(-1.0, 0.0)).length() < 1e-5);
        assert!((hit.point - Vec2::new(2.0, 0.0)).length() < 1e-5);

        // Past the first body, from the other side
        let hit = world.raycast(Vec2::new(20.0, 0.0), Vec2::new(-2.0, 0.0)).unwrap();
        assert_eq!(hit.body, far);
        assert!((hit.distance - 9.0).abs() < 1e-5);

        // Misses
        assert!(world.raycast(Vec2::ZERO, Vec2::UNIT_Y).is_none());
        assert!(world.raycast_within(Vec2::ZERO, Vec2::UNIT_X, 1.5).is_none());
    }
}

// ============================================================================
// Test 6: Time control
// ============================================================================

#[test]
fn test_pause_and_resume() {
    let mut world = PhysicsWorld::default();
    let h = world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 10.0), 1.0, Shape::circle(0.5)))
        .unwrap();

    world.set_time_scale(0.0).unwrap();
    run_world(&mut world, 30);
    assert_eq!(world.body(h).unwrap().position, Vec2::new(0.0, 10.0));
    assert_eq!(world.step_count(), 0);

    world.set_time_scale(1.0).unwrap();
    run_world(&mut world, 30);
    assert!(world.body(h).unwrap().position.y < 10.0);
    assert_eq!(world.step_count(), 30);
}

#[test]
fn test_independent_worlds() {
    let mut moon = PhysicsWorld::new(WorldConfig::default().with_gravity(Vec2::new(0.0, -1.6))).unwrap();
    let mut earth = PhysicsWorld::default();
    let m = moon
        .add_body(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5)))
        .unwrap();
    let e = earth
        .add_body(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5)))
        .unwrap();
    run_world(&mut moon, 60);
    run_world(&mut earth, 60);
    assert!((moon.body(m).unwrap().velocity.y + 1.6).abs() < 1e-3);
    assert!((earth.body(e).unwrap().velocity.y + 9.8).abs() < 1e-3);
}

#[test]
fn test_tiny_time_steps_rejected() {
    let mut world = PhysicsWorld::default();
    world.add_body(ground()).unwrap();
    let h = world
        .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 0.45), 1.0, Shape::rectangle(0.5, 0.5)))
        .unwrap();

    // Subnormal steps have no finite reciprocal
    assert!(matches!(
        world.update(1.0e-39),
        Err(PhysicsError::InvalidTimeStep { .. })
    ));
    world.set_time_scale(1.0e-38).unwrap();
    assert!(matches!(
        world.update(DT),
        Err(PhysicsError::InvalidTimeStep { .. })
    ));
    assert_eq!(world.body(h).unwrap().position, Vec2::new(0.0, 0.45));
    assert_eq!(world.step_count(), 0);

    world.set_time_scale(1.0).unwrap();
    run_world(&mut world, 10);
    let body = world.body(h).unwrap();
    assert!(body.position.is_finite() && body.velocity.is_finite());
    assert!(body.angular_velocity.is_finite());
}

#[test]
fn test_non_finite_gravity_rejected() {
    let mut world = PhysicsWorld::default();
    let h = world
        .add_body(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5)))
        .unwrap();
    for g in [Vec2::new(f32::NAN, 0.0), Vec2::new(0.0, f32::INFINITY)] {
        assert!(matches!(
            world.set_gravity(g),
            Err(PhysicsError::InvalidConfiguration { .. })
        ));
    }
    assert_eq!(world.config().gravity, Vec2::new(0.0, -9.8));

    world.set_gravity(Vec2::new(1.0, 0.0)).unwrap();
    run_world(&mut world, 60);
    let v = world.body(h).unwrap().velocity;
    assert!((v.x - 1.0).abs() < 1e-3 && v.y == 0.0);
}

// ============================================================================
// Test 7: Brute-force pairing
// ============================================================================

/// Brute-force mode drops manifolds of pairs that have drifted apart.
#[test]
fn test_brute_force_prunes_separated_pairs() {
    let mut world = PhysicsWorld::new(zero_gravity().with_brute_force(true)).unwrap();
    world
        .add_body(
            RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5))
                .with_velocity(Vec2::new(-5.0, 0.0)),
        )
        .unwrap();
    world
        .add_body(
            RigidBody::new_dynamic(Vec2::new(0.99, 0.0), 1.0, Shape::circle(0.5))
                .with_velocity(Vec2::new(5.0, 0.0)),
        )
        .unwrap();

    world.update(DT).unwrap();
    assert_eq!(world.manifold_count(), 1);

    run_world(&mut world, 10);
    assert_eq!(world.manifold_count(), 0);
    assert_registration(&world);
}
