//! Raycast scene
//!
//! Builds a static scene, fires a fan of rays through each broadphase and
//! checks they all agree. Also dumps debug draw statistics.
//! Run with: `cargo run --example raycast_scene`

use impulse2d::{
    BroadphaseKind, DebugDrawData, PhysicsResult, PhysicsWorld, RigidBody, Shape, Vec2,
    WorldConfig,
};

fn build(kind: BroadphaseKind) -> PhysicsResult<PhysicsWorld> {
    let mut world = PhysicsWorld::new(WorldConfig::default().with_broadphase(kind))?;
    for i in 0..12 {
        let angle = i as f32 * core::f32::consts::TAU / 12.0;
        let position = Vec2::new(angle.cos(), angle.sin()) * (4.0 + (i % 3) as f32 * 2.0);
        let shape = if i % 2 == 0 {
            Shape::circle(0.6)
        } else {
            Shape::polygon(&[
                Vec2::new(-0.6, -0.4),
                Vec2::new(0.6, -0.4),
                Vec2::new(0.0, 0.7),
            ])?
        };
        world.add_body(RigidBody::new_static(position, shape).with_angle(angle))?;
    }
    Ok(world)
}

fn main() -> PhysicsResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .without_time()
        .init();

    let worlds = [
        build(BroadphaseKind::DynamicTree)?,
        build(BroadphaseKind::SweepAndPrune)?,
        build(BroadphaseKind::BruteForce)?,
    ];

    for ray in 0..24 {
        let angle = ray as f32 * core::f32::consts::TAU / 24.0;
        let direction = Vec2::new(angle.cos(), angle.sin());
        let hits: Vec<_> = worlds
            .iter()
            .map(|w| w.raycast(Vec2::ZERO, direction))
            .collect();
        let agree = hits.windows(2).all(|w| w[0] == w[1]);
        match hits[0] {
            Some(hit) => println!(
                "ray {ray:2}: {} at {:.3} normal ({:.2}, {:.2}){}",
                hit.body,
                hit.distance,
                hit.normal.x,
                hit.normal.y,
                if agree { "" } else { "  MISMATCH" }
            ),
            None => println!("ray {ray:2}: miss{}", if agree { "" } else { "  MISMATCH" }),
        }
    }

    let mut draw = DebugDrawData::new();
    worlds[0].debug_draw(&mut draw);
    println!("debug draw: {} primitives", draw.primitive_count());
    Ok(())
}
