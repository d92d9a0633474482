//! Falling boxes
//!
//! Drops a small pyramid of boxes and balls onto the ground and prints the
//! resting poses. Run with: `cargo run --example falling_boxes`

use impulse2d::{PhysicsResult, PhysicsWorld, RigidBody, Shape, Vec2, WorldConfig};

fn main() -> PhysicsResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .without_time()
        .init();

    let mut world = PhysicsWorld::new(WorldConfig::default())?;
    world.add_body(RigidBody::new_static(
        Vec2::new(0.0, -0.5),
        Shape::rectangle(20.0, 0.5),
    ))?;

    let mut handles = Vec::new();
    for row in 0..4 {
        for col in 0..(4 - row) {
            let x = (col as f32 - (3 - row) as f32 * 0.5) * 1.05;
            let y = 0.5 + row as f32 * 1.05;
            let shape = if (row + col) % 3 == 2 {
                Shape::circle(0.5)
            } else {
                Shape::rectangle(0.5, 0.5)
            };
            let body = RigidBody::new_dynamic(Vec2::new(x, y), 1.0, shape).with_friction(0.5);
            handles.push(world.add_body(body)?);
        }
    }
    world.add_body(
        RigidBody::new_dynamic(Vec2::new(0.2, 8.0), 2.0, Shape::circle(0.4))
            .with_restitution(0.6),
    )?;

    for frame in 0..300 {
        world.update(1.0 / 60.0)?;
        if frame % 60 == 59 {
            println!(
                "t = {:.1}s  bodies = {}  manifolds = {}",
                (frame + 1) as f32 / 60.0,
                world.body_count(),
                world.manifold_count()
            );
        }
    }

    for h in handles {
        if let Some(body) = world.body(h) {
            println!(
                "{h}: position = ({:.3}, {:.3})  angle = {:.3}",
                body.position.x, body.position.y, body.angle
            );
        }
    }
    Ok(())
}
