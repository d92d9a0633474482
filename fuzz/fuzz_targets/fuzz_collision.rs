#![no_main]
use arbitrary::Arbitrary;
use impulse2d::collision::collide;
use impulse2d::{RigidBody, Shape, Vec2};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct CollisionInput {
    /// Pose of each body (position in 1/16 units, angle in 1/64 rad)
    a: (i8, i8, i8),
    b: (i8, i8, i8),
    /// Polygon vertex offsets for body b
    points: Vec<(i8, i8)>,
    circle_a: bool,
}

// Fuzz the narrow phase with overlapping and degenerate poses and arbitrary
// (validated) polygons. Must never panic and never report non-finite contacts.
fuzz_target!(|input: CollisionInput| {
    let pose = |(x, y, angle): (i8, i8, i8)| {
        (
            Vec2::new(f32::from(x) / 16.0, f32::from(y) / 16.0),
            f32::from(angle) / 64.0,
        )
    };

    let shape_a = if input.circle_a {
        Shape::circle(0.5)
    } else {
        Shape::rectangle(0.5, 0.25)
    };
    let points: Vec<_> = input
        .points
        .iter()
        .take(8)
        .map(|&(x, y)| Vec2::new(f32::from(x) / 32.0, f32::from(y) / 32.0))
        .collect();
    let Ok(shape_b) = Shape::polygon(&points) else {
        return;
    };

    let (pa, aa) = pose(input.a);
    let (pb, ab) = pose(input.b);
    let a = RigidBody::new_dynamic(pa, 1.0, shape_a).with_angle(aa);
    let b = RigidBody::new_dynamic(pb, 1.0, shape_b).with_angle(ab);

    for (x, y) in [(&a, &b), (&b, &a)] {
        let contacts = collide(x, y);
        assert!(contacts.len() <= 2);
        for c in contacts.as_slice() {
            assert!(c.position.is_finite());
            assert!(c.normal.is_finite());
            assert!(c.separation.is_finite());
        }
    }
});
