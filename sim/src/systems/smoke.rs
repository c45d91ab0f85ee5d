//! Smoke trail system - lays out the puffs trailing each lava bomb.

use crate::components::*;
use bevy_ecs::prelude::*;
use glam::Vec3;
use std::f32::consts::FRAC_PI_2;

/// Place every puff of `trail` behind a parent at `position`.
///
/// Puff `i` sits `spacing * (i + 1)` back along the launch direction and is
/// swung out sideways by `swirl_radius * (i + 1)`.
pub fn layout_trail(trail: &mut SmokeTrail, position: Vec3, velocity: Vec3) {
    let back = trail.direction.normalize_or_zero();
    let theta = trail.direction.z.atan2(trail.direction.x) - FRAC_PI_2 + trail.jitter;
    let swirl = Vec3::new(theta.cos(), 0.0, theta.sin());

    for (i, child) in trail.children.iter_mut().enumerate() {
        let step = (i + 1) as f32;
        child.position = position - back * trail.spacing * step + swirl * trail.swirl_radius * step;
        child.velocity = velocity;
    }
}

/// System that keeps smoke trails attached to their projectiles.
pub fn smoke_trail_system(mut query: Query<(&Projectile, &Position, &Velocity, &mut SmokeTrail)>) {
    for (projectile, pos, vel, mut trail) in query.iter_mut() {
        if projectile.expired {
            continue;
        }
        layout_trail(&mut trail, pos.0, vel.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_follow_parent() {
        let mut trail = SmokeTrail::new(Vec3::new(1.0, 0.0, 0.0), 0.0, 5, 10.0, 100.0, 1.0);
        let parent = Vec3::new(0.0, 500.0, 0.0);
        let velocity = Vec3::new(3.0, 4.0, 0.0);
        layout_trail(&mut trail, parent, velocity);

        // Direction +X: theta = -pi/2, so the swirl points along -Z.
        for (i, child) in trail.children.iter().enumerate() {
            let step = (i + 1) as f32;
            let expected = Vec3::new(-10.0 * step, 500.0, -100.0 * step);
            assert!(
                (child.position - expected).length() < 1e-3,
                "child {}: {:?}",
                i,
                child.position
            );
            assert_eq!(child.velocity, velocity);
        }
    }

    #[test]
    fn test_system_skips_expired() {
        let mut world = World::new();
        let entity = world
            .spawn((
                Projectile {
                    gravity: -19.81,
                    mass: 1.0,
                    expired: true,
                },
                Position::new(10.0, 10.0, 10.0),
                Velocity(Vec3::X),
                SmokeTrail::new(Vec3::X, 0.0, 5, 10.0, 100.0, 1.0),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(smoke_trail_system);
        schedule.run(&mut world);

        let trail = world.get::<SmokeTrail>(entity).unwrap();
        assert!(trail.children.iter().all(|c| c.position == Vec3::ZERO));
    }
}
