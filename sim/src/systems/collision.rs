//! Collision systems - sphere tests between projectiles and between aircraft.
//!
//! Pair loops visit entities in id order, `i` against `j > i`, so every pair
//! is tested once and the outcome does not depend on archetype layout.

use crate::components::*;
use crate::config::FlightConfig;
use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Strict sphere overlap: touching spheres do not collide.
#[inline]
pub fn spheres_collide(p1: Vec3, r1: f32, p2: Vec3, r2: f32) -> bool {
    p1.distance(p2) < r1 + r2
}

/// Impulse pushing `p_i` away from `p_j`. Coincident centres separate along +Y.
pub fn separation_impulse(p_i: Vec3, p_j: Vec3, magnitude: f32) -> Vec3 {
    (p_i - p_j).try_normalize().unwrap_or(Vec3::Y) * magnitude
}

/// Source of random tints for aircraft that bump into each other.
#[derive(Resource, Debug)]
pub struct TintPalette {
    rng: StdRng,
}

impl TintPalette {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_tint(&mut self) -> Tint {
        Tint([self.rng.gen(), self.rng.gen(), self.rng.gen(), 1.0])
    }
}

/// System that bounces colliding projectiles apart and heats them up.
pub fn projectile_collision_system(
    config: Res<FlightConfig>,
    mut query: Query<(
        Entity,
        &ProjectileId,
        &Projectile,
        &Position,
        &CollisionSphere,
        &mut Velocity,
        &mut Tint,
    )>,
) {
    let mut active: Vec<(ProjectileId, Entity, Vec3, f32)> = query
        .iter()
        .filter(|(_, _, projectile, ..)| !projectile.expired)
        .map(|(entity, id, _, pos, sphere, ..)| (*id, entity, pos.0, sphere.radius))
        .collect();
    active.sort_by_key(|(id, ..)| *id);

    let magnitude = config.projectile.push_magnitude;
    let mut impulses = vec![Vec3::ZERO; active.len()];
    let mut heated = vec![false; active.len()];

    for i in 0..active.len() {
        let (_, _, p_i, r_i) = active[i];
        for j in (i + 1)..active.len() {
            let (_, _, p_j, r_j) = active[j];
            if spheres_collide(p_i, r_i, p_j, r_j) {
                let push = separation_impulse(p_i, p_j, magnitude);
                impulses[i] += push;
                impulses[j] -= push;
                heated[i] = true;
                heated[j] = true;
            }
        }
    }

    for (k, (_, entity, ..)) in active.iter().enumerate() {
        if !heated[k] {
            continue;
        }
        if let Ok((_, _, projectile, _, _, mut velocity, mut tint)) = query.get_mut(*entity) {
            projectile.push(&mut velocity, impulses[k]);
            *tint = Tint::HEATED;
        }
    }
}

/// System that recolours aircraft involved in mid-air collisions.
///
/// AI pairs and player-vs-AI contacts both recolour the AI planes. Whether a
/// contact is fatal for the player is decided by the terminal check.
pub fn aircraft_collision_system(
    mut palette: ResMut<TintPalette>,
    player: Query<(&Position, &CollisionSphere), With<Player>>,
    mut planes: Query<
        (Entity, &AircraftId, &Position, &CollisionSphere, &mut Tint),
        (With<AiPlane>, Without<Player>),
    >,
) {
    let mut sorted: Vec<(AircraftId, Entity, Vec3, f32)> = planes
        .iter()
        .map(|(entity, id, pos, sphere, _)| (*id, entity, pos.0, sphere.radius))
        .collect();
    sorted.sort_by_key(|(id, ..)| *id);

    let mut hit = vec![false; sorted.len()];
    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            if spheres_collide(sorted[i].2, sorted[i].3, sorted[j].2, sorted[j].3) {
                hit[i] = true;
                hit[j] = true;
            }
        }
    }
    for (player_pos, player_sphere) in player.iter() {
        for (k, (_, _, pos, radius)) in sorted.iter().enumerate() {
            if spheres_collide(player_pos.0, player_sphere.radius, *pos, *radius) {
                hit[k] = true;
            }
        }
    }

    for (k, (id, entity, ..)) in sorted.iter().enumerate() {
        if !hit[k] {
            continue;
        }
        if let Ok((_, _, _, _, mut tint)) = planes.get_mut(*entity) {
            *tint = palette.next_tint();
            log::debug!("aircraft {} collided", id.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiPlaneConfig, AiPlaneSpawn, PlayerConfig, ProjectileConfig};

    #[test]
    fn test_touching_spheres_do_not_collide() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!(!spheres_collide(a, 2.0, b, 3.0));
        assert!(spheres_collide(a, 2.0, b, 3.001));
    }

    #[test]
    fn test_collision_is_symmetric() {
        let points = [
            (Vec3::ZERO, 1.0),
            (Vec3::new(1.5, 0.0, 0.0), 1.0),
            (Vec3::new(0.0, 10.0, 0.0), 2.0),
            (Vec3::new(0.0, 7.5, 1.0), 0.5),
        ];
        for &(p1, r1) in &points {
            for &(p2, r2) in &points {
                assert_eq!(spheres_collide(p1, r1, p2, r2), spheres_collide(p2, r2, p1, r1));
            }
        }
    }

    #[test]
    fn test_separation_impulse() {
        let push = separation_impulse(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, 30.0);
        assert_eq!(push, Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(separation_impulse(Vec3::ONE, Vec3::ONE, 30.0), Vec3::new(0.0, 30.0, 0.0));
    }

    #[test]
    fn test_projectiles_bounce_apart() {
        let mut world = World::new();
        world.insert_resource(FlightConfig::default());
        let config = ProjectileConfig::default();
        let a = world
            .spawn(ProjectileBundle::new(0, Vec3::new(0.0, 1000.0, 0.0), Vec3::ZERO, &config))
            .id();
        let b = world
            .spawn(ProjectileBundle::new(1, Vec3::new(100.0, 1000.0, 0.0), Vec3::ZERO, &config))
            .id();
        let far = world
            .spawn(ProjectileBundle::new(2, Vec3::new(5000.0, 1000.0, 0.0), Vec3::ZERO, &config))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(projectile_collision_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Velocity>(a).unwrap().0, Vec3::new(-30.0, 0.0, 0.0));
        assert_eq!(world.get::<Velocity>(b).unwrap().0, Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(*world.get::<Tint>(a).unwrap(), Tint::HEATED);
        assert_eq!(*world.get::<Tint>(far).unwrap(), Tint::LAVA);
        assert_eq!(world.get::<Velocity>(far).unwrap().0, Vec3::ZERO);
    }

    #[test]
    fn test_ai_planes_recoloured_on_contact() {
        let mut world = World::new();
        world.insert_resource(TintPalette::new(1));
        let config = AiPlaneConfig::default();
        let spawn = |y: f32| AiPlaneSpawn {
            position: Vec3::new(0.0, y, 0.0),
            clockwise: false,
        };
        let a = world.spawn(AiPlaneBundle::new(1, &spawn(4000.0), &config)).id();
        let b = world.spawn(AiPlaneBundle::new(2, &spawn(4500.0), &config)).id();
        let c = world.spawn(AiPlaneBundle::new(3, &spawn(9000.0), &config)).id();
        world.spawn(PlayerBundle::new(&PlayerConfig::default()));

        let mut schedule = Schedule::default();
        schedule.add_systems(aircraft_collision_system);
        schedule.run(&mut world);

        assert_ne!(*world.get::<Tint>(a).unwrap(), Tint::PLANE);
        assert_ne!(*world.get::<Tint>(b).unwrap(), Tint::PLANE);
        assert_eq!(*world.get::<Tint>(c).unwrap(), Tint::PLANE);
    }
}
