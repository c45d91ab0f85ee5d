//! Terminal checks - decides when the player's flight is over.

use crate::components::*;
use crate::systems::collision::spheres_collide;
use crate::terrain::TerrainResource;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of the flight so far. Anything but `Running` is final.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    #[default]
    Running,
    /// Player hit the terrain.
    CrashedFloor,
    /// Player hit an AI plane.
    CrashedPlane,
    /// Player hit a lava bomb.
    CrashedProjectile,
}

impl FlightStatus {
    pub fn is_terminal(self) -> bool {
        self != FlightStatus::Running
    }
}

/// Whether a sphere at `position` rests on or below the terrain.
pub fn touches_terrain(terrain: &TerrainResource, position: glam::Vec3, radius: f32) -> bool {
    position.y - radius <= terrain.height_under(position)
}

/// System that records the first fatal condition for the player.
///
/// Checked in order: terrain, AI planes, active projectiles.
pub fn terminal_check_system(
    mut status: ResMut<FlightStatus>,
    terrain: Res<TerrainResource>,
    player: Query<(&Position, &CollisionSphere), With<Player>>,
    planes: Query<(&Position, &CollisionSphere), (With<AiPlane>, Without<Player>)>,
    projectiles: Query<(&Position, &CollisionSphere, &Projectile), Without<Player>>,
) {
    if status.is_terminal() {
        return;
    }

    for (pos, sphere) in player.iter() {
        let outcome = if touches_terrain(&terrain, pos.0, sphere.radius) {
            FlightStatus::CrashedFloor
        } else if planes
            .iter()
            .any(|(p, s)| spheres_collide(pos.0, sphere.radius, p.0, s.radius))
        {
            FlightStatus::CrashedPlane
        } else if projectiles
            .iter()
            .any(|(p, s, projectile)| {
                !projectile.expired && spheres_collide(pos.0, sphere.radius, p.0, s.radius)
            })
        {
            FlightStatus::CrashedProjectile
        } else {
            continue;
        };

        log::warn!("flight over: {:?} at {:?}", outcome, pos.0);
        *status = outcome;
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiPlaneConfig, AiPlaneSpawn, PlayerConfig, ProjectileConfig};
    use crate::terrain::HeightField;
    use glam::Vec3;

    fn world_with_player(start: Vec3) -> World {
        let mut world = World::new();
        world.insert_resource(FlightStatus::default());
        let field = HeightField::flat(11, 11, 1000.0, 0.0).unwrap();
        world.insert_resource(TerrainResource::new(field));
        let config = PlayerConfig {
            start_position: start,
            ..PlayerConfig::default()
        };
        world.spawn(PlayerBundle::new(&config));
        world
    }

    fn check(world: &mut World) -> FlightStatus {
        let mut schedule = Schedule::default();
        schedule.add_systems(terminal_check_system);
        schedule.run(world);
        *world.resource::<FlightStatus>()
    }

    #[test]
    fn test_clear_sky_keeps_running() {
        let mut world = world_with_player(Vec3::new(0.0, 3000.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::Running);
    }

    #[test]
    fn test_floor_is_fatal() {
        // Radius 200: touching the ground counts.
        let mut world = world_with_player(Vec3::new(0.0, 200.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::CrashedFloor);
    }

    #[test]
    fn test_floor_takes_precedence_over_plane() {
        let mut world = world_with_player(Vec3::new(0.0, 100.0, 0.0));
        let config = AiPlaneConfig::default();
        let spawn = AiPlaneSpawn {
            position: Vec3::new(0.0, 150.0, 0.0),
            clockwise: false,
        };
        world.spawn(AiPlaneBundle::new(1, &spawn, &config));
        assert_eq!(check(&mut world), FlightStatus::CrashedFloor);
    }

    fn spawn_plane(world: &mut World, position: Vec3) {
        let spawn = AiPlaneSpawn {
            position,
            clockwise: false,
        };
        world.spawn(AiPlaneBundle::new(1, &spawn, &AiPlaneConfig::default()));
    }

    #[test]
    fn test_plane_contact_is_fatal() {
        let mut world = world_with_player(Vec3::new(0.0, 3000.0, 0.0));
        // 544 apart: radii 200 + 344 only touch.
        spawn_plane(&mut world, Vec3::new(0.0, 3544.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::Running);

        spawn_plane(&mut world, Vec3::new(0.0, 3300.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::CrashedPlane);
    }

    #[test]
    fn test_plane_takes_precedence_over_projectile() {
        let mut world = world_with_player(Vec3::new(0.0, 3000.0, 0.0));
        let config = ProjectileConfig::default();
        world.spawn(ProjectileBundle::new(0, Vec3::new(0.0, 3100.0, 0.0), Vec3::ZERO, &config));
        spawn_plane(&mut world, Vec3::new(100.0, 3000.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::CrashedPlane);
    }

    #[test]
    fn test_plane_and_projectile_contacts() {
        let mut world = world_with_player(Vec3::new(0.0, 3000.0, 0.0));
        let config = ProjectileConfig::default();
        let mut bomb = ProjectileBundle::new(0, Vec3::new(0.0, 3100.0, 0.0), Vec3::ZERO, &config);
        bomb.projectile.expired = true;
        let bomb = world.spawn(bomb).id();
        assert_eq!(check(&mut world), FlightStatus::Running);

        world.get_mut::<Projectile>(bomb).unwrap().expired = false;
        assert_eq!(check(&mut world), FlightStatus::CrashedProjectile);

        // Terminal status sticks.
        spawn_plane(&mut world, Vec3::new(0.0, 3000.0, 0.0));
        assert_eq!(check(&mut world), FlightStatus::CrashedProjectile);
    }
}
