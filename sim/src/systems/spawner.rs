//! Projectile spawning and removal.
//!
//! A lava bomb is launched every `spawn_interval` seconds from the volcano
//! vent, the first one on the first frame. Launch velocities come from a pool
//! drawn up front and are used in order, wrapping around.

use crate::components::*;
use crate::config::{FlightConfig, ProjectileConfig};
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Launch state for lava bombs.
#[derive(Resource, Debug)]
pub struct ProjectileSpawner {
    rng: StdRng,
    /// Seconds since the last launch.
    timer: f32,
    interval: f32,
    velocities: Vec<Vec3>,
    next_velocity: usize,
    next_id: u32,
}

impl ProjectileSpawner {
    pub fn new(config: &ProjectileConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let velocities = (0..config.velocity_pool_size.max(1))
            .map(|_| launch_velocity(&mut rng, config))
            .collect();
        Self {
            rng,
            timer: config.spawn_interval,
            interval: config.spawn_interval,
            velocities,
            next_velocity: 0,
            next_id: 0,
        }
    }

    /// Advance the timer; true when a launch is due this frame.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.timer += dt;
        if self.timer >= self.interval {
            self.timer = 0.0;
            true
        } else {
            false
        }
    }

    /// Take the next id, launch velocity and smoke jitter.
    pub fn next_launch(&mut self) -> (u32, Vec3, f32) {
        let velocity = self.velocities[self.next_velocity % self.velocities.len()];
        self.next_velocity = (self.next_velocity + 1) % self.velocities.len();
        let (id, jitter) = self.allocate();
        (id, velocity, jitter)
    }

    /// Take the next id and smoke jitter for a bomb launched by hand.
    pub fn allocate(&mut self) -> (u32, f32) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        (id, self.rng.gen_range(0.0..TAU))
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }
}

/// Random velocity inside an upward cone: elevation at least
/// `min_elevation` degrees above the horizon, speed in
/// `[min_speed, max_speed]`. Horizontal components are never negative, so
/// bombs stream away from the vent towards +X/+Z.
pub fn launch_velocity(rng: &mut impl Rng, config: &ProjectileConfig) -> Vec3 {
    let min_sin = config.min_elevation.clamp(0.0, 90.0).to_radians().sin();
    // Uniform in sin(elevation) spreads directions evenly over the cap.
    let sin_el = if min_sin < 1.0 {
        rng.gen_range(min_sin..=1.0)
    } else {
        1.0
    };
    let cos_el = (1.0 - sin_el * sin_el).max(0.0).sqrt();
    let azimuth = rng.gen_range(0.0..=FRAC_PI_2);
    // cos(FRAC_PI_2) rounds to a tiny negative in f32.
    let direction = Vec3::new(cos_el * azimuth.cos().max(0.0), sin_el, cos_el * azimuth.sin());

    let speed = if config.max_speed > config.min_speed {
        rng.gen_range(config.min_speed..=config.max_speed)
    } else {
        config.min_speed
    };
    direction * speed
}

/// Build the bundle and smoke trail for a launch.
pub fn projectile_entity(
    config: &ProjectileConfig,
    id: u32,
    velocity: Vec3,
    jitter: f32,
) -> (ProjectileBundle, SmokeTrail) {
    let smoke = &config.smoke;
    (
        ProjectileBundle::new(id, config.spawn_position, velocity, config),
        SmokeTrail::new(
            velocity,
            jitter,
            smoke.children,
            smoke.spacing,
            smoke.swirl_radius,
            smoke.render_scale,
        ),
    )
}

/// System that launches a lava bomb when the spawn timer elapses.
pub fn projectile_spawn_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    config: Res<FlightConfig>,
    mut spawner: ResMut<ProjectileSpawner>,
) {
    if !spawner.tick(dt.0) {
        return;
    }
    let (id, velocity, jitter) = spawner.next_launch();
    commands.spawn(projectile_entity(&config.projectile, id, velocity, jitter));
    log::debug!("launched projectile {} with velocity {:?}", id, velocity);
}

/// System that removes expired projectiles together with their smoke.
pub fn sweep_expired_system(mut commands: Commands, query: Query<(Entity, &Projectile)>) {
    for (entity, projectile) in query.iter() {
        if projectile.expired {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_velocities_in_cone() {
        let config = ProjectileConfig::default();
        let spawner = ProjectileSpawner::new(&config, 3);
        assert_eq!(spawner.velocities().len(), 100);

        let min_sin = 45f32.to_radians().sin();
        for v in spawner.velocities() {
            let speed = v.length();
            assert!((59.99..=300.01).contains(&speed), "speed {}", speed);
            assert!(v.y / speed >= min_sin - 1e-4);
            assert!(v.x >= 0.0 && v.z >= 0.0, "launch {:?} leaves the +X/+Z quadrant", v);
        }
    }

    #[test]
    fn test_spawner_is_seeded() {
        let config = ProjectileConfig::default();
        let a = ProjectileSpawner::new(&config, 11);
        let b = ProjectileSpawner::new(&config, 11);
        assert_eq!(a.velocities(), b.velocities());
    }

    #[test]
    fn test_velocity_pool_wraps() {
        let config = ProjectileConfig {
            velocity_pool_size: 3,
            ..ProjectileConfig::default()
        };
        let mut spawner = ProjectileSpawner::new(&config, 5);
        let pool = spawner.velocities().to_vec();
        let launched: Vec<Vec3> = (0..4).map(|_| spawner.next_launch().1).collect();
        assert_eq!(launched, vec![pool[0], pool[1], pool[2], pool[0]]);
    }

    #[test]
    fn test_spawn_timer() {
        let mut world = World::new();
        let config = FlightConfig::default();
        world.insert_resource(ProjectileSpawner::new(&config.projectile, 1));
        world.insert_resource(config);
        world.insert_resource(DeltaTime(1.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(projectile_spawn_system);

        let mut counts = Vec::new();
        for _ in 0..7 {
            schedule.run(&mut world);
            counts.push(world.query::<&Projectile>().iter(&world).count());
        }
        // First frame, then every three seconds.
        assert_eq!(counts, vec![1, 1, 1, 2, 2, 2, 3]);

        let mut query = world.query::<(&SmokeTrail, &Position)>();
        for (trail, pos) in query.iter(&world) {
            assert_eq!(trail.children.len(), 5);
            assert_eq!(pos.0, Vec3::new(-38500.0, 1000.0, -4000.0));
        }
    }

    #[test]
    fn test_sweep_removes_expired() {
        let mut world = World::new();
        let config = ProjectileConfig::default();
        let (mut bundle, trail) = projectile_entity(&config, 0, Vec3::Y, 0.0);
        bundle.projectile.expired = true;
        world.spawn((bundle, trail));
        world.spawn(projectile_entity(&config, 1, Vec3::Y, 0.0));

        let mut schedule = Schedule::default();
        schedule.add_systems(sweep_expired_system);
        schedule.run(&mut world);

        let ids: Vec<u32> = world.query::<&ProjectileId>().iter(&world).map(|id| id.0).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(world.query::<&SmokeTrail>().iter(&world).count(), 1);
    }
}
