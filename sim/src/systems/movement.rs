//! Movement systems - player controls, free-flight, circular paths and
//! ballistic projectiles, plus the per-frame model transform rebuild.

use crate::components::*;
use crate::config::FlightConfig;
use crate::math::{rotate_about, BASE_FORWARD, WORLD_UP};
use bevy_ecs::prelude::*;
use glam::Vec3;
use std::f32::consts::TAU;

/// Resource containing the delta time for the current frame.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Controls queued since the last frame, drained before integration.
#[derive(Resource, Debug, Default)]
pub struct PendingControls(pub Vec<Control>);

/// Heading basis for a yaw/pitch/roll triple (degrees).
///
/// Yaw turns the base forward axis about world up, pitch tilts it about the
/// resulting right axis, and roll spins the up axis about the final forward.
pub fn free_flight_basis(yaw: f32, pitch: f32, roll: f32) -> Orientation {
    let pitch = pitch.clamp(-FreeFlight::PITCH_LIMIT, FreeFlight::PITCH_LIMIT);

    let level = rotate_about(BASE_FORWARD, WORLD_UP, yaw);
    let right = level.cross(WORLD_UP).normalize_or_zero();
    let forward = rotate_about(level, right, pitch).normalize_or_zero();
    let up = right.cross(forward).normalize_or_zero();
    let up = rotate_about(up, forward, roll);

    Orientation { forward, up }
}

/// One step of constant-gravity motion. Returns the new position and velocity.
pub fn integrate_ballistic(position: Vec3, velocity: Vec3, gravity: f32, dt: f32) -> (Vec3, Vec3) {
    let position = position + velocity * dt + Vec3::new(0.0, 0.5 * gravity * dt * dt, 0.0);
    let velocity = Vec3::new(velocity.x, velocity.y + gravity * dt, velocity.z);
    (position, velocity)
}

/// Advance a circular path by `dt` and return the new position. Altitude is
/// carried over from `position`.
pub fn advance_circular(path: &mut CircularPath, position: Vec3, dt: f32) -> Vec3 {
    let sign = if path.clockwise { -1.0 } else { 1.0 };
    path.angle = (path.angle + sign * path.angular_speed * dt).rem_euclid(TAU);
    // rem_euclid can round up to TAU itself for tiny negative inputs.
    if path.angle >= TAU {
        path.angle = 0.0;
    }
    Vec3::new(
        path.radius * path.angle.cos(),
        position.y,
        path.radius * path.angle.sin(),
    )
}

/// System that drains queued controls into the player's flight state.
pub fn apply_controls_system(
    dt: Res<DeltaTime>,
    mut pending: ResMut<PendingControls>,
    mut query: Query<(&mut FreeFlight, &mut Position), With<Player>>,
) {
    let delta = dt.0;
    let controls = std::mem::take(&mut pending.0);
    for (mut flight, mut pos) in query.iter_mut() {
        for &control in &controls {
            if control == Control::Forward {
                let basis = free_flight_basis(flight.yaw, flight.pitch, flight.roll);
                pos.0 += basis.forward * flight.movement_speed * delta;
            } else {
                flight.apply_control(control, delta);
            }
        }
    }
}

/// System that flies the player along its heading.
pub fn free_flight_system(
    dt: Res<DeltaTime>,
    mut query: Query<(&mut FreeFlight, &mut Position, &mut Orientation), With<Player>>,
) {
    let delta = dt.0;
    for (mut flight, mut pos, mut orientation) in query.iter_mut() {
        flight.pitch = flight
            .pitch
            .clamp(-FreeFlight::PITCH_LIMIT, FreeFlight::PITCH_LIMIT);
        *orientation = free_flight_basis(flight.yaw, flight.pitch, flight.roll);
        pos.0 += orientation.forward * flight.movement_speed * delta;
    }
}

/// System that moves AI planes around their circular paths.
pub fn circular_path_system(
    dt: Res<DeltaTime>,
    mut query: Query<(&mut CircularPath, &mut Position, &mut Orientation), With<AiPlane>>,
) {
    let delta = dt.0;
    for (mut path, mut pos, mut orientation) in query.iter_mut() {
        let next = advance_circular(&mut path, pos.0, delta);
        // A zero step keeps last frame's heading.
        if let Some(direction) = (next - pos.0).try_normalize() {
            orientation.forward = direction;
            orientation.up = WORLD_UP;
        }
        pos.0 = next;
    }
}

/// System that integrates projectiles under gravity.
pub fn ballistic_system(
    dt: Res<DeltaTime>,
    config: Res<FlightConfig>,
    mut query: Query<(&mut Projectile, &mut Position, &mut Velocity)>,
) {
    let delta = dt.0;
    let floor = config.floor_altitude;
    for (mut projectile, mut pos, mut vel) in query.iter_mut() {
        if projectile.expired {
            continue;
        }
        let (position, velocity) = integrate_ballistic(pos.0, vel.0, projectile.gravity, delta);
        pos.0 = position;
        vel.0 = velocity;

        if pos.0.y <= floor {
            pos.0.y = floor;
            vel.0.y = 0.0;
            projectile.expired = true;
        }
    }
}

/// System that rebuilds every model matrix from position, heading and scale.
pub fn transform_system(
    mut query: Query<(&Position, Option<&Orientation>, &RenderScale, &mut ModelTransform)>,
) {
    for (pos, orientation, scale, mut transform) in query.iter_mut() {
        let orientation = orientation.copied().unwrap_or_default();
        *transform = ModelTransform::compose(pos.0, &orientation, scale.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiPlaneConfig, PlayerConfig, ProjectileConfig};

    fn approx(a: Vec3, b: Vec3, tolerance: f32) -> bool {
        (a - b).length() < tolerance
    }

    fn run<M>(world: &mut World, systems: impl IntoSystemConfigs<M>) {
        let mut schedule = Schedule::default();
        schedule.add_systems(systems);
        schedule.run(world);
    }

    #[test]
    fn test_ballistic_fall_one_second() {
        let (pos, vel) = integrate_ballistic(
            Vec3::new(0.0, 1000.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            -19.81,
            1.0,
        );
        assert!((pos.y - 1000.095).abs() < 1e-3, "y = {}", pos.y);
        assert!((vel.y + 9.81).abs() < 1e-4);
    }

    #[test]
    fn test_ballistic_frame_rate_independent() {
        let start = Vec3::new(-100.0, 1000.0, 50.0);
        let velocity = Vec3::new(120.0, 200.0, -80.0);
        let (once_p, once_v) = integrate_ballistic(start, velocity, -19.81, 0.5);
        let (half_p, half_v) = integrate_ballistic(start, velocity, -19.81, 0.25);
        let (twice_p, twice_v) = integrate_ballistic(half_p, half_v, -19.81, 0.25);
        assert!(approx(once_p, twice_p, 1e-3));
        assert!(approx(once_v, twice_v, 1e-4));
    }

    #[test]
    fn test_circular_frame_rate_independent() {
        let mut once = CircularPath {
            angle: 0.0,
            radius: 3000.0,
            angular_speed: 0.2,
            clockwise: true,
        };
        let mut twice = once;
        let start = Vec3::new(0.0, 4000.0, 0.0);

        let a = advance_circular(&mut once, start, 0.4);
        let mid = advance_circular(&mut twice, start, 0.2);
        let b = advance_circular(&mut twice, mid, 0.2);
        assert!(approx(a, b, 1e-2));
        assert!((once.angle - twice.angle).abs() < 1e-5);
        assert!((0.0..TAU).contains(&once.angle));
    }

    #[test]
    fn test_free_flight_basis_signs() {
        let level = free_flight_basis(0.0, 0.0, 0.0);
        assert!(approx(level.forward, Vec3::NEG_Z, 1e-5));
        assert!(approx(level.up, Vec3::Y, 1e-5));

        let yawed = free_flight_basis(90.0, 0.0, 0.0);
        assert!(approx(yawed.forward, Vec3::NEG_X, 1e-5));

        let pitched = free_flight_basis(0.0, 30.0, 0.0);
        assert!(pitched.forward.y > 0.0);
        assert!(pitched.forward.dot(pitched.up).abs() < 1e-5);

        let rolled = free_flight_basis(0.0, 0.0, 90.0);
        assert!(approx(rolled.up, Vec3::X, 1e-5));
        assert!(approx(rolled.forward, Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_free_flight_moves_along_heading() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.5));
        let config = PlayerConfig {
            initial_speed: 1000.0,
            ..PlayerConfig::default()
        };
        world.spawn(PlayerBundle::new(&config));

        run(&mut world, free_flight_system);

        let mut query = world.query::<&Position>();
        let pos = query.single(&world);
        assert!(approx(pos.0, config.start_position + Vec3::new(0.0, 0.0, -500.0), 1e-2));
    }

    #[test]
    fn test_controls_drained_before_flight() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(PendingControls(vec![
            Control::IncreaseSpeed,
            Control::YawLeft,
            Control::Forward,
        ]));
        world.spawn(PlayerBundle::new(&PlayerConfig::default()));

        run(&mut world, (apply_controls_system, free_flight_system).chain());

        assert!(world.resource::<PendingControls>().0.is_empty());
        let mut query = world.query::<(&FreeFlight, &Orientation)>();
        let (flight, orientation) = query.single(&world);
        assert_eq!(flight.movement_speed, 500.0);
        assert!((flight.yaw - 100.0).abs() < 1e-4);
        assert!(orientation.forward.x < 0.0);
    }

    #[test]
    fn test_circular_path_system_orients_planes() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        let config = AiPlaneConfig::default();
        world.spawn(AiPlaneBundle::new(1, &config.spawns[0], &config));

        run(&mut world, circular_path_system);

        let mut query = world.query::<(&Position, &Orientation, &CircularPath)>();
        let (pos, orientation, path) = query.single(&world);
        assert!((path.angle - 0.02).abs() < 1e-6);
        assert!((pos.0.y - 4000.0).abs() < 1e-3);
        assert!((pos.0.x.hypot(pos.0.z) - 3000.0).abs() < 1e-1);
        assert!((orientation.forward.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_projectile_expires_at_floor() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(FlightConfig::default());
        let config = ProjectileConfig::default();
        let entity = world
            .spawn(ProjectileBundle::new(
                0,
                Vec3::new(0.0, 5.0, 0.0),
                Vec3::new(10.0, -50.0, 0.0),
                &config,
            ))
            .id();

        run(&mut world, ballistic_system);

        let projectile = world.get::<Projectile>(entity).unwrap();
        let pos = world.get::<Position>(entity).unwrap();
        let vel = world.get::<Velocity>(entity).unwrap();
        assert!(projectile.expired);
        assert_eq!(pos.0.y, 0.0);
        assert_eq!(vel.0.y, 0.0);
        assert_eq!(vel.0.x, 10.0);
    }

    #[test]
    fn test_transform_system_composes_trs() {
        let mut world = World::new();
        let entity = world
            .spawn((
                Position::new(1.0, 2.0, 3.0),
                RenderScale(2.0),
                ModelTransform::default(),
            ))
            .id();

        run(&mut world, transform_system);

        let transform = world.get::<ModelTransform>(entity).unwrap();
        assert!(approx(transform.0.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0), 1e-6));
        // Default heading maps local +Z onto -Z.
        let z = transform.0.transform_vector3(Vec3::Z);
        assert!(approx(z, Vec3::new(0.0, 0.0, -2.0), 1e-5));
    }
}
