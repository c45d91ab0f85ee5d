//! ECS Components for the flight simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.
//!
//! World space is y-up; the base forward axis of an unrotated aircraft is -Z.

use crate::config::{AiPlaneConfig, AiPlaneSpawn, PlayerConfig, ProjectileConfig};
use crate::math::{look_rotation, model_matrix, BASE_FORWARD, WORLD_UP};
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World-space position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        self.0.distance(other.0)
    }
}

/// World-space velocity (units per second).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Heading of an entity as a forward/up pair of unit vectors.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            forward: BASE_FORWARD,
            up: WORLD_UP,
        }
    }
}

impl Orientation {
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// Rotation matrix mapping local +Z onto `forward`.
    pub fn rotation(&self) -> Mat4 {
        look_rotation(self.forward, self.up)
    }
}

/// Bounding sphere used for every collision test.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionSphere {
    pub radius: f32,
}

/// Model matrix handed to the renderer, rebuilt every frame.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform(pub Mat4);

impl Default for ModelTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

impl ModelTransform {
    pub fn compose(position: Vec3, orientation: &Orientation, scale: f32) -> Self {
        Self(model_matrix(position, orientation.rotation(), scale))
    }
}

/// Uniform model scale.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderScale(pub f32);

impl Default for RenderScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// RGBA material colour.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint(pub [f32; 4]);

impl Tint {
    /// Freshly launched lava bomb.
    pub const LAVA: Tint = Tint([0.5, 0.3, 0.0, 1.0]);
    /// Lava bomb that collided with another.
    pub const HEATED: Tint = Tint([1.0, 0.0, 0.0, 1.0]);
    /// Lava bomb that hit the ground.
    pub const GROUNDED: Tint = Tint([0.2, 0.3, 0.7, 1.0]);
    pub const PLANE: Tint = Tint([0.1, 0.1, 0.5, 1.0]);
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for an aircraft (player or AI). Orders pair loops.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AircraftId(pub u32);

/// Unique identifier for a projectile. Orders pair loops.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProjectileId(pub u32);

// ============================================================================
// PLAYER
// ============================================================================

/// Marker for the player-controlled aircraft.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Free-flight state of the player aircraft. Angles in degrees.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeFlight {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub movement_speed: f32,
    /// Degrees per second.
    pub turn_speed: f32,
    /// Speed change per second.
    pub throttle_rate: f32,
    pub max_speed: f32,
}

impl FreeFlight {
    pub const PITCH_LIMIT: f32 = 89.0;

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            movement_speed: config.initial_speed.clamp(0.0, config.max_speed),
            turn_speed: config.turn_speed,
            throttle_rate: config.throttle_rate,
            max_speed: config.max_speed,
        }
    }

    /// Apply a rotation or throttle control for `dt` seconds.
    /// `Control::Forward` moves the aircraft and is handled by the caller.
    pub fn apply_control(&mut self, control: Control, dt: f32) {
        let turn = self.turn_speed * dt;
        let throttle = self.throttle_rate * dt;
        match control {
            Control::Forward => {}
            Control::YawLeft => self.yaw += turn,
            Control::YawRight => self.yaw -= turn,
            Control::PitchUp => self.pitch += turn,
            Control::PitchDown => self.pitch -= turn,
            Control::RollLeft => self.roll -= turn,
            Control::RollRight => self.roll += turn,
            Control::IncreaseSpeed => {
                self.movement_speed = (self.movement_speed + throttle).min(self.max_speed)
            }
            Control::DecreaseSpeed => {
                self.movement_speed = (self.movement_speed - throttle).max(0.0)
            }
        }
        self.pitch = self.pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }
}

/// Player input, queued between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Extra thrust step along the current heading.
    Forward,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
    IncreaseSpeed,
    DecreaseSpeed,
}

// ============================================================================
// AI PLANES
// ============================================================================

/// Marker for AI aircraft.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AiPlane;

/// Circular flight pattern around the world Y axis.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularPath {
    /// Radians, kept in `[0, 2π)`.
    pub angle: f32,
    pub radius: f32,
    /// Radians per second.
    pub angular_speed: f32,
    pub clockwise: bool,
}

// ============================================================================
// PROJECTILES
// ============================================================================

/// Ballistic lava bomb.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Vertical acceleration (negative pulls down).
    pub gravity: f32,
    pub mass: f32,
    /// Set once the bomb has landed; swept at the end of the frame.
    pub expired: bool,
}

impl Projectile {
    pub fn from_config(config: &ProjectileConfig) -> Self {
        Self {
            gravity: config.gravity,
            mass: config.mass,
            expired: false,
        }
    }

    /// Apply an instantaneous impulse.
    pub fn push(&self, velocity: &mut Velocity, impulse: Vec3) {
        if self.mass > 0.0 {
            velocity.0 += impulse / self.mass;
        }
    }
}

/// One puff of a smoke trail. Children have no collision of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SmokeParticle {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Smoke puffs trailing a projectile, owned by it and removed with it.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokeTrail {
    /// Launch direction the trail streams back along.
    pub direction: Vec3,
    /// Swirl angle offset in radians, drawn once at spawn.
    pub jitter: f32,
    pub spacing: f32,
    pub swirl_radius: f32,
    pub render_scale: f32,
    pub children: Vec<SmokeParticle>,
}

impl SmokeTrail {
    pub fn new(
        direction: Vec3,
        jitter: f32,
        count: usize,
        spacing: f32,
        swirl_radius: f32,
        render_scale: f32,
    ) -> Self {
        Self {
            direction,
            jitter,
            spacing,
            swirl_radius,
            render_scale,
            children: vec![SmokeParticle::default(); count],
        }
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning the player aircraft.
#[derive(Bundle)]
pub struct PlayerBundle {
    pub marker: Player,
    pub id: AircraftId,
    pub flight: FreeFlight,
    pub position: Position,
    pub orientation: Orientation,
    pub sphere: CollisionSphere,
    pub scale: RenderScale,
    pub transform: ModelTransform,
    pub tint: Tint,
}

impl PlayerBundle {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            marker: Player,
            id: AircraftId(0),
            flight: FreeFlight::from_config(config),
            position: Position(config.start_position),
            orientation: Orientation::default(),
            sphere: CollisionSphere {
                radius: config.collision_radius,
            },
            scale: RenderScale(config.render_scale),
            transform: ModelTransform::default(),
            tint: Tint::PLANE,
        }
    }
}

/// Bundle for spawning an AI aircraft on its circular path.
#[derive(Bundle)]
pub struct AiPlaneBundle {
    pub marker: AiPlane,
    pub id: AircraftId,
    pub path: CircularPath,
    pub position: Position,
    pub orientation: Orientation,
    pub sphere: CollisionSphere,
    pub scale: RenderScale,
    pub transform: ModelTransform,
    pub tint: Tint,
}

impl AiPlaneBundle {
    pub fn new(id: u32, spawn: &AiPlaneSpawn, config: &AiPlaneConfig) -> Self {
        Self {
            marker: AiPlane,
            id: AircraftId(id),
            path: CircularPath {
                angle: 0.0,
                radius: config.path_radius,
                angular_speed: config.angular_speed,
                clockwise: spawn.clockwise,
            },
            position: Position(spawn.position),
            orientation: Orientation::default(),
            sphere: CollisionSphere {
                radius: config.collision_radius,
            },
            scale: RenderScale(config.render_scale),
            transform: ModelTransform::default(),
            tint: Tint::PLANE,
        }
    }
}

/// Bundle for spawning a lava bomb. The smoke trail is added alongside.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub projectile: Projectile,
    pub id: ProjectileId,
    pub position: Position,
    pub velocity: Velocity,
    pub sphere: CollisionSphere,
    pub scale: RenderScale,
    pub transform: ModelTransform,
    pub tint: Tint,
}

impl ProjectileBundle {
    pub fn new(id: u32, position: Vec3, velocity: Vec3, config: &ProjectileConfig) -> Self {
        Self {
            projectile: Projectile::from_config(config),
            id: ProjectileId(id),
            position: Position(position),
            velocity: Velocity(velocity),
            sphere: CollisionSphere {
                radius: config.collision_radius,
            },
            scale: RenderScale(config.render_scale),
            transform: ModelTransform::default(),
            tint: Tint::LAVA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_is_clamped() {
        let mut flight = FreeFlight::from_config(&PlayerConfig::default());
        for _ in 0..20 {
            flight.apply_control(Control::IncreaseSpeed, 1.0);
        }
        assert_eq!(flight.movement_speed, 4500.0);
        for _ in 0..20 {
            flight.apply_control(Control::DecreaseSpeed, 1.0);
        }
        assert_eq!(flight.movement_speed, 0.0);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut flight = FreeFlight::from_config(&PlayerConfig::default());
        flight.apply_control(Control::PitchUp, 5.0);
        assert_eq!(flight.pitch, FreeFlight::PITCH_LIMIT);
        flight.apply_control(Control::PitchDown, 10.0);
        assert_eq!(flight.pitch, -FreeFlight::PITCH_LIMIT);
    }

    #[test]
    fn test_controls_scale_with_dt() {
        let mut flight = FreeFlight::from_config(&PlayerConfig::default());
        flight.apply_control(Control::YawLeft, 0.1);
        flight.apply_control(Control::RollRight, 0.5);
        assert!((flight.yaw - 10.0).abs() < 1e-4);
        assert!((flight.roll - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_push_divides_by_mass() {
        let projectile = Projectile {
            gravity: -19.81,
            mass: 2.0,
            expired: false,
        };
        let mut velocity = Velocity(Vec3::new(1.0, 0.0, 0.0));
        projectile.push(&mut velocity, Vec3::new(0.0, 30.0, 0.0));
        assert_eq!(velocity.0, Vec3::new(1.0, 15.0, 0.0));
    }
}
