//! Flight simulation configuration.
//!
//! `FlightConfig` is inserted into the world as a resource and read by the
//! frame systems. It round-trips through JSON so scenes can be tuned without
//! rebuilding; every field has a default and missing fields fall back to it.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration for a flight world.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Seed for the spawner and tint palette RNGs.
    pub seed: u64,
    /// Upper bound on a single frame's dt in seconds.
    pub max_frame_dt: f32,
    /// Altitude below which projectiles are clamped and expire.
    pub floor_altitude: f32,
    pub player: PlayerConfig,
    pub ai_plane: AiPlaneConfig,
    pub projectile: ProjectileConfig,
    pub crater: CraterConfig,
    pub camera: CameraConfig,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            max_frame_dt: 0.25,
            floor_altitude: 0.0,
            player: PlayerConfig::default(),
            ai_plane: AiPlaneConfig::default(),
            projectile: ProjectileConfig::default(),
            crater: CraterConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl FlightConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&data)?)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded flight config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("using default flight config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Player aircraft tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_position: Vec3,
    pub collision_radius: f32,
    pub render_scale: f32,
    /// Initial forward speed (units per second).
    pub initial_speed: f32,
    /// Degrees per second for yaw/pitch/roll controls.
    pub turn_speed: f32,
    /// Speed change per second of throttle input.
    pub throttle_rate: f32,
    pub max_speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_position: Vec3::new(0.0, 3000.0, 8000.0),
            collision_radius: 200.0,
            render_scale: 500.0,
            initial_speed: 0.0,
            turn_speed: 100.0,
            throttle_rate: 500.0,
            max_speed: 4500.0,
        }
    }
}

/// An AI plane placed in the default scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPlaneSpawn {
    pub position: Vec3,
    pub clockwise: bool,
}

/// AI plane tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiPlaneConfig {
    /// Radius of the circular flight path around the world Y axis.
    pub path_radius: f32,
    /// Radians per second.
    pub angular_speed: f32,
    pub collision_radius: f32,
    pub render_scale: f32,
    pub spawns: Vec<AiPlaneSpawn>,
}

impl Default for AiPlaneConfig {
    fn default() -> Self {
        Self {
            path_radius: 3000.0,
            angular_speed: 0.2,
            collision_radius: 344.0,
            render_scale: 500.0,
            spawns: vec![
                AiPlaneSpawn {
                    position: Vec3::new(0.0, 4000.0, 0.0),
                    clockwise: false,
                },
                AiPlaneSpawn {
                    position: Vec3::new(0.0, 5000.0, 0.0),
                    clockwise: true,
                },
            ],
        }
    }
}

/// Lava bomb tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub spawn_position: Vec3,
    /// Seconds between spawns.
    pub spawn_interval: f32,
    /// Number of pre-drawn launch velocities cycled by the spawner.
    pub velocity_pool_size: usize,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Minimum launch elevation above the horizon, in degrees.
    pub min_elevation: f32,
    pub gravity: f32,
    pub mass: f32,
    pub collision_radius: f32,
    pub render_scale: f32,
    /// Impulse magnitude applied to each projectile of a colliding pair.
    pub push_magnitude: f32,
    pub smoke: SmokeConfig,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            spawn_position: Vec3::new(-38500.0, 1000.0, -4000.0),
            spawn_interval: 3.0,
            velocity_pool_size: 100,
            min_speed: 60.0,
            max_speed: 300.0,
            min_elevation: 45.0,
            gravity: -19.81,
            mass: 1.0,
            collision_radius: 86.0,
            render_scale: 100.0,
            push_magnitude: 30.0,
            smoke: SmokeConfig::default(),
        }
    }
}

/// Smoke trail attached to each lava bomb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    pub children: usize,
    /// Distance between consecutive puffs along the trail.
    pub spacing: f32,
    /// Swirl radius of the first puff; puff `i` uses `swirl_radius * (i + 1)`.
    pub swirl_radius: f32,
    pub render_scale: f32,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            children: 5,
            spacing: 180.0,
            swirl_radius: 500.0,
            render_scale: 50.0,
        }
    }
}

/// Crater deformation applied on projectile impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraterConfig {
    pub radius: f32,
    pub force: f32,
}

impl Default for CraterConfig {
    fn default() -> Self {
        Self {
            radius: 110.0,
            force: 8.0,
        }
    }
}

/// Follow camera placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Subtracted from the player position.
    pub follow_offset: Vec3,
    /// Added to the camera altitude.
    pub follow_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_offset: Vec3::new(300.0, 0.0, 300.0),
            follow_height: 2000.0,
        }
    }
}
