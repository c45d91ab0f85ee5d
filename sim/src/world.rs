//! Snapshot types.
//!
//! `FlightSnapshot` is a serializable view of one frame, enough for a
//! renderer to draw the scene without touching the ECS world.

use crate::components::*;
use crate::systems::{Camera, FlightStatus};
use crate::terrain::Crater;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Snapshot of an aircraft (player or AI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSnapshot {
    pub id: u32,
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub tint: [f32; 4],
    pub transform: Mat4,
}

/// Snapshot of a lava bomb and its smoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub tint: [f32; 4],
    pub expired: bool,
    pub transform: Mat4,
    /// Smoke puff positions, nearest first.
    pub smoke: Vec<Vec3>,
    /// Uniform render scale of every smoke puff.
    pub smoke_scale: f32,
}

/// Complete frame snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSnapshot {
    /// Frames stepped so far.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub status: FlightStatus,
    pub player: Option<AircraftSnapshot>,
    pub planes: Vec<AircraftSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub camera: Camera,
    /// Craters made since the last snapshot.
    pub new_craters: Vec<Crater>,
    /// Whether the terrain mesh changed since the last snapshot.
    pub terrain_dirty: bool,
}

impl FlightSnapshot {
    /// Capture entities and frame resources. Crater and dirty bookkeeping is
    /// left to the caller.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut player_query = world.query_filtered::<(
            &AircraftId,
            &Position,
            &Orientation,
            &Tint,
            &ModelTransform,
        ), With<Player>>();
        let player = player_query
            .iter(world)
            .next()
            .map(|(id, pos, orientation, tint, transform)| {
                aircraft_snapshot(id, pos, orientation, tint, transform)
            });

        let mut plane_query = world.query_filtered::<(
            &AircraftId,
            &Position,
            &Orientation,
            &Tint,
            &ModelTransform,
        ), With<AiPlane>>();
        let mut planes: Vec<AircraftSnapshot> = plane_query
            .iter(world)
            .map(|(id, pos, orientation, tint, transform)| {
                aircraft_snapshot(id, pos, orientation, tint, transform)
            })
            .collect();
        planes.sort_by_key(|p| p.id);

        let mut projectile_query = world.query::<(
            &ProjectileId,
            &Projectile,
            &Position,
            &Velocity,
            &Tint,
            &ModelTransform,
            Option<&SmokeTrail>,
        )>();
        let mut projectiles: Vec<ProjectileSnapshot> = projectile_query
            .iter(world)
            .map(|(id, projectile, pos, vel, tint, transform, trail)| ProjectileSnapshot {
                id: id.0,
                position: pos.0,
                velocity: vel.0,
                tint: tint.0,
                expired: projectile.expired,
                transform: transform.0,
                smoke: trail
                    .map(|t| t.children.iter().map(|c| c.position).collect())
                    .unwrap_or_default(),
                smoke_scale: trail.map(|t| t.render_scale).unwrap_or_default(),
            })
            .collect();
        projectiles.sort_by_key(|p| p.id);

        Self {
            tick,
            time,
            status: world.get_resource::<FlightStatus>().copied().unwrap_or_default(),
            player,
            planes,
            projectiles,
            camera: world.get_resource::<Camera>().copied().unwrap_or_default(),
            new_craters: Vec::new(),
            terrain_dirty: false,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn aircraft_snapshot(
    id: &AircraftId,
    pos: &Position,
    orientation: &Orientation,
    tint: &Tint,
    transform: &ModelTransform,
) -> AircraftSnapshot {
    AircraftSnapshot {
        id: id.0,
        position: pos.0,
        forward: orientation.forward,
        up: orientation.up,
        tint: tint.0,
        transform: transform.0,
    }
}
