//! Camera system - cockpit or chase view of the player aircraft.

use crate::components::*;
use crate::config::FlightConfig;
use crate::math::WORLD_UP;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    /// Sits in the cockpit and looks where the player looks.
    #[default]
    Pilot,
    /// Trails behind and above the player.
    Follow,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::Pilot => CameraMode::Follow,
            CameraMode::Follow => CameraMode::Pilot,
        }
    }
}

/// Viewpoint handed to the renderer.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub mode: CameraMode,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: WORLD_UP,
            mode: CameraMode::Pilot,
        }
    }
}

impl Camera {
    /// Right-handed view matrix looking along `direction`.
    pub fn view_matrix(&self) -> Mat4 {
        let direction = self.direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        let up = if direction.cross(self.up).length_squared() > f32::EPSILON {
            self.up
        } else {
            Vec3::Z
        };
        Mat4::look_to_rh(self.position, direction, up)
    }

    /// Place the camera for `mode` relative to the player's pose.
    pub fn track(&mut self, position: Vec3, orientation: &Orientation, offset: Vec3, height: f32) {
        match self.mode {
            CameraMode::Pilot => {
                self.position = position;
                self.direction = orientation.forward;
                self.up = orientation.up;
            }
            CameraMode::Follow => {
                self.position = position - offset + Vec3::new(0.0, height, 0.0);
                self.direction = (position - self.position)
                    .try_normalize()
                    .unwrap_or(orientation.forward);
                self.up = WORLD_UP;
            }
        }
    }
}

/// System that keeps the camera on the player.
pub fn camera_system(
    config: Res<FlightConfig>,
    mut camera: ResMut<Camera>,
    player: Query<(&Position, &Orientation), With<Player>>,
) {
    if let Some((pos, orientation)) = player.iter().next() {
        camera.track(
            pos.0,
            orientation,
            config.camera.follow_offset,
            config.camera.follow_height,
        );
    }
}
