//! Volcano Flight - Simulation Core
//!
//! A deterministic, frame-driven ECS simulation of a small flight-combat world:
//! a player aircraft, AI planes on circular paths, lava bombs trailing smoke,
//! and a height-field terrain that craters where the bombs land.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod math;
pub mod systems;
pub mod terrain;
pub mod world;

pub use api::FlightWorld;
pub use components::*;
pub use config::{ConfigError, FlightConfig};
pub use systems::*;
pub use terrain::{
    barycentric, CellTriangle, Crater, HeightField, MeshVertex, TerrainError, TerrainMesh,
    TerrainResource, TerrainSnapshot,
};
pub use world::{AircraftSnapshot, FlightSnapshot, ProjectileSnapshot};
