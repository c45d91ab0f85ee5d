//! Serialization utilities for simulation state.

use crate::terrain::TerrainSnapshot;

/// Serialize a terrain snapshot to a JSON string.
pub fn terrain_to_json_string(terrain: &TerrainSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(terrain)
}
