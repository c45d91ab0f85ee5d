//! Terrain impact system - lava bombs hitting the ground leave craters.

use crate::components::*;
use crate::config::FlightConfig;
use crate::systems::terminal::touches_terrain;
use crate::terrain::TerrainResource;
use bevy_ecs::prelude::*;
use glam::Vec3;

/// System that deforms the terrain under every projectile touching it.
///
/// Projectiles are handled in id order so later impacts in the same frame
/// read the heights left by earlier ones. Bombs clamped to the floor earlier
/// in the frame are still checked here; the sweep removes them afterwards.
/// Normals are rebuilt once at the end of the pass if anything moved.
pub fn terrain_impact_system(
    config: Res<FlightConfig>,
    mut terrain: ResMut<TerrainResource>,
    mut query: Query<(
        Entity,
        &ProjectileId,
        &mut Projectile,
        &Position,
        &CollisionSphere,
        &mut Tint,
    )>,
) {
    let mut order: Vec<(ProjectileId, Entity)> =
        query.iter().map(|(entity, id, ..)| (*id, entity)).collect();
    order.sort();

    let mut raised = 0;
    for (id, entity) in order {
        let Ok((_, _, mut projectile, pos, sphere, mut tint)) = query.get_mut(entity) else {
            continue;
        };
        if !touches_terrain(&terrain, pos.0, sphere.radius) {
            continue;
        }

        let height = terrain.height_under(pos.0);
        let impact = Vec3::new(pos.0.x, height, pos.0.z);
        let moved = terrain.apply_crater(impact, config.crater.radius, config.crater.force);
        log::debug!("projectile {} hit terrain at {:?}, raised {} vertices", id.0, impact, moved);

        raised += moved;
        *tint = Tint::GROUNDED;
        projectile.expired = true;
    }

    if raised > 0 {
        terrain.field.compute_normals();
    }
}
