//! Public API for the simulation.
//!
//! `FlightWorld` owns the ECS world and the frame schedule and is the only
//! thing a renderer or input layer needs to talk to.
//!
//! ## Frame
//!
//! Each `step(dt)` runs every system exactly once, in a fixed order, on the
//! calling thread: kinematics, then collisions and terrain impacts, then the
//! terminal check, then projectile removal and spawning. Motion is scaled by
//! `dt`, so results do not depend on the frame rate. Once the flight has
//! ended, further steps leave the world untouched.

use crate::components::*;
use crate::config::FlightConfig;
use crate::systems::*;
use crate::terrain::{HeightField, TerrainError, TerrainResource, TerrainSnapshot};
use crate::world::FlightSnapshot;
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::Vec3;
use std::path::Path;
use std::time::Instant;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Building the scene
/// - Stepping the simulation forward
/// - Queueing player controls
/// - Extracting state snapshots
pub struct FlightWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Wall-clock time of the previous `advance` call.
    last_advance: Option<Instant>,
    next_aircraft_id: u32,
}

impl FlightWorld {
    /// Default scene over the default flat terrain.
    pub fn new() -> Self {
        Self::with_config(FlightConfig::default(), HeightField::default())
    }

    /// Scene described by `config` over `terrain`: the player plus one AI
    /// plane per configured spawn.
    pub fn with_config(config: FlightConfig, terrain: HeightField) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(0.0));
        world.insert_resource(PendingControls::default());
        world.insert_resource(FlightStatus::default());
        world.insert_resource(Camera::default());
        world.insert_resource(TintPalette::new(config.seed.wrapping_add(1)));
        world.insert_resource(ProjectileSpawner::new(&config.projectile, config.seed));

        log::info!(
            "flight world: {}x{} terrain, {} AI planes, seed {}",
            terrain.rows(),
            terrain.cols(),
            config.ai_plane.spawns.len(),
            config.seed
        );
        world.insert_resource(TerrainResource::new(terrain));

        world.spawn(PlayerBundle::new(&config.player));
        let mut next_aircraft_id = 1;
        for spawn in &config.ai_plane.spawns {
            world.spawn(AiPlaneBundle::new(next_aircraft_id, spawn, &config.ai_plane));
            next_aircraft_id += 1;
        }
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(
            (
                apply_controls_system,
                free_flight_system,
                circular_path_system,
                ballistic_system,
                smoke_trail_system,
                transform_system,
                camera_system,
                projectile_collision_system,
                aircraft_collision_system,
                terrain_impact_system,
                terminal_check_system,
                sweep_expired_system,
                projectile_spawn_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            last_advance: None,
            next_aircraft_id,
        }
    }

    /// Scene over terrain read from a DEM file.
    pub fn from_dem_file(
        path: impl AsRef<Path>,
        cell_scale: f32,
        config: FlightConfig,
    ) -> Result<Self, TerrainError> {
        let terrain = HeightField::load_dem_file(path, cell_scale)?;
        Ok(Self::with_config(config, terrain))
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Negative or non-finite `dt` counts as zero and long stalls are capped at
    /// `max_frame_dt`. Returns the flight status after the frame.
    pub fn step(&mut self, dt: f32) -> FlightStatus {
        let status = self.status();
        if status.is_terminal() {
            return status;
        }

        let max_dt = self
            .world
            .get_resource::<FlightConfig>()
            .map(|c| c.max_frame_dt)
            .unwrap_or(0.25);
        let dt = if dt.is_finite() && dt > 0.0 {
            dt.min(max_dt)
        } else {
            0.0
        };

        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
        self.status()
    }

    /// Step by the wall-clock time since the previous call (zero on the first).
    pub fn advance(&mut self) -> FlightStatus {
        let now = Instant::now();
        let dt = self
            .last_advance
            .map(|previous| now.duration_since(previous).as_secs_f32())
            .unwrap_or(0.0);
        self.last_advance = Some(now);
        self.step(dt)
    }

    /// Queue a player control for the next frame.
    pub fn queue_control(&mut self, control: Control) {
        if let Some(mut pending) = self.world.get_resource_mut::<PendingControls>() {
            pending.0.push(control);
        }
    }

    /// Switch between the cockpit and chase cameras.
    pub fn toggle_camera(&mut self) -> CameraMode {
        let pose = self.player_pose();
        let (offset, height) = self
            .world
            .get_resource::<FlightConfig>()
            .map(|c| (c.camera.follow_offset, c.camera.follow_height))
            .unwrap_or_default();

        let Some(mut camera) = self.world.get_resource_mut::<Camera>() else {
            return CameraMode::default();
        };
        camera.mode = camera.mode.toggled();
        if let Some((position, orientation)) = pose {
            camera.track(position, &orientation, offset, height);
        }
        camera.mode
    }

    /// Add an AI plane circling the world Y axis. Returns its aircraft id.
    pub fn spawn_ai_plane(&mut self, position: Vec3, clockwise: bool) -> u32 {
        let id = self.next_aircraft_id;
        self.next_aircraft_id += 1;

        let config = self
            .world
            .get_resource::<FlightConfig>()
            .map(|c| c.ai_plane.clone())
            .unwrap_or_default();
        let spawn = crate::config::AiPlaneSpawn {
            position,
            clockwise,
        };
        self.world.spawn(AiPlaneBundle::new(id, &spawn, &config));
        log::debug!("spawned AI plane {} at {:?}", id, position);
        id
    }

    /// Launch a lava bomb from `position` with `velocity`. Returns its id.
    pub fn spawn_projectile(&mut self, position: Vec3, velocity: Vec3) -> u32 {
        let mut config = self
            .world
            .get_resource::<FlightConfig>()
            .map(|c| c.projectile.clone())
            .unwrap_or_default();
        config.spawn_position = position;

        let (id, jitter) = match self.world.get_resource_mut::<ProjectileSpawner>() {
            Some(mut spawner) => spawner.allocate(),
            None => (0, 0.0),
        };
        self.world.spawn(projectile_entity(&config, id, velocity, jitter));
        id
    }

    pub fn status(&self) -> FlightStatus {
        self.world
            .get_resource::<FlightStatus>()
            .copied()
            .unwrap_or_default()
    }

    /// Position and heading of the player aircraft.
    pub fn player_pose(&mut self) -> Option<(Vec3, Orientation)> {
        let mut query = self
            .world
            .query_filtered::<(&Position, &Orientation), With<Player>>();
        query
            .iter(&self.world)
            .next()
            .map(|(pos, orientation)| (pos.0, *orientation))
    }

    /// Current player flight state (speed and angles).
    pub fn player_flight(&mut self) -> Option<FreeFlight> {
        let mut query = self.world.query_filtered::<&FreeFlight, With<Player>>();
        query.iter(&self.world).next().copied()
    }

    pub fn camera(&self) -> Camera {
        self.world.get_resource::<Camera>().copied().unwrap_or_default()
    }

    /// The terrain height field.
    pub fn terrain(&self) -> Option<&HeightField> {
        self.world
            .get_resource::<TerrainResource>()
            .map(|terrain| &terrain.field)
    }

    /// Terrain height under a world position `(x, _, z)`.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.terrain().map(|field| field.height_at(x, z))
    }

    /// Get a full terrain snapshot (for initial load or when terrain_dirty).
    pub fn terrain_snapshot(&self) -> Option<TerrainSnapshot> {
        self.world
            .get_resource::<TerrainResource>()
            .map(TerrainSnapshot::from_resource)
    }

    /// Get terrain snapshot as JSON.
    pub fn terrain_snapshot_json(&self) -> String {
        self.terrain_snapshot()
            .and_then(|snapshot| terrain_to_json_string(&snapshot).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    /// Get a snapshot of the current simulation state.
    ///
    /// Craters made since the previous snapshot are handed over once and the
    /// terrain dirty flag is cleared.
    pub fn snapshot(&mut self) -> FlightSnapshot {
        let mut snapshot = FlightSnapshot::from_world(&mut self.world, self.tick, self.time);

        if let Some(mut terrain) = self.world.get_resource_mut::<TerrainResource>() {
            snapshot.new_craters = terrain.take_craters();
            snapshot.terrain_dirty = terrain.dirty;
            terrain.dirty = false;
        }

        snapshot
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Number of lava bombs in flight (including ones landing this frame).
    pub fn projectile_count(&mut self) -> usize {
        let mut query = self.world.query::<&Projectile>();
        query.iter(&self.world).count()
    }

    /// Get the number of frames stepped.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for FlightWorld {
    fn default() -> Self {
        Self::new()
    }
}
