//! ECS Systems for the flight simulation.
//!
//! Systems contain the game logic that operates on components. The frame
//! schedule runs them in this order, one after another:
//!
//! **Kinematics**
//! - `apply_controls_system` - Drains queued player controls
//! - `free_flight_system` - Flies the player along its heading
//! - `circular_path_system` - Moves AI planes around their circles
//! - `ballistic_system` - Integrates lava bombs under gravity
//! - `smoke_trail_system` - Places smoke puffs behind each bomb
//! - `transform_system` - Rebuilds model matrices
//! - `camera_system` - Follows the player
//!
//! **Collision**
//! - `projectile_collision_system` - Bounces colliding bombs apart
//! - `aircraft_collision_system` - Recolours planes in mid-air contact
//! - `terrain_impact_system` - Craters the terrain under landed bombs
//! - `terminal_check_system` - Ends the flight on a fatal contact
//!
//! **Lifecycle**
//! - `sweep_expired_system` - Removes landed bombs
//! - `projectile_spawn_system` - Launches new bombs

pub mod camera;
pub mod collision;
pub mod movement;
pub mod serialization;
pub mod smoke;
pub mod spawner;
pub mod terminal;
pub mod terrain_impact;

pub use camera::*;
pub use collision::*;
pub use movement::*;
pub use serialization::*;
pub use smoke::*;
pub use spawner::*;
pub use terminal::*;
pub use terrain_impact::*;
