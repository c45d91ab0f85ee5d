//! Demonstration of the Volcano Flight simulation.
//!
//! Run with: RUST_LOG=debug cargo run --example flight_demo

use volcano_sim::{Control, FlightStatus, FlightWorld};

fn main() {
    env_logger::init();

    println!("=== Volcano Flight - Simulation Demo ===\n");

    let mut sim = FlightWorld::new();

    println!("Initial state:");
    print_snapshot(&mut sim);

    println!("\n--- Throttle up and climb ---\n");
    for _ in 0..4 {
        sim.queue_control(Control::IncreaseSpeed);
    }
    sim.queue_control(Control::PitchUp);

    // 30 seconds at 20 frames per second.
    println!("Running 600 frames at 50 ms...\n");
    for frame in 0..600 {
        if frame % 40 == 0 {
            sim.queue_control(Control::YawLeft);
        }
        let status = sim.step(0.05);

        if (frame + 1) % 100 == 0 {
            println!("--- Frame {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_snapshot(&mut sim);
        }
        if status != FlightStatus::Running {
            println!("\nFlight ended: {:?}", status);
            break;
        }
    }

    println!("\n--- Switching to the chase camera ---\n");
    println!("Camera mode: {:?}", sim.toggle_camera());

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("snapshot failed: {}", e),
    }
}

fn print_snapshot(sim: &mut FlightWorld) {
    let snapshot = sim.snapshot();

    if let Some(player) = &snapshot.player {
        println!(
            "  Player: pos=({:.0}, {:.0}, {:.0}) fwd=({:.2}, {:.2}, {:.2})",
            player.position.x,
            player.position.y,
            player.position.z,
            player.forward.x,
            player.forward.y,
            player.forward.z
        );
    }

    for plane in &snapshot.planes {
        println!(
            "  Plane {}: pos=({:.0}, {:.0}, {:.0})",
            plane.id, plane.position.x, plane.position.y, plane.position.z
        );
    }

    println!("  Lava bombs in flight: {}", snapshot.projectiles.len());
    for crater in &snapshot.new_craters {
        println!(
            "  New crater at ({:.0}, {:.0}), {} vertices raised",
            crater.x, crater.z, crater.raised
        );
    }
}
