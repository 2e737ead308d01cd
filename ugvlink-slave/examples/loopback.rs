//! Exchange-rate check: a client session drives the simulated slave over an
//! in-memory link and reports round-trip timing.
//!
//! ```bash
//! cargo run --example loopback -p ugvlink-slave
//!
//! # Longer run
//! MOVES=20000 cargo run --example loopback -p ugvlink-slave --release
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Instant;

use ugvlink_client::{Session, SessionConfig, Setpoints, TelemetryKind};
use ugvlink_protocol::pipe;
use ugvlink_slave::{Slave, SlaveConfig};

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.replace('_', "").parse().ok())
        .unwrap_or(default)
}

fn main() {
    let num_moves = env_or("MOVES", 2_000);
    let num_queries = env_or("QUERIES", 500);

    println!("ugvlink loopback");
    println!("================");

    let (master_end, slave_end) = pipe();
    let stop = Arc::new(AtomicBool::new(false));
    let mut slave = Slave::new(slave_end, SlaveConfig::default());
    let vehicle = slave.state().clone();
    let slave_stop = stop.clone();
    let slave_thread = thread::spawn(move || slave.run(&slave_stop));

    let mut session = match Session::new(master_end, SessionConfig::default()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: failed to create session: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = session.handshake() {
        eprintln!("ERROR: handshake failed: {e}");
        std::process::exit(1);
    }

    // Phase 1: moves
    let start = Instant::now();
    let mut rejected = 0u64;
    for i in 0..num_moves {
        let speed = (i % 256) as u8;
        match session.move_wheels(Setpoints::new(speed, 255 - speed)) {
            Ok(ugvlink_client::MoveOutcome::Accepted) => {}
            Ok(_) => rejected += 1,
            Err(e) => {
                eprintln!("  move {i}: {e}");
                rejected += 1;
            }
        }
    }
    let elapsed = start.elapsed();
    println!(
        "Moves:   {num_moves} in {elapsed:.2?} ({:.0}/s), {rejected} not accepted",
        num_moves as f64 / elapsed.as_secs_f64()
    );

    // Phase 2: telemetry
    let start = Instant::now();
    let mut unavailable = 0u64;
    for i in 0..num_queries {
        let kind = TelemetryKind::ALL[i as usize % TelemetryKind::ALL.len()];
        match session.query(kind) {
            Ok(reading) if reading.as_u32().is_some() => {}
            _ => unavailable += 1,
        }
    }
    let elapsed = start.elapsed();
    println!(
        "Queries: {num_queries} in {elapsed:.2?} ({:.0}/s), {unavailable} unavailable",
        num_queries as f64 / elapsed.as_secs_f64()
    );

    println!("Stats:   {}", session.stats());
    if let Err(e) = session.shutdown() {
        eprintln!("  stop failed: {e}");
    }

    // Dropping the master end closes the link and ends the slave loop.
    match slave_thread.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => eprintln!("  slave failed: {e}"),
        Err(_) => eprintln!("  slave thread panicked"),
    }
    println!(
        "Vehicle: {} moves, stopped at {:?}",
        vehicle.move_count(),
        vehicle.setpoints()
    );
}
