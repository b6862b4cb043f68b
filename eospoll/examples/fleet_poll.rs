//! Poll a fleet of Arista EOS switches
//!
//! Reads a JSON list of targets and gathers default facts from all of them,
//! a few at a time.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example fleet_poll -- targets.json 8
//! ```
//!
//! `targets.json`:
//! ```json
//! [
//!   {"host": "leaf1", "username": "admin", "password": "secret"},
//!   {"host": "leaf2", "username": "admin", "private_key": "/home/admin/.ssh/id_ed25519"}
//! ]
//! ```

use std::env;

use eospoll::{DeviceTarget, FleetPoller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: fleet_poll <targets.json> [concurrency]");
        std::process::exit(1);
    };
    let concurrency = args.get(2).and_then(|c| c.parse().ok()).unwrap_or(4);

    let targets: Vec<DeviceTarget> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let poller = FleetPoller::new(&["!all"], concurrency)?;

    for outcome in poller.poll(&targets).await {
        match outcome.result {
            Ok(gathered) => {
                let interfaces = gathered
                    .facts
                    .get("interfaces")
                    .and_then(|i| i.as_object())
                    .map(|i| i.len())
                    .unwrap_or_default();
                println!("{}: {} interfaces", outcome.host, interfaces);
            }
            Err(e) => println!("{}: FAILED: {}", outcome.host, e),
        }
    }
    Ok(())
}
