//! Ping the hub and keep a request alive across reconnects.
//!
//! Demonstrates:
//! - Resolving the endpoint from `HUBPORT`
//! - Future-based and callback-based submission
//! - Requests surviving a hub restart
//!
//! Usage:
//!   cargo run --example ping
//!   cargo run --example ping -- --debug
//!   HUBPORT=4000 cargo run --example ping

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use hub_client::{Client, Endpoint, Result};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Hub Ping ===\n");

    let endpoint = Endpoint::from_env()?;
    println!("[Setup] Hub endpoint: {}", endpoint.ws_url());

    let client = Client::new(endpoint)?;

    // Callback requests only report success.
    client.fast_post("log", json!({"line": "ping demo started"}), |body| {
        println!("        ✓ log acknowledged: {body}");
    });

    println!("[Ping] Waiting for reply (start or restart the hub at any time)...");
    let mut reply = client.post("ping", ());
    let id = reply.id();

    loop {
        tokio::select! {
            result = &mut reply => {
                let body = result?;
                println!("        ✓ request {id} answered: {body}");
                break;
            }
            () = tokio::time::sleep(Duration::from_secs(5)) => {
                println!(
                    "        … still pending ({}), {} request(s) queued",
                    client.state(),
                    client.pending_count()
                );
            }
        }
    }

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug { "hub_client=debug" } else { "hub_client=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
