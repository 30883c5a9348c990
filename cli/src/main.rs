//! Remoter demo - bridging scenarios end to end.
//!
//! Each scenario prints how its Deferred was settled:
//!
//! ```text
//! extrinsic  -> resolved from outside, observed by a then handler
//! intrinsic  -> resolved by its initializer
//! sleep      -> a timer task resolves a Deferred the main flow awaits
//! injection  -> a parallel flow injects the value the main flow waits on
//! ```
//!
//! Set `RUST_LOG=remoter_core=debug` to watch the state machine.

mod scenarios;

use std::io;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn line() {
    println!("{}", "-".repeat(80));
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::debug!("Starting Remoter demo");

    line();
    scenarios::resolve_extrinsically().await?;
    line();
    scenarios::resolve_intrinsically().await?;
    line();
    scenarios::sleep(100).await;
    scenarios::inject_from_parallel_flow(42).await?;
    line();

    println!("wait for a while...");
    scenarios::sleep(500).await;
    println!("... and halt");
    Ok(())
}
