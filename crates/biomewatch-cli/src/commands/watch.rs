//! Main watch mode command.

use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use biomewatch_core::{BiomeTable, DetectionConfig, Engine, ShutdownSignal, SystemProcessProvider};
use tracing::info;

use crate::console::format_event;

/// Track clients until Ctrl+C, printing every engine event
pub async fn run(config: DetectionConfig, json: bool) -> Result<()> {
    let shutdown = setup_shutdown_handler()?;
    let table = Arc::new(BiomeTable::builtin());

    let (mut engine, mut events) =
        Engine::new(config, SystemProcessProvider::new(), Arc::clone(&table));

    if !json {
        println!("biomewatch v{}", env!("CARGO_PKG_VERSION"));
        println!("Watching for game clients... (Ctrl+C to quit)");
    }

    // The engine loop blocks between cycles, so it gets its own thread
    let engine_shutdown = Arc::clone(&shutdown);
    let handle = thread::spawn(move || engine.run(&engine_shutdown));

    // Ends when the engine thread drops its sender
    while let Some(event) = events.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", format_event(&event, &table));
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("detection thread panicked"))?;

    info!("Watch stopped");
    if !json {
        println!("Shutdown complete.");
    }
    Ok(())
}

/// Setup graceful shutdown handler with Ctrl+C
fn setup_shutdown_handler() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());

    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        shutdown_ctrlc.trigger();
    })?;

    Ok(shutdown)
}
