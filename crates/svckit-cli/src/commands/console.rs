//! Console mode: run the service body in the foreground until Ctrl+C

use anyhow::{Context, Result};
use std::io;
use svckit_core::controller::run_console;
use svckit_core::{CancellationToken, Config, EventLog, LifecycleMachine, LifecycleOptions};
use svckit_platform::TracingEventLog;
use svckit_service::heartbeat_factory;
use tracing::info;

/// Start the worker, block until interrupted, then stop it
pub fn run(config: &Config) -> Result<()> {
    let interrupt = CancellationToken::new();
    let handler_token = interrupt.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        handler_token.cancel();
    })
    .context("Failed to set signal handler")?;

    run_until(config, &interrupt)
}

/// Console body with an externally supplied interrupt
pub fn run_until(config: &Config, interrupt: &CancellationToken) -> Result<()> {
    let name = config.service.name.clone();
    let options = LifecycleOptions::from(&config.lifecycle);
    let mut machine = LifecycleMachine::new(heartbeat_factory(name.clone()), options);

    let event_log = TracingEventLog;
    let source = config.event_source();
    let note = |text: &str| {
        if config.event_log.enabled {
            event_log.write_entry(&source, text);
        }
    };

    note("In OnStart");
    // Stdout is not locked here: the worker logs while we block.
    let result = run_console(&mut machine, interrupt, &name, io::stdout());
    note("In OnStop");

    result.with_context(|| format!("{name} stopped with an error"))
}
