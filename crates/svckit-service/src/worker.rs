//! The service body
//!
//! A placeholder that does "some work" once per interval. Replace
//! [`HeartbeatWorker::run_once`] with the real job.

use std::time::Instant;

use svckit_core::{Result, Worker, WorkerFactory};
use tracing::{debug, info};

/// Worker that records a tick per unit of work
#[derive(Debug)]
pub struct HeartbeatWorker {
    name: String,
    ticks: u64,
    started: Option<Instant>,
}

impl HeartbeatWorker {
    /// Create a worker for service `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticks: 0,
            started: None,
        }
    }

    /// Units of work performed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Worker for HeartbeatWorker {
    fn initialize(&mut self) -> Result<()> {
        self.started = Some(Instant::now());
        info!(service = %self.name, "Worker initialized");
        Ok(())
    }

    fn run_once(&mut self) -> Result<()> {
        self.ticks += 1;
        debug!(service = %self.name, tick = self.ticks, "Doing some work");
        Ok(())
    }

    fn finish(&mut self) {
        let uptime = self.started.map(|t| t.elapsed()).unwrap_or_default();
        info!(service = %self.name, ticks = self.ticks, ?uptime, "Worker finished");
    }
}

/// Factory producing a fresh [`HeartbeatWorker`] per start
pub fn heartbeat_factory(name: impl Into<String>) -> impl WorkerFactory {
    let name = name.into();
    move || -> Box<dyn Worker> { Box::new(HeartbeatWorker::new(name.clone())) }
}
