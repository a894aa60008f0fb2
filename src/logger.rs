//! Diagnostic sink for the rewrite middleware.
//!
//! Every slot is optional: the provided methods do nothing, so an
//! implementation overrides only the levels it cares about. The middleware
//! only ever calls [`Logger::error`], once, when a rewrite attempt fails.

use std::fmt;

use tracing::{debug, error, info};

pub trait Logger: Send + Sync + 'static {
    fn error(&self, _message: &dyn fmt::Display) {}
    fn info(&self, _message: &dyn fmt::Display) {}
    fn debug(&self, _message: &dyn fmt::Display) {}
}

/// Forwards to the `tracing` macros. The default logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &dyn fmt::Display) {
        error!("{message}");
    }

    fn info(&self, message: &dyn fmt::Display) {
        info!("{message}");
    }

    fn debug(&self, message: &dyn fmt::Display) {
        debug!("{message}");
    }
}

/// Drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Logger for Silent {}
