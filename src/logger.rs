//! Logging capability handed to the session
//!
//! The session never reaches for a global logger of its own; it holds an
//! `Arc<dyn Logger>`. [`LogFacade`] forwards to the `log` crate, so whatever
//! backend the application installed (for example `env_logger`) sees the
//! records.

use std::fmt;

use log::Level;

/// Target used for records emitted through [`LogFacade`]
pub const LOG_TARGET: &str = "gs_usb_host";

/// Sink for diagnostics emitted by the driver
pub trait Logger: Send + Sync {
    /// Emit one record
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Forwards records to the `log` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}", args);
    }
}
