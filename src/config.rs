//! Session configuration

use std::time::Duration;

use crate::constants::{DEFAULT_CONTROL_TIMEOUT, DEFAULT_HOTPLUG_POLL_INTERVAL};

/// Tunables for a [`Session`](crate::Session)
///
/// The adapter identity, interface and endpoints are fixed by the protocol
/// and live in [`constants`](crate::constants); only timing is adjustable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    control_timeout: Duration,
    hotplug_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            hotplug_poll_interval: DEFAULT_HOTPLUG_POLL_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the default timeouts
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout applied to every control transfer
    pub fn control_timeout(&self) -> Duration {
        self.control_timeout
    }

    pub fn set_control_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.control_timeout = timeout;
        self
    }

    /// How long the monitor waits for USB events before checking for shutdown
    pub fn hotplug_poll_interval(&self) -> Duration {
        self.hotplug_poll_interval
    }

    pub fn set_hotplug_poll_interval(&mut self, interval: Duration) -> &mut Self {
        self.hotplug_poll_interval = interval;
        self
    }
}
