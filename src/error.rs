//! Error types for the GS-USB host driver
//!
//! Everything below session construction is recoverable: callers get one of
//! these values back and decide whether to retry, poll for the device, or
//! give up.

use thiserror::Error;

/// Result type alias for GS-USB operations
pub type Result<T> = std::result::Result<T, GsUsbError>;

/// Error types for GS-USB operations
#[derive(Error, Debug)]
pub enum GsUsbError {
    /// The libusb context could not be created
    #[error("Failed to create USB context: {0}")]
    Context(rusb::Error),

    /// The hotplug monitor thread could not be started
    #[error("Failed to start hotplug monitor: {0}")]
    MonitorSpawn(#[from] std::io::Error),

    /// USB error from the rusb library
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// No adapter is attached, so there is no handle to use
    #[error("Invalid device handle: no adapter connected")]
    DeviceNotConnected,

    /// Control transfer failed
    #[error("Control transfer failed: {0}")]
    ControlTransfer(rusb::Error),

    /// Bulk transfer failed
    #[error("Bulk transfer failed: {0}")]
    BulkTransfer(rusb::Error),

    /// The device accepted fewer bytes than were offered
    #[error("Short transfer: expected {expected} bytes, transferred {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// Nothing arrived before the bulk read timeout expired
    #[error("Read timeout")]
    ReadTimeout,

    /// Bitrate is not in the supported timing table
    #[error("Unsupported bitrate {bitrate}")]
    UnsupportedBitrate { bitrate: u32 },

    /// Invalid response from device
    #[error("Invalid response from device: expected {expected} bytes, got {actual}")]
    InvalidResponse { expected: usize, actual: usize },
}

impl GsUsbError {
    /// Check if this error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            GsUsbError::ReadTimeout
                | GsUsbError::Usb(rusb::Error::Timeout)
                | GsUsbError::ControlTransfer(rusb::Error::Timeout)
                | GsUsbError::BulkTransfer(rusb::Error::Timeout)
        )
    }

    /// Check if this error is a USB error
    pub fn is_usb_error(&self) -> bool {
        matches!(
            self,
            GsUsbError::Context(_)
                | GsUsbError::Usb(_)
                | GsUsbError::ControlTransfer(_)
                | GsUsbError::BulkTransfer(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        assert!(GsUsbError::ReadTimeout.is_timeout());
        assert!(GsUsbError::BulkTransfer(rusb::Error::Timeout).is_timeout());
        assert!(!GsUsbError::BulkTransfer(rusb::Error::Pipe).is_timeout());
        assert!(!GsUsbError::DeviceNotConnected.is_timeout());
    }

    #[test]
    fn test_usb_error_classification() {
        assert!(GsUsbError::ControlTransfer(rusb::Error::NoDevice).is_usb_error());
        assert!(!GsUsbError::UnsupportedBitrate { bitrate: 1 }.is_usb_error());
        assert!(!GsUsbError::InvalidResponse {
            expected: 24,
            actual: 3
        }
        .is_usb_error());
    }
}
