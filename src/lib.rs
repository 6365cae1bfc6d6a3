//! Hotplug-aware host driver for a GS-USB CAN adapter
//!
//! This crate drives one candleLight/GS-USB compatible adapter
//! (VID 0x1D50, PID 0x606F) on channel 0. A [`Session`] tracks the adapter
//! across plug and unplug events, configures bit timing, identify LEDs and
//! loopback, and moves single CAN frames over the bulk endpoints.
//!
//! # Features
//!
//! - Hotplug tracking, including adapters plugged in before startup
//! - Fixed bitrate table from 10 kbit/s to 1 Mbit/s
//! - Hardware timestamps and loopback echo detection
//! - Injectable logging through the [`Logger`] trait
//!
//! # Example
//!
//! ```no_run
//! use gs_usb_host::{CanFrame, GsUsbError, Session};
//! use std::time::Duration;
//!
//! fn main() -> gs_usb_host::Result<()> {
//!     let session = Session::new()?;
//!     if !session.is_connected() {
//!         println!("No GS-USB device found");
//!         return Ok(());
//!     }
//!
//!     // Configure bitrate (250 kbps)
//!     session.set_bitrate(250_000)?;
//!     session.start_channel(false)?;
//!
//!     let frame = CanFrame::new(0x7FF, &[0x12, 0x34, 0x56, 0x78]);
//!     session.write_frame(&frame, Duration::from_millis(100))?;
//!
//!     loop {
//!         match session.read_frame(Duration::from_millis(100)) {
//!             Ok(frame) => println!("{}", frame),
//!             Err(GsUsbError::ReadTimeout) => continue,
//!             Err(e) => return Err(e),
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod hotplug;
pub mod logger;
pub mod session;
pub mod structures;
pub mod transfer;

#[cfg(test)]
mod mock;

pub use config::SessionConfig;
pub use constants::{
    CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_MAX_DLC, CAN_RTR_FLAG, CAN_SFF_MASK,
    GS_USB_ID_PRODUCT, GS_USB_ID_VENDOR,
};
pub use device::GsUsb;
pub use error::{GsUsbError, Result};
pub use frame::{CanFrame, HostFrame};
pub use hotplug::UsbDevice;
pub use logger::{LogFacade, Logger};
pub use session::{libusb_version, Session, UsbDeviceInfo};
pub use structures::{DeviceBitTiming, DeviceConfig, DeviceMode, HostConfig, SUPPORTED_BITRATES};
pub use transfer::{ControlData, Transport, UsbHandle};
