//! USB transfer layer
//!
//! [`Transport`] owns the adapter's device handle behind a single mutex and
//! moves bytes over the control and bulk endpoints. Every transfer holds the
//! lock for its whole duration, so a detach can never free the handle while a
//! transfer is using it, and transfers from different threads never
//! interleave on the handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusb::{DeviceHandle, Direction, Recipient, RequestType, UsbContext};

use crate::constants::{GS_USB_ENDPOINT_IN, GS_USB_ENDPOINT_OUT};
use crate::error::{GsUsbError, Result};
use crate::logger::Logger;

/// Open handle to a USB device
///
/// This is the slice of `rusb::DeviceHandle` the driver needs; it is a trait
/// so the transfer discipline can be exercised without hardware.
pub trait UsbHandle: Send {
    /// Host-to-device control transfer
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    /// Device-to-host control transfer
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    /// Write to a bulk OUT endpoint
    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize>;

    /// Read from a bulk IN endpoint
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;

    /// Claim an interface for exclusive use
    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()>;
}

impl<T: UsbContext> UsbHandle for DeviceHandle<T> {
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_control(self, request_type, request, value, index, buf, timeout)
    }

    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        DeviceHandle::write_bulk(self, endpoint, buf, timeout)
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        DeviceHandle::read_bulk(self, endpoint, buf, timeout)
    }

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, iface)
    }
}

/// Payload of a control transfer; the variant selects the direction
#[derive(Debug)]
pub enum ControlData<'a> {
    /// Host-to-device
    Out(&'a [u8]),
    /// Device-to-host
    In(&'a mut [u8]),
}

impl ControlData<'_> {
    /// bmRequestType for a vendor request addressed to the interface
    pub fn request_type(&self) -> u8 {
        let direction = match self {
            ControlData::Out(_) => Direction::Out,
            ControlData::In(_) => Direction::In,
        };
        rusb::request_type(direction, RequestType::Vendor, Recipient::Interface)
    }
}

/// The single-handle transfer layer
pub struct Transport<H> {
    handle: Mutex<Option<H>>,
    control_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl<H: UsbHandle> Transport<H> {
    /// Create a transport with no handle installed
    pub fn new(control_timeout: Duration, logger: Arc<dyn Logger>) -> Self {
        Self {
            handle: Mutex::new(None),
            control_timeout,
            logger,
        }
    }

    /// Whether a handle is currently held
    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Lock the handle slot
    ///
    /// The slot holds nothing but an `Option`, so a panic on another thread
    /// cannot leave it half-updated and poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<H>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_handle<R>(&self, transfer: impl FnOnce(&H) -> Result<R>) -> Result<R> {
        let guard = self.lock();
        match guard.as_ref() {
            Some(handle) => transfer(handle),
            None => {
                self.logger.error(format_args!("Invalid device handle."));
                Err(GsUsbError::DeviceNotConnected)
            }
        }
    }

    /// Issue a vendor control transfer to the interface
    ///
    /// Succeeds only when the device reports a non-zero byte count.
    pub fn control_transfer(
        &self,
        request: u8,
        value: u16,
        index: u16,
        data: ControlData<'_>,
    ) -> Result<usize> {
        let request_type = data.request_type();
        let timeout = self.control_timeout;
        let expected = match &data {
            ControlData::Out(buf) => buf.len(),
            ControlData::In(buf) => buf.len(),
        };

        self.with_handle(|handle| {
            let result = match data {
                ControlData::Out(buf) => {
                    handle.write_control(request_type, request, value, index, buf, timeout)
                }
                ControlData::In(buf) => {
                    handle.read_control(request_type, request, value, index, buf, timeout)
                }
            };

            match result {
                Ok(0) => {
                    self.logger.error(format_args!(
                        "Failed to transfer control (request = {}): no data transferred.",
                        request
                    ));
                    Err(GsUsbError::ShortTransfer {
                        expected,
                        actual: 0,
                    })
                }
                Ok(transferred) => Ok(transferred),
                Err(e) => {
                    self.logger.error(format_args!(
                        "Failed to transfer control (request = {}): {}.",
                        request, e
                    ));
                    Err(GsUsbError::ControlTransfer(e))
                }
            }
        })
    }

    /// Write `data` to the bulk OUT endpoint
    ///
    /// A short write is a failure.
    pub fn bulk_out(&self, data: &[u8], timeout: Duration) -> Result<()> {
        self.with_handle(|handle| {
            match handle.write_bulk(GS_USB_ENDPOINT_OUT, data, timeout) {
                Ok(written) if written == data.len() => Ok(()),
                Ok(written) => {
                    self.logger.error(format_args!(
                        "Short bulk write: {} of {} bytes.",
                        written,
                        data.len()
                    ));
                    Err(GsUsbError::ShortTransfer {
                        expected: data.len(),
                        actual: written,
                    })
                }
                Err(e) => {
                    self.logger
                        .error(format_args!("Failed to initiate transfer: {}.", e));
                    Err(GsUsbError::BulkTransfer(e))
                }
            }
        })
    }

    /// Read from the bulk IN endpoint into `buf`, returning the byte count
    ///
    /// A timeout means nothing was available and comes back as
    /// [`GsUsbError::ReadTimeout`] without being logged.
    pub fn bulk_in(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.with_handle(|handle| {
            match handle.read_bulk(GS_USB_ENDPOINT_IN, buf, timeout) {
                Ok(read) => Ok(read),
                Err(rusb::Error::Timeout) => Err(GsUsbError::ReadTimeout),
                Err(e) => {
                    self.logger
                        .error(format_args!("Failed to initiate transfer: {}.", e));
                    Err(GsUsbError::BulkTransfer(e))
                }
            }
        })
    }
}

impl<H> std::fmt::Debug for Transport<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("control_timeout", &self.control_timeout)
            .finish_non_exhaustive()
    }
}
