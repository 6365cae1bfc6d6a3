//! GS-USB device operations
//!
//! [`GsUsb`] holds the adapter's handle slot and implements everything the
//! host does with the adapter: attach/detach bookkeeping for hotplug events,
//! channel configuration, and frame transfer. It is generic over the handle
//! type; sessions use `rusb::DeviceHandle`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusb::{Context, DeviceHandle};

use crate::config::SessionConfig;
use crate::constants::{
    GS_USB_BREQ_BITTIMING, GS_USB_BREQ_DEVICE_CONFIG, GS_USB_BREQ_HOST_FORMAT,
    GS_USB_BREQ_IDENTIFY, GS_USB_BREQ_MODE, GS_USB_CONFIGURATION_INDEX,
    GS_USB_DEVICE_CONFIG_SIZE,
};
use crate::error::Result;
use crate::frame::{CanFrame, HostFrame};
use crate::hotplug::{find_adapter, UsbDevice};
use crate::logger::Logger;
use crate::structures::{DeviceBitTiming, DeviceConfig, DeviceMode, HostConfig};
use crate::transfer::{ControlData, Transport, UsbHandle};

/// GS-USB adapter on channel 0
///
/// At most one handle is held at a time. It is installed by [`attach`] and
/// released by [`detach`]; every operation that needs it fails with
/// [`GsUsbError::DeviceNotConnected`](crate::GsUsbError::DeviceNotConnected)
/// while it is absent.
///
/// [`attach`]: GsUsb::attach
/// [`detach`]: GsUsb::detach
pub struct GsUsb<H = DeviceHandle<Context>> {
    transport: Transport<H>,
    logger: Arc<dyn Logger>,
    /// Whether the channel was started and not stopped since
    running: AtomicBool,
}

impl<H: UsbHandle> GsUsb<H> {
    /// Create a detached device using the session's timeouts
    pub fn new(config: &SessionConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            transport: Transport::new(config.control_timeout(), Arc::clone(&logger)),
            logger,
            running: AtomicBool::new(false),
        }
    }

    /// Whether an adapter handle is currently held
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether the channel has been started and not stopped since
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle an adapter arrival
    ///
    /// Opens the device and claims its interface while holding the handle
    /// lock, replacing any previous handle. A failed claim is logged but the
    /// handle stays installed; later transfers report the problem. The host
    /// format handshake follows on a best-effort basis.
    pub fn attach<D>(&self, device: &D)
    where
        D: UsbDevice<Handle = H>,
    {
        let configurations = match device.num_configurations() {
            Ok(configurations) => configurations,
            Err(e) => {
                self.logger
                    .error(format_args!("Failed to get device descriptor: {}.", e));
                return;
            }
        };

        let expected = GS_USB_CONFIGURATION_INDEX + 1;
        if configurations < expected {
            self.logger.error(format_args!(
                "Expected at least {} configuration(s) but received only {}.",
                expected, configurations
            ));
            return;
        }

        {
            let mut slot = self.transport.lock();

            let handle = match device.open() {
                Ok(handle) => handle,
                Err(e) => {
                    self.logger
                        .error(format_args!("Failed to open device: {}.", e));
                    return;
                }
            };

            let handle = slot.insert(handle);
            if let Err(e) = handle.claim_interface(GS_USB_CONFIGURATION_INDEX) {
                self.logger
                    .error(format_args!("Failed to claim interface: {}.", e));
            }
        }

        if let Err(e) = self.send_host_format() {
            self.logger
                .warn(format_args!("Host format handshake failed: {}.", e));
        }
        self.logger.info(format_args!("Connected!"));
    }

    /// Attach to the first adapter among devices that are already present
    ///
    /// Hotplug only reports future arrivals, so this covers an adapter plugged
    /// in before the session started. Returns whether an adapter was found.
    pub fn attach_present<D>(&self, devices: impl IntoIterator<Item = D>) -> bool
    where
        D: UsbDevice<Handle = H>,
    {
        match find_adapter(devices) {
            Some(device) => {
                self.attach(&device);
                true
            }
            None => false,
        }
    }

    /// Handle an adapter departure by releasing the handle
    pub fn detach(&self) {
        *self.transport.lock() = None;
        self.logger.info(format_args!("Disconnected."));
    }

    /// Send HOST_FORMAT so the device learns the host byte order
    pub fn send_host_format(&self) -> Result<()> {
        self.control_out(GS_USB_BREQ_HOST_FORMAT, &HostConfig::default().pack())
    }

    /// Turn the identify LEDs on or off
    pub fn set_identify_leds(&self, enable: bool) -> Result<()> {
        self.control_out(GS_USB_BREQ_IDENTIFY, &u32::from(enable).to_ne_bytes())
    }

    /// Start the channel with hardware timestamps, optionally in loopback
    pub fn start_channel(&self, loopback: bool) -> Result<()> {
        self.control_out(GS_USB_BREQ_MODE, &DeviceMode::start(loopback).pack())?;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop the channel
    ///
    /// The channel keeps counting as running if the MODE request fails.
    pub fn stop_channel(&self) -> Result<()> {
        self.control_out(GS_USB_BREQ_MODE, &DeviceMode::stop().pack())?;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Stop a channel that was left running, ahead of session teardown
    ///
    /// Nothing is sent when the channel is not running. A failed stop is
    /// logged at debug level and otherwise ignored.
    pub fn shutdown(&self) {
        if !self.is_running() {
            return;
        }

        if let Err(e) = self.stop_channel() {
            self.logger
                .debug(format_args!("Stopping channel on teardown failed: {}.", e));
        }
    }

    /// Set the CAN bitrate
    ///
    /// Bitrates outside [`SUPPORTED_BITRATES`](crate::SUPPORTED_BITRATES) are
    /// rejected before anything is sent to the device.
    pub fn set_bitrate(&self, bitrate: u32) -> Result<()> {
        let timing = DeviceBitTiming::from_bitrate(bitrate).map_err(|e| {
            self.logger
                .warn(format_args!("Rejecting bitrate {}: not supported.", bitrate));
            e
        })?;

        self.control_out(GS_USB_BREQ_BITTIMING, &timing.pack())
    }

    /// Query the device configuration (channel count, versions)
    pub fn device_config(&self) -> Result<DeviceConfig> {
        let mut buf = [0u8; GS_USB_DEVICE_CONFIG_SIZE];
        let len = self.transport.control_transfer(
            GS_USB_BREQ_DEVICE_CONFIG,
            0,
            0,
            ControlData::In(&mut buf),
        )?;
        DeviceConfig::unpack(&buf[..len])
    }

    /// Send a CAN frame
    ///
    /// A zero timeout blocks until the device accepts the frame.
    pub fn write_frame(&self, frame: &CanFrame, timeout: Duration) -> Result<()> {
        let data = HostFrame::from(frame).pack();
        self.transport.bulk_out(&data, timeout)
    }

    /// Read a CAN frame
    ///
    /// Returns [`GsUsbError::ReadTimeout`](crate::GsUsbError::ReadTimeout) when
    /// nothing arrived in time. Anything other than a complete wire frame is
    /// rejected.
    pub fn read_frame(&self, timeout: Duration) -> Result<CanFrame> {
        let mut buf = [0u8; HostFrame::SIZE];
        let len = self.transport.bulk_in(&mut buf, timeout)?;
        let wire = HostFrame::unpack(&buf[..len])?;
        Ok(CanFrame::from(&wire))
    }

    fn control_out(&self, request: u8, data: &[u8]) -> Result<()> {
        self.transport
            .control_transfer(request, 0, 0, ControlData::Out(data))?;
        Ok(())
    }
}

impl<H> std::fmt::Debug for GsUsb<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsUsb")
            .field("transport", &self.transport)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}
