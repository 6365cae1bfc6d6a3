//! Adapter session
//!
//! A [`Session`] owns the libusb context, watches for the adapter coming and
//! going, and exposes the device operations of [`GsUsb`]. Dropping it stops a
//! running channel, shuts down the hotplug monitor, deregisters the hotplug
//! callback and finally releases the context.

use std::sync::Arc;
use std::time::Duration;

use rusb::{Context, DeviceHandle, Hotplug, HotplugBuilder, Registration, UsbContext};

use crate::config::SessionConfig;
use crate::constants::{GS_USB_ID_PRODUCT, GS_USB_ID_VENDOR};
use crate::device::GsUsb;
use crate::error::{GsUsbError, Result};
use crate::frame::CanFrame;
use crate::hotplug::{HotplugHandler, Monitor};
use crate::logger::{LogFacade, Logger};
use crate::structures::DeviceConfig;

/// Version of the linked libusb as `major.minor.micro.nano`
pub fn libusb_version() -> String {
    let version = rusb::version();
    format!(
        "{}.{}.{}.{}",
        version.major(),
        version.minor(),
        version.micro(),
        version.nano()
    )
}

/// Identity of an enumerated USB device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl std::fmt::Display for UsbDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {}, addr {})",
            self.vendor_id, self.product_id, self.bus, self.address
        )
    }
}

/// Host session for a single GS-USB adapter
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use gs_usb_host::{CanFrame, GsUsbError, Session};
///
/// let session = Session::new()?;
/// if !session.is_connected() {
///     println!("No adapter attached");
///     return Ok(());
/// }
///
/// session.set_bitrate(500_000)?;
/// session.start_channel(false)?;
/// session.write_frame(&CanFrame::new(0x123, &[1, 2, 3]), Duration::from_millis(100))?;
///
/// match session.read_frame(Duration::from_millis(100)) {
///     Ok(frame) => println!("{}", frame),
///     Err(GsUsbError::ReadTimeout) => {}
///     Err(e) => return Err(e),
/// }
/// # Ok::<(), GsUsbError>(())
/// ```
pub struct Session {
    device: Arc<GsUsb<DeviceHandle<Context>>>,
    monitor: Monitor,
    registration: Option<Registration<Context>>,
    logger: Arc<dyn Logger>,
    context: Context,
}

impl Session {
    /// Open a session with the default configuration, logging through `log`
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default(), Arc::new(LogFacade))
    }

    /// Open a session
    ///
    /// Fails only if the USB context or the monitor thread cannot be created.
    /// Not finding the adapter is not an error; check [`is_connected`].
    ///
    /// [`is_connected`]: Session::is_connected
    pub fn with_config(config: SessionConfig, logger: Arc<dyn Logger>) -> Result<Self> {
        let context = Context::new().map_err(GsUsbError::Context)?;
        let device = Arc::new(GsUsb::new(&config, Arc::clone(&logger)));

        let registration = if rusb::has_hotplug() {
            let callback: Box<dyn Hotplug<Context>> =
                Box::new(HotplugHandler::new(Arc::clone(&device)));
            match HotplugBuilder::new()
                .vendor_id(GS_USB_ID_VENDOR)
                .product_id(GS_USB_ID_PRODUCT)
                .register(&context, callback)
            {
                Ok(registration) => Some(registration),
                Err(e) => {
                    logger.error(format_args!("Failed to register hotplug callback: {}.", e));
                    None
                }
            }
        } else {
            logger.warn(format_args!(
                "Hotplug is not supported on this platform; only devices present at startup are used."
            ));
            None
        };

        let events = context.clone();
        let interval = config.hotplug_poll_interval();
        let monitor = Monitor::spawn(
            move || events.handle_events(Some(interval)),
            Arc::clone(&logger),
        )?;

        let session = Self {
            device,
            monitor,
            registration,
            logger,
            context,
        };
        session.check_for_connected_adapter();
        Ok(session)
    }

    /// Attach to an adapter that was plugged in before the session started
    ///
    /// Hotplug only reports future arrivals.
    fn check_for_connected_adapter(&self) {
        let devices = match self.context.devices() {
            Ok(devices) => devices,
            Err(e) => {
                self.logger
                    .warn(format_args!("Failed to enumerate USB devices: {}.", e));
                return;
            }
        };

        if !self.device.attach_present(devices.iter()) {
            self.logger
                .info(format_args!("No adapter present at startup."));
        }
    }

    /// List every USB device currently attached
    pub fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>> {
        let devices = self.context.devices()?;
        self.logger
            .info(format_args!("Found {} devices.", devices.len()));

        let mut found = Vec::new();
        for (i, device) in devices.iter().enumerate() {
            let desc = match device.device_descriptor() {
                Ok(desc) => desc,
                Err(_) => continue,
            };

            let info = UsbDeviceInfo {
                bus: device.bus_number(),
                address: device.address(),
                vendor_id: desc.vendor_id(),
                product_id: desc.product_id(),
            };
            self.logger.info(format_args!("Device {} : {}", i, info));
            found.push(info);
        }

        Ok(found)
    }

    /// Whether the adapter is currently attached and opened
    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Turn the identify LEDs on or off
    pub fn set_identify_leds(&self, enable: bool) -> Result<()> {
        self.device.set_identify_leds(enable)
    }

    /// Start the channel, optionally in loopback mode
    pub fn start_channel(&self, loopback: bool) -> Result<()> {
        self.device.start_channel(loopback)
    }

    /// Stop the channel
    pub fn stop_channel(&self) -> Result<()> {
        self.device.stop_channel()
    }

    /// Set the CAN bitrate
    pub fn set_bitrate(&self, bitrate: u32) -> Result<()> {
        self.device.set_bitrate(bitrate)
    }

    /// Query the adapter's configuration
    pub fn device_config(&self) -> Result<DeviceConfig> {
        self.device.device_config()
    }

    /// Send a CAN frame; a zero timeout blocks
    pub fn write_frame(&self, frame: &CanFrame, timeout: Duration) -> Result<()> {
        self.device.write_frame(frame, timeout)
    }

    /// Read a CAN frame; a zero timeout blocks
    pub fn read_frame(&self, timeout: Duration) -> Result<CanFrame> {
        self.device.read_frame(timeout)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("hotplug", &self.registration.is_some())
            .field("monitor_running", &self.monitor.is_running())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.device.shutdown();
        self.monitor.shutdown();
        self.registration.take();
    }
}
