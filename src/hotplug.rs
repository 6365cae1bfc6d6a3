//! Hotplug plumbing
//!
//! Device references coming from libusb are seen through [`UsbDevice`], the
//! hotplug callback forwards arrivals and departures to the shared
//! [`GsUsb`], and [`Monitor`] runs the thread that services libusb events.

use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rusb::{DeviceHandle, Hotplug, UsbContext};

use crate::constants::{GS_USB_ID_PRODUCT, GS_USB_ID_VENDOR};
use crate::device::GsUsb;
use crate::error::Result;
use crate::logger::Logger;
use crate::transfer::UsbHandle;

/// Unopened USB device as reported by enumeration or a hotplug event
pub trait UsbDevice {
    type Handle: UsbHandle;

    fn vendor_product(&self) -> rusb::Result<(u16, u16)>;

    fn num_configurations(&self) -> rusb::Result<u8>;

    fn open(&self) -> rusb::Result<Self::Handle>;
}

impl<T: UsbContext> UsbDevice for rusb::Device<T> {
    type Handle = DeviceHandle<T>;

    fn vendor_product(&self) -> rusb::Result<(u16, u16)> {
        let desc = self.device_descriptor()?;
        Ok((desc.vendor_id(), desc.product_id()))
    }

    fn num_configurations(&self) -> rusb::Result<u8> {
        Ok(self.device_descriptor()?.num_configurations())
    }

    fn open(&self) -> rusb::Result<DeviceHandle<T>> {
        rusb::Device::open(self)
    }
}

/// Check if a USB device is the GS-USB adapter
pub fn is_adapter<D: UsbDevice>(device: &D) -> bool {
    matches!(
        device.vendor_product(),
        Ok((GS_USB_ID_VENDOR, GS_USB_ID_PRODUCT))
    )
}

/// First adapter among `devices`, if any
pub fn find_adapter<D: UsbDevice>(devices: impl IntoIterator<Item = D>) -> Option<D> {
    devices.into_iter().find(is_adapter)
}

/// Callback registered with libusb for the adapter's vendor/product pair
pub(crate) struct HotplugHandler<T: UsbContext> {
    device: Arc<GsUsb<DeviceHandle<T>>>,
}

impl<T: UsbContext> HotplugHandler<T> {
    pub(crate) fn new(device: Arc<GsUsb<DeviceHandle<T>>>) -> Self {
        Self { device }
    }
}

impl<T: UsbContext> Hotplug<T> for HotplugHandler<T> {
    fn device_arrived(&mut self, device: rusb::Device<T>) {
        self.device.attach(&device);
    }

    fn device_left(&mut self, _device: rusb::Device<T>) {
        self.device.detach();
    }
}

/// Background thread servicing USB events
///
/// Each pass blocks in `service_events` for a bounded time and then checks
/// the stop channel, so shutdown takes at most one poll interval.
pub(crate) struct Monitor {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Monitor {
    pub(crate) fn spawn<F>(mut service_events: F, logger: Arc<dyn Logger>) -> Result<Self>
    where
        F: FnMut() -> rusb::Result<()> + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("gs-usb-hotplug".into())
            .spawn(move || loop {
                if let Err(e) = service_events() {
                    logger.debug(format_args!("Servicing USB events failed: {}.", e));
                }

                match stopped.try_recv() {
                    Err(TryRecvError::Empty) => continue,
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// Signal the thread to stop and wait for it
    pub(crate) fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(false, |thread| !thread.is_finished())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
