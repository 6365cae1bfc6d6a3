//! Scripted USB doubles for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::Level;

use crate::constants::{GS_USB_ID_PRODUCT, GS_USB_ID_VENDOR};
use crate::hotplug::UsbDevice;
use crate::logger::Logger;
use crate::transfer::UsbHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ControlRecord {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

/// State shared by every handle opened from one mock device
#[derive(Default)]
pub(crate) struct MockBus {
    control_out: Mutex<Vec<ControlRecord>>,
    control_in_types: Mutex<Vec<u8>>,
    control_in: Mutex<VecDeque<rusb::Result<Vec<u8>>>>,
    control_out_result: Mutex<Option<rusb::Result<usize>>>,
    bulk_out: Mutex<Vec<Vec<u8>>>,
    bulk_in: Mutex<VecDeque<rusb::Result<Vec<u8>>>>,
    last_bulk_endpoint: Mutex<Option<u8>>,
    write_limit: Mutex<Option<usize>>,
    claim_error: Mutex<Option<rusb::Error>>,
    open_error: Mutex<Option<rusb::Error>>,
    transfers: AtomicUsize,
    opened: AtomicUsize,
    released: AtomicUsize,
    claimed: AtomicUsize,
}

impl MockBus {
    pub fn control_out(&self) -> Vec<ControlRecord> {
        self.control_out.lock().unwrap().clone()
    }

    pub fn control_in_request_types(&self) -> Vec<u8> {
        self.control_in_types.lock().unwrap().clone()
    }

    pub fn push_control_in(&self, reply: rusb::Result<Vec<u8>>) {
        self.control_in.lock().unwrap().push_back(reply);
    }

    pub fn set_control_out_result(&self, result: rusb::Result<usize>) {
        *self.control_out_result.lock().unwrap() = Some(result);
    }

    pub fn bulk_out(&self) -> Vec<Vec<u8>> {
        self.bulk_out.lock().unwrap().clone()
    }

    pub fn push_bulk_in(&self, reply: rusb::Result<Vec<u8>>) {
        self.bulk_in.lock().unwrap().push_back(reply);
    }

    pub fn last_bulk_endpoint(&self) -> Option<u8> {
        *self.last_bulk_endpoint.lock().unwrap()
    }

    pub fn set_write_limit(&self, limit: Option<usize>) {
        *self.write_limit.lock().unwrap() = limit;
    }

    pub fn set_claim_error(&self, error: Option<rusb::Error>) {
        *self.claim_error.lock().unwrap() = error;
    }

    pub fn set_open_error(&self, error: Option<rusb::Error>) {
        *self.open_error.lock().unwrap() = error;
    }

    /// Number of transfers that reached a handle
    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::SeqCst)
    }
}

/// Handle double; panics if it is dropped while a transfer is running on it
pub(crate) struct MockHandle {
    bus: Arc<MockBus>,
    busy: AtomicBool,
}

impl MockHandle {
    pub fn new(bus: Arc<MockBus>) -> Self {
        Self {
            bus,
            busy: AtomicBool::new(false),
        }
    }

    fn enter(&self) {
        assert!(!self.busy.swap(true, Ordering::SeqCst), "overlapping transfers");
        self.bus.transfers.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        assert!(
            !self.busy.load(Ordering::SeqCst),
            "handle released during a transfer"
        );
        self.bus.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl UsbHandle for MockHandle {
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.enter();
        self.bus.control_out.lock().unwrap().push(ControlRecord {
            request_type,
            request,
            value,
            index,
            data: buf.to_vec(),
        });
        let result = self
            .bus
            .control_out_result
            .lock()
            .unwrap()
            .unwrap_or(Ok(buf.len()));
        self.leave();
        result
    }

    fn read_control(
        &self,
        request_type: u8,
        _request: u8,
        _value: u16,
        _index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        self.enter();
        self.bus.control_in_types.lock().unwrap().push(request_type);
        let reply = self
            .bus
            .control_in
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(rusb::Error::Timeout));
        self.leave();

        let reply = reply?;
        let len = reply.len().min(buf.len());
        buf[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }

    fn write_bulk(&self, endpoint: u8, buf: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        self.enter();
        *self.bus.last_bulk_endpoint.lock().unwrap() = Some(endpoint);
        self.bus.bulk_out.lock().unwrap().push(buf.to_vec());
        let limit = *self.bus.write_limit.lock().unwrap();
        self.leave();
        Ok(limit.map_or(buf.len(), |limit| limit.min(buf.len())))
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
        self.enter();
        *self.bus.last_bulk_endpoint.lock().unwrap() = Some(endpoint);
        let reply = self
            .bus
            .bulk_in
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(rusb::Error::Timeout));
        self.leave();

        let reply = reply?;
        let len = reply.len().min(buf.len());
        buf[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }

    fn claim_interface(&mut self, _iface: u8) -> rusb::Result<()> {
        self.bus.claimed.fetch_add(1, Ordering::SeqCst);
        match *self.bus.claim_error.lock().unwrap() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Device double
pub(crate) struct MockDevice {
    pub bus: Arc<MockBus>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub configurations: u8,
}

impl MockDevice {
    /// A GS-USB adapter with one configuration
    pub fn adapter(bus: Arc<MockBus>) -> Self {
        Self {
            bus,
            vendor_id: GS_USB_ID_VENDOR,
            product_id: GS_USB_ID_PRODUCT,
            configurations: 1,
        }
    }
}

impl UsbDevice for MockDevice {
    type Handle = MockHandle;

    fn vendor_product(&self) -> rusb::Result<(u16, u16)> {
        Ok((self.vendor_id, self.product_id))
    }

    fn num_configurations(&self) -> rusb::Result<u8> {
        Ok(self.configurations)
    }

    fn open(&self) -> rusb::Result<MockHandle> {
        if let Some(e) = *self.bus.open_error.lock().unwrap() {
            return Err(e);
        }
        self.bus.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle::new(self.bus.clone()))
    }
}

/// Logger that keeps every record
#[derive(Default)]
pub(crate) struct RecordingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn count(&self, level: Level) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|(_, message)| message.contains(text))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, args: std::fmt::Arguments<'_>) {
        self.records.lock().unwrap().push((level, args.to_string()));
    }
}
