//! GS-USB protocol structures
//!
//! This module contains the control-transfer payloads used for device
//! configuration: host format, channel mode, bit timing and the device
//! configuration reply. Multi-byte fields are in host byte order, which is
//! what the HOST_FORMAT handshake tells the device to expect.

use crate::constants::{
    GS_CAN_MODE_HW_TIMESTAMP, GS_CAN_MODE_LOOP_BACK, GS_CAN_MODE_RESET, GS_CAN_MODE_START,
    GS_USB_DEVICE_CONFIG_SIZE, GS_USB_HOST_FORMAT_MAGIC,
};
use crate::error::{GsUsbError, Result};

/// Bitrates accepted by [`DeviceBitTiming::from_bitrate`]
pub const SUPPORTED_BITRATES: [u32; 10] = [
    10_000, 20_000, 50_000, 83_333, 100_000, 125_000, 250_000, 500_000, 800_000, 1_000_000,
];

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Host format handshake payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Byte order magic
    pub byte_order: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            byte_order: GS_USB_HOST_FORMAT_MAGIC,
        }
    }
}

impl HostConfig {
    /// Pack into bytes for USB transfer
    pub fn pack(&self) -> [u8; 4] {
        self.byte_order.to_ne_bytes()
    }
}

/// Device mode configuration
///
/// Used to start or stop the CAN channel with specific mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMode {
    /// Mode value (0 = reset/stop, 1 = start)
    pub mode: u32,
    /// Mode flags (combination of GS_CAN_MODE_* constants)
    pub flags: u32,
}

impl DeviceMode {
    /// Create a new device mode configuration
    pub fn new(mode: u32, flags: u32) -> Self {
        Self { mode, flags }
    }

    /// Start the channel with hardware timestamps, optionally in loopback
    pub fn start(loopback: bool) -> Self {
        let mut flags = GS_CAN_MODE_HW_TIMESTAMP;
        if loopback {
            flags |= GS_CAN_MODE_LOOP_BACK;
        }
        Self::new(GS_CAN_MODE_START, flags)
    }

    /// Stop the channel
    pub fn stop() -> Self {
        Self::new(GS_CAN_MODE_RESET, 0)
    }

    /// Pack into bytes for USB transfer
    pub fn pack(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&self.mode.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.flags.to_ne_bytes());
        buf
    }
}

/// CAN bit timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBitTiming {
    /// Propagation segment
    pub prop_seg: u32,
    /// Phase segment 1
    pub phase_seg1: u32,
    /// Phase segment 2
    pub phase_seg2: u32,
    /// Synchronization jump width
    pub sjw: u32,
    /// Baud rate prescaler
    pub brp: u32,
}

impl DeviceBitTiming {
    /// Create a new bit timing configuration
    pub fn new(prop_seg: u32, phase_seg1: u32, phase_seg2: u32, sjw: u32, brp: u32) -> Self {
        Self {
            prop_seg,
            phase_seg1,
            phase_seg2,
            sjw,
            brp,
        }
    }

    /// Look up the timing for a bitrate
    ///
    /// Only the rates in [`SUPPORTED_BITRATES`] are accepted; anything else is
    /// rejected rather than approximated. 800 kbit/s uses a shorter phase
    /// segment 1 than the rest of the table, matching the adapter firmware.
    pub fn from_bitrate(bitrate: u32) -> Result<Self> {
        let prop_seg = 1;
        let sjw = 1;
        let phase_seg1 = 13 - prop_seg;
        let phase_seg2 = 2;

        let timing = match bitrate {
            10_000 => (phase_seg1, phase_seg2, 300),
            20_000 => (phase_seg1, phase_seg2, 150),
            50_000 => (phase_seg1, phase_seg2, 60),
            83_333 => (phase_seg1, phase_seg2, 36),
            100_000 => (phase_seg1, phase_seg2, 30),
            125_000 => (phase_seg1, phase_seg2, 24),
            250_000 => (phase_seg1, phase_seg2, 12),
            500_000 => (phase_seg1, phase_seg2, 6),
            800_000 => (12 - prop_seg, phase_seg2, 4),
            1_000_000 => (phase_seg1, phase_seg2, 3),
            _ => return Err(GsUsbError::UnsupportedBitrate { bitrate }),
        };

        let (phase_seg1, phase_seg2, brp) = timing;
        Ok(Self::new(prop_seg, phase_seg1, phase_seg2, sjw, brp))
    }

    /// Pack into bytes for USB transfer
    pub fn pack(&self) -> [u8; 20] {
        let mut buf = [0u8; 20];
        buf[0..4].copy_from_slice(&self.prop_seg.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.phase_seg1.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.phase_seg2.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.sjw.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.brp.to_ne_bytes());
        buf
    }
}

impl std::fmt::Display for DeviceBitTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prop Seg: {}\nPhase Seg 1: {}\nPhase Seg 2: {}\nSJW: {}\nBRP: {}",
            self.prop_seg, self.phase_seg1, self.phase_seg2, self.sjw, self.brp
        )
    }
}

/// Device configuration reply to DEVICE_CONFIG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Reserved byte 1
    pub reserved1: u8,
    /// Reserved byte 2
    pub reserved2: u8,
    /// Reserved byte 3
    pub reserved3: u8,
    /// Interface count (number of CAN channels - 1)
    pub icount: u8,
    /// Firmware version (multiply by 0.1 for actual version)
    pub sw_version: u32,
    /// Hardware version (multiply by 0.1 for actual version)
    pub hw_version: u32,
}

impl DeviceConfig {
    /// Unpack from bytes received via USB
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() != GS_USB_DEVICE_CONFIG_SIZE {
            return Err(GsUsbError::InvalidResponse {
                expected: GS_USB_DEVICE_CONFIG_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            reserved1: data[0],
            reserved2: data[1],
            reserved3: data[2],
            icount: data[3],
            sw_version: read_u32(data, 4),
            hw_version: read_u32(data, 8),
        })
    }

    /// Get the number of CAN channels
    pub fn channel_count(&self) -> u8 {
        self.icount.saturating_add(1)
    }
}

impl std::fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iCount: {}\nFW Version: {:.1}\nHW Version: {:.1}",
            self.icount,
            self.sw_version as f32 / 10.0,
            self.hw_version as f32 / 10.0
        )
    }
}
