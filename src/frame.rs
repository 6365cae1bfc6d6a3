//! CAN frame representations
//!
//! [`CanFrame`] is the adapter-neutral frame handed to and from callers.
//! [`HostFrame`] is the fixed 24-byte record the adapter exchanges on its bulk
//! endpoints. Conversion between the two is pure and never touches the bus.

use crate::constants::{
    CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_MAX_DLC, CAN_MAX_DLEN, CAN_RTR_FLAG,
    GS_USB_ECHO_ID, GS_USB_FRAME_SIZE_HW_TIMESTAMP, GS_USB_RX_ECHO_ID,
};
use crate::error::{GsUsbError, Result};

/// Adapter-neutral CAN frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanFrame {
    /// Message identifier, including any EFF/RTR/ERR flag bits
    pub id: u32,
    /// Data length code (0-8)
    pub dlc: u8,
    /// Frame data; only the first `dlc` bytes are meaningful
    pub data: [u8; CAN_MAX_DLEN],
    /// Device timestamp on receipt, in microseconds
    pub timestamp_us: u32,
    /// Error frame
    pub error_frame: bool,
    /// Remote transmission request
    pub rtr_frame: bool,
    /// Extended (29-bit) identifier
    pub eff_frame: bool,
    /// Loopback echo of a frame this host transmitted
    pub from_tx: bool,
}

impl CanFrame {
    /// Create a frame with the given identifier and data
    ///
    /// Data beyond 8 bytes is dropped.
    pub fn new(id: u32, data: &[u8]) -> Self {
        let len = data.len().min(CAN_MAX_DLEN);
        let mut frame = Self {
            id,
            dlc: len as u8,
            ..Self::default()
        };
        frame.data[..len].copy_from_slice(&data[..len]);
        frame
    }

    /// Get the arbitration ID (without flags)
    pub fn arbitration_id(&self) -> u32 {
        self.id & CAN_EFF_MASK
    }

    /// Get frame data as a slice
    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(CAN_MAX_DLC))]
    }
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.from_tx { "TX" } else { "RX" };
        let data_str = if self.rtr_frame {
            "remote request".to_string()
        } else {
            self.data()
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        };

        write!(
            f,
            "{} {:>8X}{}   [{}]  {}  @{} us",
            direction,
            self.arbitration_id(),
            if self.error_frame { " ERR" } else { "" },
            self.dlc,
            data_str,
            self.timestamp_us
        )
    }
}

/// GS-USB wire frame (classic CAN with hardware timestamp)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostFrame {
    /// Echo ID (0 on TX, 0xFFFFFFFF for frames received from the bus)
    pub echo_id: u32,
    /// CAN identifier with flag bits
    pub can_id: u32,
    /// Data length code
    pub can_dlc: u8,
    /// CAN channel
    pub channel: u8,
    /// Frame flags
    pub flags: u8,
    /// Reserved byte
    pub reserved: u8,
    /// Frame data
    pub data: [u8; CAN_MAX_DLEN],
    /// Hardware timestamp in microseconds
    pub timestamp_us: u32,
}

impl HostFrame {
    /// Size of the frame on the wire
    pub const SIZE: usize = GS_USB_FRAME_SIZE_HW_TIMESTAMP;

    /// Pack frame into bytes for transmission
    pub fn pack(&self) -> [u8; GS_USB_FRAME_SIZE_HW_TIMESTAMP] {
        let mut buf = [0u8; GS_USB_FRAME_SIZE_HW_TIMESTAMP];

        // Header: echo_id (4) + can_id (4) + can_dlc (1) + channel (1) + flags (1) + reserved (1)
        buf[0..4].copy_from_slice(&self.echo_id.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.can_id.to_ne_bytes());
        buf[8] = self.can_dlc;
        buf[9] = self.channel;
        buf[10] = self.flags;
        buf[11] = self.reserved;

        buf[12..20].copy_from_slice(&self.data);
        buf[20..24].copy_from_slice(&self.timestamp_us.to_ne_bytes());
        buf
    }

    /// Unpack a frame received from the device
    ///
    /// The buffer must hold exactly one frame; anything shorter or longer is
    /// rejected instead of being decoded partially.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(GsUsbError::InvalidResponse {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let word = |offset: usize| {
            u32::from_ne_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };

        let mut frame_data = [0u8; CAN_MAX_DLEN];
        frame_data.copy_from_slice(&data[12..20]);

        Ok(Self {
            echo_id: word(0),
            can_id: word(4),
            can_dlc: data[8],
            channel: data[9],
            flags: data[10],
            reserved: data[11],
            data: frame_data,
            timestamp_us: word(20),
        })
    }
}

impl From<&CanFrame> for HostFrame {
    fn from(frame: &CanFrame) -> Self {
        let dlc = frame.dlc.min(CAN_MAX_DLC);
        let len = usize::from(dlc);

        let mut wire = Self {
            echo_id: GS_USB_ECHO_ID,
            can_id: frame.id,
            can_dlc: dlc,
            ..Self::default()
        };
        wire.data[..len].copy_from_slice(&frame.data[..len]);
        wire
    }
}

impl From<&HostFrame> for CanFrame {
    fn from(wire: &HostFrame) -> Self {
        let dlc = wire.can_dlc.min(CAN_MAX_DLC);
        let len = usize::from(dlc);

        let mut frame = Self {
            id: wire.can_id,
            dlc,
            timestamp_us: wire.timestamp_us,
            error_frame: wire.can_id & CAN_ERR_FLAG != 0,
            rtr_frame: wire.can_id & CAN_RTR_FLAG != 0,
            eff_frame: wire.can_id & CAN_EFF_FLAG != 0,
            from_tx: wire.echo_id != GS_USB_RX_ECHO_ID,
            ..Self::default()
        };
        frame.data[..len].copy_from_slice(&wire.data[..len]);
        frame
    }
}
