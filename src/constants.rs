//! GS-USB protocol constants
//!
//! This module contains the constants used when talking to a GS-USB adapter:
//! USB identifiers, endpoints, control request codes, mode flags and the
//! bit layout of the CAN identifier on the wire.

use std::time::Duration;

// ============================================================================
// USB Vendor/Product IDs
// ============================================================================

/// GS-USB vendor ID
pub const GS_USB_ID_VENDOR: u16 = 0x1D50;
/// GS-USB product ID
pub const GS_USB_ID_PRODUCT: u16 = 0x606F;

// ============================================================================
// USB Interface and Endpoints
// ============================================================================

/// Configuration/interface index the driver claims
pub const GS_USB_CONFIGURATION_INDEX: u8 = 0;

/// Bulk IN endpoint (device to host, index 1)
pub const GS_USB_ENDPOINT_IN: u8 = 0x81;
/// Bulk OUT endpoint (host to device, index 2)
pub const GS_USB_ENDPOINT_OUT: u8 = 0x02;

// ============================================================================
// GS-USB Control Request Codes
// ============================================================================

/// Set host byte order
pub const GS_USB_BREQ_HOST_FORMAT: u8 = 0;
/// Set bit timing
pub const GS_USB_BREQ_BITTIMING: u8 = 1;
/// Set/start mode
pub const GS_USB_BREQ_MODE: u8 = 2;
/// Get bus errors
pub const GS_USB_BREQ_BERR: u8 = 3;
/// Get bit timing constants
pub const GS_USB_BREQ_BT_CONST: u8 = 4;
/// Get device configuration
pub const GS_USB_BREQ_DEVICE_CONFIG: u8 = 5;
/// Get timestamp
pub const GS_USB_BREQ_TIMESTAMP: u8 = 6;
/// Identify device (blink LED)
pub const GS_USB_BREQ_IDENTIFY: u8 = 7;
/// Get user ID
pub const GS_USB_BREQ_GET_USER_ID: u8 = 8;
/// Set user ID
pub const GS_USB_BREQ_SET_USER_ID: u8 = 9;

// ============================================================================
// GS-USB Mode Values and Flags
// ============================================================================

/// Reset/stop mode
pub const GS_CAN_MODE_RESET: u32 = 0;
/// Start mode
pub const GS_CAN_MODE_START: u32 = 1;

/// Normal operation mode
pub const GS_CAN_MODE_NORMAL: u32 = 0;
/// Listen-only mode (no ACKs sent)
pub const GS_CAN_MODE_LISTEN_ONLY: u32 = 1 << 0;
/// Loopback mode (for testing)
pub const GS_CAN_MODE_LOOP_BACK: u32 = 1 << 1;
/// Triple sample mode
pub const GS_CAN_MODE_TRIPLE_SAMPLE: u32 = 1 << 2;
/// One-shot mode (no retransmission)
pub const GS_CAN_MODE_ONE_SHOT: u32 = 1 << 3;
/// Hardware timestamp mode
pub const GS_CAN_MODE_HW_TIMESTAMP: u32 = 1 << 4;
/// Pad packets to max packet size
pub const GS_CAN_MODE_PAD_PKTS_TO_MAX_PKT_SIZE: u32 = 1 << 7;

/// Magic the host sends with HOST_FORMAT so the device can infer byte order
pub const GS_USB_HOST_FORMAT_MAGIC: u32 = 0x0000_BEEF;

// ============================================================================
// CAN ID Flags (in CAN frame identifier)
// ============================================================================

/// Extended frame format flag (29-bit ID)
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Remote transmission request flag
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;
/// Error message frame flag
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;

/// Standard frame format mask (11-bit ID)
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
/// Extended frame format mask (29-bit ID)
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// Maximum DLC for classic CAN
pub const CAN_MAX_DLC: u8 = 8;
/// Maximum data length for classic CAN
pub const CAN_MAX_DLEN: usize = 8;

// ============================================================================
// GS-USB Frame Constants
// ============================================================================

/// Echo ID written on transmit; the device fills in its own
pub const GS_USB_ECHO_ID: u32 = 0;
/// Echo ID of frames received from the bus (not a loopback echo)
pub const GS_USB_RX_ECHO_ID: u32 = 0xFFFF_FFFF;

/// Classic CAN frame size with hardware timestamp
pub const GS_USB_FRAME_SIZE_HW_TIMESTAMP: usize = 24;

/// Size of the DEVICE_CONFIG reply
pub const GS_USB_DEVICE_CONFIG_SIZE: usize = 12;

// ============================================================================
// Timing
// ============================================================================

/// Default timeout for control transfers
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_millis(100);
/// Default bounded wait of the hotplug monitor between shutdown checks
pub const DEFAULT_HOTPLUG_POLL_INTERVAL: Duration = Duration::from_millis(100);
