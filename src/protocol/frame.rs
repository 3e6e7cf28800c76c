//! # Cortex Frame Constants and Types
//!
//! Wire layout of one frame:
//!
//! ```text
//! +--------+------+----------+---------------------------+
//! | 0xFA   | type | sequence | payload (length by type)  |
//! +--------+------+----------+---------------------------+
//! ```
//!
//! There is no length prefix; the payload length is implied by the type.

use serde::{Deserialize, Serialize};

/// Frame start marker
pub const START_MARKER: u8 = 0xFA;

/// Header length (marker + type + sequence)
pub const HEADER_LEN: usize = 3;

/// Status message type (encoder counters inbound, pose estimate outbound)
pub const MSG_TYPE_STATUS: u8 = 1;

/// Request-behind-scan message type
pub const MSG_TYPE_BEHIND_SCAN: u8 = 2;

/// Object-pickup message type (pickup complete inbound, targets outbound)
pub const MSG_TYPE_PICKUP: u8 = 3;

/// Number of known message types
pub const MESSAGE_TYPE_COUNT: usize = 3;

/// Inbound status payload size
pub const STATUS_PAYLOAD_LEN: usize = 10;

/// Offset of the left encoder counter within the status payload
pub const STATUS_LEFT_OFFSET: usize = 1;

/// Offset of the right encoder counter within the status payload
pub const STATUS_RIGHT_OFFSET: usize = 5;

/// Outbound pose estimate payload size (x, y, yaw; one byte each)
pub const POSE_ESTIMATE_PAYLOAD_LEN: usize = 3;

/// Number of object triples carried by an outbound pickup-target message
pub const PICKUP_TARGET_COUNT: usize = 4;

/// Outbound pickup-target payload size
pub const PICKUP_TARGETS_PAYLOAD_LEN: usize = PICKUP_TARGET_COUNT * 3;

/// Known message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Encoder status from the cortex, pose estimate towards it
    Status,
    /// The cortex asks what is behind the robot
    BehindScanRequest,
    /// The cortex finished picking up objects, or new targets towards it
    Pickup,
}

impl MessageType {
    /// All known types in wire order
    pub const ALL: [MessageType; MESSAGE_TYPE_COUNT] = [
        MessageType::Status,
        MessageType::BehindScanRequest,
        MessageType::Pickup,
    ];

    /// Map a wire byte to a known type
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            MSG_TYPE_STATUS => Some(MessageType::Status),
            MSG_TYPE_BEHIND_SCAN => Some(MessageType::BehindScanRequest),
            MSG_TYPE_PICKUP => Some(MessageType::Pickup),
            _ => None,
        }
    }

    /// Wire byte for this type
    pub fn as_byte(self) -> u8 {
        match self {
            MessageType::Status => MSG_TYPE_STATUS,
            MessageType::BehindScanRequest => MSG_TYPE_BEHIND_SCAN,
            MessageType::Pickup => MSG_TYPE_PICKUP,
        }
    }

    /// Zero-based slot used by per-type tables
    pub(crate) fn index(self) -> usize {
        usize::from(self.as_byte() - 1)
    }

    /// Inbound payload length for this type
    pub fn inbound_payload_len(self) -> usize {
        match self {
            MessageType::Status => STATUS_PAYLOAD_LEN,
            MessageType::BehindScanRequest => 0,
            MessageType::Pickup => 0,
        }
    }
}

/// Inbound payload length for a raw type byte.
///
/// Unknown types carry no payload.
pub fn length_for(message_type: u8) -> usize {
    MessageType::from_byte(message_type)
        .map(MessageType::inbound_payload_len)
        .unwrap_or(0)
}

/// Decoded frame header (the start marker is implied)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Raw message type byte
    pub message_type: u8,
    /// Sequence counter byte
    pub sequence: u8,
}

/// One complete inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    /// Exactly `length_for(header.message_type)` bytes
    pub payload: Vec<u8>,
}

impl Frame {
    /// Known message type, if any
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_byte(self.header.message_type)
    }
}

/// Encoder counters carried by a status payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPayload {
    pub left_count: i32,
    pub right_count: i32,
}

/// Externally estimated pose sent back to the cortex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    pub yaw: f64,
}

/// World-frame coordinate of an object to pick up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Read a little-endian `i32` at `offset`.
///
/// Returns `None` if fewer than four bytes are available.
pub fn read_i32_le(bytes: &[u8], offset: usize) -> Option<i32> {
    let end = offset.checked_add(4)?;
    let raw: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(i32::from_le_bytes(raw))
}
