//! # Cortex Frame Encoder
//!
//! Encodes outbound messages: pose estimates and pickup targets.
//!
//! Pose and coordinate values are written one byte per field, which is the
//! width the cortex firmware reads. Anything finer than whole units is lost
//! and values outside `0..=255` saturate. Widening these fields needs a
//! matching firmware change.

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::*;

/// A fully stamped outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_type: MessageType,
    pub sequence: u8,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    /// Encode as header followed by payload
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&encode_header(self.message_type.as_byte(), self.sequence));
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Encode a frame header: marker, type, sequence
pub fn encode_header(message_type: u8, sequence: u8) -> [u8; HEADER_LEN] {
    [START_MARKER, message_type, sequence]
}

/// Truncate a value to a single wire byte.
///
/// Fractions are dropped, negatives become 0, values above 255 become 255
/// and NaN becomes 0.
pub fn truncate_to_byte(value: f64) -> u8 {
    value as u8
}

/// Encode a pose estimate payload (x, y, yaw)
pub fn encode_pose_estimate_payload(pose: &PoseEstimate) -> [u8; POSE_ESTIMATE_PAYLOAD_LEN] {
    [
        truncate_to_byte(pose.x),
        truncate_to_byte(pose.y),
        truncate_to_byte(pose.yaw),
    ]
}

/// Encode a pickup-target payload
///
/// Flattens up to [`PICKUP_TARGET_COUNT`] (x, y, z) triples. Missing
/// triples are zero, extra ones are dropped.
pub fn encode_pickup_targets_payload(
    targets: &[ObjectCoordinate],
) -> [u8; PICKUP_TARGETS_PAYLOAD_LEN] {
    let mut payload = [0u8; PICKUP_TARGETS_PAYLOAD_LEN];

    for (slot, target) in payload
        .chunks_exact_mut(3)
        .zip(targets.iter().take(PICKUP_TARGET_COUNT))
    {
        slot[0] = truncate_to_byte(target.x);
        slot[1] = truncate_to_byte(target.y);
        slot[2] = truncate_to_byte(target.z);
    }

    payload
}
