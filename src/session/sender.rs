//! # Outbound Sender
//!
//! Writes pose estimates and pickup targets to the cortex.
//!
//! The write half of the link, the outbound sequence counters and the
//! pickup handshake state sit behind one async mutex, so at most one write
//! is in flight and each message's counter is stamped in wire order. Clones
//! share the same state and can be handed to collaborator tasks.

use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CortexError, Result};
use crate::protocol::encoder::{
    encode_pickup_targets_payload, encode_pose_estimate_payload, OutboundMessage,
};
use crate::protocol::frame::{MessageType, ObjectCoordinate, PoseEstimate};
use crate::protocol::sequence::OutboundCounters;

struct SenderState<W> {
    writer: W,
    counters: OutboundCounters,
    /// Set when the cortex is idle and may receive new targets
    ready_for_pickup: bool,
    /// Targets last sent to the cortex
    buffered_targets: Vec<ObjectCoordinate>,
}

/// Cloneable outbound handle to the cortex
pub struct CortexSender<W> {
    state: Arc<Mutex<SenderState<W>>>,
}

impl<W> Clone for CortexSender<W> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<W> std::fmt::Debug for CortexSender<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CortexSender").finish_non_exhaustive()
    }
}

impl<W> CortexSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap the write half of the link.
    ///
    /// The cortex starts idle, so the first target list is accepted.
    pub fn new(writer: W) -> Self {
        Self {
            state: Arc::new(Mutex::new(SenderState {
                writer,
                counters: OutboundCounters::new(),
                ready_for_pickup: true,
                buffered_targets: Vec::new(),
            })),
        }
    }

    /// Send an externally estimated pose as a status message
    pub async fn send_pose_estimate(&self, pose: &PoseEstimate) -> Result<()> {
        let mut state = self.state.lock().await;
        let payload = encode_pose_estimate_payload(pose);
        Self::send(&mut state, MessageType::Status, &payload).await
    }

    /// Send pickup targets if the cortex is ready for them.
    ///
    /// Returns `false` and sends nothing while a previous pickup is still
    /// in progress. On send, the targets are buffered for the next
    /// pickup-complete notification.
    pub async fn send_pickup_targets(&self, targets: &[ObjectCoordinate]) -> Result<bool> {
        let mut state = self.state.lock().await;
        if !state.ready_for_pickup {
            debug!("Cortex busy, dropping {} pickup targets", targets.len());
            return Ok(false);
        }

        let payload = encode_pickup_targets_payload(targets);
        Self::send(&mut state, MessageType::Pickup, &payload).await?;

        state.buffered_targets = targets.to_vec();
        state.ready_for_pickup = false;
        Ok(true)
    }

    /// Record that the cortex finished its pickup; returns the targets it
    /// was last sent.
    pub async fn mark_pickup_complete(&self) -> Vec<ObjectCoordinate> {
        let mut state = self.state.lock().await;
        state.ready_for_pickup = true;
        state.buffered_targets.clone()
    }

    pub async fn is_ready_for_pickup(&self) -> bool {
        self.state.lock().await.ready_for_pickup
    }

    async fn send(state: &mut SenderState<W>, ty: MessageType, payload: &[u8]) -> Result<()> {
        let message = OutboundMessage {
            message_type: ty,
            sequence: state.counters.next_outbound(ty),
            payload: payload.to_vec(),
        };
        let bytes = message.encode();

        state
            .writer
            .write_all(&bytes)
            .await
            .map_err(CortexError::LinkIo)?;
        state.writer.flush().await.map_err(CortexError::LinkIo)?;

        debug!(
            "Sent {:?} seq={} ({} bytes)",
            ty,
            message.sequence,
            bytes.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CortexError;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_pose_estimate_wire_format() {
        let (client, mut server) = duplex(64);
        let sender = CortexSender::new(client);

        sender
            .send_pose_estimate(&PoseEstimate { x: 12.6, y: 300.0, yaw: 2.9 })
            .await
            .unwrap();

        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xFA, 1, 1, 12, 255, 2]);
    }

    #[tokio::test]
    async fn test_sequence_increments_per_type() {
        let (client, mut server) = duplex(256);
        let sender = CortexSender::new(client);
        let pose = PoseEstimate { x: 0.0, y: 0.0, yaw: 0.0 };

        sender.send_pose_estimate(&pose).await.unwrap();
        sender.send_pose_estimate(&pose).await.unwrap();
        sender.send_pickup_targets(&[]).await.unwrap();

        let mut buf = [0u8; 6 + 6 + 15];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[0..3], &[0xFA, 1, 1]);
        assert_eq!(&buf[6..9], &[0xFA, 1, 2]);
        assert_eq!(&buf[12..15], &[0xFA, 3, 1]);
    }

    #[tokio::test]
    async fn test_pickup_targets_gated_by_ready_flag() {
        let (client, mut server) = duplex(256);
        let sender = CortexSender::new(client);
        let first = [ObjectCoordinate { x: 1.0, y: 2.0, z: 3.0 }];
        let second = [ObjectCoordinate { x: 9.0, y: 9.0, z: 9.0 }];

        assert!(sender.send_pickup_targets(&first).await.unwrap());
        assert!(!sender.is_ready_for_pickup().await);
        assert!(!sender.send_pickup_targets(&second).await.unwrap());

        let picked_up = sender.mark_pickup_complete().await;
        assert_eq!(picked_up, first.to_vec());
        assert!(sender.is_ready_for_pickup().await);
        assert!(sender.send_pickup_targets(&second).await.unwrap());

        let mut buf = [0u8; 30];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[0..6], &[0xFA, 3, 1, 1, 2, 3]);
        assert_eq!(&buf[15..21], &[0xFA, 3, 2, 9, 9, 9]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (client, _server) = duplex(256);
        let sender = CortexSender::new(client);
        let other = sender.clone();

        assert!(sender.send_pickup_targets(&[]).await.unwrap());
        assert!(!other.is_ready_for_pickup().await);
    }

    #[tokio::test]
    async fn test_write_failure_is_link_error() {
        let writer = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let sender = CortexSender::new(writer);

        let result = sender
            .send_pose_estimate(&PoseEstimate { x: 0.0, y: 0.0, yaw: 0.0 })
            .await;
        assert!(matches!(result, Err(CortexError::LinkIo(_))));
    }

    #[tokio::test]
    async fn test_failed_pickup_send_keeps_ready_flag() {
        let writer = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let sender = CortexSender::new(writer);

        assert!(sender.send_pickup_targets(&[]).await.is_err());
        assert!(sender.is_ready_for_pickup().await);
    }
}
