//! # Outbound Commands
//!
//! Line-delimited JSON commands from the navigation side, one per line:
//!
//! ```text
//! {"pose_estimate":{"x":12.0,"y":40.5,"yaw":1.57}}
//! {"pickup_targets":[{"x":10.0,"y":20.0,"z":0.0}]}
//! ```

use serde::Deserialize;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::error::{CortexError, Result};
use crate::protocol::frame::{ObjectCoordinate, PoseEstimate};
use crate::session::CortexSender;

/// A message the upper layer wants sent to the cortex
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundCommand {
    PoseEstimate(PoseEstimate),
    PickupTargets(Vec<ObjectCoordinate>),
}

/// Parse one command line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<OutboundCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| CortexError::Command(e.to_string()))
}

/// Send a command through the link
///
/// Returns whether anything was written; pickup targets are dropped while
/// the cortex is still busy with the previous pickup.
pub async fn apply<W>(command: &OutboundCommand, sender: &CortexSender<W>) -> Result<bool>
where
    W: AsyncWrite + Unpin + Send,
{
    match command {
        OutboundCommand::PoseEstimate(pose) => {
            sender.send_pose_estimate(pose).await?;
            Ok(true)
        }
        OutboundCommand::PickupTargets(targets) => {
            let sent = sender.send_pickup_targets(targets).await?;
            if sent {
                info!("Sent {} pickup targets", targets.len());
            } else {
                debug!("Cortex not ready for pickup, dropped {} targets", targets.len());
            }
            Ok(sent)
        }
    }
}
