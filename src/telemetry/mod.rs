//! # Telemetry Module
//!
//! Records the upward interface (odometry, inertial samples, cortex
//! notifications) as JSON Lines with rotation.
//!
//! This module handles:
//! - Converting poll outcomes into timestamped records
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod writer;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::imu::ImuSample;
use crate::odometry::OdometryUpdate;
use crate::protocol::frame::ObjectCoordinate;
use crate::protocol::sequence::SequenceCheck;
use crate::session::{CortexEvent, PollOutcome};

pub use writer::TelemetryWriter;

/// Payload of one telemetry line
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Odometry(OdometryUpdate),
    Imu(ImuSample),
    BehindScanRequested,
    PickupComplete { picked_up: Vec<ObjectCoordinate> },
    SequenceMismatch { message_type: u8, expected: u8, received: u8 },
}

/// One telemetry line
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

impl TelemetryRecord {
    pub fn now(event: TelemetryEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Records worth keeping from one poll, in emission order.
///
/// Unknown frames produce no frame record; the inertial sample is always
/// included.
pub fn records_for(outcome: &PollOutcome) -> Vec<TelemetryRecord> {
    let mut records = Vec::with_capacity(3);

    if let SequenceCheck::Mismatch { expected, received } = outcome.sequence {
        records.push(TelemetryRecord::now(TelemetryEvent::SequenceMismatch {
            message_type: outcome.header.message_type,
            expected,
            received,
        }));
    }

    match &outcome.event {
        CortexEvent::Odometry(update) => {
            records.push(TelemetryRecord::now(TelemetryEvent::Odometry(update.clone())));
        }
        CortexEvent::BehindScanRequested => {
            records.push(TelemetryRecord::now(TelemetryEvent::BehindScanRequested));
        }
        CortexEvent::PickupComplete { picked_up } => {
            records.push(TelemetryRecord::now(TelemetryEvent::PickupComplete {
                picked_up: picked_up.clone(),
            }));
        }
        CortexEvent::Unknown { .. } => {}
    }

    records.push(TelemetryRecord::now(TelemetryEvent::Imu(outcome.imu.clone())));
    records
}
