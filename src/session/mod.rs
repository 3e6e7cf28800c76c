//! # Session Controller
//!
//! Owns the read half of the cortex link together with all engine state
//! (sequence tracker, odometry, inertial calibration) and drives the
//! read-dispatch loop.
//!
//! ## States
//!
//! - **Uncalibrated**: initial. The first [`Session::initialize`] or
//!   [`Session::poll`] configures the inertial sensor, waits for it to
//!   settle and measures bias. Blocking and not cancellable.
//! - **Ready**: services polls until the link fails or the session is
//!   cancelled.
//!
//! ## Poll
//!
//! One poll reads one frame (bounded by the read timeout), checks its
//! sequence counter, dispatches by type, then takes an inertial sample
//! regardless of type. Protocol anomalies never fail a poll.

pub mod sender;

use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CortexError, Result};
use crate::imu::{ImuSample, InertialSensor, InertialStateBuilder, SensorSettings};
use crate::odometry::{OdometryEngine, OdometryParams, OdometryUpdate};
use crate::protocol::decoder::{decode_status, read_frame};
use crate::protocol::frame::{Frame, Header, MessageType, ObjectCoordinate, PoseEstimate};
use crate::protocol::sequence::{SequenceCheck, SequencePolicy, SequenceTracker};

pub use sender::CortexSender;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uncalibrated,
    Ready,
}

/// Timing and bring-up parameters of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub read_timeout: Duration,
    pub calibration_samples: usize,
    pub sensor: SensorSettings,
    pub settle_delay: Duration,
    pub sequence: SequencePolicy,
    pub odometry: OdometryParams,
    pub imu_covariance: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            read_timeout: config.serial.read_timeout(),
            calibration_samples: config.imu.calibration_samples,
            sensor: config.imu.sensor_settings(),
            settle_delay: config.imu.settle_delay(),
            sequence: config.protocol.sequence_policy(),
            odometry: config.odometry.params(),
            imu_covariance: config.imu.covariance,
        }
    }
}

/// What a frame meant for the upper layer
#[derive(Debug, Clone, PartialEq)]
pub enum CortexEvent {
    /// Status frame integrated into odometry
    Odometry(OdometryUpdate),
    /// The cortex wants to know what is behind the robot
    BehindScanRequested,
    /// The cortex picked up its targets; these are the ones it was sent
    PickupComplete { picked_up: Vec<ObjectCoordinate> },
    /// Unrecognized type byte; nothing was done
    Unknown { message_type: u8 },
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub header: Header,
    pub sequence: SequenceCheck,
    pub event: CortexEvent,
    pub imu: ImuSample,
}

impl PollOutcome {
    /// Odometry update, if this poll read a status frame
    pub fn odometry(&self) -> Option<&OdometryUpdate> {
        match &self.event {
            CortexEvent::Odometry(update) => Some(update),
            _ => None,
        }
    }
}

/// Cortex link session
pub struct Session<R, W, S> {
    reader: R,
    sender: CortexSender<W>,
    sequence: SequenceTracker,
    odometry: OdometryEngine,
    inertial: InertialStateBuilder<S>,
    state: SessionState,
    settings: SessionSettings,
}

impl<R, W, S> std::fmt::Debug for Session<R, W, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("sequence", &self.sequence)
            .field("odometry", &self.odometry)
            .field("inertial", &self.inertial)
            .finish_non_exhaustive()
    }
}

impl<R, W, S> Session<R, W, S>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    S: InertialSensor,
{
    /// Create an uncalibrated session over a split link
    pub fn new(reader: R, writer: W, sensor: S, settings: SessionSettings) -> Self {
        Self {
            reader,
            sender: CortexSender::new(writer),
            sequence: SequenceTracker::new(settings.sequence),
            odometry: OdometryEngine::new(settings.odometry, Instant::now()),
            inertial: InertialStateBuilder::new(sensor, settings.imu_covariance),
            state: SessionState::Uncalibrated,
            settings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sequence(&self) -> &SequenceTracker {
        &self.sequence
    }

    pub fn odometry(&self) -> &OdometryEngine {
        &self.odometry
    }

    /// Outbound handle for collaborator tasks
    pub fn sender(&self) -> CortexSender<W> {
        self.sender.clone()
    }

    /// Bring up and calibrate the inertial sensor if not done yet
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state == SessionState::Ready {
            return Ok(());
        }

        info!("Configuring inertial sensor: {:?}", self.settings.sensor);
        self.inertial.configure(&self.settings.sensor)?;

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        let samples = self.settings.calibration_samples;
        let inertial = &mut self.inertial;
        blocking(move || inertial.calibrate(samples).map(|_| ()))?;

        // Stationary time spent calibrating is not motion
        self.odometry = OdometryEngine::new(self.settings.odometry, Instant::now());
        self.state = SessionState::Ready;
        info!("Session ready");
        Ok(())
    }

    /// Read and process one frame
    ///
    /// # Errors
    ///
    /// - `LinkTimeout` if no complete frame arrives within the read timeout
    /// - `LinkIo` if the link fails or closes
    /// - the sensor's error if calibration or sampling fails
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        self.initialize().await?;

        let timeout = self.settings.read_timeout;
        let frame = tokio::time::timeout(timeout, read_frame(&mut self.reader))
            .await
            .map_err(|_| CortexError::LinkTimeout(timeout))??;

        let header = frame.header;
        let sequence = self.sequence.check(header.message_type, header.sequence);
        if let SequenceCheck::Mismatch { expected, received } = sequence {
            warn!(
                "Message count invalid ({}) for type {}, expected {}",
                received, header.message_type, expected
            );
        }

        let event = self.dispatch(&frame).await;
        let inertial = &mut self.inertial;
        let imu = blocking(move || inertial.sample())?;

        Ok(PollOutcome {
            header,
            sequence,
            event,
            imu,
        })
    }

    async fn dispatch(&mut self, frame: &Frame) -> CortexEvent {
        match frame.message_type() {
            Some(MessageType::Status) => match decode_status(&frame.payload) {
                Some(status) => CortexEvent::Odometry(self.odometry.update(
                    status.left_count,
                    status.right_count,
                    Instant::now(),
                )),
                None => CortexEvent::Unknown {
                    message_type: frame.header.message_type,
                },
            },
            Some(MessageType::BehindScanRequest) => {
                debug!("Cortex requested behind scan");
                CortexEvent::BehindScanRequested
            }
            Some(MessageType::Pickup) => {
                let picked_up = self.sender.mark_pickup_complete().await;
                debug!("Cortex completed pickup of {} objects", picked_up.len());
                CortexEvent::PickupComplete { picked_up }
            }
            None => {
                debug!("Ignoring unknown message type {}", frame.header.message_type);
                CortexEvent::Unknown {
                    message_type: frame.header.message_type,
                }
            }
        }
    }

    /// Send an externally estimated pose to the cortex
    pub async fn send_pose_estimate(&self, pose: &PoseEstimate) -> Result<()> {
        self.sender.send_pose_estimate(pose).await
    }

    /// Send pickup targets if the cortex is ready for them
    pub async fn send_pickup_targets(&self, targets: &[ObjectCoordinate]) -> Result<bool> {
        self.sender.send_pickup_targets(targets).await
    }

    /// Poll until cancelled or the link fails
    ///
    /// Each outcome goes to `on_outcome`. Read timeouts are logged and
    /// polling continues. Cancellation also interrupts a read in flight.
    pub async fn run<F>(&mut self, cancel: CancellationToken, mut on_outcome: F) -> Result<()>
    where
        F: FnMut(PollOutcome),
    {
        let mut polls: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll() => result,
            };

            match result {
                Ok(outcome) => {
                    polls += 1;
                    on_outcome(outcome);
                }
                Err(e) if e.is_recoverable() => warn!("{}", e),
                Err(e) => return Err(e),
            }
        }

        info!("Session stopped after {} frames", polls);
        Ok(())
    }
}

/// Run synchronous sensor I/O, moving other tasks off this worker when the
/// runtime allows it
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
