//! # Serial Communication Module
//!
//! Handles the serial connection to the cortex.
//!
//! This module handles:
//! - Opening the port 8N1 without flow control
//! - Splitting the stream into a read half for the poll loop and a write
//!   half for outbound messages

use crate::config::SerialConfig;
use crate::error::{CortexError, Result};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Cortex UART baud rate
pub const CORTEX_BAUD_RATE: u32 = 115_200;

/// Cortex serial port handle
///
/// Manages the connection to the cortex over a USB serial adapter.
pub struct CortexSerial {
    /// Serial port handle
    port: SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for CortexSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CortexSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl CortexSerial {
    /// Open the port named in the configuration
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port cannot be opened or configured
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cortex_link::config::SerialConfig;
    /// use cortex_link::serial::CortexSerial;
    ///
    /// # async fn demo() -> anyhow::Result<()> {
    /// let serial = CortexSerial::open(&SerialConfig::default())?;
    /// let (reader, writer) = serial.split();
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        debug!("Opening serial port {} at {} baud", config.port, config.baud_rate);
        let port = Self::open_port(&config.port, config.baud_rate)?;
        info!("Opened cortex link at {}", config.port);

        Ok(Self {
            port,
            device_path: config.port.clone(),
        })
    }

    /// Open a specific serial port with cortex settings
    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CortexError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into independent read and write halves
    pub fn split(self) -> (ReadHalf<SerialStream>, WriteHalf<SerialStream>) {
        tokio::io::split(self.port)
    }
}
