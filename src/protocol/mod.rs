//! # Cortex Link Protocol Module
//!
//! Fixed-format binary framing spoken with the cortex microcontroller.
//!
//! This module handles:
//! - Start-marker synchronization and header decoding
//! - Type-to-length payload dispatch
//! - Per-type sequence counter validation and outbound stamping
//! - Encoding of pose-estimate and pickup-target messages

pub mod frame;
pub mod encoder;
pub mod decoder;
pub mod sequence;
