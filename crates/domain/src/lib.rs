//! Domain layer - Pure control logic with no I/O
//!
//! This crate contains:
//! - Value objects (ChannelId, Value, Thresholds, Bounds)
//! - The Channel and ChannelDriver interfaces (traits)
//! - Write batches
//! - Control decisions (hysteresis, setpoint pipeline, timestamp pairing)
//! - Controller configuration records
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Invariants enforced when configuration is validated
//! - Decisions are plain functions of their inputs
//! - Testable in isolation

pub mod channel;
pub mod control;
pub mod driver;
pub mod error;

// Re-export commonly used types
pub use channel::{Channel, ChannelId, ChannelProvider, Value, WriteBatch};
pub use control::{ControllerConfig, ControllerKind, Switch};
pub use error::DomainError;
