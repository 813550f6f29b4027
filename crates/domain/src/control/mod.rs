//! Control decisions, free of any channel or locking concerns.

mod config;
mod correlation;
mod hysteresis;
mod setpoint;
mod thresholds;

pub use config::{
    CirculationConfig, ControllerConfig, ControllerKind, HeatPumpConfig, InverterConfig,
    SwitchTarget, TwoPointConfig,
};
pub use correlation::{CorrelatedPair, Side};
pub use hysteresis::{Hysteresis, Switch};
pub use setpoint::{SetpointDecision, SetpointInputs, SetpointPipeline};
pub use thresholds::{Bounds, Thresholds};
