use serde::{Deserialize, Serialize};

use super::Thresholds;

/// Commanded output of an on/off device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl std::fmt::Display for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-point control over a temperature stream.
///
/// - `Off -> On` when `temperature <= min`
/// - `On -> Off` when `temperature >= max`
/// - hold inside the deadband
///
/// An unknown current state or a NaN sample never produces a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hysteresis {
    thresholds: Thresholds,
}

impl Hysteresis {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Returns the state to switch to, if the sample calls for a transition.
    pub fn evaluate(&self, current: Option<Switch>, temperature: f64) -> Option<Switch> {
        match current? {
            Switch::Off if temperature <= self.thresholds.min() => Some(Switch::On),
            Switch::On if temperature >= self.thresholds.max() => Some(Switch::Off),
            _ => None,
        }
    }
}
