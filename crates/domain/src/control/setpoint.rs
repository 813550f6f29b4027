use super::Bounds;
use crate::error::{DomainError, Result};

/// Inputs of one setpoint decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetpointInputs {
    /// Accepted power command
    pub command: f64,
    /// Metered power of the secondary source, only while it is active
    pub offset: Option<f64>,
    /// Latest state of charge, `None` if never received
    pub state_of_charge: Option<f64>,
    /// Last setpoint reported for the device, or else the last one written
    pub last_setpoint: Option<f64>,
}

/// Outcome of one decision cycle; at most one write results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetpointDecision {
    /// Write this (clamped) setpoint
    Apply(f64),
    /// State of charge out of range and the device still has a non-zero setpoint
    ForceZero,
    /// Nothing to write
    Unchanged,
}

/// Turns a power command into a bounded setpoint.
///
/// Offset correction is applied before clamping, and the state-of-charge
/// gate overrides everything else. An unknown state of charge closes the
/// gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointPipeline {
    power: Bounds,
    state_of_charge: Bounds,
}

impl SetpointPipeline {
    pub fn new(power: Bounds, state_of_charge: Bounds) -> Self {
        Self {
            power,
            state_of_charge,
        }
    }

    pub fn power(&self) -> &Bounds {
        &self.power
    }

    pub fn state_of_charge(&self) -> &Bounds {
        &self.state_of_charge
    }

    /// Reject commands outside the device's operating range.
    pub fn check(&self, command: f64) -> Result<()> {
        if self.power.contains(command) {
            Ok(())
        } else {
            Err(DomainError::SetpointOutOfBounds {
                value: command,
                min: self.power.min(),
                max: self.power.max(),
            })
        }
    }

    pub fn decide(&self, inputs: SetpointInputs) -> Result<SetpointDecision> {
        self.check(inputs.command)?;

        let corrected = inputs.command + inputs.offset.unwrap_or(0.0);
        let setpoint = self.power.clamp(corrected);

        let soc_in_range = inputs
            .state_of_charge
            .is_some_and(|soc| self.state_of_charge.contains(soc));
        if !soc_in_range {
            return Ok(match inputs.last_setpoint {
                Some(last) if last == 0.0 => SetpointDecision::Unchanged,
                _ => SetpointDecision::ForceZero,
            });
        }

        if inputs.last_setpoint == Some(setpoint) {
            return Ok(SetpointDecision::Unchanged);
        }
        Ok(SetpointDecision::Apply(setpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> SetpointPipeline {
        SetpointPipeline::new(
            Bounds::new("power", -5000.0, 5000.0).unwrap(),
            Bounds::new("state of charge", 10.0, 90.0).unwrap(),
        )
    }

    fn inputs(command: f64) -> SetpointInputs {
        SetpointInputs {
            command,
            state_of_charge: Some(50.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_applies_command_within_bounds() {
        assert_eq!(
            pipeline().decide(inputs(1500.0)).unwrap(),
            SetpointDecision::Apply(1500.0)
        );
    }

    #[test]
    fn test_rejects_out_of_bounds_command() {
        let err = pipeline().decide(inputs(5000.1)).unwrap_err();
        assert_eq!(
            err,
            DomainError::SetpointOutOfBounds {
                value: 5000.1,
                min: -5000.0,
                max: 5000.0
            }
        );
    }

    #[test]
    fn test_offset_is_added_then_clamped() {
        let with_solar = SetpointInputs {
            offset: Some(1200.0),
            ..inputs(1000.0)
        };
        assert_eq!(
            pipeline().decide(with_solar).unwrap(),
            SetpointDecision::Apply(2200.0)
        );

        let saturated = SetpointInputs {
            offset: Some(3000.0),
            ..inputs(4000.0)
        };
        assert_eq!(
            pipeline().decide(saturated).unwrap(),
            SetpointDecision::Apply(5000.0)
        );
    }

    #[test]
    fn test_soc_breach_forces_zero_once() {
        let breach = SetpointInputs {
            state_of_charge: Some(95.0),
            last_setpoint: Some(1500.0),
            ..inputs(1500.0)
        };
        assert_eq!(
            pipeline().decide(breach).unwrap(),
            SetpointDecision::ForceZero
        );

        let already_zero = SetpointInputs {
            last_setpoint: Some(0.0),
            ..breach
        };
        assert_eq!(
            pipeline().decide(already_zero).unwrap(),
            SetpointDecision::Unchanged
        );
    }

    #[test]
    fn test_unknown_soc_closes_gate() {
        let unknown = SetpointInputs {
            state_of_charge: None,
            ..inputs(1500.0)
        };
        assert_eq!(
            pipeline().decide(unknown).unwrap(),
            SetpointDecision::ForceZero
        );
    }

    #[test]
    fn test_repeated_setpoint_is_unchanged() {
        let repeat = SetpointInputs {
            last_setpoint: Some(1500.0),
            ..inputs(1500.0)
        };
        assert_eq!(
            pipeline().decide(repeat).unwrap(),
            SetpointDecision::Unchanged
        );
    }
}
