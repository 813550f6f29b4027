use serde::{Deserialize, Serialize};

use super::{Bounds, Hysteresis, SetpointPipeline, Thresholds};
use crate::channel::ChannelId;
use crate::error::{DomainError, Result};

/// Activation record for one controller.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ControllerConfig {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: ControllerKind,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ControllerKind {
    /// Generic two-point temperature control
    TwoPoint(TwoPointConfig),
    /// Heat pump with input temperature interlock
    HeatPump(HeatPumpConfig),
    /// Battery inverter with setpoint negotiation
    Inverter(InverterConfig),
    /// Circulation temperature delta
    Circulation(CirculationConfig),
}

impl ControllerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoPoint(_) => "TwoPoint",
            Self::HeatPump(_) => "HeatPump",
            Self::Inverter(_) => "Inverter",
            Self::Circulation(_) => "Circulation",
        }
    }
}

impl ControllerConfig {
    /// Check every invariant that can be checked without the bus.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "Controller ID cannot be empty".to_string(),
            ));
        }
        match &self.kind {
            ControllerKind::TwoPoint(c) => c.hysteresis().map(|_| ()),
            ControllerKind::HeatPump(c) => c.hysteresis().map(|_| ()),
            ControllerKind::Inverter(c) => c.pipeline().map(|_| ()),
            ControllerKind::Circulation(c) => c.validate(),
        }
    }

    /// Channels this controller binds to.
    pub fn channels(&self) -> Vec<&ChannelId> {
        match &self.kind {
            ControllerKind::TwoPoint(c) => {
                let mut channels = vec![&c.temp];
                if let SwitchTarget::Channel(relay) = &c.target {
                    channels.push(relay);
                }
                channels
            }
            ControllerKind::HeatPump(c) => vec![&c.temp_in, &c.state],
            ControllerKind::Inverter(c) => {
                let mut channels = vec![&c.command, &c.setpoint, &c.soc];
                channels.extend(c.solar.as_ref());
                channels
            }
            ControllerKind::Circulation(c) => vec![&c.temp_out, &c.temp_in, &c.delta],
        }
    }
}

/// What a two-point controller switches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SwitchTarget {
    /// Boolean relay channel
    Channel(ChannelId),
    /// Another activated controller, e.g. a heat pump
    Component(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TwoPointConfig {
    pub temp: ChannelId,
    pub temp_min: f64,
    pub temp_max: f64,
    pub target: SwitchTarget,
}

impl TwoPointConfig {
    pub fn hysteresis(&self) -> Result<Hysteresis> {
        Thresholds::new(self.temp_min, self.temp_max).map(Hysteresis::new)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HeatPumpConfig {
    /// Heating cycle input temperature
    pub temp_in: ChannelId,
    /// Relay state, written for actuation and read back as feedback
    pub state: ChannelId,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Input temperature at or above which the heat pump is forced off
    pub temp_in_max: f64,
    /// Coefficient of performance
    #[serde(default)]
    pub cop: Option<f64>,
}

impl HeatPumpConfig {
    pub fn hysteresis(&self) -> Result<Hysteresis> {
        let thresholds = Thresholds::new(self.temp_min, self.temp_max)?;
        if !self.temp_in_max.is_finite() || self.temp_in_max <= self.temp_min {
            return Err(DomainError::InvalidConfiguration(format!(
                "Input temperature limit ({}) must be above temp_min ({})",
                self.temp_in_max, self.temp_min
            )));
        }
        Ok(Hysteresis::new(thresholds))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InverterConfig {
    /// Externally commanded power
    pub command: ChannelId,
    /// Power setpoint written to the device
    pub setpoint: ChannelId,
    pub power_min: f64,
    pub power_max: f64,
    /// Battery state of charge
    pub soc: ChannelId,
    pub soc_min: f64,
    pub soc_max: f64,
    /// Metered power of co-located generation, added to the command while positive
    #[serde(default)]
    pub solar: Option<ChannelId>,
}

impl InverterConfig {
    pub fn pipeline(&self) -> Result<SetpointPipeline> {
        let power = Bounds::new("power", self.power_min, self.power_max)?;
        let soc = Bounds::new("state of charge", self.soc_min, self.soc_max)?;
        if self.command == self.setpoint {
            return Err(DomainError::InvalidConfiguration(format!(
                "Command and setpoint must be distinct channels: {}",
                self.command
            )));
        }
        Ok(SetpointPipeline::new(power, soc))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CirculationConfig {
    pub temp_out: ChannelId,
    pub temp_in: ChannelId,
    /// Derived `temp_out - temp_in`
    pub delta: ChannelId,
}

impl CirculationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.temp_out == self.temp_in {
            return Err(DomainError::InvalidConfiguration(format!(
                "Circulation inputs must be distinct channels: {}",
                self.temp_in
            )));
        }
        if self.delta == self.temp_out || self.delta == self.temp_in {
            return Err(DomainError::InvalidConfiguration(format!(
                "Circulation delta channel {} cannot be one of its inputs",
                self.delta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ChannelId {
        ChannelId::new(s).unwrap()
    }

    fn heat_pump(temp_min: f64, temp_max: f64) -> ControllerConfig {
        ControllerConfig {
            id: "hp1".to_string(),
            enabled: true,
            kind: ControllerKind::HeatPump(HeatPumpConfig {
                temp_in: id("hp_temp_in"),
                state: id("hp_state"),
                temp_min,
                temp_max,
                temp_in_max: 60.0,
                cop: Some(3.5),
            }),
        }
    }

    #[test]
    fn test_deserialize_tagged_controller() {
        let config: ControllerConfig = serde_json::from_value(json!({
            "id": "buffer",
            "type": "TwoPoint",
            "temp": "buffer_temp",
            "temp_min": 40.0,
            "temp_max": 55.0,
            "target": { "component": "hp1" }
        }))
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.kind.as_str(), "TwoPoint");
        match config.kind {
            ControllerKind::TwoPoint(c) => {
                assert_eq!(c.target, SwitchTarget::Component("hp1".to_string()));
            }
            _ => panic!("Wrong controller kind"),
        }
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        assert!(heat_pump(35.0, 45.0).validate().is_ok());
        let err = heat_pump(45.0, 35.0).validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_temp_in_max_below_min_is_rejected() {
        let mut config = heat_pump(35.0, 45.0);
        if let ControllerKind::HeatPump(c) = &mut config.kind {
            c.temp_in_max = 30.0;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverter_bounds_are_validated() {
        let mut inverter = InverterConfig {
            command: id("inv_command"),
            setpoint: id("inv_setpoint"),
            power_min: -5000.0,
            power_max: 5000.0,
            soc: id("bat_soc"),
            soc_min: 10.0,
            soc_max: 90.0,
            solar: Some(id("pv_power")),
        };
        assert!(inverter.pipeline().is_ok());

        inverter.soc_min = 95.0;
        assert!(inverter.pipeline().is_err());
    }

    #[test]
    fn test_circulation_channels_must_differ() {
        let config = CirculationConfig {
            temp_out: id("circ_out"),
            temp_in: id("circ_in"),
            delta: id("circ_in"),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bound_channels() {
        let config = heat_pump(35.0, 45.0);
        let channels: Vec<&str> = config.channels().iter().map(|c| c.as_str()).collect();
        assert_eq!(channels, vec!["hp_temp_in", "hp_state"]);
    }
}
