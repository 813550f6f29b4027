use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{error, info, warn};

use domain::channel::ChannelProvider;
use domain::control::{ControllerConfig, ControllerKind, SwitchTarget};
use domain::error::{DomainError, Result};

use super::{Circulation, HeatPump, Inverter, RelaySwitch, Switchable, TwoPointController};
use crate::subscription::lock;

/// An activated controller.
#[derive(Clone)]
pub enum ControlUnit {
    TwoPoint(Arc<TwoPointController>),
    HeatPump(Arc<HeatPump>),
    Inverter(Arc<Inverter>),
    Circulation(Arc<Circulation>),
}

impl ControlUnit {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TwoPoint(_) => "TwoPoint",
            Self::HeatPump(_) => "HeatPump",
            Self::Inverter(_) => "Inverter",
            Self::Circulation(_) => "Circulation",
        }
    }

    pub fn deactivate(&self) {
        match self {
            Self::TwoPoint(c) => c.deactivate(),
            Self::HeatPump(c) => c.deactivate(),
            Self::Inverter(c) => c.deactivate(),
            Self::Circulation(c) => c.deactivate(),
        }
    }

    /// Units a two-point controller can use as its target.
    pub fn as_switchable(&self) -> Option<Arc<dyn Switchable>> {
        match self {
            Self::HeatPump(c) => Some(c.clone() as Arc<dyn Switchable>),
            _ => None,
        }
    }
}

/// Owns the activated controllers of one installation.
pub struct ControlManager {
    channels: Arc<dyn ChannelProvider>,
    units: DashMap<String, ControlUnit>,
    order: Mutex<Vec<String>>,
}

impl ControlManager {
    pub fn new(channels: Arc<dyn ChannelProvider>) -> Self {
        Self {
            channels,
            units: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Activate one controller. Disabled records are skipped.
    pub fn activate(&self, config: &ControllerConfig) -> Result<()> {
        if !config.enabled {
            info!(controller = %config.id, "Skipping disabled controller");
            return Ok(());
        }
        config.validate()?;
        if self.units.contains_key(&config.id) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Controller {} is already active",
                config.id
            )));
        }

        let channels = self.channels.as_ref();
        let id = config.id.clone();
        let unit = match &config.kind {
            ControllerKind::TwoPoint(c) => {
                let target = self.resolve_target(&c.target)?;
                ControlUnit::TwoPoint(Arc::new(TwoPointController::activate(
                    id, c, target, channels,
                )?))
            }
            ControllerKind::HeatPump(c) => {
                ControlUnit::HeatPump(Arc::new(HeatPump::activate(id, c, channels)?))
            }
            ControllerKind::Inverter(c) => {
                ControlUnit::Inverter(Arc::new(Inverter::activate(id, c, channels)?))
            }
            ControllerKind::Circulation(c) => {
                ControlUnit::Circulation(Arc::new(Circulation::activate(id, c, channels)?))
            }
        };

        self.units.insert(config.id.clone(), unit);
        lock(&self.order).push(config.id.clone());
        Ok(())
    }

    /// Activate a set of records, components before the controllers that
    /// target them. Failed records are logged and skipped; their errors are
    /// returned by controller ID.
    pub fn activate_all(&self, configs: &[ControllerConfig]) -> Vec<(String, DomainError)> {
        let (dependent, independent): (Vec<_>, Vec<_>) =
            configs.iter().partition(|c| match &c.kind {
                ControllerKind::TwoPoint(t) => matches!(t.target, SwitchTarget::Component(_)),
                _ => false,
            });

        let mut failures = Vec::new();
        for config in independent.into_iter().chain(dependent) {
            if let Err(e) = self.activate(config) {
                error!(
                    controller = %config.id,
                    kind = config.kind.as_str(),
                    error = %e,
                    "Activation failed"
                );
                failures.push((config.id.clone(), e));
            }
        }
        info!(active = self.len(), failed = failures.len(), "✅ Controllers activated");
        failures
    }

    fn resolve_target(&self, target: &SwitchTarget) -> Result<Arc<dyn Switchable>> {
        match target {
            SwitchTarget::Channel(channel) => Ok(Arc::new(RelaySwitch::new(
                self.channels.require(channel)?,
            ))),
            SwitchTarget::Component(name) => self
                .units
                .get(name)
                .and_then(|unit| unit.as_switchable())
                .ok_or_else(|| DomainError::UnknownComponent(name.clone())),
        }
    }

    pub fn get(&self, id: &str) -> Option<ControlUnit> {
        self.units.get(id).map(|unit| unit.clone())
    }

    pub fn heat_pump(&self, id: &str) -> Result<Arc<HeatPump>> {
        match self.get(id) {
            Some(ControlUnit::HeatPump(c)) => Ok(c),
            _ => Err(DomainError::UnknownComponent(id.to_string())),
        }
    }

    pub fn inverter(&self, id: &str) -> Result<Arc<Inverter>> {
        match self.get(id) {
            Some(ControlUnit::Inverter(c)) => Ok(c),
            _ => Err(DomainError::UnknownComponent(id.to_string())),
        }
    }

    pub fn two_point(&self, id: &str) -> Result<Arc<TwoPointController>> {
        match self.get(id) {
            Some(ControlUnit::TwoPoint(c)) => Ok(c),
            _ => Err(DomainError::UnknownComponent(id.to_string())),
        }
    }

    pub fn circulation(&self, id: &str) -> Result<Arc<Circulation>> {
        match self.get(id) {
            Some(ControlUnit::Circulation(c)) => Ok(c),
            _ => Err(DomainError::UnknownComponent(id.to_string())),
        }
    }

    pub fn deactivate(&self, id: &str) -> Result<()> {
        let (_, unit) = self
            .units
            .remove(id)
            .ok_or_else(|| DomainError::UnknownComponent(id.to_string()))?;
        lock(&self.order).retain(|active| active != id);
        unit.deactivate();
        Ok(())
    }

    /// Deactivate everything, most recently activated first.
    pub fn deactivate_all(&self) {
        let order: Vec<String> = lock(&self.order).drain(..).collect();
        for id in order.iter().rev() {
            match self.units.remove(id) {
                Some((_, unit)) => {
                    info!(controller = %id, kind = unit.kind(), "Deactivating controller");
                    unit.deactivate();
                }
                None => warn!(controller = %id, "Controller vanished before deactivation"),
            }
        }
    }

    /// IDs in activation order.
    pub fn ids(&self) -> Vec<String> {
        lock(&self.order).clone()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
