use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use domain::channel::{Channel, ChannelProvider, Value, WriteBatch};
use domain::control::{HeatPumpConfig, Hysteresis, Switch};
use domain::error::{DomainError, Result};

use super::Switchable;
use crate::subscription::{Subscriptions, bind, lock};

/// Point-in-time view of a heat pump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPumpStatus {
    pub id: String,
    pub temperature: Option<f64>,
    pub state: Option<Switch>,
    pub running_since: Option<DateTime<Utc>>,
    pub maintenance: bool,
    pub cop: Option<f64>,
}

#[derive(Debug, Default)]
struct HeatPumpState {
    /// Last input temperature sample
    temperature: Option<f64>,
    /// Effective relay state: feedback, or the last state commanded since
    switch: Option<Switch>,
    /// Last reported relay state
    feedback: Option<Switch>,
    running_since: Option<DateTime<Utc>>,
    maintenance: bool,
    active: bool,
}

struct Inner {
    id: String,
    hysteresis: Hysteresis,
    temp_in_max: f64,
    cop: Option<f64>,
    state_channel: Arc<dyn Channel>,
    state: Mutex<HeatPumpState>,
}

impl Inner {
    fn is_unsafe(&self, temperature: f64) -> bool {
        temperature >= self.temp_in_max
    }

    fn actuate(&self, state: &mut HeatPumpState, next: Switch, at: DateTime<Utc>) {
        let mut batch = WriteBatch::new();
        batch.add(&self.state_channel, Value::boolean(next.is_on(), at));
        batch.commit();
        state.switch = Some(next);
    }

    fn force_off(&self, state: &mut HeatPumpState, at: DateTime<Utc>) {
        self.state_channel.write(Value::boolean(false, at));
        state.switch = Some(Switch::Off);
    }

    fn on_temperature(&self, value: &Value) {
        let temperature = value.as_f64();
        if temperature.is_nan() {
            warn!(component = %self.id, "Ignoring non-numeric input temperature");
            return;
        }

        let mut state = lock(&self.state);
        if !state.active {
            return;
        }
        state.temperature = Some(temperature);

        if self.is_unsafe(temperature) {
            warn!(
                component = %self.id,
                temperature,
                limit = self.temp_in_max,
                "🔥 Input temperature limit reached, forcing heat pump off"
            );
            self.force_off(&mut state, value.timestamp);
            return;
        }
        if state.maintenance {
            debug!(component = %self.id, temperature, "In maintenance, hysteresis suppressed");
            return;
        }

        if let Some(next) = self.hysteresis.evaluate(state.switch, temperature) {
            info!(component = %self.id, temperature, "Heat pump switching {}", next);
            self.actuate(&mut state, next, value.timestamp);
        }
    }

    fn on_state(&self, value: &Value) {
        let reported = Switch::from_bool(value.as_bool());
        let mut state = lock(&self.state);
        if !state.active {
            return;
        }

        if reported.is_on() && state.temperature.is_some_and(|t| self.is_unsafe(t)) {
            warn!(
                component = %self.id,
                temperature = ?state.temperature,
                limit = self.temp_in_max,
                "Heat pump reported on above input temperature limit, reversing"
            );
            self.force_off(&mut state, value.timestamp);
            return;
        }

        if reported.is_on() && state.feedback == Some(Switch::Off) {
            state.running_since = Some(value.timestamp);
            debug!(component = %self.id, since = %value.timestamp, "Run began");
        }
        state.feedback = Some(reported);
        state.switch = Some(reported);
    }
}

/// Heat pump with hysteresis on its heating cycle input temperature and a
/// hard input temperature interlock.
pub struct HeatPump {
    inner: Arc<Inner>,
    subscriptions: Subscriptions,
}

impl HeatPump {
    pub fn activate(
        id: impl Into<String>,
        config: &HeatPumpConfig,
        channels: &dyn ChannelProvider,
    ) -> Result<Self> {
        let id = id.into();
        let hysteresis = config.hysteresis()?;
        let temperature = channels.require(&config.temp_in)?;
        let state_channel = channels.require(&config.state)?;

        let switch = state_channel
            .latest()
            .map(|v| Switch::from_bool(v.as_bool()));
        let inner = Arc::new(Inner {
            id,
            hysteresis,
            temp_in_max: config.temp_in_max,
            cop: config.cop,
            state: Mutex::new(HeatPumpState {
                temperature: temperature
                    .latest()
                    .map(|v| v.as_f64())
                    .filter(|t| !t.is_nan()),
                switch,
                feedback: switch,
                active: true,
                ..Default::default()
            }),
            state_channel: state_channel.clone(),
        });

        let subscriptions = Subscriptions::new();
        subscriptions.register(&state_channel, bind(&inner, Inner::on_state));
        subscriptions.register(&temperature, bind(&inner, Inner::on_temperature));

        info!(
            component = %inner.id,
            temp_in = %config.temp_in,
            state = %config.state,
            temp_in_max = config.temp_in_max,
            "Heat pump activated"
        );
        Ok(Self {
            inner,
            subscriptions,
        })
    }

    pub fn set_maintenance(&self, enabled: bool) {
        let mut state = lock(&self.inner.state);
        if state.maintenance != enabled {
            state.maintenance = enabled;
            info!(component = %self.inner.id, enabled, "Maintenance mode changed");
        }
    }

    pub fn is_maintenance(&self) -> bool {
        lock(&self.inner.state).maintenance
    }

    pub fn status(&self) -> HeatPumpStatus {
        let state = lock(&self.inner.state);
        HeatPumpStatus {
            id: self.inner.id.clone(),
            temperature: state.temperature,
            state: state.switch,
            running_since: state.running_since,
            maintenance: state.maintenance,
            cop: self.inner.cop,
        }
    }

    pub fn deactivate(&self) {
        self.subscriptions.release();
        let mut state = lock(&self.inner.state);
        if state.active {
            state.active = false;
            info!(component = %self.inner.id, "Heat pump deactivated");
        }
    }
}

impl Switchable for HeatPump {
    fn id(&self) -> &str {
        &self.inner.id
    }

    /// Rejected while inactive, in maintenance, or while the last input
    /// temperature is at or above the limit. An unknown temperature admits.
    fn start(&self, at: DateTime<Utc>) -> Result<()> {
        let mut state = lock(&self.inner.state);
        if !state.active {
            return Err(DomainError::Inactive(self.inner.id.clone()));
        }
        if state.maintenance {
            return Err(DomainError::Maintenance(self.inner.id.clone()));
        }
        if let Some(temperature) = state.temperature.filter(|t| self.inner.is_unsafe(*t)) {
            return Err(DomainError::UnsafeStart {
                component: self.inner.id.clone(),
                temperature,
                limit: self.inner.temp_in_max,
            });
        }
        self.inner.actuate(&mut state, Switch::On, at);
        info!(component = %self.inner.id, "Heat pump started");
        Ok(())
    }

    fn stop(&self, at: DateTime<Utc>) -> Result<()> {
        let mut state = lock(&self.inner.state);
        if !state.active {
            return Err(DomainError::Inactive(self.inner.id.clone()));
        }
        self.inner.actuate(&mut state, Switch::Off, at);
        info!(component = %self.inner.id, "Heat pump stopped");
        Ok(())
    }
}
