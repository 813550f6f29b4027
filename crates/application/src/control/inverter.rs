use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use domain::channel::{Channel, ChannelProvider, Value, WriteBatch};
use domain::control::{InverterConfig, SetpointDecision, SetpointInputs, SetpointPipeline};
use domain::error::{DomainError, Result};

use crate::subscription::{Subscriptions, bind, lock};

#[derive(Debug, Default)]
struct InverterState {
    /// Last command taken over from the command stream
    command: Option<f64>,
    /// Last setpoint this controller wrote
    last_setpoint: Option<f64>,
    paused: bool,
    active: bool,
}

struct Inner {
    id: String,
    pipeline: SetpointPipeline,
    command: Arc<dyn Channel>,
    setpoint: Arc<dyn Channel>,
    soc: Arc<dyn Channel>,
    solar: Option<Arc<dyn Channel>>,
    state: Mutex<InverterState>,
}

impl Inner {
    /// Metered power of the secondary source while it is producing.
    fn offset(&self) -> Option<f64> {
        self.solar
            .as_ref()
            .and_then(|c| c.latest())
            .map(|v| v.as_f64())
            .filter(|p| *p > 0.0)
    }

    /// One decision cycle for the accepted command. Yields at most one write.
    fn recompute(&self, state: &mut InverterState, at: DateTime<Utc>) -> Result<()> {
        let Some(command) = state.command else {
            return Ok(());
        };
        let inputs = SetpointInputs {
            command,
            offset: self.offset(),
            state_of_charge: self.soc.latest().map(|v| v.as_f64()),
            last_setpoint: self
                .setpoint
                .latest()
                .map(|v| v.as_f64())
                .or(state.last_setpoint),
        };

        let mut batch = WriteBatch::new();
        match self.pipeline.decide(inputs)? {
            SetpointDecision::Apply(setpoint) => {
                batch.add(&self.setpoint, Value::number(setpoint, at));
                state.last_setpoint = Some(setpoint);
                info!(inverter = %self.id, command, setpoint, offset = ?inputs.offset, "Setpoint applied");
            }
            SetpointDecision::ForceZero => {
                batch.add(&self.setpoint, Value::number(0.0, Utc::now()));
                state.last_setpoint = Some(0.0);
                warn!(
                    inverter = %self.id,
                    soc = ?inputs.state_of_charge,
                    "State of charge out of range, setpoint zeroed"
                );
            }
            SetpointDecision::Unchanged => {
                debug!(inverter = %self.id, command, "Setpoint unchanged");
            }
        }
        batch.commit();
        Ok(())
    }

    fn on_command(&self, value: &Value) {
        let command = value.as_f64();
        let mut state = lock(&self.state);
        if !state.active || state.command == Some(command) {
            return;
        }
        if let Err(e) = self.pipeline.check(command) {
            warn!(inverter = %self.id, error = %e, "Ignoring command");
            return;
        }
        state.command = Some(command);
        if let Err(e) = self.recompute(&mut state, value.timestamp) {
            debug!(inverter = %self.id, error = %e, "Unable to update setpoint");
        }
    }

    fn on_offset(&self, value: &Value) {
        let mut state = lock(&self.state);
        if !state.active || state.paused {
            return;
        }
        if let Err(e) = self.recompute(&mut state, value.timestamp) {
            debug!(inverter = %self.id, error = %e, "Unable to update setpoint");
        }
    }
}

/// Battery inverter turning power commands into bounded setpoints.
pub struct Inverter {
    inner: Arc<Inner>,
    subscriptions: Subscriptions,
}

impl Inverter {
    pub fn activate(
        id: impl Into<String>,
        config: &InverterConfig,
        channels: &dyn ChannelProvider,
    ) -> Result<Self> {
        let id = id.into();
        let pipeline = config.pipeline()?;
        let command = channels.require(&config.command)?;
        let setpoint = channels.require(&config.setpoint)?;
        let soc = channels.require(&config.soc)?;
        let solar = config
            .solar
            .as_ref()
            .map(|c| channels.require(c))
            .transpose()?;

        let inner = Arc::new(Inner {
            id,
            pipeline,
            command: command.clone(),
            setpoint,
            soc,
            solar: solar.clone(),
            state: Mutex::new(InverterState {
                active: true,
                ..Default::default()
            }),
        });

        let subscriptions = Subscriptions::new();
        subscriptions.register(&command, bind(&inner, Inner::on_command));
        if let Some(solar) = &solar {
            subscriptions.register(solar, bind(&inner, Inner::on_offset));
        }

        info!(
            inverter = %inner.id,
            command = %config.command,
            setpoint = %config.setpoint,
            power_min = config.power_min,
            power_max = config.power_max,
            "Inverter activated"
        );
        Ok(Self {
            inner,
            subscriptions,
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Submit a power command.
    ///
    /// A command that differs from the accepted one is published to the
    /// command channel and takes effect when it is delivered back. Resubmitting
    /// the accepted command re-runs the decision, which writes nothing if the
    /// setpoint is already in place. Must not be called from a listener of the
    /// command channel.
    pub fn set(&self, value: Value) -> Result<()> {
        let command = value.as_f64();
        self.inner.pipeline.check(command)?;

        let pending = {
            let mut state = lock(&self.inner.state);
            if !state.active {
                return Err(DomainError::Inactive(self.inner.id.clone()));
            }
            if state.command == Some(command) {
                self.inner.recompute(&mut state, value.timestamp)?;
                false
            } else {
                true
            }
        };
        if pending {
            debug!(inverter = %self.inner.id, command, "Command pending");
            self.inner.command.publish(value);
        }
        Ok(())
    }

    pub fn command(&self) -> Option<f64> {
        lock(&self.inner.state).command
    }

    pub fn last_setpoint(&self) -> Option<f64> {
        lock(&self.inner.state).last_setpoint
    }

    pub fn min_power(&self) -> f64 {
        self.inner.pipeline.power().min()
    }

    pub fn max_power(&self) -> f64 {
        self.inner.pipeline.power().max()
    }

    /// Suspend recomputation on offset changes. Commands are still taken over.
    pub fn pause(&self) {
        lock(&self.inner.state).paused = true;
        info!(inverter = %self.inner.id, "Inverter paused");
    }

    pub fn resume(&self) {
        lock(&self.inner.state).paused = false;
        info!(inverter = %self.inner.id, "Inverter resumed");
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.inner.state).paused
    }

    pub fn deactivate(&self) {
        self.subscriptions.release();
        let mut state = lock(&self.inner.state);
        if state.active {
            state.active = false;
            info!(inverter = %self.inner.id, "Inverter deactivated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::channel::{ChannelId, ChannelWrite};
    use infrastructure::ChannelBus;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn id(s: &str) -> ChannelId {
        ChannelId::new(s).unwrap()
    }

    fn setup(soc: f64) -> (ChannelBus, UnboundedReceiver<ChannelWrite>, Inverter) {
        let (bus, rx) = ChannelBus::new();
        for c in ["inv/command", "inv/setpoint", "bat/soc", "pv/power"] {
            bus.declare(id(c));
        }
        bus.publish(&id("bat/soc"), Value::number(soc, at(0))).unwrap();
        let config = InverterConfig {
            command: id("inv/command"),
            setpoint: id("inv/setpoint"),
            power_min: -5000.0,
            power_max: 5000.0,
            soc: id("bat/soc"),
            soc_min: 10.0,
            soc_max: 90.0,
            solar: Some(id("pv/power")),
        };
        let inverter = Inverter::activate("inv1", &config, &bus).unwrap();
        (bus, rx, inverter)
    }

    fn setpoints(rx: &mut UnboundedReceiver<ChannelWrite>) -> Vec<f64> {
        let mut out = Vec::new();
        while let Ok(write) = rx.try_recv() {
            assert_eq!(write.channel, id("inv/setpoint"));
            out.push(write.value.as_f64());
        }
        out
    }

    #[test]
    fn test_new_command_goes_through_command_stream() {
        let (bus, mut rx, inverter) = setup(50.0);

        inverter.set(Value::number(1500.0, at(1))).unwrap();

        assert_eq!(setpoints(&mut rx), vec![1500.0]);
        assert_eq!(inverter.command(), Some(1500.0));
        let published = bus.get(&id("inv/command")).unwrap().latest().unwrap();
        assert_eq!(published.as_f64(), 1500.0);
    }

    #[test]
    fn test_out_of_bounds_command_is_rejected() {
        let (_bus, mut rx, inverter) = setup(50.0);

        let err = inverter.set(Value::number(7000.0, at(1))).unwrap_err();
        assert!(matches!(err, DomainError::SetpointOutOfBounds { .. }));
        assert!(setpoints(&mut rx).is_empty());
        assert_eq!(inverter.command(), None);
    }

    #[test]
    fn test_out_of_bounds_command_on_stream_is_ignored() {
        let (bus, mut rx, inverter) = setup(50.0);
        inverter.set(Value::number(1000.0, at(1))).unwrap();
        setpoints(&mut rx);

        bus.publish(&id("inv/command"), Value::number(-9000.0, at(2))).unwrap();
        assert!(setpoints(&mut rx).is_empty());
        assert_eq!(inverter.command(), Some(1000.0));
    }

    #[test]
    fn test_offset_samples_recompute_unless_paused() {
        let (bus, mut rx, inverter) = setup(50.0);
        inverter.set(Value::number(1000.0, at(1))).unwrap();
        setpoints(&mut rx);

        bus.publish(&id("pv/power"), Value::number(800.0, at(2))).unwrap();
        assert_eq!(setpoints(&mut rx), vec![1800.0]);

        inverter.pause();
        bus.publish(&id("pv/power"), Value::number(1200.0, at(3))).unwrap();
        assert!(setpoints(&mut rx).is_empty());

        inverter.resume();
        bus.publish(&id("pv/power"), Value::number(0.0, at(4))).unwrap();
        assert_eq!(setpoints(&mut rx), vec![1000.0]);
    }

    #[test]
    fn test_unknown_soc_zeroes_once() {
        let (bus, mut rx) = ChannelBus::new();
        for c in ["inv/command", "inv/setpoint", "bat/soc"] {
            bus.declare(id(c));
        }
        let config = InverterConfig {
            command: id("inv/command"),
            setpoint: id("inv/setpoint"),
            power_min: -5000.0,
            power_max: 5000.0,
            soc: id("bat/soc"),
            soc_min: 10.0,
            soc_max: 90.0,
            solar: None,
        };
        let inverter = Inverter::activate("inv1", &config, &bus).unwrap();

        inverter.set(Value::number(1500.0, at(1))).unwrap();
        assert_eq!(setpoints(&mut rx), vec![0.0]);

        inverter.set(Value::number(1500.0, at(2))).unwrap();
        assert!(setpoints(&mut rx).is_empty());
    }

    #[test]
    fn test_set_after_deactivate_is_rejected() {
        let (_bus, mut rx, inverter) = setup(50.0);
        inverter.deactivate();

        assert_eq!(
            inverter.set(Value::number(100.0, at(1))).unwrap_err(),
            DomainError::Inactive("inv1".to_string())
        );
        assert!(setpoints(&mut rx).is_empty());
    }
}
