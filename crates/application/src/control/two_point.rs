use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use domain::channel::{ChannelProvider, Value};
use domain::control::{Hysteresis, Switch, TwoPointConfig};
use domain::error::Result;

use super::Switchable;
use crate::subscription::{Subscriptions, bind, lock};

struct TwoPointState {
    switch: Switch,
    active: bool,
}

struct Inner {
    id: String,
    hysteresis: Hysteresis,
    target: Arc<dyn Switchable>,
    state: Mutex<TwoPointState>,
}

impl Inner {
    fn on_temperature(&self, value: &Value) {
        let temperature = value.as_f64();
        let mut state = lock(&self.state);
        if !state.active {
            return;
        }

        let Some(next) = self.hysteresis.evaluate(Some(state.switch), temperature) else {
            debug!(controller = %self.id, temperature, state = %state.switch, "Within band");
            return;
        };

        let result = match next {
            Switch::On => self.target.start(value.timestamp),
            Switch::Off => self.target.stop(value.timestamp),
        };
        match result {
            Ok(()) => {
                info!(
                    controller = %self.id,
                    target = self.target.id(),
                    temperature,
                    "Switched {}", next
                );
                state.switch = next;
            }
            // State is kept so the next sample retries
            Err(e) => warn!(
                controller = %self.id,
                target = self.target.id(),
                error = %e,
                "Actuation rejected"
            ),
        }
    }
}

/// Hysteresis control of a [`Switchable`] target from one temperature stream.
pub struct TwoPointController {
    inner: Arc<Inner>,
    subscriptions: Subscriptions,
}

impl TwoPointController {
    pub fn activate(
        id: impl Into<String>,
        config: &TwoPointConfig,
        target: Arc<dyn Switchable>,
        channels: &dyn ChannelProvider,
    ) -> Result<Self> {
        let id = id.into();
        let hysteresis = config.hysteresis()?;
        let temperature = channels.require(&config.temp)?;

        let inner = Arc::new(Inner {
            id,
            hysteresis,
            target,
            state: Mutex::new(TwoPointState {
                switch: Switch::Off,
                active: true,
            }),
        });

        let subscriptions = Subscriptions::new();
        subscriptions.register(&temperature, bind(&inner, Inner::on_temperature));

        info!(
            controller = %inner.id,
            temp = %config.temp,
            target = inner.target.id(),
            min = hysteresis.thresholds().min(),
            max = hysteresis.thresholds().max(),
            "Two-point control activated"
        );
        Ok(Self {
            inner,
            subscriptions,
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> Switch {
        lock(&self.inner.state).switch
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.state).active
    }

    pub fn deactivate(&self) {
        self.subscriptions.release();
        let mut state = lock(&self.inner.state);
        if state.active {
            state.active = false;
            info!(controller = %self.inner.id, "Two-point control deactivated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use domain::error::DomainError;
    use domain::channel::ChannelId;
    use infrastructure::ChannelBus;

    /// Records actuation calls; rejects starts while `reject` is set.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<bool>>,
        reject: Mutex<bool>,
    }

    impl Switchable for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }
        fn start(&self, _at: DateTime<Utc>) -> Result<()> {
            if *self.reject.lock().unwrap() {
                return Err(DomainError::Maintenance("recorder".into()));
            }
            self.calls.lock().unwrap().push(true);
            Ok(())
        }
        fn stop(&self, _at: DateTime<Utc>) -> Result<()> {
            self.calls.lock().unwrap().push(false);
            Ok(())
        }
    }

    fn setup(min: f64, max: f64) -> (ChannelBus, Arc<Recorder>, Result<TwoPointController>) {
        let (bus, _rx) = ChannelBus::new();
        bus.declare(ChannelId::new("buffer/temp").unwrap());
        let recorder = Arc::new(Recorder::default());
        let config = TwoPointConfig {
            temp: ChannelId::new("buffer/temp").unwrap(),
            temp_min: min,
            temp_max: max,
            target: domain::control::SwitchTarget::Component("recorder".into()),
        };
        let controller = TwoPointController::activate("buffer", &config, recorder.clone(), &bus);
        (bus, recorder, controller)
    }

    fn feed(bus: &ChannelBus, temps: &[f64]) {
        let id = ChannelId::new("buffer/temp").unwrap();
        for t in temps {
            bus.publish(&id, Value::number(*t, Utc::now())).unwrap();
        }
    }

    #[test]
    fn test_one_actuation_per_transition() {
        let (bus, recorder, controller) = setup(40.0, 55.0);
        let controller = controller.unwrap();

        feed(&bus, &[50.0, 39.0, 38.0, 45.0, 56.0, 60.0, 50.0]);

        assert_eq!(*recorder.calls.lock().unwrap(), vec![true, false]);
        assert_eq!(controller.state(), Switch::Off);
    }

    #[test]
    fn test_rejected_start_is_retried() {
        let (bus, recorder, controller) = setup(40.0, 55.0);
        let controller = controller.unwrap();

        *recorder.reject.lock().unwrap() = true;
        feed(&bus, &[39.0]);
        assert_eq!(controller.state(), Switch::Off);

        *recorder.reject.lock().unwrap() = false;
        feed(&bus, &[39.5]);
        assert_eq!(controller.state(), Switch::On);
        assert_eq!(*recorder.calls.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_inverted_band_refuses_activation() {
        let (_bus, _recorder, controller) = setup(55.0, 40.0);
        match controller {
            Err(e) => assert!(e.is_configuration()),
            Ok(_) => panic!("Activation should fail for min >= max"),
        }
    }

    #[test]
    fn test_no_actuation_after_deactivate() {
        let (bus, recorder, controller) = setup(40.0, 55.0);
        let controller = controller.unwrap();

        controller.deactivate();
        feed(&bus, &[20.0]);

        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(!controller.is_active());
    }
}
