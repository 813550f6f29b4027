use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use domain::channel::{Channel, ChannelProvider, Value};
use domain::control::{CirculationConfig, CorrelatedPair, Side};
use domain::error::Result;

use crate::subscription::{Subscriptions, bind, lock};

struct Inner {
    id: String,
    delta: Arc<dyn Channel>,
    pair: Mutex<CorrelatedPair>,
}

impl Inner {
    fn on_sample(&self, side: Side, value: &Value) {
        let delta = lock(&self.pair).update(side, *value);
        if let Some(delta) = delta {
            debug!(
                circulation = %self.id,
                delta = delta.as_f64(),
                at = %delta.timestamp,
                "Temperature delta updated"
            );
            self.delta.publish(delta);
        }
    }
}

/// Publishes outlet minus inlet temperature for samples taken at the same instant.
pub struct Circulation {
    inner: Arc<Inner>,
    subscriptions: Subscriptions,
}

impl Circulation {
    pub fn activate(
        id: impl Into<String>,
        config: &CirculationConfig,
        channels: &dyn ChannelProvider,
    ) -> Result<Self> {
        let id = id.into();
        config.validate()?;
        let outlet = channels.require(&config.temp_out)?;
        let inlet = channels.require(&config.temp_in)?;
        let delta = channels.require(&config.delta)?;

        let inner = Arc::new(Inner {
            id,
            delta,
            pair: Mutex::new(CorrelatedPair::new()),
        });

        let subscriptions = Subscriptions::new();
        subscriptions.register(&inlet, bind(&inner, |c: &Inner, v| c.on_sample(Side::Rhs, v)));
        subscriptions.register(&outlet, bind(&inner, |c: &Inner, v| c.on_sample(Side::Lhs, v)));

        info!(
            circulation = %inner.id,
            temp_out = %config.temp_out,
            temp_in = %config.temp_in,
            delta = %config.delta,
            "Circulation activated"
        );
        Ok(Self {
            inner,
            subscriptions,
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Most recently derived delta.
    pub fn delta(&self) -> Option<Value> {
        self.inner.delta.latest()
    }

    pub fn deactivate(&self) {
        if self.subscriptions.release() > 0 {
            info!(circulation = %self.inner.id, "Circulation deactivated");
        }
    }
}
