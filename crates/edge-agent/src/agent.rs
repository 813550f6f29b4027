use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use domain::channel::ChannelWrite;

use application::{ControlManager, ControlUnit, DriverActor};
use infrastructure::{AgentConfig, ChannelBus, SimulatorDriver};

/// A running installation: bus, activated controllers and the driver feeding them.
pub struct Agent {
    agent_id: String,
    bus: Arc<ChannelBus>,
    manager: Arc<ControlManager>,
    cancel_token: CancellationToken,
    driver_handle: JoinHandle<()>,
}

impl Agent {
    /// Declare the channels, activate the controllers and spawn the driver.
    ///
    /// Must be called from within a Tokio runtime. Controllers that fail to
    /// activate are logged and left out; the rest keep running.
    pub fn start(config: &AgentConfig) -> Result<Self> {
        config
            .validate()
            .with_context(|| format!("Invalid configuration for agent {}", config.agent_id))?;

        let (bus, writes) = ChannelBus::new();
        for channel in &config.channels {
            bus.declare(channel.clone());
        }
        let bus = Arc::new(bus);
        info!(channels = bus.len(), "📡 Channel bus ready");

        let manager = Arc::new(ControlManager::new(bus.clone()));
        let failures = manager.activate_all(&config.controllers);
        if !failures.is_empty() {
            let inactive: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
            warn!(?inactive, "⚠️ Running with inactive controllers");
        }

        let (cancel_token, driver_handle) = match &config.simulator {
            Some(simulator) => {
                let interval = Duration::from_millis(simulator.interval_ms);
                let driver = SimulatorDriver::new(simulator.clone());
                let actor = DriverActor::new(Box::new(driver), bus.clone(), writes, interval);
                (actor.cancel_token(), tokio::spawn(actor.run()))
            }
            None => {
                warn!("No driver configured, writes will only be logged");
                let token = CancellationToken::new();
                let handle = tokio::spawn(log_writes(writes, token.clone()));
                (token, handle)
            }
        };

        Ok(Self {
            agent_id: config.agent_id.clone(),
            bus,
            manager,
            cancel_token,
            driver_handle,
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn bus(&self) -> &Arc<ChannelBus> {
        &self.bus
    }

    pub fn manager(&self) -> &ControlManager {
        &self.manager
    }

    /// Snapshot of every active controller, for status logging.
    pub fn status(&self) -> serde_json::Value {
        status_of(&self.agent_id, &self.manager)
    }

    /// Status snapshots that outlive borrows of the agent, for periodic reports.
    pub fn status_source(&self) -> impl Fn() -> serde_json::Value + Send + 'static {
        let agent_id = self.agent_id.clone();
        let manager = self.manager.clone();
        move || status_of(&agent_id, &manager)
    }

    /// Deactivate every controller, then stop the driver.
    pub async fn shutdown(self) -> Result<()> {
        self.manager.deactivate_all();
        self.cancel_token.cancel();
        self.driver_handle
            .await
            .context("Driver task terminated abnormally")?;
        info!(agent = %self.agent_id, "Agent stopped");
        Ok(())
    }
}

async fn log_writes(mut writes: mpsc::UnboundedReceiver<ChannelWrite>, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            write = writes.recv() => match write {
                Some(w) => {
                    info!(channel = %w.channel, value = w.value.as_f64(), "Write without driver")
                }
                None => break,
            },
        }
    }
}

fn status_of(agent_id: &str, manager: &ControlManager) -> serde_json::Value {
    let controllers: Vec<serde_json::Value> = manager
        .ids()
        .iter()
        .filter_map(|id| manager.get(id).map(|unit| (id, unit)))
        .map(|(id, unit)| match unit {
            ControlUnit::HeatPump(hp) => {
                json!({ "id": id, "kind": "HeatPump", "status": hp.status() })
            }
            ControlUnit::TwoPoint(tp) => {
                json!({ "id": id, "kind": "TwoPoint", "state": tp.state() })
            }
            ControlUnit::Inverter(inv) => json!({
                "id": id,
                "kind": "Inverter",
                "command": inv.command(),
                "setpoint": inv.last_setpoint(),
                "paused": inv.is_paused(),
            }),
            ControlUnit::Circulation(c) => json!({
                "id": id,
                "kind": "Circulation",
                "delta": c.delta().map(|v| v.as_f64()),
            }),
        })
        .collect();

    json!({ "agent_id": agent_id, "controllers": controllers })
}
