use std::collections::HashSet;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use domain::channel::ChannelId;
use domain::control::ControllerConfig;
use domain::error::{DomainError, Result};

use crate::drivers::SimulatorConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    pub agent_id: String,
    /// Channels declared on the bus; controllers may only bind to these
    #[serde(default)]
    pub channels: Vec<ChannelId>,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

impl AgentConfig {
    pub fn load(config_dir: &str) -> std::result::Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("agent_id", "ems-agent")?
            // Required so a missing installation file fails loudly
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // e.g. EMS__AGENT_ID=site-7
            .add_source(Environment::with_prefix("EMS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .set_default("agent_id", "ems-agent")?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Cross-record checks the individual records cannot do themselves.
    pub fn validate(&self) -> Result<()> {
        let mut declared = HashSet::new();
        for channel in &self.channels {
            if !declared.insert(channel) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Channel {} declared twice",
                    channel
                )));
            }
        }

        let mut ids = HashSet::new();
        for controller in &self.controllers {
            if !ids.insert(controller.id.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate controller ID: {}",
                    controller.id
                )));
            }
        }

        if let Some(simulator) = &self.simulator {
            if simulator.interval_ms == 0 {
                return Err(DomainError::InvalidConfiguration(
                    "Simulator interval_ms must be greater than zero".to_string(),
                ));
            }
            for channel in simulator.channel_ids() {
                if !declared.contains(channel) {
                    return Err(DomainError::MissingChannel(channel.to_string()));
                }
            }
        }
        Ok(())
    }
}
