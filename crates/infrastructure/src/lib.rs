//! Infrastructure layer - In-process bus, configuration and device drivers

pub mod bus;
pub mod config;
pub mod drivers;

pub use bus::{ChannelBus, LocalChannel};
pub use config::AgentConfig;
pub use drivers::{SimulatedChannel, SimulatorConfig, SimulatorDriver};
