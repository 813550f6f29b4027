mod simulator;

pub use simulator::{SimulatedChannel, SimulatorConfig, SimulatorDriver};
