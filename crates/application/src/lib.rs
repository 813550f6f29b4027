//! Application layer - The reactive control engine

pub mod control;
pub mod driver;
pub mod subscription;

pub use control::{
    Circulation, ControlManager, ControlUnit, HeatPump, HeatPumpStatus, Inverter, RelaySwitch,
    Switchable, TwoPointController,
};
pub use driver::DriverActor;
