//! The reactive controllers and their lifecycle.
//!
//! Each controller owns one state record behind one mutex. Channel listeners
//! hold only weak references to it, and deactivation unsubscribes before the
//! state is dropped.

mod circulation;
mod heat_pump;
mod inverter;
mod manager;
mod switchable;
mod two_point;

pub use circulation::Circulation;
pub use heat_pump::{HeatPump, HeatPumpStatus};
pub use inverter::Inverter;
pub use manager::{ControlManager, ControlUnit};
pub use switchable::{RelaySwitch, Switchable};
pub use two_point::TwoPointController;
