//! Edge agent - wires the channel bus, controllers and drivers of one installation

pub mod agent;

pub use agent::Agent;
