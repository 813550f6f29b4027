mod driver_actor;

pub use driver_actor::DriverActor;
