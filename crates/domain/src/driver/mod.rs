mod channel_driver;
mod connection_state;

pub use channel_driver::ChannelDriver;
pub use connection_state::ConnectionState;
