use thiserror::Error;

/// Domain-level errors
///
/// Configuration faults are fatal at activation time; everything else is an
/// operational rejection the controller recovers from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    #[error("Invalid controller configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Channel not bound: {0}")]
    MissingChannel(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Setpoint out of bounds: {value} not within [{min}, {max}]")]
    SetpointOutOfBounds { value: f64, min: f64, max: f64 },

    #[error(
        "Unable to switch on {component}: input temperature {temperature} above threshold {limit}"
    )]
    UnsafeStart {
        component: String,
        temperature: f64,
        limit: f64,
    },

    #[error("Component {0} is in maintenance")]
    Maintenance(String),

    #[error("Component {0} is not active")]
    Inactive(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Driver error: {0}")]
    DriverError(String),
}

impl DomainError {
    /// Whether this error means the component must not be activated.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidChannelId(_)
                | Self::InvalidConfiguration(_)
                | Self::MissingChannel(_)
                | Self::UnknownComponent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
