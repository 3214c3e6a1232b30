use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpioControlError {
    // Configuration
    #[error("Invalid pin key '{0}': expected bcm<N>")]
    InvalidPinKey(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("At least one playlist must be configured")]
    EmptyPlaylists,
    #[error("Invalid value '{1}' for option '{0}'")]
    InvalidOption(String, String),

    // Hardware setup
    #[error("Pin {0} is not available on this pin controller")]
    UnknownPin(u8),
    #[error("Hardware Error: {0}")]
    Hardware(String),
    #[error("Cannot spawn thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    // Dispatch
    #[error("No settings registered for pin {0}")]
    UnconfiguredPin(u8),
    #[error("Could not find input handler for event: {0}")]
    UnknownEvent(String),

    #[error("No playlist with name {0} found")]
    PlaylistNotFound(String),

    #[error("Playback core Error: {0}")]
    Core(String),
}

impl GpioControlError {
    pub fn core_error(message: impl Into<String>) -> Self {
        GpioControlError::Core(message.into())
    }

    pub fn hardware_error(message: impl Into<String>) -> Self {
        GpioControlError::Hardware(message.into())
    }

    pub fn invalid_option(key: &str, value: impl ToString) -> Self {
        GpioControlError::InvalidOption(key.to_string(), value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GpioControlError>;
