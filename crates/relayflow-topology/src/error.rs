/*!
 * Error types for the RelayFlow topology crate.
 */
use relayflow_core::types::ChannelId;
use thiserror::Error;

/// Error type for topology construction
#[derive(Error, Debug)]
pub enum Error {
    /// A component could not be constructed
    #[error("Construction error: {0}")]
    Construction(String),

    /// A component was constructed but failed to initialize
    #[error("Failed to initialize {kind} {id}: {reason}")]
    Init {
        /// Component kind
        kind: &'static str,
        /// Component id
        id: ChannelId,
        /// Failure description
        reason: String,
    },

    /// A component needs a channel the registry does not have
    #[error("{component} requires {channel} {id}, which is not registered")]
    MissingChannel {
        /// Component kind
        component: &'static str,
        /// Channel kind
        channel: &'static str,
        /// Channel id
        id: ChannelId,
    },

    /// Peripheral error
    #[error("Peripheral error: {0}")]
    Peripheral(#[from] relayflow_devices::PeripheralError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] relayflow_core::error::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for topology construction
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new construction error
    pub fn construction<S: AsRef<str>>(msg: S) -> Self {
        Error::Construction(msg.as_ref().to_string())
    }

    /// Create a new initialization error
    pub fn init<S: AsRef<str>>(kind: &'static str, id: ChannelId, reason: S) -> Self {
        Error::Init {
            kind,
            id,
            reason: reason.as_ref().to_string(),
        }
    }

    /// Create a new missing channel error
    pub fn missing_channel(component: &'static str, channel: &'static str, id: ChannelId) -> Self {
        Error::MissingChannel {
            component,
            channel,
            id,
        }
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::missing_channel("window_covering", "output", ChannelId::new(2));
        assert_eq!(
            err.to_string(),
            "window_covering requires output 2, which is not registered"
        );

        let err = Error::init("switch", ChannelId::new(1), "relay stuck");
        assert_eq!(err.to_string(), "Failed to initialize switch 1: relay stuck");
    }

    #[test]
    fn test_peripheral_error_converts() {
        let err: Error = relayflow_devices::PeripheralError::metering("bus timeout").into();
        assert!(matches!(err, Error::Peripheral(_)));
    }
}
