use std::fmt;

/// Main error type for the peer shuffling service
#[derive(Debug)]
pub enum ShuffleError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Node lifecycle and controller errors
    Node(String),

    /// Gossip protocol errors
    Gossip(GossipError),

    /// Transport layer errors
    Transport(String),

    /// Serialization/deserialization errors
    Serialization(SerializationError),

    /// Channel or task coordination errors
    Concurrency(String),
}

/// Gossip protocol specific errors
#[derive(Debug)]
pub enum GossipError {
    /// Wire packet carries a protocol version we do not speak
    Version(u8),
}

/// Serialization related errors
#[derive(Debug)]
pub enum SerializationError {
    /// JSON serialization errors (reports)
    Json(serde_json::Error),

    /// Binary encoding errors (wire packets)
    Encode(bincode::error::EncodeError),

    /// Binary decoding errors (wire packets)
    Decode(bincode::error::DecodeError),
}

impl fmt::Display for ShuffleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShuffleError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ShuffleError::Node(msg) => write!(f, "Node error: {}", msg),
            ShuffleError::Gossip(err) => write!(f, "Gossip error: {}", err),
            ShuffleError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ShuffleError::Serialization(err) => write!(f, "Serialization error: {}", err),
            ShuffleError::Concurrency(msg) => write!(f, "Concurrency error: {}", msg),
        }
    }
}

impl fmt::Display for GossipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GossipError::Version(v) => write!(f, "Unsupported packet version: {}", v),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::Json(err) => write!(f, "JSON: {}", err),
            SerializationError::Encode(err) => write!(f, "Binary encode: {}", err),
            SerializationError::Decode(err) => write!(f, "Binary decode: {}", err),
        }
    }
}

impl std::error::Error for ShuffleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShuffleError::Serialization(err) => Some(err),
            ShuffleError::Gossip(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for GossipError {}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::Json(err) => Some(err),
            SerializationError::Encode(err) => Some(err),
            SerializationError::Decode(err) => Some(err),
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, ShuffleError>;

impl ShuffleError {
    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            ShuffleError::Config(_) => "configuration_error",
            ShuffleError::Node(_) => "node_error",
            ShuffleError::Gossip(_) => "gossip_error",
            ShuffleError::Transport(_) => "transport_error",
            ShuffleError::Serialization(_) => "serialization_error",
            ShuffleError::Concurrency(_) => "concurrency_error",
        }
    }
}

impl From<serde_json::Error> for ShuffleError {
    fn from(err: serde_json::Error) -> Self {
        ShuffleError::Serialization(SerializationError::Json(err))
    }
}

impl From<bincode::error::EncodeError> for ShuffleError {
    fn from(err: bincode::error::EncodeError) -> Self {
        ShuffleError::Serialization(SerializationError::Encode(err))
    }
}

impl From<bincode::error::DecodeError> for ShuffleError {
    fn from(err: bincode::error::DecodeError) -> Self {
        ShuffleError::Serialization(SerializationError::Decode(err))
    }
}

impl From<GossipError> for ShuffleError {
    fn from(err: GossipError) -> Self {
        ShuffleError::Gossip(err)
    }
}

impl From<SerializationError> for ShuffleError {
    fn from(err: SerializationError) -> Self {
        ShuffleError::Serialization(err)
    }
}

impl From<tokio::task::JoinError> for ShuffleError {
    fn from(err: tokio::task::JoinError) -> Self {
        ShuffleError::Concurrency(format!("Task join failed: {}", err))
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::ShuffleError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ShuffleError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::error::ShuffleError::Transport($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ShuffleError::Transport(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! node_error {
    ($msg:expr) => {
        $crate::error::ShuffleError::Node($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ShuffleError::Node(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = ShuffleError::Config("cache size must be positive".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: cache size must be positive"
        );

        let gossip_err: ShuffleError = GossipError::Version(9).into();
        assert_eq!(
            gossip_err.to_string(),
            "Gossip error: Unsupported packet version: 9"
        );
        assert_eq!(gossip_err.error_type(), "gossip_error");
    }

    #[test]
    fn test_macros() {
        let err = config_error!("Shuffle length {} is invalid", 0);
        assert_eq!(
            err.to_string(),
            "Configuration error: Shuffle length 0 is invalid"
        );

        let err = transport_error!("Peer not found: {}", 7);
        assert!(matches!(err, ShuffleError::Transport(_)));
        assert_eq!(err.to_string(), "Transport error: Peer not found: 7");

        let err = node_error!("stopped");
        assert_eq!(err.error_type(), "node_error");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ShuffleError = json_err.into();
        assert!(matches!(
            err,
            ShuffleError::Serialization(SerializationError::Json(_))
        ));
        assert!(std::error::Error::source(&err).is_some());
    }
}
