//! Error types for fabric operations

use thiserror::Error;

/// Main error type for fabric operations
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NetworkError {
    /// Errors a caller can be told about before anything enters the queue.
    pub fn is_validation(&self) -> bool {
        matches!(self, NetworkError::Validation(_) | NetworkError::Api(_))
    }

    /// Errors only the applier observes; they fail the action in flight.
    pub fn is_device(&self) -> bool {
        matches!(self, NetworkError::Device(_))
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        ValidationError::BadArgument {
            message: message.into(),
        }
        .into()
    }

    pub fn illegal_operation(message: impl Into<String>) -> Self {
        ValidationError::IllegalOperation {
            message: message.into(),
        }
        .into()
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
        .into()
    }
}

/// Request-time rejections; nothing has touched a device yet
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid VLAN specification '{spec}': {reason}")]
    InvalidVlanSpec { spec: String, reason: String },

    #[error("Channel {channel} is not legal for network {network}")]
    IllegalChannel { channel: String, network: String },

    #[error("Bad argument: {message}")]
    BadArgument { message: String },

    #[error("Schema validation failed for {driver} switch: {message}")]
    Schema { driver: String, message: String },

    #[error("Illegal operation: {message}")]
    IllegalOperation { message: String },

    #[error("Blocked: {message}")]
    Blocked { message: String },
}

/// Failures talking to, or understanding, a physical switch
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Communication with switch {switch} failed: {message}")]
    Communication { switch: String, message: String },

    #[error("Command batch '{operation}' on switch {switch} timed out after {seconds}s")]
    Timeout {
        switch: String,
        operation: String,
        seconds: u64,
    },

    #[error("Unexpected state on {switch} port {port}: {message}")]
    UnexpectedState {
        switch: String,
        port: String,
        message: String,
    },
}

/// Lookup and authorization errors raised by the request layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Resource conflict: {resource} - {message}")]
    Conflict { resource: String, message: String },

    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },
}

impl From<fabric_shared_types::SharedTypeError> for NetworkError {
    fn from(err: fabric_shared_types::SharedTypeError) -> Self {
        NetworkError::bad_argument(err.to_string())
    }
}
