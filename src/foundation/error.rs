/// Convenience result type used across Pixli.
pub type PixliResult<T> = Result<T, PixliError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum PixliError {
    /// Invalid user-provided state, configuration or snapshot data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while compiling or sampling motion functions.
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors while evaluating a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A protocol adapter could not decode or encode a message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A protocol adapter lost (or never established) its transport.
    #[error("connection error: {0}")]
    Connection(String),

    /// Frame buffers could not be allocated or did not match their declared size.
    #[error("resource error: {0}")]
    Resource(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PixliError {
    /// Build a [`PixliError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PixliError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`PixliError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`PixliError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`PixliError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`PixliError::Connection`] value.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Build a [`PixliError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}

impl From<serde_json::Error> for PixliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
