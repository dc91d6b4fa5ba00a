/// Result alias that carries the custom [`TryOnError`] type.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    /// Free-form message for failures that do not warrant a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Input rejected before any work was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Image decoding or encoding failed.
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    /// Configuration or wire payload could not be (de)serialized.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl TryOnError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for TryOnError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TryOnError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
