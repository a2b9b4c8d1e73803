/// Result alias that carries the custom [`SketchError`] type.
pub type Result<T> = std::result::Result<T, SketchError>;

/// Common error type for the core crate.
///
/// The simulation itself never fails; errors only surface at the edges where
/// configuration, pose recordings and images are loaded or frames are written.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unknown body part `{0}`")]
    UnknownBodyPart(String),
    #[error("unknown note `{0}`")]
    UnknownNote(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A thread panicked while holding a shared slot.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl SketchError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for SketchError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SketchError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
