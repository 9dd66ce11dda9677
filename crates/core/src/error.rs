/// Result alias that carries the custom [`AudioCanvasError`] type.
pub type Result<T> = std::result::Result<T, AudioCanvasError>;

/// Common error type for the core crate.
///
/// The per-frame paths (analysis, drawing, clip ticks) never produce one of
/// these; they degrade to empty frames instead. Errors are reserved for
/// configuration mistakes made by the host application.
#[derive(Debug, thiserror::Error)]
pub enum AudioCanvasError {
    /// A builder variant was requested by a name nobody registered.
    #[error("unknown visual variant `{0}`")]
    UnknownVariant(String),
    #[error("no visual owns group `{0}`")]
    UnknownGroup(String),
    /// Input rejected before any work was done.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AudioCanvasError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for AudioCanvasError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AudioCanvasError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
