use thiserror::Error;

/// Errors that can occur in the pixelsmith server core.
#[derive(Error, Debug)]
pub enum PixelsmithError {
    #[error("config error: {message}")]
    Config { message: String },

    #[error("registry error: {message}")]
    Registry { message: String },

    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("tool error: {message}")]
    Tool { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `PixelsmithError`.
pub type Result<T> = std::result::Result<T, PixelsmithError>;
