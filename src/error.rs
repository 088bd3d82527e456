use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from reading input or config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Tree data could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured render target does not exist in the document.
    #[error("Render target not found: {0}")]
    MissingRenderTarget(String),

    /// Flat records whose parent chain never reaches the root.
    #[error("Unreachable records (cyclic parentId chain): {}", .0.join(", "))]
    UnreachableRecords(Vec<String>),

    /// Logging could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),
}
