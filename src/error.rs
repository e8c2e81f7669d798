//! Error types for the stamping service

use thiserror::Error;

/// Result type alias for stamping operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, rendering or serving a request
#[derive(Error, Debug)]
pub enum Error {
    /// The request is missing required input (e.g. blank text)
    #[error("{0}")]
    ValidationError(String),

    /// `/generate` was called before the template was initialized
    #[error("Template not initialized")]
    NotInitialized,

    /// Request body exceeded the configured limit
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Failed to load or synthesize the template
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Failed to parse, rasterize or encode the composite
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to bind or run the HTTP server
    #[error("Server error: {0}")]
    ServerError(String),
}

impl Error {
    /// HTTP status code reported for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ValidationError(_) => 400,
            Error::NotInitialized => 404,
            Error::PayloadTooLarge(_) => 413,
            Error::TemplateError(_)
            | Error::RenderError(_)
            | Error::Io(_)
            | Error::ConfigError(_)
            | Error::ServerError(_) => 500,
        }
    }

    /// Machine-readable kind reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ValidationError(_) => "validation",
            Error::NotInitialized => "not_initialized",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::TemplateError(_) => "template",
            Error::RenderError(_) => "render",
            Error::Io(_) => "io",
            Error::ConfigError(_) => "config",
            Error::ServerError(_) => "server",
        }
    }

    /// Whether the message is safe to show to a client verbatim.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
