//! Error types for xsd-assembly
//!
//! Assembly findings (missing attributes, namespace conflicts, unreadable
//! documents reached through a reference) are not errors: they are recorded
//! as messages on the load request that produced them. The types here cover
//! the failures of the individual building blocks (reading a file, parsing a
//! document, loading a catalog), which the engine converts into messages.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsd-assembly operations
#[derive(Error, Debug)]
pub enum Error {
    /// XML document could not be parsed, or is not a schema document
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Resource could not be located or read
    #[error("resource error: {0}")]
    Resource(String),

    /// Catalog document could not be loaded
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short human-readable reason, as shown in assembly messages.
    ///
    /// Parser messages often carry a general prefix followed by the useful
    /// part in parentheses; only the parenthesized detail is kept when present.
    pub fn reason(&self) -> String {
        match self {
            Error::Parse(e) => parenthesized_detail(&e.message).unwrap_or_else(|| e.message.clone()),
            Error::Resource(msg) | Error::Catalog(msg) | Error::LimitExceeded(msg) => msg.clone(),
            Error::Io(e) => e.to_string(),
            Error::Url(e) => e.to_string(),
            Error::Other(msg) => msg.clone(),
        }
    }

    /// Whether this error came from reading a file rather than parsing it
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Resource(_))
    }
}

/// Extract the text inside the outermost parentheses of `msg`, if any.
fn parenthesized_detail(msg: &str) -> Option<String> {
    let open = msg.find('(')?;
    let close = msg.rfind(')')?;
    if close <= open + 1 {
        return None;
    }
    Some(msg[open + 1..close].trim().to_string())
}

/// Document parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the document (`line:column`)
    pub location: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, " at {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
