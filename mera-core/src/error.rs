use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated snapshot, descriptor or archive content.
    #[error("Format error: {0}")]
    Format(String),

    /// Bad arguments: unit/variable mismatch, out-of-range levels, bad masks...
    #[error("Usage error: {0}")]
    Usage(String),

    /// Absent snapshot, metadata file or physics component.
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Unknown {kind}: {key}")]
    KeyNotFound { kind: &'static str, key: String },

    /// The operation has no defined result on zero rows (or zero weight).
    #[error("Empty selection: {0}")]
    EmptySelection(String),
}

impl MeraError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    pub fn unknown_variable(key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind: "variable",
            key: key.into(),
        }
    }

    pub fn unknown_unit(key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind: "unit",
            key: key.into(),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, MeraError>;
