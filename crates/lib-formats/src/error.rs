//! Error types for sweep file import and export.

use thiserror::Error;

/// Errors that can occur while reading or writing sweep files.
#[derive(Debug, Error)]
pub enum FormatError {
    /// I/O error reading or writing the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error in a text file.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Invalid value for a field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Structurally invalid file.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat { format: String, message: String },

    /// File extension with no reader or writer.
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nom parsing error (internal).
    #[error("Parse error: {0}")]
    Nom(String),
}

impl FormatError {
    /// Create a syntax error at a specific line.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.into(),
            message: message.into(),
        }
    }
}

/// Convert nom errors to our error type.
impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for FormatError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => FormatError::Nom("Incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let preview: String = e.input.chars().take(20).collect();
                FormatError::Nom(format!("{:?} at '{}...'", e.code, preview))
            }
        }
    }
}

pub type FormatResult<T> = Result<T, FormatError>;
