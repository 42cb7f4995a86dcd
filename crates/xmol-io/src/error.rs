//! Error types for molecular file I/O

use thiserror::Error;

/// Errors that can occur during molecular file reading
#[derive(Error, Debug)]
pub enum IoError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with location information
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Error message
        message: String,
    },

    /// Content matched no sniffing rule
    #[error("Unrecognized format: {0}")]
    UnknownFormat(String),

    /// Format was recognized but no reader is bundled for it
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    /// Invalid record in the file
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// File is empty or contains no atoms
    #[error("Empty file or no atoms found")]
    EmptyFile,

    /// Decompression error
    #[error("Decompression error: {0}")]
    Decompression(String),
}

impl IoError {
    /// Create a parse error at a specific line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a parse error without line information (line 0)
    pub fn parse_msg(message: impl Into<String>) -> Self {
        IoError::Parse {
            line: 0,
            message: message.into(),
        }
    }

    /// Create an invalid record error
    pub fn invalid_record(record: impl Into<String>) -> Self {
        IoError::InvalidRecord(record.into())
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        IoError::MissingField(field.into())
    }

    /// Create an unsupported format error
    pub fn unsupported(format: impl Into<String>) -> Self {
        IoError::Unsupported(format.into())
    }
}

/// Result type for molecular file I/O operations
pub type IoResult<T> = Result<T, IoError>;
