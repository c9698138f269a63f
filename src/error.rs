//! Error handling for method resolution and sorting

use std::io;
use thiserror::Error;

/// Custom error type for sort and compare operations
#[derive(Error, Debug)]
pub enum SortError {
    #[error("Invalid sort method: {method}")]
    InvalidMethod { method: String },

    #[error("Invalid arguments for method {method}: {message}")]
    InvalidArity { method: String, message: String },

    #[error("Invalid argument for method {method}: {message}")]
    InvalidArgument { method: String, message: String },

    #[error("Element not found in lookup table: {key}")]
    MissingKey { key: String },

    #[error("Field {index} not present in element: {element}")]
    MissingField { index: usize, element: String },

    #[error("Unable to parse {kind}: {value}")]
    Unparsable { kind: ValueKind, value: String },

    #[error("Comparison function failed: {message}")]
    UserFunction { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Permission denied: {file}")]
    PermissionDenied { file: String },

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Conflicting sort options: {message}")]
    ConflictingOptions { message: String },

    #[error("Input is not sorted at line {line}")]
    NotSorted { line: usize },

    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error("Parse error: {message}")]
    ParseError { message: String },
}

/// What an unparsable value was expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Date,
    Ip,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Number => "number",
            ValueKind::Date => "date",
            ValueKind::Ip => "IP address",
        };
        write!(f, "{name}")
    }
}

impl SortError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SortError::PermissionDenied { .. }
            | SortError::FileNotFound { .. }
            | SortError::Io(_) => crate::SORT_FAILURE,

            SortError::NotSorted { .. } => crate::EXIT_FAILURE,

            _ => crate::EXIT_FAILURE,
        }
    }

    /// True for errors raised while resolving a method, before any element is compared
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SortError::InvalidMethod { .. }
                | SortError::InvalidArity { .. }
                | SortError::InvalidArgument { .. }
        )
    }

    /// Create an invalid method error
    pub fn invalid_method(method: &str) -> Self {
        SortError::InvalidMethod {
            method: method.to_string(),
        }
    }

    /// Create an invalid arity error
    pub fn invalid_arity(method: &str, message: &str) -> Self {
        SortError::InvalidArity {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(method: &str, message: &str) -> Self {
        SortError::InvalidArgument {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a missing lookup key error
    pub fn missing_key(key: &str) -> Self {
        SortError::MissingKey {
            key: key.to_string(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(index: usize, element: &str) -> Self {
        SortError::MissingField {
            index,
            element: element.to_string(),
        }
    }

    pub fn unparsable(kind: ValueKind, value: &str) -> Self {
        SortError::Unparsable {
            kind,
            value: value.to_string(),
        }
    }

    /// Create a user function error
    pub fn user_function(message: &str) -> Self {
        SortError::UserFunction {
            message: message.to_string(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(file: &str) -> Self {
        SortError::PermissionDenied {
            file: file.to_string(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        SortError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create a conflicting options error
    pub fn conflicting_options(message: &str) -> Self {
        SortError::ConflictingOptions {
            message: message.to_string(),
        }
    }

    /// Create a not sorted error
    pub fn not_sorted(line: usize) -> Self {
        SortError::NotSorted { line }
    }

    /// Create a parse error
    pub fn parse_error(message: &str) -> Self {
        SortError::ParseError {
            message: message.to_string(),
        }
    }
}

/// Result type for sort operations
pub type SortResult<T> = Result<T, SortError>;

/// Context trait for adding file context to I/O errors
pub trait SortContext<T> {
    fn with_file_context(self, filename: &str) -> SortResult<T>;
}

impl<T> SortContext<T> for Result<T, io::Error> {
    fn with_file_context(self, filename: &str) -> SortResult<T> {
        self.map_err(|io_err| match io_err.kind() {
            io::ErrorKind::PermissionDenied => SortError::permission_denied(filename),
            io::ErrorKind::NotFound => SortError::file_not_found(filename),
            _ => SortError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", filename, io_err),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        assert!(SortError::invalid_method("bogus").is_validation());
        assert!(SortError::invalid_arity("split", "too many").is_validation());
        assert!(SortError::invalid_argument("split", "bad regex").is_validation());
        assert!(!SortError::missing_key("x").is_validation());
        assert!(!SortError::unparsable(ValueKind::Ip, "1.2.3").is_validation());
    }

    #[test]
    fn test_file_context() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.with_file_context("input.txt").unwrap_err();
        assert!(matches!(err, SortError::FileNotFound { ref file } if file == "input.txt"));
        assert_eq!(err.exit_code(), crate::SORT_FAILURE);
    }

    #[test]
    fn test_messages() {
        let err = SortError::unparsable(ValueKind::Date, "yesterday-ish");
        assert_eq!(err.to_string(), "Unable to parse date: yesterday-ish");

        let err = SortError::missing_field(3, "a b");
        assert_eq!(err.to_string(), "Field 3 not present in element: a b");
    }
}
