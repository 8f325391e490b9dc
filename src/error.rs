use std::path::PathBuf;
use thiserror::Error;

/// Sourcedoc error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Invalid module identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Failed to import {module}: {cause}")]
    ImportFailure {
        module: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expected {expected}, got: {path}")]
    TypeMismatch { expected: &'static str, path: PathBuf },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Duplicate documentation url {url}: {first} and {second}")]
    DuplicateUrl {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for sourcedoc operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Wrap a load failure for `module`. Already wrapped failures pass through.
    pub fn import_failure(module: impl Into<String>, cause: Error) -> Self {
        match cause {
            Error::ImportFailure { .. } | Error::InvalidIdentifier(_) => cause,
            cause => Error::ImportFailure {
                module: module.into(),
                cause: Box::new(cause),
            },
        }
    }

    /// Create a type mismatch error for a path-bearing value
    pub fn type_mismatch(expected: &'static str, path: impl Into<PathBuf>) -> Self {
        Error::TypeMismatch {
            expected,
            path: path.into(),
        }
    }

    /// True for errors meaning "this thing does not exist"
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::ImportFailure { cause, .. } => cause.is_not_found(),
            _ => false,
        }
    }
}
