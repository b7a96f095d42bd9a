//! Error types for partial planning and action execution.
//!
//! Every error raised while planning a partial is fatal for the build step
//! that requested it. There is no recoverable path: callers surface the
//! error and stop.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the partials and the local executor.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading version file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A path to sign that is not a directory was given signed framework exceptions.
    #[error(
        "Internal Error: Received a list of signed frameworks as exceptions for code signing, \
         but path to sign is not a directory: {path}"
    )]
    SignedFrameworksOnFile {
        /// The path that was going to be signed
        path: String,
    },

    /// A signed framework exception lies outside the directory being signed.
    #[error(
        "Internal Error: Signed framework does not have the current path to sign ({path}) \
         as its prefix ({framework})"
    )]
    SignedFrameworkOutsidePath {
        /// The directory being signed
        path: String,
        /// The offending signed framework path
        framework: String,
    },

    /// Device build under a rule that requires a provisioning profile, without one.
    #[error(
        "The provisioning_profile attribute must be set for device builds on this platform ({platform})"
    )]
    MissingProvisioningProfile {
        /// Platform type of the build
        platform: String,
    },

    /// A `--define` value could not be interpreted as a boolean.
    #[error("Valid values for --define={name} are: 1|0|true|false|yes|no, got '{value}'")]
    InvalidDefine {
        /// Define name
        name: String,
        /// Rejected value
        value: String,
    },

    /// A `--define` argument was not of the form `key=value`.
    #[error("malformed define '{0}', expected key=value")]
    MalformedDefine(String),

    /// Unrecognized enumerated value in configuration.
    #[error("unsupported {kind} '{value}'")]
    Unsupported {
        /// What kind of value was being parsed
        kind: &'static str,
        /// Rejected value
        value: String,
    },

    /// Child process execution error.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Child process ran but exited unsuccessfully.
    #[error("action {mnemonic} failed ({status}): {stderr}")]
    ActionFailed {
        /// Mnemonic of the failing action
        mnemonic: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// An action must run on macOS but the executor is on another host.
    #[error("action {mnemonic} requires a Darwin execution platform")]
    RequiresDarwin {
        /// Mnemonic of the action
        mnemonic: String,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory (recursive copies).
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// TOML configuration parsing error.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl From<handlebars::TemplateError> for Error {
    fn from(error: handlebars::TemplateError) -> Self {
        Error::Template(Box::new(error))
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with this crate's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying binary".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_error() {
        let result: Result<()> = Err(Error::GenericError("inner".into()));
        let err = result.context("outer").unwrap_err();
        assert_eq!(err.to_string(), "outer: inner");
    }

    #[test]
    fn test_option_context() {
        let value: Option<u8> = None;
        let err = value.context("missing value").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref msg) if msg == "missing value"));
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let result: std::io::Result<()> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.fs_context("reading file", "/tmp/x").unwrap_err();
        assert_eq!(err.to_string(), "reading file /tmp/x: gone");
    }
}
