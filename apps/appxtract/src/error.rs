//! CLI error handling

use std::fmt;

use appxtract_errors::{ConfigError, PlatformError, UnpackError, UserFacingError};

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(ConfigError),
    /// Pipeline error
    Unpack(UnpackError),
    /// External tool or adapter error
    Platform(PlatformError),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

/// Message followed by the code, hint and retry lines the error provides
fn write_user_facing(f: &mut fmt::Formatter<'_>, err: &dyn UserFacingError) -> fmt::Result {
    write!(f, "{}", err.user_message())?;
    if let Some(code) = err.user_code() {
        write!(f, "\n  Code: {code}")?;
    }
    if let Some(hint) = err.user_hint() {
        write!(f, "\n  Hint: {hint}")?;
    }
    if err.is_retryable() {
        write!(f, "\n  Retry: safe to retry this operation.")?;
    }
    Ok(())
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: ")?;
                write_user_facing(f, e)
            }
            CliError::Unpack(e) => write_user_facing(f, e),
            CliError::Platform(e) => write_user_facing(f, e),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Unpack(e) => Some(e),
            CliError::Platform(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<appxtract_errors::Error> for CliError {
    fn from(e: appxtract_errors::Error) -> Self {
        match e {
            appxtract_errors::Error::Unpack(e) => CliError::Unpack(e),
            appxtract_errors::Error::Config(e) => CliError::Config(e),
            appxtract_errors::Error::Platform(e) => CliError::Platform(e),
            appxtract_errors::Error::Io {
                kind,
                message,
                path,
            } => {
                let message = match path {
                    Some(path) => format!("{}: {message}", path.display()),
                    None => message,
                };
                CliError::Io(std::io::Error::new(kind, message))
            }
        }
    }
}

impl From<UnpackError> for CliError {
    fn from(e: UnpackError) -> Self {
        CliError::Unpack(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
