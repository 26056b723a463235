//! Environment variable utilities for safe and validated access.
//!
//! Variables are not only checked for presence but also for non-empty,
//! trimmed content. Typed values are parsed with [`std::str::FromStr`].

use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when accessing environment variables.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnvVarError {
    /// Environment variable is not set
    #[error(
        "Environment variable '{name}' not found. Please set this variable in your .env file or environment."
    )]
    NotFound { name: String },

    /// Environment variable contains invalid UTF-8 characters
    #[error(
        "Environment variable '{name}' contains invalid UTF-8 characters. Please check the value."
    )]
    InvalidUtf8 { name: String },

    /// Environment variable is set but contains only whitespace or is empty
    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },

    /// Environment variable is set but its value cannot be parsed
    #[error("Environment variable '{name}' has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Utility functions for safe environment variable handling.
///
/// All methods trim whitespace and treat blank values as missing.
///
/// # Examples
///
/// ```no_run
/// use tables::utils::EnvUtils;
///
/// let table = EnvUtils::get_validated_var("TABLES_TABLE_NAME")?;
/// let timeout: Option<u64> = EnvUtils::get_optional_parsed_var("TABLES_REQUEST_TIMEOUT_SECS")?;
/// ```
pub struct EnvUtils;

impl EnvUtils {
    /// Checks if an environment variable exists and has a non-empty value.
    pub fn has_non_empty_var(name: &str) -> bool {
        match std::env::var(name) {
            Ok(value) => !value.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Gets an environment variable with validation.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError`] if:
    /// - The variable is not set ([`EnvVarError::NotFound`])
    /// - The variable is empty or contains only whitespace ([`EnvVarError::Empty`])
    /// - The variable contains invalid UTF-8 ([`EnvVarError::InvalidUtf8`])
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// Gets an optional environment variable.
    ///
    /// Returns `None` if the variable is missing, empty, or invalid.
    pub fn get_optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }

    /// Gets an optional environment variable and parses it into `T`.
    ///
    /// A missing or blank variable yields `Ok(None)`; a present value that
    /// fails to parse is an error rather than being silently ignored.
    pub fn get_optional_parsed_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::get_optional_var(name) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| EnvVarError::InvalidValue {
                    name: name.to_string(),
                    reason: e.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }
}
