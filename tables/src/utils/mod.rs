//! # Utilities Module
//!
//! Small helpers shared across the crate.
//!
//! ### Environment Variable Utilities
//!
//! The [`env`] module provides safe and validated access to environment variables,
//! used by [`crate::config::TableServiceConfig::from_env`]:
//!
//! ```no_run
//! use tables::utils::env::EnvUtils;
//!
//! if EnvUtils::has_non_empty_var("TABLES_ACCOUNT_URL") {
//!     let url = EnvUtils::get_validated_var("TABLES_ACCOUNT_URL")?;
//!     println!("Account URL: {}", url);
//! }
//!
//! let timeout = EnvUtils::get_optional_var("TABLES_REQUEST_TIMEOUT_SECS")
//!     .unwrap_or_else(|| "30".to_string());
//! ```

pub mod env;

pub use env::{EnvUtils, EnvVarError};
