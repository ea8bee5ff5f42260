//! Error types for configuration and dispatch

use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for a dispatch run
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read
    #[error("cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has mistyped values
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent
    #[error("missing required setting '{0}'")]
    MissingKey(&'static str),

    /// A key is present but its value cannot be used
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Fatal errors of a dispatch run.
///
/// All of these are raised before the first message is sent; a failed send
/// is recorded per record instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Settings are missing or malformed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The workbook could not be read
    #[error("cannot read workbook: {0}")]
    Read(#[from] payslip_xlsx::XlsxError),

    /// The sheet has no rows, so there is no header to build a message from
    #[error("sheet '{0}' has no rows")]
    EmptySheet(String),
}
