//! Settings and on-disk layout
//!
//! A run works inside one base directory:
//!
//! ```text
//! <base>/config/config.toml   settings
//! <base>/data/                workbook, attach.txt, signature.txt
//! <base>/logs/log.txt         run journal
//! ```
//!
//! Everything is resolved once into a [`Layout`] and a [`Settings`] value and
//! passed down explicitly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::transport::Credentials;

/// Skeleton written by `payslip init`
pub const DEFAULT_CONFIG: &str = r#"# Payslip mailer settings

[user]
# Sender account, also used to log in to the SMTP server
email = "payroll@example.com"
password = "change-me"
smtp_server = "smtp.example.com"
smtp_port = 587
# true: implicit TLS (usually port 465), false: STARTTLS
enable_ssl = false

[message]
# {period} is replaced with the first record's period cell
subject = "Payslip for {period}"
# Relative paths are resolved against the data directory
workbook = "payroll.xlsx"
send_interval_ms = 1000
display_name_column = 4
period_column = 2
"#;

/// Directory layout rooted at a base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.toml")
    }

    /// Preamble shown above the table
    pub fn attach_file(&self) -> PathBuf {
        self.data_dir().join("attach.txt")
    }

    /// Signature appended below the table
    pub fn signature_file(&self) -> PathBuf {
        self.data_dir().join("signature.txt")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("log.txt")
    }

    /// Resolve a workbook name against the data directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn workbook_path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.data_dir().join(name)
    }

    /// Create the config, data and logs directories
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [self.config_dir(), self.data_dir(), self.logs_dir()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Write [`DEFAULT_CONFIG`] unless a settings file already exists.
    ///
    /// Returns whether a file was written.
    pub fn write_default_config(&self) -> io::Result<bool> {
        let path = self.config_file();
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG)?;
        Ok(true)
    }
}

/// Read an optional text source; a missing file is the empty string
pub fn load_text_source<P: AsRef<Path>>(path: P) -> io::Result<String> {
    match fs::read(path.as_ref()) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Sender account and SMTP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSettings {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    /// Implicit TLS when set, STARTTLS otherwise
    pub enable_ssl: bool,
}

impl UserSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

/// How messages are built and paced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageSettings {
    /// Subject line; `{period}` is replaced with the period cell text
    pub subject: String,
    /// Workbook file name, relative to the data directory
    pub workbook: String,
    /// Pause after each successful send
    pub send_interval_ms: u64,
    /// 1-based column holding the recipient's display name
    pub display_name_column: u32,
    /// 1-based column whose first-record value fills `{period}`
    pub period_column: u32,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            subject: "Payslip for {period}".to_string(),
            workbook: "payroll.xlsx".to_string(),
            send_interval_ms: 1000,
            display_name_column: 4,
            period_column: 2,
        }
    }
}

/// Everything read from `config/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub user: UserSettings,
    pub message: MessageSettings,
}

/// File shape before required keys are checked
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    user: Option<RawUser>,
    #[serde(default)]
    message: MessageSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    email: Option<String>,
    password: Option<String>,
    smtp_server: Option<String>,
    smtp_port: Option<u16>,
    enable_ssl: Option<bool>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        log::debug!("loaded settings from '{}'", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let raw: RawSettings = toml::from_str(text)?;
        let user = raw.user.unwrap_or_default();

        let user = UserSettings {
            email: required(user.email, "user.email")?,
            password: user.password.ok_or(ConfigError::MissingKey("user.password"))?,
            smtp_server: required(user.smtp_server, "user.smtp_server")?,
            smtp_port: user.smtp_port.ok_or(ConfigError::MissingKey("user.smtp_port"))?,
            enable_ssl: user.enable_ssl.ok_or(ConfigError::MissingKey("user.enable_ssl"))?,
        };

        if user.smtp_port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "user.smtp_port",
                reason: "port must be between 1 and 65535".into(),
            });
        }

        let message = raw.message;
        for (key, col) in [
            ("message.display_name_column", message.display_name_column),
            ("message.period_column", message.period_column),
        ] {
            if col == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: "columns are numbered from 1".into(),
                });
            }
        }

        Ok(Self { user, message })
    }
}

/// A present, non-blank string
fn required(value: Option<String>, key: &'static str) -> ConfigResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(ConfigError::InvalidValue {
            key,
            reason: "must not be empty".into(),
        }),
        None => Err(ConfigError::MissingKey(key)),
    }
}
