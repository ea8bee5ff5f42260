//! Message transports
//!
//! A transport never fails the run: every problem on the way to the
//! recipient comes back as [`SendOutcome::Failed`] and the dispatch loop
//! moves on to the next record.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::{self, authentication};
use lettre::Transport as _;

use crate::config::UserSettings;

/// Login for the sending account
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Result of handing one message to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Not delivered, with a human-readable reason
    Failed(String),
}

/// Something that can deliver an HTML message to one address
pub trait Transport {
    fn send(&mut self, to: &str, subject: &str, html_body: &str, credentials: &Credentials)
        -> SendOutcome;
}

/// Blocking SMTP delivery.
///
/// One connection per message: log in, send, quit.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    server: String,
    port: u16,
    implicit_tls: bool,
    timeout: Option<Duration>,
}

impl SmtpTransport {
    /// Connection settings from the `[user]` section
    pub fn new(user: &UserSettings) -> Self {
        Self {
            server: user.smtp_server.clone(),
            port: user.smtp_port,
            implicit_tls: user.enable_ssl,
            timeout: Some(Duration::from_secs(60)),
        }
    }

    fn mailer(&self, credentials: &Credentials) -> Result<smtp::SmtpTransport, smtp::Error> {
        let builder = if self.implicit_tls {
            smtp::SmtpTransport::relay(&self.server)?
        } else {
            smtp::SmtpTransport::starttls_relay(&self.server)?
        };

        Ok(builder
            .port(self.port)
            .credentials(authentication::Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .timeout(self.timeout)
            .build())
    }

    fn try_send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        credentials: &Credentials,
    ) -> Result<(), String> {
        let from: Mailbox = credentials
            .username
            .parse()
            .map_err(|e| format!("invalid sender address '{}': {}", credentials.username, e))?;
        let to_box: Mailbox = to
            .parse()
            .map_err(|e| format!("invalid recipient address '{}': {}", to, e))?;

        let message = lettre::Message::builder()
            .from(from)
            .to(to_box)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("cannot build message: {}", e))?;

        let mailer = self.mailer(credentials).map_err(|e| e.to_string())?;
        mailer.send(&message).map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl Transport for SmtpTransport {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        html_body: &str,
        credentials: &Credentials,
    ) -> SendOutcome {
        log::debug!(
            "connecting to {}:{} ({})",
            self.server,
            self.port,
            if self.implicit_tls { "TLS" } else { "STARTTLS" }
        );
        match self.try_send(to, subject, html_body, credentials) {
            Ok(()) => SendOutcome::Delivered,
            Err(reason) => SendOutcome::Failed(reason),
        }
    }
}

/// Writes each message to `<dir>/<n>-<address>.html` instead of sending it
#[derive(Debug, Clone)]
pub struct PreviewTransport {
    dir: PathBuf,
    written: usize,
}

impl PreviewTransport {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    /// Number of messages written so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn file_name(index: usize, to: &str) -> String {
        let safe: String = to
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '@' | '.' | '-' | '_' | '+' => c,
                _ => '_',
            })
            .collect();
        format!("{}-{}.html", index, safe)
    }
}

impl Transport for PreviewTransport {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        html_body: &str,
        _credentials: &Credentials,
    ) -> SendOutcome {
        let path = self.dir.join(Self::file_name(self.written + 1, to));
        let contents = format!(
            "<!-- to: {} -->\n<!-- subject: {} -->\n{}",
            to, subject, html_body
        );

        let result = fs::create_dir_all(&self.dir).and_then(|()| fs::write(&path, contents));
        match result {
            Ok(()) => {
                self.written += 1;
                log::debug!("wrote preview '{}'", path.display());
                SendOutcome::Delivered
            }
            Err(e) => SendOutcome::Failed(format!("cannot write {}: {}", path.display(), e)),
        }
    }
}
