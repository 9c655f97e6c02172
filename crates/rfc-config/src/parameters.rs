//! Logon parameters for one backend system.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::DEFAULT_LANGUAGE;
use crate::error::ConfigError;

/// Everything the transport needs to open a session.
///
/// The password is never serialized and never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionParameters {
    /// Application server host.
    pub ashost: String,
    /// Two-digit system number.
    pub sysnr: String,
    /// Three-digit client (tenant) number.
    pub client: String,
    /// Logon user.
    pub user: String,
    /// Logon password.
    #[serde(skip_serializing)]
    pub passwd: String,
    /// One or two letter logon language.
    pub lang: String,
    /// Transport trace level, `0` to `3`.
    pub trace: u8,
    /// Requested codepage. The transport negotiates one when absent.
    pub codepage: Option<String>,
}

impl ConnectionParameters {
    /// Builds parameters for a host, system number and client.
    #[must_use]
    pub fn new(
        ashost: impl Into<String>,
        sysnr: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        Self {
            ashost: ashost.into(),
            sysnr: sysnr.into(),
            client: client.into(),
            ..Self::default()
        }
    }

    /// Sets the logon user and password.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, passwd: impl Into<String>) -> Self {
        self.user = user.into();
        self.passwd = passwd.into();
        self
    }

    /// Sets the logon language.
    #[must_use]
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Requests a specific codepage.
    #[must_use]
    pub fn with_codepage(mut self, codepage: impl Into<String>) -> Self {
        self.codepage = Some(codepage.into());
        self
    }

    /// Sets the transport trace level.
    #[must_use]
    pub const fn with_trace(mut self, trace: u8) -> Self {
        self.trace = trace;
        self
    }

    /// Checks field formats before the parameters reach a transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first field that is empty or
    /// malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ashost.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "ashost" });
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "user" });
        }
        require_digits("sysnr", &self.sysnr, 2, "two digits")?;
        require_digits("client", &self.client, 3, "three digits")?;
        let lang_ok = (1..=2).contains(&self.lang.len())
            && self.lang.chars().all(|c| c.is_ascii_alphabetic());
        if !lang_ok {
            return Err(ConfigError::invalid(
                "lang",
                self.lang.as_str(),
                "one or two letters",
            ));
        }
        if self.trace > 3 {
            return Err(ConfigError::invalid(
                "trace",
                self.trace.to_string(),
                "a level from 0 to 3",
            ));
        }
        if let Some(codepage) = &self.codepage {
            require_digits("codepage", codepage, 4, "four digits")?;
        }
        Ok(())
    }
}

fn require_digits(
    field: &'static str,
    value: &str,
    width: usize,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if value.len() == width && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, expected))
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            ashost: String::new(),
            sysnr: "00".to_owned(),
            client: "000".to_owned(),
            user: String::new(),
            passwd: String::new(),
            lang: DEFAULT_LANGUAGE.to_owned(),
            trace: 0,
            codepage: None,
        }
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("ashost", &self.ashost)
            .field("sysnr", &self.sysnr)
            .field("client", &self.client)
            .field("user", &self.user)
            .field("passwd", &"<redacted>")
            .field("lang", &self.lang)
            .field("trace", &self.trace)
            .field("codepage", &self.codepage)
            .finish()
    }
}
