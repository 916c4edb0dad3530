//! Configuration types.
//!
//! Settings come from environment variables, optionally backed by a dotenv
//! style settings file. `from_lookup` takes the lookup as a closure so tests
//! never touch the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::correlation::CorrelationPolicy;
use crate::error::ConfigError;
use crate::poller::PollPolicy;

/// Default whole-run deadline: 20 minutes.
const DEFAULT_DEADLINE_SECS: u64 = 1200;

/// Variable naming an explicit settings file.
pub const SETTINGS_FILE_VAR: &str = "INBOX_CHECK_CONFIG";

/// Settings file read from the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = ".env";

/// Remote document API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including scheme, without trailing slash.
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
    /// Per-call HTTP timeout.
    pub request_timeout: Duration,
}

/// Outbound email settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender_address: String,
    pub sender_password: SecretString,
    /// Document-processing inbox the attachment is sent to.
    pub inbox_address: String,
    pub subject: String,
    pub body: String,
    /// Connect and read/write timeout of the SMTP session.
    pub timeout: Duration,
}

/// Full configuration of one check run.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub api: ApiConfig,
    pub email: EmailConfig,
    /// File sent as the attachment.
    pub file_path: PathBuf,
    pub correlation: CorrelationPolicy,
    pub polling: PollPolicy,
    /// Whole-pipeline deadline; `None` waits for the round budgets only.
    pub deadline: Option<Duration>,
    /// Settings file the values were backed by, if one was read.
    pub settings_file: Option<PathBuf>,
}

impl CheckerConfig {
    /// Build config from the process environment.
    ///
    /// Values missing from the environment fall back to the settings file named
    /// by `INBOX_CHECK_CONFIG`, or `.env` in the working directory when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let explicit = std::env::var(SETTINGS_FILE_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let file = SettingsFile::load(explicit.as_deref())?;

        let mut config = Self::from_lookup(file.layered(|key| std::env::var(key).ok()))?;
        config.settings_file = file.path().map(Path::to_path_buf);
        Ok(config)
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let request_timeout = Duration::from_secs(env.parsed("REQUEST_TIMEOUT_SECS", 30)?);
        let api = ApiConfig {
            base_url: normalize_base_url(&env.required("API_URL")?),
            username: env.required("ROSSUM_USER")?,
            password: SecretString::from(env.required("ROSSUM_PASSWORD")?),
            request_timeout,
        };

        let email = EmailConfig {
            smtp_host: env
                .optional("SMTP_HOST")
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: env.parsed("SMTP_PORT", 465)?,
            sender_address: env.required("SENDER_EMAIL_ADDRESS")?,
            sender_password: SecretString::from(env.required("SENDER_EMAIL_PASSWORD")?),
            inbox_address: env.required("EMAIL")?,
            subject: env
                .optional("EMAIL_SUBJECT")
                .unwrap_or_else(|| "Sample invoice file".to_string()),
            body: env
                .optional("EMAIL_BODY")
                .unwrap_or_else(|| "Process data from the attached file".to_string()),
            timeout: request_timeout,
        };

        let defaults = CorrelationPolicy::default();
        let correlation = CorrelationPolicy {
            max_rounds: env.positive("CORRELATION_MAX_ROUNDS", defaults.max_rounds)?,
            round_delay: Duration::from_secs(
                env.parsed("CORRELATION_ROUND_DELAY_SECS", defaults.round_delay.as_secs())?,
            ),
        };

        let defaults = PollPolicy::default();
        let polling = PollPolicy {
            max_rounds: env.positive("POLL_MAX_ROUNDS", defaults.max_rounds)?,
            delay: Duration::from_secs(env.parsed("POLL_DELAY_SECS", defaults.delay.as_secs())?),
        };

        let deadline = match env.parsed("CHECK_DEADLINE_SECS", DEFAULT_DEADLINE_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            api,
            email,
            file_path: PathBuf::from(env.required("FILE_NAME")?),
            correlation,
            polling,
            deadline,
            settings_file: None,
        })
    }

    /// Name the remote service records for the attachment.
    pub fn attachment_name(&self) -> String {
        attachment_name(&self.file_path)
    }
}

/// Final path component of the attachment, as the inbox sees it.
pub fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Prefix `https://` when no scheme is given and drop any trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Key/value pairs read from a dotenv style settings file.
#[derive(Debug, Default)]
pub struct SettingsFile {
    path: Option<PathBuf>,
    values: HashMap<String, String>,
}

impl SettingsFile {
    /// Read `explicit`, or `.env` when no path is given.
    ///
    /// An explicit file must exist; a missing default file yields no values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => match Self::read(Path::new(DEFAULT_SETTINGS_FILE)) {
                Err(ConfigError::SettingsFileMissing(_)) => Ok(Self::default()),
                other => other,
            },
        }
    }

    /// Parse the file at `path`.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::SettingsFile {
            path: path.display().to_string(),
            message,
        };

        let entries = dotenvy::from_path_iter(path).map_err(|e| {
            if e.not_found() {
                ConfigError::SettingsFileMissing(path.display().to_string())
            } else {
                invalid(e.to_string())
            }
        })?;

        let mut values = HashMap::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| invalid(e.to_string()))?;
            values.insert(key, value);
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Lookup that asks `primary` first and falls back to the file.
    ///
    /// Blank primary values do not shadow the file.
    pub fn layered<'a, F>(&'a self, primary: F) -> impl Fn(&str) -> Option<String> + 'a
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        move |key| {
            primary(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| self.get(key))
        }
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        }
    }

    fn positive(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        let value = self.parsed(key, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    }
}
