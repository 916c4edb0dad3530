//! Error types for the inbox checker.

/// Top-level error type for a check run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Document listing failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Check cancelled")]
    Cancelled,
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Settings file not found: {0}")]
    SettingsFileMissing(String),

    #[error("Invalid settings file {path}: {message}")]
    SettingsFile { path: String, message: String },
}

/// What went wrong below the HTTP status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Connect,
    Timeout,
    Malformed,
    Other,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Malformed => "malformed response",
            Self::Other => "transport",
        };
        f.write_str(s)
    }
}

/// Failures surfaced by the API client. No retries happen at that layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{kind} failure calling {url}: {reason}")]
    Transport {
        url: String,
        kind: TransportKind,
        reason: String,
    },

    #[error("{url} returned HTTP {status_code}: {body}")]
    Status {
        url: String,
        status_code: u16,
        body: String,
    },
}

impl ApiError {
    /// Network unreachable, timed out, or the body could not be decoded.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Transport { .. } => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else if err.is_decode() || err.is_body() {
            TransportKind::Malformed
        } else {
            TransportKind::Other
        };
        Self::Transport {
            url: url.to_string(),
            kind,
            reason: err.to_string(),
        }
    }
}

/// A listing round could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("page {page} of the document listing failed: {source}")]
    Page {
        page: u32,
        #[source]
        source: ApiError,
    },
}

impl FetchError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            Self::Page { source, .. } => source,
        }
    }

    /// Transport failures abort correlation; HTTP status failures only spend a round.
    pub fn is_transport(&self) -> bool {
        self.api_error().is_transport()
    }
}

/// Email submission errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Failed to read attachment {path}: {source}")]
    ReadAttachment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {field} address: {reason}")]
    InvalidAddress { field: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Smtp(String),

    #[error("Submission task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for the checker.
pub type Result<T> = std::result::Result<T, Error>;
