use serde::{Deserialize, Serialize};

/// Failure of a remote generation call.
///
/// The session never surfaces these directly: every variant is converted into
/// fallback content plus a [`Notification`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Rate limit or quota exhaustion on the provider side
    RateLimited(String),
    /// Connection, DNS or timeout failure
    Network(String),
    /// The provider answered but the payload was unusable
    InvalidResponse(String),
    /// Any other non-success HTTP status
    Api { status: u16, body: String },
}

impl GenerationError {
    /// Maps an HTTP status and body onto a variant. Status codes win; the body
    /// is only consulted for providers that report quota problems under a
    /// different status.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || mentions_quota(&body) {
            GenerationError::RateLimited(body)
        } else {
            GenerationError::Api { status, body }
        }
    }

    /// Best-effort classification of a free-text failure message. Only used
    /// where no status code is available.
    pub fn from_message(message: &str) -> Self {
        if message.contains("429") || mentions_quota(message) {
            GenerationError::RateLimited(message.to_string())
        } else {
            GenerationError::Network(message.to_string())
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }

    pub fn notification(&self) -> Notification {
        if self.is_rate_limited() {
            Notification::quota_exhausted()
        } else {
            Notification::generation_failed()
        }
    }
}

fn mentions_quota(text: &str) -> bool {
    text.to_ascii_lowercase().contains("quota")
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            GenerationError::Network(msg) => write!(f, "Network error: {}", msg),
            GenerationError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            GenerationError::Api { status, body } => write!(f, "API error {}: {}", status, body),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return GenerationError::from_status(status.as_u16(), e.to_string());
        }
        if e.is_decode() {
            GenerationError::InvalidResponse(e.to_string())
        } else {
            GenerationError::from_message(&e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    QuotaExhausted,
    GenerationFailed,
}

/// User-facing notice shown next to fallback content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn quota_exhausted() -> Self {
        Self {
            kind: NotificationKind::QuotaExhausted,
            message: "The AI tutor has reached its usage limit for now. You can keep going with standard questions.".to_string(),
        }
    }

    pub fn generation_failed() -> Self {
        Self {
            kind: NotificationKind::GenerationFailed,
            message: "We couldn't generate personalised content this time. Showing a standard question instead.".to_string(),
        }
    }
}
