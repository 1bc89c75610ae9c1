pub mod http;
pub mod offline;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::assessment::prompt::GenerationRequest;
use crate::errors::GenerationError;

pub use http::HttpGenerator;
pub use offline::UnconfiguredGenerator;

/// Remote source of HTML fragments. One call per request, no retries.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n(.*?)\n?```$").unwrap();
}

/// Strips a surrounding markdown code fence and rejects empty payloads.
pub fn normalize(raw: &str) -> Result<String, GenerationError> {
    let trimmed = raw.trim();
    let body = match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => trimmed,
    };
    if body.is_empty() {
        return Err(GenerationError::InvalidResponse("generator returned no content".to_string()));
    }
    Ok(body.to_string())
}
