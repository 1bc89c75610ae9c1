use async_trait::async_trait;

use super::ContentGenerator;
use crate::assessment::prompt::GenerationRequest;
use crate::errors::GenerationError;

/// Stand-in used when no API key is configured. Every call fails, so sessions
/// run on fallback content.
pub struct UnconfiguredGenerator;

#[async_trait]
impl ContentGenerator for UnconfiguredGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Network("no generator is configured".to_string()))
    }
}
