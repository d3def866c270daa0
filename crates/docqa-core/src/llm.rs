//! LLM provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for chat/completion models that turn an assembled prompt into an answer.
///
/// The model call sits outside the retrieval core: callers build the prompt
/// from retrieved context and hand it over here.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
