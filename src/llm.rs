//! Language-model collaborator seam
//!
//! Planning, review and answer synthesis all talk to the model through this
//! trait, so tests can script responses without a network.

use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationOptions {
    /// Low temperature for structured JSON output.
    pub const STRUCTURED: GenerationOptions = GenerationOptions {
        temperature: 0.1,
        max_output_tokens: 2048,
    };

    /// Slightly warmer for the prose answer.
    pub const PROSE: GenerationOptions = GenerationOptions {
        temperature: 0.4,
        max_output_tokens: 1024,
    };
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt with its system instruction, returning the raw text reply.
    async fn generate(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String>;
}
