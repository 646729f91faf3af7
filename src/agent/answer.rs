//! Answer synthesizer
//!
//! Turns the final digest into prose. The reply is terminal and returned as-is.

use crate::llm::{GenerationOptions, LanguageModel};
use crate::Result;
use std::sync::Arc;

const ANSWER_SYSTEM_PROMPT: &str = r#"You answer questions about video games using ONLY the retrieved data provided.

Guidelines:
- Be concise and answer the question directly
- Emphasize key numbers in **bold**
- When a total count is marked as the answer, use that total, not the number of sample records
- If a search returned zero games, say so explicitly instead of guessing
- Use short bullet lists for rankings or comparisons"#;

pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(&self, query: &str, digest: &str) -> Result<String> {
        let prompt = format!(
            "USER QUESTION:\n{}\n\nRETRIEVED DATA:\n{}\n\nWrite the answer.",
            query, digest
        );

        self.model
            .generate(ANSWER_SYSTEM_PROMPT, &prompt, GenerationOptions::PROSE)
            .await
    }
}
