//! Language-model-backed plan requester
//!
//! Sends the query with a fixed instruction schema describing the three
//! action kinds and their referencing rules.

use crate::llm::{GenerationOptions, LanguageModel};
use crate::planner::Planner;
use crate::tools::catalog;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

pub struct LlmPlanner {
    model: Arc<dyn LanguageModel>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Build the planning instruction schema
    pub fn system_prompt() -> String {
        format!(
            r#"You are a query planner for a video game database (RAWG).

Turn the user's question into a JSON plan of data-retrieval and computation actions.
Today's date is {today}.

Action kinds:

1. fetch: retrieve games from the database
{{
  "type": "fetch",
  "id": "<unique id, e.g. f1>",
  "description": "<what this fetch retrieves>",
  "params": {{
    "platforms": ["<platform name>", ...],
    "genres": ["<genre name>", ...],
    "dates": {{ "from": "YYYY-MM-DD", "to": "YYYY-MM-DD" }},
    "metacritic": {{ "min": 0, "max": 100 }},
    "search": "<free text>",
    "search_exact": false,
    "developers": "<developer slug>",
    "publishers": "<publisher slug>",
    "exclude_additions": true,
    "ordering": "-rating | -metacritic | -released | -added | name",
    "page_size": 20
  }}
}}
All params are optional. page_size must be at most 40.

2. calculate: aggregate a numeric field over ONE fetch result
{{
  "type": "calculate",
  "id": "<unique id>",
  "description": "...",
  "operation": "average | sum | count | min | max",
  "source": "<id of a fetch action>",
  "field": "metacritic | rating | ratings_count"
}}

3. compare: compare groups, each backed by ONE fetch result
{{
  "type": "compare",
  "id": "<unique id>",
  "description": "...",
  "groups": [
    {{ "name": "<label>", "source": "<id of a fetch action>", "field": "metacritic | rating | count" }}
  ]
}}
Use field "count" to compare how many games match each fetch (uses the total count, not the page).

Known platforms: {platforms}
Known genres: {genres}

Rules:
- Every "source" MUST be the id of a fetch action in the same plan.
- Never use a calculate or compare id as a source.
- Actions run in order; list fetches before the actions that use them.
- For "how many" questions a fetch alone is enough: its total count is the answer.
- Return ONLY valid JSON, no explanation text.

Output format:
{{
  "reasoning": "<short explanation of the approach>",
  "actions": [ ... ]
}}"#,
            today = Utc::now().format("%Y-%m-%d"),
            platforms = catalog::platform_names().join(", "),
            genres = catalog::genre_names().join(", "),
        )
    }

    fn build_prompt(query: &str) -> String {
        format!("USER QUESTION:\n{}\n\nReturn the JSON plan.", query)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn request_plan(&self, query: &str) -> Result<String> {
        let response = self
            .model
            .generate(
                &Self::system_prompt(),
                &Self::build_prompt(query),
                GenerationOptions::STRUCTURED,
            )
            .await?;

        debug!(response_chars = response.len(), "Plan response received");
        Ok(response)
    }
}
