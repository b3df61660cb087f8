pub mod gemini;
pub mod schema;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One structured-output call: persona, prompt and the JSON schema the reply
/// must follow.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub response_schema: Value,
}

/// Seam between the simulator and the hosted model so callers can swap in a
/// test double.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the raw JSON text produced by the model.
    async fn generate_json(&self, request: &JsonRequest) -> Result<String>;
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
pub fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
