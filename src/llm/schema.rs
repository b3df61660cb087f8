//! Response schemas in the OpenAPI subset the Gemini API accepts.

use serde_json::{json, Value};

use crate::types::ScenarioCategory;

fn metrics_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "publicSatisfaction": { "type": "NUMBER" },
            "efficiency": { "type": "NUMBER" },
            "socialEquity": { "type": "NUMBER" },
            "budgetUsage": { "type": "NUMBER" }
        },
        "required": ["publicSatisfaction", "efficiency", "socialEquity", "budgetUsage"]
    })
}

pub fn scenario_schema() -> Value {
    let categories = ScenarioCategory::ALL
        .iter()
        .map(ScenarioCategory::as_slug)
        .collect::<Vec<_>>();
    json!({
        "type": "OBJECT",
        "properties": {
            "id": { "type": "STRING" },
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "category": { "type": "STRING", "enum": categories },
            "context": { "type": "STRING" },
            "initialMetrics": metrics_schema()
        },
        "required": ["id", "title", "description", "category", "context", "initialMetrics"]
    })
}

pub fn simulation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "metrics": metrics_schema(),
            "analysis": { "type": "STRING" },
            "theoreticalAlignment": { "type": "STRING" },
            "consequences": { "type": "ARRAY", "items": { "type": "STRING" } },
            "score": { "type": "NUMBER" }
        },
        "required": ["metrics", "analysis", "theoreticalAlignment", "consequences", "score"]
    })
}
