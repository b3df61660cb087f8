use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::llm::schema::{scenario_schema, simulation_schema};
use crate::llm::{GenerativeModel, JsonRequest};
use crate::prompts::{scenario_prompt, simulation_prompt, SYSTEM_INSTRUCTION};
use crate::types::{
    ActorWeights, Scenario, ScenarioCategory, SimulationMetrics, SimulationResult,
};

pub const FALLBACK_SCENARIO_ID: &str = "fallback-cn-1";

/// Static case served whenever scenario generation fails for a reason other
/// than a missing credential.
pub fn fallback_scenario() -> Scenario {
    Scenario {
        id: FALLBACK_SCENARIO_ID.to_string(),
        title: "老旧小区加装电梯的治理困境".to_string(),
        description: "随着城市老龄化，老旧小区加装电梯需求迫切。但低层住户反对（采光/噪音）、高层住户资金不足。政府若全资投入财政压力巨大且不可持续；完全交给市场则会导致价格高昂，低收入群体被排除；仅靠居民自治又常因协商破裂而搁浅。".to_string(),
        category: ScenarioCategory::Infrastructure,
        context: "此场景考察作为'准公共物品'的社区设施，如何解决'搭便车'问题及集体行动的困境。".to_string(),
        initial_metrics: SimulationMetrics {
            public_satisfaction: 45.0,
            efficiency: 30.0,
            social_equity: 50.0,
            budget_usage: 60.0,
        },
    }
}

/// Ask the model for a fresh case. Call and parse failures degrade to
/// [`fallback_scenario`]; only a missing credential is returned as an error.
pub async fn generate_scenario(model: &dyn GenerativeModel) -> Result<Scenario> {
    let request = JsonRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: scenario_prompt(),
        response_schema: scenario_schema(),
    };

    let outcome = match model.generate_json(&request).await {
        Ok(text) => parse_scenario(&text),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(scenario) => {
            debug!(id = %scenario.id, title = %scenario.title, "scenario generated");
            Ok(scenario)
        }
        Err(Error::MissingApiKey) => Err(Error::MissingApiKey),
        Err(err) => {
            warn!(model = model.name(), error = %err, "scenario generation failed, using fallback case");
            Ok(fallback_scenario())
        }
    }
}

pub fn parse_scenario(text: &str) -> Result<Scenario> {
    let mut scenario: Scenario = serde_json::from_str(text)?;
    scenario.initial_metrics = scenario.initial_metrics.clamped();
    Ok(scenario)
}

/// Evaluate a policy mix against a case. Every failure is returned to the
/// caller; nothing partial is ever produced.
pub async fn simulate_outcome(
    model: &dyn GenerativeModel,
    scenario: &Scenario,
    weights: &ActorWeights,
) -> Result<SimulationResult> {
    weights.validate()?;
    let request = JsonRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: simulation_prompt(scenario, weights),
        response_schema: simulation_schema(),
    };

    let text = model.generate_json(&request).await.map_err(|err| {
        warn!(model = model.name(), error = %err, "simulation call failed");
        err
    })?;
    let result = parse_simulation(&text).map_err(|err| {
        warn!(model = model.name(), error = %err, "simulation reply rejected");
        err
    })?;
    debug!(score = result.score, consequences = result.consequences.len(), "simulation complete");
    Ok(result)
}

pub fn parse_simulation(text: &str) -> Result<SimulationResult> {
    let result: SimulationResult = serde_json::from_str(text)?;
    Ok(result.clamped())
}
