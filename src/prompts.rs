use crate::types::{ActorWeights, Scenario};

/// Persona shared by both calls: a public administration professor coaching
/// graduate entrance exam candidates.
pub const SYSTEM_INSTRUCTION: &str = r#"你是一位资深的公共管理学教授，专门辅导研究生入学考试（考研）。
你的任务是运行一个基于“政府职能转变”理论的模拟器。核心关注点是：
1. **政府淡出 (Government Fade-out)**：政府从“划桨”转向“掌舵”，减少微观干预。
2. **政府替代 (Government Substitution)**：
   - **市场替代**：合同外包、特许经营、凭单制（私有化逻辑）。
   - **社会替代**：多中心治理、共同生产、第三部门参与（社会化逻辑）。
3. **失灵理论**：必须分析可能出现的“政府失灵”（低效/寻租）、“市场失灵”（不公/外部性）或“志愿失灵”（资金不足/家长作风）。

请使用专业的公共管理学术语进行分析（如：新公共管理 NPM、公共选择理论、治理理论、交易成本等）。
输出必须是严格的 JSON 格式。"#;

const SCENARIO_PROMPT: &str = r#"请生成一个用于公共管理案例分析的复杂政策场景。

场景要求：
1. 必须是一个典型的公共事务难题（如：老旧小区加装电梯、农村垃圾治理、公立医院改革、网约车监管、养老服务供给）。
2. 这是一个两难困境，需要权衡政府、市场和社会的力量。
3. 适合考察“政府是否应该淡出”以及“谁来替代”的问题。

请返回 JSON 格式：
{
  "id": "string",
  "title": "简短的中文标题",
  "description": "详细的案例背景描述（200字左右）",
  "category": "one of ['public_service', 'infrastructure', 'social_welfare', 'regulation']",
  "context": "该场景的理论背景提示（如：属于准公共物品的供给问题）",
  "initialMetrics": {
    "publicSatisfaction": number (0-100),
    "efficiency": number (0-100),
    "socialEquity": number (0-100),
    "budgetUsage": number (0-100)
  }
}"#;

/// Heuristics the model is asked to reason with; one line per intervention
/// pattern.
pub const OUTCOME_HEURISTICS: [&str; 4] = [
    "政府过高 -> 只有政府在“划桨”，可能导致财政危机、效率低下（官僚主义），但公平性通常较好。",
    "市场过高 -> 可能出现“撇脂效应”（只服务富人），效率高但公平性下降。",
    "社会过高 -> 志愿失灵（资源不足），或是“平庸的多数”。",
    "均衡模型 -> 协同治理 (Collaborative Governance)。",
];

pub fn scenario_prompt() -> String {
    SCENARIO_PROMPT.to_string()
}

pub fn simulation_prompt(scenario: &Scenario, weights: &ActorWeights) -> String {
    let heuristics = OUTCOME_HEURISTICS
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"案例: {title}
背景: {description}

用户的政策配置 (投入权重 0-100):
- 政府主导程度 (Government): {government}%
- 市场机制引入 (Market): {market}%
- 社会组织/自治参与 (Society): {society}%

请基于公共管理理论（如萨拉蒙的工具理论、奥斯特罗姆的多中心治理）进行推演。

逻辑参考：
{heuristics}

请返回 JSON:
{{
  "metrics": {{ ...更新后的四个指标 0-100 }},
  "analysis": "深度解析（300字左右），分析政策的优劣，运用专业术语。",
  "theoreticalAlignment": "该策略对应什么理论模型？（例如：'新公共服务 NPS' 或 'PPP模式' 或 '福利国家复归'）",
  "consequences": ["具体后果1", "具体后果2", ...],
  "score": number (0-100, 基于解决问题的有效性和可持续性)
}}"#,
        title = scenario.title,
        description = scenario.description,
        government = weights.government,
        market = weights.market,
        society = weights.society,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fallback_scenario;

    #[test]
    fn simulation_prompt_embeds_case_and_weights() {
        let scenario = fallback_scenario();
        let weights = ActorWeights::new(70, 20, 10).expect("weights");
        let prompt = simulation_prompt(&scenario, &weights);

        assert!(prompt.contains(&scenario.title));
        assert!(prompt.contains(&scenario.description));
        assert!(prompt.contains("(Government): 70%"));
        assert!(prompt.contains("(Market): 20%"));
        assert!(prompt.contains("(Society): 10%"));
        for heuristic in OUTCOME_HEURISTICS {
            assert!(prompt.contains(heuristic));
        }
        assert!(prompt.contains("\"metrics\": {"));
    }

    #[test]
    fn scenario_prompt_lists_categories() {
        let prompt = scenario_prompt();
        for slug in ["public_service", "infrastructure", "social_welfare", "regulation"] {
            assert!(prompt.contains(slug));
        }
    }
}
