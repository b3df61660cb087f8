use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::report::{radar_axes, ConsequenceTone, GovernanceModel, ScoreBand};
use crate::session::SessionSnapshot;
use crate::types::{Actor, ActorWeights, Scenario, SimulationMetrics, SimulationResult};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_scenario_table(scenario: &Scenario) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), scenario.id.clone()]);
    table.add_row(vec!["Title".to_string(), scenario.title.clone()]);
    table.add_row(vec![
        "Category".to_string(),
        format!("{} ({})", scenario.category.label(), scenario.category.as_slug()),
    ]);
    table.add_row(vec!["Description".to_string(), scenario.description.clone()]);
    table.add_row(vec!["Context".to_string(), scenario.context.clone()]);
    let mut out = table.to_string();
    out.push('\n');
    out.push_str(&render_metrics_table(&scenario.initial_metrics, None));
    out
}

pub fn render_weights_table(weights: &ActorWeights) -> String {
    let mut table = new_table();
    table.set_header(vec!["Actor", "Weight"]);
    for actor in Actor::ALL {
        table.add_row(vec![actor.label().to_string(), format!("{}%", weights.get(actor))]);
    }
    let model = GovernanceModel::classify(weights);
    format!(
        "{table}\nTotal: {}  当前模型判定: {}",
        weights.total(),
        model.label()
    )
}

/// Radar axes as rows; the baseline column appears only when one is given.
pub fn render_metrics_table(current: &SimulationMetrics, baseline: Option<&SimulationMetrics>) -> String {
    let mut table = new_table();
    if baseline.is_some() {
        table.set_header(vec!["Dimension", "Current", "Baseline", "Change"]);
    } else {
        table.set_header(vec!["Dimension", "Value"]);
    }
    for axis in radar_axes(current, baseline) {
        let mut cells = vec![Cell::new(axis.subject), Cell::new(format!("{:.0}", axis.current))];
        if let Some(base) = axis.baseline {
            let delta = axis.current - base;
            let color = if delta >= 0.0 { Color::Green } else { Color::Red };
            cells.push(Cell::new(format!("{base:.0}")));
            cells.push(Cell::new(format!("{delta:+.0}")).fg(color));
        }
        table.add_row(Row::from(cells));
    }
    table.to_string()
}

pub fn render_result_table(result: &SimulationResult, baseline: Option<&SimulationMetrics>) -> String {
    let band_color = match ScoreBand::from_score(result.score) {
        ScoreBand::Excellent => Color::Green,
        ScoreBand::Passing => Color::Yellow,
        ScoreBand::Failing => Color::Red,
    };

    let mut summary = new_table();
    summary.set_header(vec!["综合评分", "理论定性 (Theoretical Alignment)"]);
    summary.add_row(Row::from(vec![
        Cell::new(format!("{:.0} / 100", result.score)).fg(band_color),
        Cell::new(&result.theoretical_alignment),
    ]));

    let mut consequences = new_table();
    consequences.set_header(vec!["#", "预期治理后果"]);
    for (idx, item) in result.consequences.iter().enumerate() {
        let color = match ConsequenceTone::of(item) {
            ConsequenceTone::Negative => Color::Red,
            ConsequenceTone::Positive => Color::Green,
        };
        consequences.add_row(Row::from(vec![
            Cell::new(idx + 1),
            Cell::new(item).fg(color),
        ]));
    }

    format!(
        "{summary}\n{}\n教授点评 (Analysis):\n{}\n{consequences}",
        render_metrics_table(&result.metrics, baseline),
        result.analysis
    )
}

pub fn render_session(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    if let Some(error) = &snapshot.error {
        out.push_str(&format!("! {error}\n"));
    }
    match &snapshot.scenario {
        Some(scenario) => out.push_str(&render_scenario_table(scenario)),
        None => out.push_str("No scenario loaded."),
    }
    out.push('\n');
    out.push_str(&render_weights_table(&snapshot.weights));
    out.push('\n');
    match &snapshot.result {
        Some(result) => out.push_str(&render_result_table(
            result,
            snapshot.scenario.as_ref().map(|s| &s.initial_metrics),
        )),
        None => out.push_str("等待推演: adjust the weights and run a simulation."),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fallback_scenario;

    #[test]
    fn scenario_table_shows_title_and_category() {
        let rendered = render_scenario_table(&fallback_scenario());
        assert!(rendered.contains("老旧小区加装电梯的治理困境"));
        assert!(rendered.contains("infrastructure"));
        assert!(rendered.contains("财政健康"));
    }

    #[test]
    fn weights_table_includes_model_label() {
        let weights = ActorWeights::new(10, 80, 10).expect("weights");
        let rendered = render_weights_table(&weights);
        assert!(rendered.contains("市场主导型"));
        assert!(rendered.contains("80%"));
    }

    #[test]
    fn metrics_table_adds_change_column_with_baseline() {
        let scenario = fallback_scenario();
        let with_baseline = render_metrics_table(&scenario.initial_metrics, Some(&scenario.initial_metrics));
        assert!(with_baseline.contains("Baseline"));
        assert!(!render_metrics_table(&scenario.initial_metrics, None).contains("Baseline"));
    }
}
