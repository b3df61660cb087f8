use anyhow::Result;

use crate::report::radar_axes;
use crate::types::{Scenario, SimulationMetrics, SimulationResult};

pub fn metrics_to_csv(current: &SimulationMetrics, baseline: Option<&SimulationMetrics>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["dimension", "current", "baseline"])?;
    for axis in radar_axes(current, baseline) {
        writer.write_record([
            axis.subject.to_string(),
            format!("{:.2}", axis.current),
            axis.baseline.map(|b| format!("{b:.2}")).unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn scenario_to_csv(scenario: &Scenario) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "id",
        "title",
        "category",
        "public_satisfaction",
        "efficiency",
        "social_equity",
        "budget_usage",
    ])?;
    let m = &scenario.initial_metrics;
    writer.write_record([
        scenario.id.clone(),
        scenario.title.clone(),
        scenario.category.as_slug().to_string(),
        format!("{:.2}", m.public_satisfaction),
        format!("{:.2}", m.efficiency),
        format!("{:.2}", m.social_equity),
        format!("{:.2}", m.budget_usage),
    ])?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn result_to_csv(result: &SimulationResult, baseline: Option<&SimulationMetrics>) -> Result<String> {
    let mut out = metrics_to_csv(&result.metrics, baseline)?;
    out.push_str(&format!("score,{:.2},\n", result.score));
    Ok(out)
}
