//! Presentation-side derivations: governance model label, score band,
//! consequence tone and radar axes. Nothing here talks to the model.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::{ActorWeights, Scenario, SimulationMetrics, SimulationResult, INITIAL_METRICS};

const NEGATIVE_MARKERS: [&str; 5] = ["失灵", "风险", "下降", "不足", "危机"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceModel {
    AdministrativeDominant,
    MarketDominant,
    SocietyDominant,
    GovernanceVacuum,
    FunctionalOverlap,
    MixedGovernance,
}

impl GovernanceModel {
    /// Ordered threshold rules; the first match wins, so the rules are not
    /// mutually exclusive.
    pub fn classify(weights: &ActorWeights) -> Self {
        let ActorWeights {
            government,
            market,
            society,
        } = *weights;

        if government > 60 && market < 30 && society < 30 {
            Self::AdministrativeDominant
        } else if government < 40 && market > 60 {
            Self::MarketDominant
        } else if government < 40 && society > 60 {
            Self::SocietyDominant
        } else if government < 30 && market < 30 && society < 30 {
            Self::GovernanceVacuum
        } else if weights.total() > 200 {
            Self::FunctionalOverlap
        } else {
            Self::MixedGovernance
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::AdministrativeDominant => "administrative-dominant",
            Self::MarketDominant => "market-dominant",
            Self::SocietyDominant => "society-dominant",
            Self::GovernanceVacuum => "governance-vacuum",
            Self::FunctionalOverlap => "functional-overlap",
            Self::MixedGovernance => "mixed-governance",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AdministrativeDominant => "行政主导型 (传统科层制)",
            Self::MarketDominant => "市场主导型 (新公共管理)",
            Self::SocietyDominant => "社会自治型 (多中心治理)",
            Self::GovernanceVacuum => "治理真空 (碎片化)",
            Self::FunctionalOverlap => "职能重叠/过度治理",
            Self::MixedGovernance => "混合治理",
        }
    }
}

impl Display for GovernanceModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Passing,
    Failing,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Passing
        } else {
            Self::Failing
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceTone {
    Positive,
    Negative,
}

impl ConsequenceTone {
    pub fn of(consequence: &str) -> Self {
        if NEGATIVE_MARKERS
            .iter()
            .any(|marker| consequence.contains(marker))
        {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RadarAxis {
    pub subject: &'static str,
    pub current: f64,
    pub baseline: Option<f64>,
}

pub fn radar_axes(current: &SimulationMetrics, baseline: Option<&SimulationMetrics>) -> Vec<RadarAxis> {
    vec![
        RadarAxis {
            subject: "公众满意度",
            current: current.public_satisfaction,
            baseline: baseline.map(|b| b.public_satisfaction),
        },
        RadarAxis {
            subject: "行政效率",
            current: current.efficiency,
            baseline: baseline.map(|b| b.efficiency),
        },
        RadarAxis {
            subject: "社会公平",
            current: current.social_equity,
            baseline: baseline.map(|b| b.social_equity),
        },
        RadarAxis {
            subject: "财政健康(反预算)",
            current: current.fiscal_health(),
            baseline: baseline.map(SimulationMetrics::fiscal_health),
        },
    ]
}

/// Metrics to show: the latest result, else the scenario baseline, else the
/// neutral starting point.
pub fn displayed_metrics(
    scenario: Option<&Scenario>,
    result: Option<&SimulationResult>,
) -> SimulationMetrics {
    result
        .map(|r| r.metrics)
        .or_else(|| scenario.map(|s| s.initial_metrics))
        .unwrap_or(INITIAL_METRICS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(government: i64, market: i64, society: i64) -> ActorWeights {
        ActorWeights::new(government, market, society).expect("valid weights")
    }

    #[test]
    fn strong_government_is_administrative() {
        for government in 61..=100 {
            for other in [0, 15, 29] {
                assert_eq!(
                    GovernanceModel::classify(&w(government, other, 29 - other.min(29))),
                    GovernanceModel::AdministrativeDominant
                );
            }
        }
    }

    #[test]
    fn market_rule_wins_over_society_rule() {
        for government in [0, 20, 39] {
            for market in [61, 80, 100] {
                assert_eq!(
                    GovernanceModel::classify(&w(government, market, 100)),
                    GovernanceModel::MarketDominant
                );
            }
        }
        assert_eq!(
            GovernanceModel::classify(&w(10, 20, 70)),
            GovernanceModel::SocietyDominant
        );
    }

    #[test]
    fn all_low_is_vacuum() {
        for government in [0, 10, 29] {
            for market in [0, 29] {
                for society in [0, 29] {
                    assert_eq!(
                        GovernanceModel::classify(&w(government, market, society)),
                        GovernanceModel::GovernanceVacuum
                    );
                }
            }
        }
    }

    #[test]
    fn overlap_only_after_directional_rules() {
        assert_eq!(
            GovernanceModel::classify(&w(80, 70, 60)),
            GovernanceModel::FunctionalOverlap
        );
        // government < 40 and market > 60 matches before the sum check.
        assert_eq!(
            GovernanceModel::classify(&w(39, 100, 100)),
            GovernanceModel::MarketDominant
        );
        assert_eq!(
            GovernanceModel::classify(&w(100, 50, 50)),
            GovernanceModel::MixedGovernance
        );
    }

    #[test]
    fn defaults_are_mixed() {
        assert_eq!(
            GovernanceModel::classify(&ActorWeights::default()),
            GovernanceModel::MixedGovernance
        );
        assert_eq!(GovernanceModel::MixedGovernance.label(), "混合治理");
    }

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::from_score(80.0), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(79.9), ScoreBand::Passing);
        assert_eq!(ScoreBand::from_score(60.0), ScoreBand::Passing);
        assert_eq!(ScoreBand::from_score(12.0), ScoreBand::Failing);
    }

    #[test]
    fn consequence_tone_uses_markers() {
        assert_eq!(ConsequenceTone::of("出现志愿失灵"), ConsequenceTone::Negative);
        assert_eq!(ConsequenceTone::of("财政危机加剧"), ConsequenceTone::Negative);
        assert_eq!(ConsequenceTone::of("居民满意度提升"), ConsequenceTone::Positive);
    }

    #[test]
    fn radar_inverts_budget_usage() {
        let current = SimulationMetrics {
            public_satisfaction: 70.0,
            efficiency: 60.0,
            social_equity: 40.0,
            budget_usage: 80.0,
        };
        let axes = radar_axes(&current, None);
        assert_eq!(axes.len(), 4);
        assert_eq!(axes[3].current, 20.0);
        assert!(axes.iter().all(|axis| axis.baseline.is_none()));
    }

    #[test]
    fn displayed_metrics_fall_back_to_initial() {
        assert_eq!(displayed_metrics(None, None), INITIAL_METRICS);
    }
}
