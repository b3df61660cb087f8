use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_WEIGHTS: ActorWeights = ActorWeights {
    government: 50,
    market: 25,
    society: 25,
};

pub const INITIAL_METRICS: SimulationMetrics = SimulationMetrics {
    public_satisfaction: 50.0,
    efficiency: 50.0,
    social_equity: 50.0,
    budget_usage: 50.0,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    PublicService,
    Infrastructure,
    SocialWelfare,
    Regulation,
}

impl ScenarioCategory {
    pub const ALL: [ScenarioCategory; 4] = [
        ScenarioCategory::PublicService,
        ScenarioCategory::Infrastructure,
        ScenarioCategory::SocialWelfare,
        ScenarioCategory::Regulation,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::PublicService => "public_service",
            Self::Infrastructure => "infrastructure",
            Self::SocialWelfare => "social_welfare",
            Self::Regulation => "regulation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PublicService => "公共服务",
            Self::Infrastructure => "基础设施",
            Self::SocialWelfare => "社会福利",
            Self::Regulation => "市场监管",
        }
    }
}

impl Display for ScenarioCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ScenarioCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_slug() == normalized)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// The four 4E dimensions, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationMetrics {
    pub public_satisfaction: f64,
    pub efficiency: f64,
    pub social_equity: f64,
    pub budget_usage: f64,
}

impl SimulationMetrics {
    pub fn clamped(self) -> Self {
        Self {
            public_satisfaction: clamp_score(self.public_satisfaction),
            efficiency: clamp_score(self.efficiency),
            social_equity: clamp_score(self.social_equity),
            budget_usage: clamp_score(self.budget_usage),
        }
    }

    pub fn in_range(&self) -> bool {
        [
            self.public_satisfaction,
            self.efficiency,
            self.social_equity,
            self.budget_usage,
        ]
        .iter()
        .all(|v| (0.0..=100.0).contains(v))
    }

    /// Fiscal health is the inverse of budget consumption.
    pub fn fiscal_health(&self) -> f64 {
        100.0 - self.budget_usage
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        INITIAL_METRICS
    }
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Government,
    Market,
    Society,
}

impl Actor {
    pub const ALL: [Actor; 3] = [Actor::Government, Actor::Market, Actor::Society];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Market => "market",
            Self::Society => "society",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Government => "政府 (Government)",
            Self::Market => "市场 (Market)",
            Self::Society => "社会 (Society)",
        }
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for Actor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "government" | "gov" | "g" | "政府" => Ok(Self::Government),
            "market" | "mkt" | "m" | "市场" => Ok(Self::Market),
            "society" | "soc" | "s" | "社会" => Ok(Self::Society),
            _ => Err(Error::UnknownActor(s.to_string())),
        }
    }
}

/// Intervention intensity per sector. The three values are independent and
/// need not add up to 100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorWeights {
    pub government: u8,
    pub market: u8,
    pub society: u8,
}

impl ActorWeights {
    pub fn new(government: i64, market: i64, society: i64) -> Result<Self, Error> {
        Ok(Self {
            government: checked_weight(Actor::Government, government)?,
            market: checked_weight(Actor::Market, market)?,
            society: checked_weight(Actor::Society, society)?,
        })
    }

    pub fn get(&self, actor: Actor) -> u8 {
        match actor {
            Actor::Government => self.government,
            Actor::Market => self.market,
            Actor::Society => self.society,
        }
    }

    pub fn set(&mut self, actor: Actor, value: i64) -> Result<(), Error> {
        let value = checked_weight(actor, value)?;
        match actor {
            Actor::Government => self.government = value,
            Actor::Market => self.market = value,
            Actor::Society => self.society = value,
        }
        Ok(())
    }

    pub fn total(&self) -> u16 {
        u16::from(self.government) + u16::from(self.market) + u16::from(self.society)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for actor in Actor::ALL {
            checked_weight(actor, i64::from(self.get(actor)))?;
        }
        Ok(())
    }
}

impl Default for ActorWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

fn checked_weight(actor: Actor, value: i64) -> Result<u8, Error> {
    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::WeightOutOfRange {
            actor: actor.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ScenarioCategory,
    /// Theoretical background hint for the case.
    pub context: String,
    pub initial_metrics: SimulationMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub metrics: SimulationMetrics,
    pub analysis: String,
    pub theoretical_alignment: String,
    pub consequences: Vec<String>,
    pub score: f64,
}

impl SimulationResult {
    pub fn clamped(mut self) -> Self {
        self.metrics = self.metrics.clamped();
        self.score = clamp_score(self.score);
        self
    }
}

/// Snapshot of the latest completed round for the current scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub round: u32,
    pub scenario_title: String,
    pub weights: ActorWeights,
    pub result: SimulationResult,
    pub completed_at: DateTime<Utc>,
}
