//! Orchestration state. `Session` is the plain state machine; `Orchestrator`
//! drives it around the two model calls.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::{generate_scenario, simulate_outcome};
use crate::error::{Error, Result};
use crate::llm::GenerativeModel;
use crate::report::{displayed_metrics, radar_axes, GovernanceModel, RadarAxis};
use crate::types::{
    Actor, ActorWeights, HistoryItem, Scenario, SimulationMetrics, SimulationResult,
    DEFAULT_WEIGHTS,
};

pub const LOAD_ERROR: &str = "场景加载失败，请检查 API Key 设置。";
pub const SIMULATE_ERROR: &str = "模拟失败，AI 服务暂时不可用。";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    LoadingScenario,
    Simulating,
    Ready,
}

/// Issued when an operation starts; a completion is only applied when its
/// ticket epoch still matches the session.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct SimulationTicket {
    epoch: u64,
    pub scenario: Scenario,
    pub weights: ActorWeights,
}

#[derive(Debug, Clone)]
pub struct Session {
    scenario: Option<Scenario>,
    weights: ActorWeights,
    result: Option<SimulationResult>,
    latest_round: Option<HistoryItem>,
    rounds: u32,
    initializing: bool,
    loading: bool,
    simulating: bool,
    error: Option<String>,
    epoch: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            scenario: None,
            weights: DEFAULT_WEIGHTS,
            result: None,
            latest_round: None,
            rounds: 0,
            initializing: true,
            loading: false,
            simulating: false,
            error: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.initializing {
            Phase::Initializing
        } else if self.loading {
            Phase::LoadingScenario
        } else if self.simulating {
            Phase::Simulating
        } else {
            Phase::Ready
        }
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn weights(&self) -> ActorWeights {
        self.weights
    }

    pub fn result(&self) -> Option<&SimulationResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn latest_round(&self) -> Option<&HistoryItem> {
        self.latest_round.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    pub fn set_weight(&mut self, actor: Actor, value: i64) -> Result<ActorWeights> {
        self.weights.set(actor, value)?;
        Ok(self.weights)
    }

    pub fn set_weights(&mut self, weights: ActorWeights) -> Result<ActorWeights> {
        weights.validate()?;
        self.weights = weights;
        Ok(self.weights)
    }

    /// Starting a load orphans any pending simulation.
    pub fn begin_load(&mut self) -> Result<LoadTicket> {
        if self.loading {
            return Err(Error::Busy("scenario load"));
        }
        self.epoch += 1;
        self.loading = true;
        self.simulating = false;
        self.result = None;
        self.latest_round = None;
        self.error = None;
        Ok(LoadTicket { epoch: self.epoch })
    }

    pub fn finish_load(&mut self, ticket: LoadTicket, outcome: Result<Scenario>) -> Result<Scenario> {
        if ticket.epoch != self.epoch {
            return Err(Error::Superseded);
        }
        self.loading = false;
        self.initializing = false;
        match outcome {
            Ok(scenario) => {
                self.scenario = Some(scenario.clone());
                self.weights = DEFAULT_WEIGHTS;
                self.rounds = 0;
                Ok(scenario)
            }
            Err(err) => {
                self.error = Some(LOAD_ERROR.to_string());
                Err(err)
            }
        }
    }

    pub fn begin_simulation(&mut self) -> Result<SimulationTicket> {
        if self.loading {
            return Err(Error::Busy("scenario load"));
        }
        if self.simulating {
            return Err(Error::Busy("simulation"));
        }
        let scenario = self.scenario.clone().ok_or(Error::NoScenario)?;
        self.simulating = true;
        self.error = None;
        Ok(SimulationTicket {
            epoch: self.epoch,
            scenario,
            weights: self.weights,
        })
    }

    /// Applies a simulation outcome. Returns `None` when the ticket is stale
    /// (a new scenario was loaded meanwhile) and the outcome was dropped.
    pub fn finish_simulation(
        &mut self,
        ticket: SimulationTicket,
        outcome: Result<SimulationResult>,
    ) -> Option<Result<SimulationResult>> {
        if ticket.epoch != self.epoch {
            return None;
        }
        self.simulating = false;
        let applied = match outcome {
            Ok(result) => {
                self.rounds += 1;
                self.latest_round = Some(HistoryItem {
                    round: self.rounds,
                    scenario_title: ticket.scenario.title.clone(),
                    weights: ticket.weights,
                    result: result.clone(),
                    completed_at: Utc::now(),
                });
                self.result = Some(result.clone());
                Ok(result)
            }
            Err(err) => {
                self.error = Some(SIMULATE_ERROR.to_string());
                Err(err)
            }
        };
        Some(applied)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let metrics = displayed_metrics(self.scenario.as_ref(), self.result.as_ref());
        let baseline = self.scenario.as_ref().map(|s| &s.initial_metrics);
        SessionSnapshot {
            phase: self.phase(),
            loading_scenario: self.loading,
            simulating: self.simulating,
            error: self.error.clone(),
            scenario: self.scenario.clone(),
            weights: self.weights,
            weights_total: self.weights.total(),
            governance_model: GovernanceModel::classify(&self.weights),
            governance_label: GovernanceModel::classify(&self.weights).label(),
            result: self.result.clone(),
            metrics,
            radar: radar_axes(&metrics, baseline),
            latest_round: self.latest_round.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub loading_scenario: bool,
    pub simulating: bool,
    pub error: Option<String>,
    pub scenario: Option<Scenario>,
    pub weights: ActorWeights,
    pub weights_total: u16,
    pub governance_model: GovernanceModel,
    pub governance_label: &'static str,
    pub result: Option<SimulationResult>,
    pub metrics: SimulationMetrics,
    pub radar: Vec<RadarAxis>,
    pub latest_round: Option<HistoryItem>,
}

/// Shared handle used by the CLI loop and the REST API. The lock is never held
/// across a model call.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn GenerativeModel>,
    state: Arc<Mutex<Session>>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            state: Arc::new(Mutex::new(Session::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn set_weight(&self, actor: Actor, value: i64) -> Result<ActorWeights> {
        self.lock().set_weight(actor, value)
    }

    pub fn set_weights(&self, weights: ActorWeights) -> Result<ActorWeights> {
        self.lock().set_weights(weights)
    }

    pub async fn load_scenario(&self) -> Result<Scenario> {
        let ticket = self.lock().begin_load()?;
        let outcome = generate_scenario(self.model.as_ref()).await;
        let scenario = self.lock().finish_load(ticket, outcome)?;
        info!(id = %scenario.id, title = %scenario.title, "scenario loaded");
        Ok(scenario)
    }

    pub async fn simulate(&self) -> Result<SimulationResult> {
        let ticket = self.lock().begin_simulation()?;
        let outcome = simulate_outcome(self.model.as_ref(), &ticket.scenario, &ticket.weights).await;
        match self.lock().finish_simulation(ticket, outcome) {
            Some(applied) => applied,
            None => {
                warn!("scenario changed while simulating, result discarded");
                Err(Error::Superseded)
            }
        }
    }
}
