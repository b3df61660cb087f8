use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::report::GovernanceModel;
use crate::session::{Orchestrator, SessionSnapshot};
use crate::types::{Actor, ActorWeights, Scenario, SimulationResult};

#[derive(Clone)]
struct ApiState {
    config: Config,
    orchestrator: Orchestrator,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match &error {
            Error::NoScenario
            | Error::WeightOutOfRange { .. }
            | Error::UnknownActor(_)
            | Error::UnknownCategory(_) => StatusCode::BAD_REQUEST,
            Error::Busy(_) | Error::Superseded => StatusCode::CONFLICT,
            Error::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            Error::Transport { .. }
            | Error::Api { .. }
            | Error::EmptyResponse
            | Error::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
struct WeightsRequest {
    government: Option<i64>,
    market: Option<i64>,
    society: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifyQuery {
    government: i64,
    market: i64,
    society: i64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
}

#[derive(Debug, Serialize)]
struct ScenarioResponse {
    scenario: Scenario,
    weights: ActorWeights,
}

#[derive(Debug, Serialize)]
struct WeightsResponse {
    weights: ActorWeights,
    total: u16,
    governance_model: GovernanceModel,
    governance_label: &'static str,
}

#[derive(Debug, Serialize)]
struct SimulateResponse {
    round: Option<u32>,
    result: SimulationResult,
}

impl WeightsResponse {
    fn from_weights(weights: ActorWeights) -> Self {
        let model = GovernanceModel::classify(&weights);
        Self {
            weights,
            total: weights.total(),
            governance_model: model,
            governance_label: model.label(),
        }
    }
}

pub fn router(config: Config, orchestrator: Orchestrator) -> Router {
    let state = ApiState {
        config: config.redacted(),
        orchestrator,
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/session", get(session))
        .route("/v1/scenario", post(load_scenario))
        .route("/v1/weights", put(update_weights))
        .route("/v1/simulate", post(simulate))
        .route("/v1/classify", get(classify))
        .route("/v1/config", get(show_config))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, orchestrator: Orchestrator, bind: SocketAddr) -> Result<()> {
    let app = router(config, orchestrator);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<ApiState>) -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        model: state.orchestrator.model_name().to_string(),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn session(State(state): State<ApiState>) -> Json<ApiResponse<SessionSnapshot>> {
    ok(state.orchestrator.snapshot())
}

async fn load_scenario(State(state): State<ApiState>) -> ApiResult<ScenarioResponse> {
    let scenario = state.orchestrator.load_scenario().await.map_err(|err| {
        warn!(error = %err, "scenario load failed");
        ApiError::from(err)
    })?;
    Ok(ok(ScenarioResponse {
        scenario,
        weights: state.orchestrator.snapshot().weights,
    }))
}

async fn update_weights(
    State(state): State<ApiState>,
    Json(request): Json<WeightsRequest>,
) -> ApiResult<WeightsResponse> {
    let changes = [
        (Actor::Government, request.government),
        (Actor::Market, request.market),
        (Actor::Society, request.society),
    ];
    if changes.iter().all(|(_, value)| value.is_none()) {
        return Err(ApiError::bad_request("at least one weight is required"));
    }

    let mut weights = state.orchestrator.snapshot().weights;
    for (actor, value) in changes {
        if let Some(value) = value {
            weights.set(actor, value)?;
        }
    }
    let weights = state.orchestrator.set_weights(weights)?;
    Ok(ok(WeightsResponse::from_weights(weights)))
}

async fn simulate(State(state): State<ApiState>) -> ApiResult<SimulateResponse> {
    let result = state.orchestrator.simulate().await?;
    let round = state
        .orchestrator
        .snapshot()
        .latest_round
        .map(|item| item.round);
    Ok(ok(SimulateResponse { round, result }))
}

async fn classify(Query(query): Query<ClassifyQuery>) -> ApiResult<WeightsResponse> {
    let weights = ActorWeights::new(query.government, query.market, query.society)?;
    Ok(ok(WeightsResponse::from_weights(weights)))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::llm::testing::ScriptedModel;

    const RESULT_JSON: &str = r#"{
        "metrics": {"publicSatisfaction": 55, "efficiency": 70, "socialEquity": 42, "budgetUsage": 38},
        "analysis": "市场化改革提升效率。",
        "theoreticalAlignment": "新公共管理 NPM",
        "consequences": ["撇脂效应导致公平性下降"],
        "score": 64
    }"#;

    fn app(replies: Vec<crate::error::Result<String>>) -> Router {
        let orchestrator = Orchestrator::new(Arc::new(ScriptedModel::new(replies)));
        router(Config::default(), orchestrator)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn health_reports_model() {
        let app = app(vec![]);
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["model"], "scripted");
    }

    #[tokio::test]
    async fn simulate_without_scenario_is_bad_request() {
        let app = app(vec![]);
        let (status, body) = call(&app, Method::POST, "/v1/simulate", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn full_round_over_http() {
        let app = app(vec![
            Err(Error::EmptyResponse),
            Ok(RESULT_JSON.to_string()),
        ]);

        let (status, body) = call(&app, Method::POST, "/v1/scenario", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["scenario"]["id"], "fallback-cn-1");
        assert_eq!(body["data"]["weights"]["government"], 50);

        let (status, body) = call(
            &app,
            Method::PUT,
            "/v1/weights",
            Some(r#"{"government": 20, "market": 75}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["governance_model"], "market_dominant");
        assert_eq!(body["data"]["weights"]["society"], 25);

        let (status, body) = call(&app, Method::POST, "/v1/simulate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["round"], 1);
        assert_eq!(body["data"]["result"]["score"], 64.0);

        let (_, body) = call(&app, Method::GET, "/v1/session", None).await;
        assert_eq!(body["data"]["phase"], "ready");
        assert_eq!(body["data"]["latest_round"]["weights"]["market"], 75);
    }

    #[tokio::test]
    async fn out_of_range_weight_is_rejected() {
        let app = app(vec![]);
        let (status, _) = call(&app, Method::PUT, "/v1/weights", Some(r#"{"society": 140}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, Method::GET, "/v1/session", None).await;
        assert_eq!(body["data"]["weights"]["society"], 25);
    }

    #[tokio::test]
    async fn missing_key_maps_to_service_unavailable() {
        let app = app(vec![Err(Error::MissingApiKey)]);
        let (status, body) = call(&app, Method::POST, "/v1/scenario", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "API key is missing");
    }

    #[tokio::test]
    async fn classify_endpoint() {
        let app = app(vec![]);
        let (status, body) = call(
            &app,
            Method::GET,
            "/v1/classify?government=10&market=10&society=10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["governance_model"], "governance_vacuum");
        assert_eq!(body["data"]["governance_label"], "治理真空 (碎片化)");
    }
}
