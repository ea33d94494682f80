use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::warn;

use crate::agent::{DynAgent, SourcingAgent, StoredContent};
use crate::config::{default_query, default_sources_input, AgentConfig};
use crate::dashboard::render::{render_page, Flash, PageContext, View};
use crate::dashboard::session::{execute_run, RUN_SUCCESS_MESSAGE};
use crate::dashboard::{
    parse_sources, AgentFactory, ConfigSummary, DashboardSession, OverviewSummary, RunOutcome,
};
use crate::metrics::Metrics;

pub const STATIC_DIR: &str = "static";

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<DashboardSession>>,
    pub config: Arc<AgentConfig>,
    pub agent_factory: AgentFactory,
    /// Serializes agent runs: one in flight at a time.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: AgentConfig, agent_factory: AgentFactory) -> Self {
        let session = DashboardSession::new(default_query(), default_sources_input(&config));
        Self {
            session: Arc::new(RwLock::new(session)),
            config: Arc::new(config),
            agent_factory,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// State whose agent is the built-in `SourcingAgent` configured from `config`.
    pub fn from_config(config: AgentConfig) -> Self {
        let cfg = config.clone();
        let factory: AgentFactory =
            Arc::new(move || Ok(Arc::new(SourcingAgent::from_config(&cfg)?) as DynAgent));
        Self::new(config, factory)
    }

    async fn ensure_agent(&self) -> Option<DynAgent> {
        self.session.write().await.initialize(&self.agent_factory)
    }

    /// Run the agent against `sources`, caching the outcome in the session.
    pub async fn run_agent(
        &self,
        query: &str,
        sources: &[String],
        sources_input: &str,
    ) -> RunOutcome {
        let _running = self.run_lock.lock().await;
        let agent = {
            let mut s = self.session.write().await;
            s.last_query = query.to_string();
            s.last_sources_input = sources_input.to_string();
            s.initialize(&self.agent_factory)
        };
        let Some(agent) = agent else {
            return RunOutcome::Skipped;
        };
        // Session lock is not held across the agent call.
        let outcome = execute_run(&agent, query, sources).await;
        self.session.write().await.apply_run(outcome)
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(dashboard))
        .route("/run", post(run_form))
        .route("/health", get(|| async { "ok" }))
        .route("/api/overview", get(api_overview))
        .route("/api/content", get(api_content))
        .route("/api/config", get(api_config))
        .route("/api/run", post(api_run))
        .nest_service("/static", ServeDir::new(STATIC_DIR));

    match Metrics::init() {
        Ok(m) => app = app.merge(m.router::<AppState>()),
        Err(e) => warn!(error = %e, "metrics endpoint disabled"),
    }

    app.layer(CorsLayer::very_permissive()).with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct DashboardParams {
    view: Option<String>,
}

async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Html<String> {
    state.ensure_agent().await;
    Html(render_current(&state, View::parse(params.view.as_deref()), None).await)
}

#[derive(Debug, Deserialize)]
struct RunForm {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    query: String,
    #[serde(default)]
    sources: String,
}

async fn run_form(State(state): State<AppState>, Form(form): Form<RunForm>) -> Html<String> {
    let sources = parse_sources(&form.sources);
    let outcome = state.run_agent(&form.query, &sources, &form.sources).await;
    let flash = match outcome {
        RunOutcome::Completed => Some(Flash::Success(RUN_SUCCESS_MESSAGE.to_string())),
        RunOutcome::Failed(msg) => Some(Flash::Error(msg)),
        RunOutcome::Skipped => None,
    };
    Html(render_current(&state, View::parse(form.view.as_deref()), flash).await)
}

async fn render_current(state: &AppState, view: View, flash: Option<Flash>) -> String {
    let s = state.session.read().await;
    render_page(&PageContext {
        view,
        query: &s.last_query,
        sources_input: &s.last_sources_input,
        results: s.results.as_ref(),
        stored_content: &s.stored_content,
        config: &state.config,
        flash,
        init_error: s.init_error(),
        now: Utc::now(),
    })
}

async fn api_overview(State(state): State<AppState>) -> Json<OverviewSummary> {
    let s = state.session.read().await;
    Json(OverviewSummary::from_result(s.results.as_ref()))
}

async fn api_content(State(state): State<AppState>) -> Json<Vec<StoredContent>> {
    Json(state.session.read().await.stored_content.clone())
}

async fn api_config(State(state): State<AppState>) -> Json<ConfigSummary> {
    Json(ConfigSummary::from_config(&state.config))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourcesField {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ApiRunReq {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    sources: Option<SourcesField>,
}

async fn api_run(State(state): State<AppState>, Json(req): Json<ApiRunReq>) -> Response {
    let query = req.query.unwrap_or_else(default_query);
    let (sources, sources_input) = match req.sources {
        Some(SourcesField::List(list)) => {
            let input = list.join(",");
            (parse_sources(&input), input)
        }
        Some(SourcesField::Text(input)) => (parse_sources(&input), input),
        None => {
            let input = state.config.static_sources.join(",");
            (state.config.static_sources.clone(), input)
        }
    };

    match state.run_agent(&query, &sources, &sources_input).await {
        RunOutcome::Completed => {
            let s = state.session.read().await;
            match &s.results {
                Some(r) => Json(r.clone()).into_response(),
                None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        RunOutcome::Failed(msg) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": msg }))).into_response()
        }
        RunOutcome::Skipped => {
            let s = state.session.read().await;
            let msg = s.init_error().unwrap_or("agent unavailable").to_string();
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": msg }))).into_response()
        }
    }
}
