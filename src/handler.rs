use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::{
    annotator::BatchAnnotator,
    collector::{Collection, LiveCollector},
    config::Config,
    dashboard::{
        airline_options, select_airline, DashboardView, Notice, DEFAULT_COMMUNITY,
        DEFAULT_TARGET_COUNT, ALL_OPTION, MODES, MODE_AIRLINE, MODE_LIVE,
    },
    error::AnnotateError,
    health::HealthChecker,
    metrics::MetricsRegistry,
    reddit::RedditClient,
    schema::{AnnotatedDataset, Provenance, MAX_TARGET_COUNT, MIN_TARGET_COUNT, TARGET_COUNT_STEP},
};

pub struct AppState {
    pub cfg: Config,
    pub annotator: Arc<BatchAnnotator>,
    pub collector: Option<LiveCollector<RedditClient>>,
    pub metrics: MetricsRegistry,
    pub health: HealthChecker,
}

#[derive(Debug, Deserialize)]
pub struct AirlineQuery {
    #[serde(default = "default_airline")]
    pub airline: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_airline() -> String {
    ALL_OPTION.to_string()
}

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_count() -> usize {
    DEFAULT_TARGET_COUNT
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<DashboardView>,
}

impl DashboardResponse {
    fn notice(mode: &'static str, notice: Notice) -> Self {
        Self {
            mode,
            options: None,
            notice: Some(notice),
            view: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct LiveControls {
    min_count: usize,
    max_count: usize,
    step: usize,
    default_count: usize,
    default_community: &'static str,
}

#[derive(Debug, Serialize)]
struct ModesResponse {
    modes: [&'static str; 3],
    live: LiveControls,
    notice: Notice,
}

/// Static-mode response: airline choices plus the view for `choice`.
pub fn airline_response(dataset: &AnnotatedDataset, choice: &str) -> DashboardResponse {
    let records = select_airline(dataset, choice);
    let view = (!records.is_empty())
        .then(|| DashboardView::build(format!("Displaying results for: {choice}"), &records));

    DashboardResponse {
        mode: MODE_AIRLINE,
        options: Some(airline_options(dataset)),
        notice: None,
        view,
    }
}

/// Live-mode response: the view, or a warning/error notice.
pub fn live_response(collection: &Collection) -> DashboardResponse {
    match collection {
        Collection::Ready(dataset) => {
            let records: Vec<_> = dataset.records.iter().collect();
            let caption = match &dataset.provenance {
                Provenance::Live { community, .. } => {
                    format!("Displaying results for: r/{community}")
                }
                Provenance::Static { source } => {
                    format!("Displaying results for: {source}")
                }
            };
            DashboardResponse {
                mode: MODE_LIVE,
                options: None,
                notice: None,
                view: Some(DashboardView::build(caption, &records)),
            }
        }
        Collection::Empty(_) => DashboardResponse::notice(MODE_LIVE, Notice::warning("No comments found.")),
        Collection::Failed { error, .. } => {
            DashboardResponse::notice(MODE_LIVE, Notice::error(format!("An error occurred: {error}.")))
        }
    }
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let modes_route = warp::path!("api" / "modes")
        .and(warp::get())
        .map(handle_modes);

    let airline_route = warp::path!("api" / "airline")
        .and(warp::get())
        .and(warp::query::<AirlineQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_airline);

    let live_route = warp::path!("api" / "live")
        .and(warp::get())
        .and(warp::query::<LiveQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_live);

    let metrics_route = warp::path!("metrics")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_metrics);

    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_health);

    let root_route = warp::path::end()
        .and(warp::get())
        .map(|| "Sentiscope - /api/modes, /api/airline, /api/live, /metrics, /health");

    modes_route
        .or(airline_route)
        .or(live_route)
        .or(metrics_route)
        .or(health_route)
        .or(root_route)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn handle_modes() -> impl Reply {
    warp::reply::json(&ModesResponse {
        modes: MODES,
        live: LiveControls {
            min_count: MIN_TARGET_COUNT,
            max_count: MAX_TARGET_COUNT,
            step: TARGET_COUNT_STEP,
            default_count: DEFAULT_TARGET_COUNT,
            default_community: DEFAULT_COMMUNITY,
        },
        notice: Notice::info("Please select an analysis mode to get started."),
    })
}

async fn handle_airline(query: AirlineQuery, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let annotator = state.annotator.clone();
    let path = state.cfg.dataset_path.clone();

    let loaded = tokio::task::spawn_blocking(move || annotator.annotate(&path))
        .await
        .map_err(|e| AnnotateError::Worker(e.to_string()))
        .and_then(|result| result);

    let (response, status) = match loaded {
        Ok(dataset) => {
            info!(airline = %query.airline, rows = dataset.len(), "Serving airline view");
            (airline_response(&dataset, &query.airline), StatusCode::OK)
        }
        Err(err) => {
            error!(error = %err, "Failed to load static dataset");
            (
                DashboardResponse::notice(MODE_AIRLINE, Notice::error(err.to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    Ok(warp::reply::with_status(warp::reply::json(&response), status))
}

async fn handle_live(query: LiveQuery, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let Some(collector) = state.collector.as_ref() else {
        let response = DashboardResponse::notice(
            MODE_LIVE,
            Notice::error("An error occurred: Reddit credentials are not configured."),
        );
        return Ok(warp::reply::with_status(
            warp::reply::json(&response),
            StatusCode::SERVICE_UNAVAILABLE,
        ));
    };

    info!(community = %query.community, count = query.count, "Fetching live comments");
    let collection = collector.collect(&query.community, query.count).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&live_response(&collection)),
        StatusCode::OK,
    ))
}

async fn handle_metrics(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let metrics_text = state.metrics.gather_metrics();
    Ok(warp::reply::with_header(
        metrics_text,
        "Content-Type",
        "text/plain; version=0.0.4; charset=utf-8",
    ))
}

async fn handle_health(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let reddit = state.collector.as_ref().map(|c| c.source());
    let health_status = state
        .health
        .get_overall_health(&state.cfg.dataset_path, reddit)
        .await;

    let json_response = serde_json::to_string_pretty(&health_status)
        .unwrap_or_else(|_| "{\"error\": \"Failed to serialize health status\"}".to_string());

    Ok(warp::reply::with_header(
        json_response,
        "Content-Type",
        "application/json",
    ))
}
