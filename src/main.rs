// Sentiment dashboard server
// Run with: cargo run
// Reads TWEETS_CSV, PORT and the REDDIT_* credentials from the environment (or .env).

use std::sync::Arc;

use dotenv::dotenv;
use tracing::{info, warn};

use sentiscope::{
    annotator::BatchAnnotator,
    collector::LiveCollector,
    config::Config,
    handler::{routes, AppState},
    health::HealthChecker,
    metrics::MetricsRegistry,
    reddit::RedditClient,
    sentiment::{PolarityScorer, VaderScorer},
};

type DynErr = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), DynErr> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env()?;
    let scorer: Arc<dyn PolarityScorer> = Arc::new(VaderScorer::new());

    let annotator = Arc::new(BatchAnnotator::new(scorer.clone()));

    let collector = match cfg.reddit.clone() {
        Some(creds) => {
            let client = RedditClient::new(creds)?;
            Some(LiveCollector::new(client, scorer, cfg.live_cache_ttl))
        }
        None => {
            warn!("REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET not set; live analysis disabled");
            None
        }
    };

    let port = cfg.port;
    info!(dataset = %cfg.dataset_path.display(), port, "Starting sentiment dashboard");

    let state = Arc::new(AppState {
        cfg,
        annotator,
        collector,
        metrics: MetricsRegistry::new(),
        health: HealthChecker::new(),
    });

    warp::serve(routes(state))
        .run(([0, 0, 0, 0], port))
        .await;

    Ok(())
}
