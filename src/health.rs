use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::reddit::RedditClient;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub services: HashMap<String, ServiceHealth>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceHealth {
    pub status: String,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl ServiceHealth {
    fn healthy(message: impl Into<String>, start: Instant) -> Self {
        Self {
            status: "healthy".to_string(),
            message: Some(message.into()),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    fn unhealthy(message: impl Into<String>, start: Instant) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message.into()),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Default)]
pub struct HealthChecker;

impl HealthChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check_dataset(&self, path: &Path) -> ServiceHealth {
        let start = Instant::now();

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                ServiceHealth::healthy(format!("{} readable", path.display()), start)
            }
            Ok(_) => ServiceHealth::unhealthy(format!("{} is not a file", path.display()), start),
            Err(e) => ServiceHealth::unhealthy(format!("{}: {}", path.display(), e), start),
        }
    }

    pub async fn check_reddit(&self, client: Option<&RedditClient>) -> ServiceHealth {
        let start = Instant::now();

        let Some(client) = client else {
            return ServiceHealth::unhealthy("Reddit credentials are not configured", start);
        };
        match client.authenticate().await {
            Ok(_) => ServiceHealth::healthy("Reddit API token available", start),
            Err(e) => ServiceHealth::unhealthy(format!("Reddit error: {}", e), start),
        }
    }

    pub async fn get_overall_health(&self, dataset: &Path, reddit: Option<&RedditClient>) -> HealthStatus {
        let mut services = HashMap::new();

        services.insert("dataset".to_string(), self.check_dataset(dataset));
        services.insert("reddit".to_string(), self.check_reddit(reddit).await);

        let all_healthy = services.values().all(|service| service.status == "healthy");
        let overall_status = if all_healthy { "healthy" } else { "degraded" };

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            services,
        }
    }
}
