use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";
pub const DEFAULT_API_URL: &str = "https://oauth.reddit.com";
const DEFAULT_USERNAME: &str = "default_user";

/// Credentials for Reddit's app-only OAuth flow.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub auth_url: String,
    pub api_url: String,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: None,
            auth_url: DEFAULT_AUTH_URL.into(),
            api_url: DEFAULT_API_URL.into(),
        }
    }

    pub fn user_agent(&self) -> String {
        let username = self.username.as_deref().unwrap_or(DEFAULT_USERNAME);
        format!("SentimentAnalysisApp by u/{username}")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub port: u16,
    pub live_cache_ttl: Duration,
    pub reddit: Option<RedditCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dataset_path = lookup("TWEETS_CSV")
            .unwrap_or_else(|| "Tweets.csv".into())
            .into();

        let port = parse_or(&lookup, "PORT", 8501u16)?;
        let ttl_secs = parse_or(&lookup, "LIVE_CACHE_TTL_SECS", 600u64)?;

        let reddit = match (lookup("REDDIT_CLIENT_ID"), lookup("REDDIT_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => {
                let mut creds = RedditCredentials::new(id, secret);
                creds.username = lookup("REDDIT_USERNAME").filter(|u| !u.trim().is_empty());
                if let Some(url) = lookup("REDDIT_AUTH_URL") {
                    creds.auth_url = url.trim_end_matches('/').to_string();
                }
                if let Some(url) = lookup("REDDIT_API_URL") {
                    creds.api_url = url.trim_end_matches('/').to_string();
                }
                Some(creds)
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    name: "REDDIT_CLIENT_ID",
                    other: "REDDIT_CLIENT_SECRET",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    name: "REDDIT_CLIENT_SECRET",
                    other: "REDDIT_CLIENT_ID",
                })
            }
        };

        Ok(Self {
            dataset_path,
            port,
            live_cache_ttl: Duration::from_secs(ttl_secs),
            reddit,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
