use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collector::{CommentSource, Thread};
use crate::config::RedditCredentials;
use crate::error::CollectError;
use crate::metrics::REDDIT_FETCH_DURATION;

// Largest comment page Reddit returns in one request.
const COMMENT_PAGE_LIMIT: usize = 2048;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
// Refresh a little before Reddit would reject the token.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// App-only OAuth client for the Reddit listing endpoints.
pub struct RedditClient {
    http: Client,
    creds: RedditCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(creds: RedditCredentials) -> Result<Self, CollectError> {
        let http = Client::builder()
            .user_agent(creds.user_agent())
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            creds,
            token: Mutex::new(None),
        })
    }

    /// Returns a bearer token, requesting a new one when none is cached or
    /// the cached one is about to expire.
    pub async fn authenticate(&self) -> Result<String, CollectError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken, CollectError> {
        let url = format!("{}/api/v1/access_token", self.creds.auth_url);

        let res = self
            .http
            .post(&url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = ?status, "Reddit rejected client credentials");
            return Err(CollectError::Unauthorized(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(CollectError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let token = parse_token(&body)?;
        info!("Obtained Reddit access token");
        Ok(token)
    }

    async fn get_json(&self, path: &str) -> Result<Value, CollectError> {
        let _timer = REDDIT_FETCH_DURATION.start_timer();
        let token = self.authenticate().await?;
        let url = format!("{}{}", self.creds.api_url, path);

        let res = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollectError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED {
            // force a new token on the next call
            *self.token.lock().await = None;
            return Err(CollectError::Unauthorized(format!("status {status}")));
        }
        if !status.is_success() {
            let body = if status.is_redirection() {
                res.headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            } else {
                res.text().await?
            };
            return Err(CollectError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl CommentSource for RedditClient {
    async fn hot_threads(&self, community: &str, limit: usize) -> Result<Vec<Thread>, CollectError> {
        let path = format!("/r/{community}/hot?limit={limit}");
        let body = self.get_json(&path).await.map_err(|err| match err {
            // unknown communities redirect to search or answer 404
            CollectError::Api { status, .. } if status == 404 || (300..400).contains(&status) => {
                CollectError::CommunityNotFound(community.to_string())
            }
            other => other,
        })?;

        let threads = parse_hot_listing(&body)?;
        info!(community = %community, count = threads.len(), "Fetched hot threads");
        Ok(threads)
    }

    async fn thread_comments(&self, community: &str, thread: &Thread) -> Result<Vec<String>, CollectError> {
        let path = format!(
            "/r/{community}/comments/{}?limit={COMMENT_PAGE_LIMIT}&sort=confidence",
            thread.id
        );
        let body = self.get_json(&path).await?;
        let comments = flatten_comment_tree(&body)?;
        debug!(thread = %thread.id, count = comments.len(), "Fetched comment tree");
        Ok(comments)
    }
}

fn parse_token(body: &str) -> Result<AccessToken, CollectError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| CollectError::Decode(format!("token response: {e}")))?;

    if let Some(err) = json["error"].as_str() {
        return Err(CollectError::Unauthorized(err.to_string()));
    }
    let value = json["access_token"]
        .as_str()
        .ok_or_else(|| CollectError::Decode("token response has no access_token".into()))?;
    let lifetime = Duration::from_secs(json["expires_in"].as_u64().unwrap_or(3600));

    Ok(AccessToken {
        value: value.to_string(),
        expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_SLACK),
    })
}

fn listing_children(listing: &Value) -> impl Iterator<Item = &Value> {
    listing["data"]["children"]
        .as_array()
        .into_iter()
        .flatten()
}

fn parse_hot_listing(body: &Value) -> Result<Vec<Thread>, CollectError> {
    if body["data"]["children"].as_array().is_none() {
        return Err(CollectError::Decode("hot listing has no children".into()));
    }

    Ok(listing_children(body)
        .filter(|thing| thing["kind"].as_str() == Some("t3"))
        .filter_map(|thing| {
            let data = &thing["data"];
            Some(Thread {
                id: data["id"].as_str()?.to_string(),
                title: data["title"].as_str().unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// Comment bodies of a thread, breadth first: all top-level comments, then
/// their replies level by level. "more" placeholders are dropped.
fn flatten_comment_tree(body: &Value) -> Result<Vec<String>, CollectError> {
    let comments = body
        .get(1)
        .ok_or_else(|| CollectError::Decode("comment page has no comment listing".into()))?;

    let mut queue: VecDeque<&Value> = listing_children(comments).collect();
    let mut bodies = Vec::new();

    while let Some(thing) = queue.pop_front() {
        if thing["kind"].as_str() != Some("t1") {
            continue;
        }
        let data = &thing["data"];
        bodies.push(data["body"].as_str().unwrap_or_default().to_string());
        // `replies` is "" for leaf comments
        queue.extend(listing_children(&data["replies"]));
    }

    Ok(bodies)
}
