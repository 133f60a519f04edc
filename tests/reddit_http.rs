//! Drives `RedditClient` through `LiveCollector` against a local warp server
//! that answers the way Reddit does for unknown, throttled and unauthorized
//! requests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use warp::http::{Response, StatusCode};
use warp::Filter;

use sentiscope::config::RedditCredentials;
use sentiscope::error::CollectError;
use sentiscope::reddit::RedditClient;
use sentiscope::sentiment::VaderScorer;
use sentiscope::{Collection, LiveCollector};

struct FakeReddit {
    addr: SocketAddr,
    token_requests: Arc<AtomicUsize>,
    comment_queries: Arc<Mutex<Vec<String>>>,
}

fn respond(status: StatusCode, body: Value, location: Option<&str>) -> Response<String> {
    let mut builder = Response::builder()
        .status(status)
        .header("content-type", "application/json");
    if let Some(location) = location {
        builder = builder.header("location", location);
    }
    builder.body(body.to_string()).unwrap()
}

fn listing(children: Vec<Value>) -> Value {
    json!({ "kind": "Listing", "data": { "children": children } })
}

fn comment(body: &str, replies: Value) -> Value {
    json!({ "kind": "t1", "data": { "body": body, "replies": replies } })
}

/// Hot listings by community name:
/// `python` has one thread, `missing` is 404, `renamed` redirects to search,
/// `busy` is throttled and `expired` rejects the bearer token.
async fn start(reject_credentials: bool) -> FakeReddit {
    let token_requests = Arc::new(AtomicUsize::new(0));
    let comment_queries = Arc::new(Mutex::new(Vec::new()));

    let counter = token_requests.clone();
    let token = warp::path!("api" / "v1" / "access_token")
        .and(warp::post())
        .map(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if reject_credentials {
                respond(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized", "error": 401 }), None)
            } else {
                respond(
                    StatusCode::OK,
                    json!({ "access_token": "fake-token", "token_type": "bearer", "expires_in": 86400 }),
                    None,
                )
            }
        });

    let hot = warp::path!("r" / String / "hot")
        .and(warp::get())
        .map(|community: String| match community.as_str() {
            "python" => respond(
                StatusCode::OK,
                listing(vec![json!({ "kind": "t3", "data": { "id": "abc", "title": "Weekly thread" } })]),
                None,
            ),
            "renamed" => respond(
                StatusCode::FOUND,
                json!({}),
                Some("https://www.reddit.com/subreddits/search.json?q=renamed"),
            ),
            "busy" => respond(StatusCode::TOO_MANY_REQUESTS, json!({ "message": "Too Many Requests" }), None),
            "expired" => respond(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" }), None),
            _ => respond(StatusCode::NOT_FOUND, json!({ "message": "Not Found", "error": 404 }), None),
        });

    let queries = comment_queries.clone();
    let comments = warp::path!("r" / String / "comments" / String)
        .and(warp::get())
        .and(warp::query::raw())
        .map(move |_community: String, _id: String, query: String| {
            queries.lock().unwrap().push(query);
            let page = json!([
                listing(vec![json!({ "kind": "t3", "data": { "id": "abc" } })]),
                listing(vec![
                    comment("This release is great, I love it", listing(vec![
                        comment("Terrible regression, everything is broken", json!("")),
                    ])),
                    comment("[deleted]", json!("")),
                    comment("   ", json!("")),
                    comment("It compiles", json!("")),
                ]),
            ]);
            respond(StatusCode::OK, page, None)
        });

    let (addr, server) = warp::serve(token.or(hot).or(comments)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    FakeReddit {
        addr,
        token_requests,
        comment_queries,
    }
}

fn collector(fake: &FakeReddit) -> LiveCollector<RedditClient> {
    let mut creds = RedditCredentials::new("id", "secret");
    creds.auth_url = format!("http://{}", fake.addr);
    creds.api_url = format!("http://{}", fake.addr);
    let client = RedditClient::new(creds).unwrap();
    LiveCollector::new(client, Arc::new(VaderScorer::new()), Duration::from_secs(600))
}

#[tokio::test]
async fn collects_comment_tree_with_full_page_query() {
    let fake = start(false).await;
    let collector = collector(&fake);

    let collection = collector.collect("python", 25).await;
    let Collection::Ready(dataset) = &collection else {
        panic!("expected a ready collection, got {collection:?}");
    };
    let texts: Vec<&str> = dataset.records.iter().map(|r| r.text()).collect();
    assert_eq!(
        texts,
        vec![
            "This release is great, I love it",
            "It compiles",
            "Terrible regression, everything is broken",
        ]
    );

    let queries = fake.comment_queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains("limit=2048"), "query was {}", queries[0]);
    assert!(queries[0].contains("sort=confidence"), "query was {}", queries[0]);
}

#[tokio::test]
async fn not_found_community_is_reported() {
    let fake = start(false).await;
    let collection = collector(&fake).collect("missing", 25).await;

    assert!(matches!(
        collection.error(),
        Some(CollectError::CommunityNotFound(c)) if c == "missing"
    ));
}

#[tokio::test]
async fn redirect_to_search_is_not_found() {
    let fake = start(false).await;
    let collection = collector(&fake).collect("renamed", 25).await;

    assert!(matches!(
        collection.error(),
        Some(CollectError::CommunityNotFound(c)) if c == "renamed"
    ));
}

#[tokio::test]
async fn throttling_is_rate_limited_and_keeps_token() {
    let fake = start(false).await;
    let collector = collector(&fake);

    for _ in 0..2 {
        let collection = collector.collect("busy", 25).await;
        assert!(matches!(collection.error(), Some(CollectError::RateLimited)));
    }
    assert_eq!(fake.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() {
    let fake = start(true).await;
    let collection = collector(&fake).collect("python", 25).await;

    assert!(matches!(collection.error(), Some(CollectError::Unauthorized(_))));
    assert!(fake.comment_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_bearer_token_is_dropped() {
    let fake = start(false).await;
    let collector = collector(&fake);

    let first = collector.collect("expired", 25).await;
    assert!(matches!(first.error(), Some(CollectError::Unauthorized(_))));
    let second = collector.collect("expired", 25).await;
    assert!(matches!(second.error(), Some(CollectError::Unauthorized(_))));

    // each attempt had to fetch a fresh token
    assert_eq!(fake.token_requests.load(Ordering::SeqCst), 2);
}
