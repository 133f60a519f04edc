//! Bounded collection of live comments, scored and cached per request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::TtlCache;
use crate::error::CollectError;
use crate::metrics::{CACHE_HITS, LIVE_COLLECTIONS, LIVE_COLLECTION_FAILURES, RECORDS_SCORED};
use crate::schema::{AnnotatedDataset, CollectionRequest, Provenance, TextRecord};
use crate::sentiment::PolarityScorer;

/// Hot threads examined per collection.
pub const HOT_THREAD_LIMIT: usize = 30;
/// Placeholder bodies of deleted or moderator-removed comments.
pub const REMOVED_SENTINELS: [&str; 2] = ["[deleted]", "[removed]"];
pub const DEFAULT_LIVE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: String,
    pub title: String,
}

/// A discussion API exposing a community's hot threads and their comments.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn hot_threads(&self, community: &str, limit: usize) -> Result<Vec<Thread>, CollectError>;

    /// Every comment body of the thread in the API's natural order, with
    /// "load more" placeholders already discarded.
    async fn thread_comments(&self, community: &str, thread: &Thread) -> Result<Vec<String>, CollectError>;
}

/// Outcome of a live collection. Every variant carries a dataset; it is empty
/// unless the collection is `Ready`.
#[derive(Debug)]
pub enum Collection {
    Ready(Arc<AnnotatedDataset>),
    Empty(Arc<AnnotatedDataset>),
    Failed {
        dataset: Arc<AnnotatedDataset>,
        error: CollectError,
    },
}

impl Collection {
    fn from_dataset(dataset: Arc<AnnotatedDataset>) -> Self {
        if dataset.is_empty() {
            Collection::Empty(dataset)
        } else {
            Collection::Ready(dataset)
        }
    }

    pub fn dataset(&self) -> &Arc<AnnotatedDataset> {
        match self {
            Collection::Ready(ds) | Collection::Empty(ds) => ds,
            Collection::Failed { dataset, .. } => dataset,
        }
    }

    pub fn error(&self) -> Option<&CollectError> {
        match self {
            Collection::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Collection::Ready(_))
    }
}

pub fn is_qualifying(body: &str) -> bool {
    !body.trim().is_empty() && !REMOVED_SENTINELS.contains(&body)
}

pub struct LiveCollector<S> {
    source: S,
    scorer: Arc<dyn PolarityScorer>,
    cache: TtlCache<CollectionRequest, Arc<AnnotatedDataset>>,
}

impl<S: CommentSource> LiveCollector<S> {
    pub fn new(source: S, scorer: Arc<dyn PolarityScorer>, ttl: Duration) -> Self {
        Self::with_cache(source, scorer, TtlCache::new(ttl))
    }

    pub fn with_cache(
        source: S,
        scorer: Arc<dyn PolarityScorer>,
        cache: TtlCache<CollectionRequest, Arc<AnnotatedDataset>>,
    ) -> Self {
        Self {
            source,
            scorer,
            cache,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collects up to `target_count` scored comments from `community`. Never
    /// fails outright: problems come back as `Collection::Failed`.
    pub async fn collect(&self, community: &str, target_count: usize) -> Collection {
        let request = match CollectionRequest::new(community, target_count) {
            Ok(request) => request,
            Err(error) => {
                warn!(community = %community, target_count, error = %error, "Rejected live collection request");
                let dataset = AnnotatedDataset::empty(live_provenance(community.trim(), target_count));
                return Collection::Failed {
                    dataset: Arc::new(dataset),
                    error,
                };
            }
        };

        if let Some(hit) = self.cache.get(&request) {
            CACHE_HITS.inc();
            debug!(request = %request, "Live collection served from cache");
            return Collection::from_dataset(hit);
        }

        LIVE_COLLECTIONS.inc();
        let provenance = live_provenance(request.community(), request.target_count());
        match self.gather(&request).await {
            Ok(bodies) => {
                let records: Vec<TextRecord> = bodies
                    .into_iter()
                    .map(|text| TextRecord::scored(text, HashMap::new(), self.scorer.as_ref()))
                    .collect();
                RECORDS_SCORED.inc_by(records.len() as f64);

                if records.is_empty() {
                    warn!(request = %request, "No comments found");
                } else {
                    info!(request = %request, count = records.len(), "Collected live comments");
                }

                let mut dataset = AnnotatedDataset::empty(provenance);
                dataset.records = records;
                let dataset = Arc::new(dataset);
                self.cache.insert(request, dataset.clone());
                Collection::from_dataset(dataset)
            }
            Err(error) => {
                LIVE_COLLECTION_FAILURES.inc();
                error!(request = %request, error = %error, "Live collection failed");
                Collection::Failed {
                    dataset: Arc::new(AnnotatedDataset::empty(provenance)),
                    error,
                }
            }
        }
    }

    async fn gather(&self, request: &CollectionRequest) -> Result<Vec<String>, CollectError> {
        let target = request.target_count();
        let threads = self
            .source
            .hot_threads(request.community(), HOT_THREAD_LIMIT)
            .await?;

        let mut bodies: Vec<String> = Vec::with_capacity(target);
        for thread in threads.iter().take(HOT_THREAD_LIMIT) {
            if bodies.len() >= target {
                break;
            }
            let comments = self.source.thread_comments(request.community(), thread).await?;
            let remaining = target - bodies.len();
            bodies.extend(
                comments
                    .into_iter()
                    .filter(|body| is_qualifying(body))
                    .take(remaining),
            );
        }

        bodies.truncate(target);
        Ok(bodies)
    }
}

fn live_provenance(community: &str, requested: usize) -> Provenance {
    Provenance::Live {
        community: community.to_string(),
        requested,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Neutral;

    impl PolarityScorer for Neutral {
        fn compound(&self, _text: &str) -> f64 {
            0.0
        }
    }

    /// `threads` hot threads, each with the given comment bodies.
    struct Stub {
        threads: Vec<Vec<String>>,
        hot_calls: AtomicUsize,
        comment_calls: AtomicUsize,
    }

    impl Stub {
        fn new(threads: Vec<Vec<&str>>) -> Self {
            Self {
                threads: threads
                    .into_iter()
                    .map(|t| t.into_iter().map(str::to_string).collect())
                    .collect(),
                hot_calls: AtomicUsize::new(0),
                comment_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommentSource for Stub {
        async fn hot_threads(&self, _community: &str, limit: usize) -> Result<Vec<Thread>, CollectError> {
            self.hot_calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.threads.len().min(limit))
                .map(|i| Thread {
                    id: i.to_string(),
                    title: format!("thread {i}"),
                })
                .collect())
        }

        async fn thread_comments(&self, _community: &str, thread: &Thread) -> Result<Vec<String>, CollectError> {
            self.comment_calls.fetch_add(1, Ordering::SeqCst);
            let idx: usize = thread.id.parse().unwrap();
            Ok(self.threads[idx].clone())
        }
    }

    fn collector(stub: Stub) -> LiveCollector<Stub> {
        LiveCollector::new(stub, Arc::new(Neutral), DEFAULT_LIVE_TTL)
    }

    #[test]
    fn sentinels_do_not_qualify() {
        assert!(!is_qualifying("[deleted]"));
        assert!(!is_qualifying("[removed]"));
        assert!(!is_qualifying(""));
        assert!(!is_qualifying("   "));
        assert!(!is_qualifying("\n\t"));
        assert!(is_qualifying("[deleted] but not really"));
    }

    #[tokio::test]
    async fn stops_at_target_and_skips_sentinels() {
        let many: Vec<&str> = (0..20).map(|_| "hello").collect();
        let mut first = vec!["[deleted]", "[removed]"];
        first.extend(many.iter().copied());
        let stub = Stub::new(vec![first, many.clone(), many.clone(), many]);
        let c = collector(stub);

        let result = c.collect("python", 25).await;
        assert!(result.is_ready());
        let ds = result.dataset();
        assert_eq!(ds.len(), 25);
        assert!(ds.records.iter().all(|r| is_qualifying(r.text())));
        assert!(ds.records.iter().all(|r| r.label() == SentimentLabel::Neutral));
        // 20 + 5 from the second thread; the rest are never fetched
        assert_eq!(c.source().comment_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fewer_comments_than_target() {
        let stub = Stub::new(vec![vec!["a", "b", "[removed]"], vec![], vec!["c"]]);
        let c = collector(stub);
        let result = c.collect("python", 50).await;
        let texts: Vec<&str> = result.dataset().records.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn only_thirty_threads_are_read() {
        let threads: Vec<Vec<&str>> = (0..40).map(|_| vec!["x"]).collect();
        let c = collector(Stub::new(threads));
        let result = c.collect("python", 100).await;
        assert_eq!(result.dataset().len(), HOT_THREAD_LIMIT);
        assert_eq!(c.source().comment_calls.load(Ordering::SeqCst), HOT_THREAD_LIMIT);
    }

    #[tokio::test]
    async fn empty_is_cached_and_not_an_error() {
        let c = collector(Stub::new(vec![vec!["[deleted]"]]));
        let first = c.collect("quiet", 25).await;
        assert!(matches!(first, Collection::Empty(_)));
        assert!(first.error().is_none());

        let second = c.collect("quiet", 25).await;
        assert!(matches!(second, Collection::Empty(_)));
        assert_eq!(c.source().hot_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_is_keyed_per_request() {
        let c = collector(Stub::new(vec![vec!["a"; 60]]));
        let a = c.collect("python", 25).await;
        let b = c.collect("python", 25).await;
        assert!(Arc::ptr_eq(a.dataset(), b.dataset()));
        assert_eq!(c.source().hot_calls.load(Ordering::SeqCst), 1);

        let wider = c.collect("python", 50).await;
        assert_eq!(wider.dataset().len(), 50);
        assert_eq!(c.source().hot_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_request_fails_softly() {
        let c = collector(Stub::new(vec![vec!["a"]]));
        let result = c.collect("python", 30).await;
        assert!(matches!(result.error(), Some(CollectError::InvalidRequest(_))));
        assert!(result.dataset().is_empty());
        assert_eq!(c.source().hot_calls.load(Ordering::SeqCst), 0);
    }
}
