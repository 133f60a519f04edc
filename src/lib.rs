pub mod annotator;
pub mod cache;
pub mod collector;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod handler;
pub mod health;
pub mod metrics;
pub mod reddit;
pub mod schema;
pub mod sentiment;

pub use annotator::BatchAnnotator;
pub use collector::{Collection, CommentSource, LiveCollector};
pub use schema::{AnnotatedDataset, CollectionRequest, TextRecord};
pub use sentiment::{classify, PolarityScorer, SentimentLabel, VaderScorer};
