use thiserror::Error;

/// Problems reading process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set together with {other}")]
    Incomplete { name: &'static str, other: &'static str },
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Fatal failures of the static-source annotator. No partial dataset is
/// produced when one of these is returned.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("cannot read source {source_id}: {err}")]
    Io {
        source_id: String,
        #[source]
        err: std::io::Error,
    },
    #[error("malformed source {source_id}: {err}")]
    Csv {
        source_id: String,
        #[source]
        err: csv::Error,
    },
    #[error("source {source_id} has no '{column}' column")]
    MissingColumn { source_id: String, column: &'static str },
    #[error("{source_id}: column '{column}' is reserved for derived values")]
    ReservedColumn { source_id: String, column: &'static str },
    #[error("annotation worker failed: {0}")]
    Worker(String),
}

/// Reasons a live collection came back without data. These never escape the
/// collector as `Err`; they travel inside `Collection::Failed`.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("credentials rejected by Reddit ({0})")]
    Unauthorized(String),
    #[error("community r/{0} does not exist")]
    CommunityNotFound(String),
    #[error("rate limited by Reddit")]
    RateLimited,
    #[error("Reddit returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Decode(String),
}
