use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CollectError;
use crate::sentiment::{classify, PolarityScorer, SentimentLabel};

pub const TEXT_COLUMN: &str = "text";
pub const SCORE_COLUMN: &str = "score";
pub const LABEL_COLUMN: &str = "label";

pub const MIN_TARGET_COUNT: usize = 25;
pub const MAX_TARGET_COUNT: usize = 500;
pub const TARGET_COUNT_STEP: usize = 25;

/// One scored unit of text. `score` and `label` are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRecord {
    text: String,
    score: f64,
    label: SentimentLabel,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    extra: HashMap<String, String>,
}

impl TextRecord {
    pub fn scored(
        text: String,
        extra: HashMap<String, String>,
        scorer: &dyn PolarityScorer,
    ) -> Self {
        let score = scorer.compound(&text);
        Self {
            text,
            score,
            label: classify(score),
            extra,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn label(&self) -> SentimentLabel {
        self.label
    }

    /// A passthrough column value, e.g. `airline`.
    pub fn field(&self, column: &str) -> Option<&str> {
        if column == TEXT_COLUMN {
            return Some(&self.text);
        }
        self.extra.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Static {
        source: String,
    },
    Live {
        community: String,
        requested: usize,
        fetched_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedDataset {
    pub provenance: Provenance,
    /// Input column names in source order, `text` included.
    pub columns: Vec<String>,
    pub records: Vec<TextRecord>,
}

impl AnnotatedDataset {
    pub fn empty(provenance: Provenance) -> Self {
        Self {
            provenance,
            columns: vec![TEXT_COLUMN.to_string()],
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Input columns followed by the two derived ones.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain([SCORE_COLUMN, LABEL_COLUMN])
            .collect()
    }

    /// Sorted distinct non-empty values of a passthrough column.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.field(column))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Records whose `column` equals `value`, order preserved.
    pub fn filter_by(&self, column: &str, value: &str) -> Vec<&TextRecord> {
        self.records
            .iter()
            .filter(|r| r.field(column) == Some(value))
            .collect()
    }
}

/// Cache key of the live collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRequest {
    community: String,
    target_count: usize,
}

impl CollectionRequest {
    pub fn new(community: &str, target_count: usize) -> Result<Self, CollectError> {
        let community = community.trim().trim_start_matches("r/").to_string();
        if community.is_empty() {
            return Err(CollectError::InvalidRequest(
                "community name is empty".into(),
            ));
        }
        if !community.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CollectError::InvalidRequest(format!(
                "'{community}' is not a valid community name"
            )));
        }
        if !(MIN_TARGET_COUNT..=MAX_TARGET_COUNT).contains(&target_count)
            || target_count % TARGET_COUNT_STEP != 0
        {
            return Err(CollectError::InvalidRequest(format!(
                "target count {target_count} must be between {MIN_TARGET_COUNT} and \
                 {MAX_TARGET_COUNT} in steps of {TARGET_COUNT_STEP}"
            )));
        }
        Ok(Self {
            community,
            target_count,
        })
    }

    pub fn community(&self) -> &str {
        &self.community
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }
}

impl fmt::Display for CollectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r/{} ({} comments)", self.community, self.target_count)
    }
}
