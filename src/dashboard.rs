//! Display-ready views over annotated records: aggregate percentages, the
//! label distribution for the pie chart, and the tinted record table.

use serde::Serialize;

use crate::schema::{AnnotatedDataset, TextRecord};
use crate::sentiment::SentimentLabel;

pub const MODE_HOME: &str = "Home";
pub const MODE_AIRLINE: &str = "Airline Tweet Demo";
pub const MODE_LIVE: &str = "Live Reddit Analysis";
pub const MODES: [&str; 3] = [MODE_HOME, MODE_AIRLINE, MODE_LIVE];

pub const ALL_OPTION: &str = "All";
pub const AIRLINE_COLUMN: &str = "airline";
pub const DEFAULT_COMMUNITY: &str = "python";
pub const DEFAULT_TARGET_COUNT: usize = 50;

/// Pie chart color for a label.
pub fn chart_color(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Positive => "#2ca02c",
        SentimentLabel::Negative => "#d62728",
        SentimentLabel::Neutral => "#7f7f7f",
    }
}

/// Background tint of a table row.
pub fn row_tint(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Positive => "#e6fffa",
        SentimentLabel::Negative => "#ffe6e6",
        SentimentLabel::Neutral => "#f0f2f6",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelShare {
    pub count: usize,
    pub percent: f64,
    pub display: String,
}

impl LabelShare {
    fn new(count: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        Self {
            count,
            percent,
            display: format!("{percent:.2}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub total: usize,
    pub positive: LabelShare,
    pub negative: LabelShare,
    pub neutral: LabelShare,
}

impl SentimentSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TextRecord>,
    {
        let (mut pos, mut neg, mut neu) = (0, 0, 0);
        for record in records {
            match record.label() {
                SentimentLabel::Positive => pos += 1,
                SentimentLabel::Negative => neg += 1,
                SentimentLabel::Neutral => neu += 1,
            }
        }
        let total = pos + neg + neu;
        Self {
            total,
            positive: LabelShare::new(pos, total),
            negative: LabelShare::new(neg, total),
            neutral: LabelShare::new(neu, total),
        }
    }

    pub fn share(&self, label: SentimentLabel) -> &LabelShare {
        match label {
            SentimentLabel::Positive => &self.positive,
            SentimentLabel::Negative => &self.negative,
            SentimentLabel::Neutral => &self.neutral,
        }
    }

    /// Non-zero label counts, largest first.
    pub fn distribution(&self) -> Vec<Slice> {
        let mut slices: Vec<Slice> = SentimentLabel::ALL
            .iter()
            .map(|&label| Slice {
                label,
                count: self.share(label).count,
                color: chart_color(label),
            })
            .filter(|s| s.count > 0)
            .collect();
        slices.sort_by(|a, b| b.count.cmp(&a.count));
        slices
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: SentimentLabel,
    pub count: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// 1-based position in the displayed selection.
    pub index: usize,
    pub text: String,
    pub score: f64,
    pub label: SentimentLabel,
    pub tint: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub caption: String,
    pub summary: SentimentSummary,
    pub distribution: Vec<Slice>,
    pub rows: Vec<TableRow>,
}

impl DashboardView {
    pub fn build(caption: impl Into<String>, records: &[&TextRecord]) -> Self {
        let summary = SentimentSummary::from_records(records.iter().copied());
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, r)| TableRow {
                index: i + 1,
                text: r.text().to_string(),
                score: r.score(),
                label: r.label(),
                tint: row_tint(r.label()),
            })
            .collect();

        Self {
            caption: caption.into(),
            distribution: summary.distribution(),
            summary,
            rows,
        }
    }
}

/// `All` followed by the sorted distinct airlines.
pub fn airline_options(dataset: &AnnotatedDataset) -> Vec<String> {
    std::iter::once(ALL_OPTION.to_string())
        .chain(dataset.distinct_values(AIRLINE_COLUMN))
        .collect()
}

pub fn select_airline<'a>(dataset: &'a AnnotatedDataset, choice: &str) -> Vec<&'a TextRecord> {
    if choice == ALL_OPTION {
        dataset.records.iter().collect()
    } else {
        dataset.filter_by(AIRLINE_COLUMN, choice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
