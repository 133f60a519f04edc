//! Scores every row of a static CSV source.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::cache::MemoCache;
use crate::error::AnnotateError;
use crate::metrics::{ANNOTATE_DURATION, CACHE_HITS, DATASETS_ANNOTATED, RECORDS_SCORED};
use crate::schema::{AnnotatedDataset, Provenance, TextRecord, LABEL_COLUMN, SCORE_COLUMN, TEXT_COLUMN};
use crate::sentiment::PolarityScorer;

pub struct BatchAnnotator {
    scorer: Arc<dyn PolarityScorer>,
    cache: MemoCache<String, Arc<AnnotatedDataset>>,
}

impl BatchAnnotator {
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self::with_cache(scorer, MemoCache::new())
    }

    pub fn with_cache(
        scorer: Arc<dyn PolarityScorer>,
        cache: MemoCache<String, Arc<AnnotatedDataset>>,
    ) -> Self {
        Self { scorer, cache }
    }

    /// Annotates the CSV at `path`, reusing an earlier result for the same file.
    pub fn annotate(&self, path: impl AsRef<Path>) -> Result<Arc<AnnotatedDataset>, AnnotateError> {
        let path = path.as_ref();
        let source_id = source_identity(path);

        if let Some(hit) = self.cache.get(&source_id) {
            CACHE_HITS.inc();
            debug!(source = %source_id, "Static dataset served from cache");
            return Ok(hit);
        }

        let _timer = ANNOTATE_DURATION.start_timer();
        let file = File::open(path).map_err(|err| AnnotateError::Io {
            source_id: source_id.clone(),
            err,
        })?;
        let dataset = Arc::new(self.annotate_reader(&source_id, file)?);

        DATASETS_ANNOTATED.inc();
        info!(source = %source_id, rows = dataset.len(), "Annotated static dataset");
        self.cache.insert(source_id, dataset.clone());
        Ok(dataset)
    }

    /// Annotates CSV from any reader. Not memoized.
    pub fn annotate_reader<R: Read>(
        &self,
        source_id: &str,
        reader: R,
    ) -> Result<AnnotatedDataset, AnnotateError> {
        let csv_err = |err| AnnotateError::Csv {
            source_id: source_id.to_string(),
            err,
        };

        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let columns: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let text_idx = columns
            .iter()
            .position(|c| c == TEXT_COLUMN)
            .ok_or_else(|| AnnotateError::MissingColumn {
                source_id: source_id.to_string(),
                column: TEXT_COLUMN,
            })?;

        if let Some(column) = [SCORE_COLUMN, LABEL_COLUMN]
            .into_iter()
            .find(|reserved| columns.iter().any(|c| c == reserved))
        {
            return Err(AnnotateError::ReservedColumn {
                source_id: source_id.to_string(),
                column,
            });
        }

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for row in rdr.records() {
            let row = row.map_err(csv_err)?;
            let text = row.get(text_idx).unwrap_or_default();
            if text.trim().is_empty() {
                dropped += 1;
                continue;
            }

            let extra: HashMap<String, String> = columns
                .iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(i, _)| *i != text_idx)
                .map(|(_, (name, value))| (name.clone(), value.to_string()))
                .collect();

            records.push(TextRecord::scored(text.to_string(), extra, self.scorer.as_ref()));
        }

        RECORDS_SCORED.inc_by(records.len() as f64);
        if dropped > 0 {
            debug!(source = %source_id, dropped, "Dropped rows without text");
        }

        Ok(AnnotatedDataset {
            provenance: Provenance::Static {
                source: source_id.to_string(),
            },
            columns,
            records,
        })
    }
}

fn source_identity(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
