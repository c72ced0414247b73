//! Checksum-gated rebuilding of a record's n-gram blob.
//!
//! Runs inline in the write path, before a record is inserted or updated:
//!
//! ```text
//! text sources ──join──▶ raw text ──sha256──▶ checksum
//!                                               │
//!                         same as stored? ──yes─┴─▶ Unchanged (no n-grams computed)
//!                                │no
//!                                ▼
//!                 n-grams ──greedy fill ≤ max length──▶ blob + checksum stored
//! ```

use crate::checksum;
use crate::config::AssemblyConfig;
use crate::ngram::generate;
use crate::record::SearchableRecord;
use serde::Serialize;
use tracing::{debug, enabled, error, trace, Level};

/// Which write is about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
}

/// Result of one assembly pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssembleOutcome {
    /// Raw text unchanged since the last rebuild; nothing was touched.
    Unchanged,
    /// Blob and checksum were rewritten.
    Rebuilt {
        /// Distinct n-grams generated.
        generated: usize,
        /// N-grams that fit into the blob.
        appended: usize,
        /// Final blob length in bytes.
        length: usize,
    },
}

impl AssembleOutcome {
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, AssembleOutcome::Rebuilt { .. })
    }

    /// True if some generated n-grams did not fit.
    pub fn is_truncated(&self) -> bool {
        match self {
            AssembleOutcome::Rebuilt {
                generated,
                appended,
                ..
            } => appended < generated,
            AssembleOutcome::Unchanged => false,
        }
    }
}

/// A stage of the caller's write path that may rewrite a record before it is persisted.
pub trait WriteStage<R> {
    fn before_write(&self, record: &mut R, kind: WriteKind);
}

/// An ordered chain of [`WriteStage`]s.
pub struct WritePipeline<R> {
    stages: Vec<Box<dyn WriteStage<R> + Send + Sync>>,
}

impl<R> WritePipeline<R> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage(mut self, stage: impl WriteStage<R> + Send + Sync + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order.
    pub fn before_write(&self, record: &mut R, kind: WriteKind) {
        for stage in &self.stages {
            stage.before_write(record, kind);
        }
    }
}

impl<R> Default for WritePipeline<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the search blob and checksum of [`SearchableRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchDataAssembler;

impl SearchDataAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Concatenate the record's non-blank sources with single spaces.
    pub fn raw_text<R: SearchableRecord + ?Sized>(record: &R) -> String {
        let sources = record.text_sources();
        let capacity = AssemblyConfig::ESTIMATED_BLOB_CAPACITY
            .max(sources.len() * AssemblyConfig::ESTIMATED_SOURCE_LENGTH);
        let mut text = String::with_capacity(capacity);

        for value in sources.iter().filter_map(|s| s.read()) {
            if value.trim().is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&value);
        }

        text
    }

    /// Rebuild the record's blob and checksum if its raw text changed.
    pub fn assemble<R: SearchableRecord + ?Sized>(&self, record: &mut R) -> AssembleOutcome {
        // checksum the raw text, not the n-grams: the point is to skip n-gram work
        let text = Self::raw_text(record);
        let new_checksum = checksum::compute(&text);
        let id = record.record_id().unwrap_or_default();

        if new_checksum.trim().is_empty() {
            error!(
                "FTS checksum blank for [{}] ID '{}', rebuilding n-grams anyway",
                record.record_type(),
                id
            );
        } else if record.search_data_checksum() == Some(new_checksum.as_str()) {
            debug!(
                "Not rebuilding FTS n-grams: content unchanged for [{}] ID '{}'",
                record.record_type(),
                id
            );
            return AssembleOutcome::Unchanged;
        }

        let max_length = record.max_search_data_length();
        let ngrams = generate(&text, &record.ngram_config());
        let (blob, appended) = fill_blob(ngrams.iter().map(String::as_str), max_length);

        let outcome = AssembleOutcome::Rebuilt {
            generated: ngrams.len(),
            appended,
            length: blob.len(),
        };

        if enabled!(Level::TRACE) {
            trace!(
                "Rebuilt FTS n-grams for [{}] ID '{}': '{}'",
                record.record_type(),
                id,
                blob
            );
        } else {
            debug!(
                "Rebuilt FTS n-grams for [{}] ID '{}': {:?}",
                record.record_type(),
                id,
                outcome
            );
        }

        record.set_search_data(blob);
        record.set_search_data_checksum(new_checksum);
        outcome
    }
}

impl<R: SearchableRecord> WriteStage<R> for SearchDataAssembler {
    fn before_write(&self, record: &mut R, _kind: WriteKind) {
        // insert and update differ only in whether a checksum is stored yet
        self.assemble(record);
    }
}

/// Append n-grams separated by single spaces while the total stays within `max_length`.
///
/// Stops at the first n-gram that does not fit; never appends a partial n-gram.
/// Returns the blob and the number of n-grams in it.
pub fn fill_blob<'a>(ngrams: impl IntoIterator<Item = &'a str>, max_length: usize) -> (String, usize) {
    let mut blob = String::with_capacity(AssemblyConfig::ESTIMATED_BLOB_CAPACITY.min(max_length));
    let mut appended = 0;

    for ngram in ngrams {
        let separator = if blob.is_empty() { 0 } else { 1 };
        if blob.len() + separator + ngram.len() > max_length {
            break;
        }
        if separator == 1 {
            blob.push(' ');
        }
        blob.push_str(ngram);
        appended += 1;
    }

    (blob, appended)
}
