//! Pop report service facade
//!
//! Ties the normalizer, predicate, aggregator and report assembler to a
//! [`RecordStore`]. Holds no per-request state; clone the store handle to
//! share it.

use std::collections::BTreeSet;

use popreport_common::db::models::RecordField;
use popreport_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::normalizer::{self, NormalizedBatch, RejectionBreakdown};
use crate::predicate::MatchPredicate;
use crate::report::{assemble, PopReport};
use crate::store::RecordStore;

/// How an ingestion treats records already in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Clear the store, then insert (full reload)
    #[default]
    Replace,
    /// Insert alongside existing records
    Append,
}

/// Outcome of one [`PopReportService::ingest`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub batch_id: Uuid,
    pub mode: IngestMode,
    pub removed: u64,
    pub inserted: u64,
    pub breakdown: RejectionBreakdown,
}

/// Whole-collection summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_items: u64,
    pub total_artists: u64,
    pub total_albums: u64,
    pub item_types: Vec<ItemTypeCount>,
    pub grade_distribution: Vec<GradeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeCount {
    pub item_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: u8,
    pub count: u64,
}

pub struct PopReportService<S> {
    store: S,
}

impl<S: RecordStore> PopReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Normalize raw records and keep the admissible ones
    pub fn normalize_and_filter<'a, I>(&self, raws: I) -> NormalizedBatch
    where
        I: IntoIterator<Item = &'a Value>,
    {
        normalizer::normalize_and_filter(raws)
    }

    /// Population report for `term`, optionally restricted to one item type
    pub async fn run_pop_report(&self, term: &str, item_type: Option<&str>) -> Result<PopReport> {
        let predicate = MatchPredicate::build(term, item_type)?;
        let records = self.store.query_matching(&predicate).await?;
        let tree = aggregate(&records, &predicate);

        info!(
            term = %predicate.term(),
            item_type = ?predicate.item_type(),
            matched = records.len(),
            groups = tree.albums.len(),
            "Pop report"
        );

        Ok(assemble(predicate.term(), predicate.item_type(), &tree))
    }

    /// Item types present among records matching `term`, ignoring item type
    pub async fn available_item_types(&self, term: &str) -> Result<BTreeSet<String>> {
        let predicate = MatchPredicate::build(term, None)?;
        self.store
            .distinct_values(RecordField::ItemType, Some(&predicate))
            .await
    }

    /// Normalize `raws` and store the admitted records
    ///
    /// A replace with nothing admitted leaves the store untouched.
    pub async fn ingest(&self, raws: &[Value], mode: IngestMode) -> Result<IngestSummary> {
        let batch_id = Uuid::new_v4();
        let NormalizedBatch { records, breakdown } = self.normalize_and_filter(raws);

        let (removed, inserted) = match mode {
            IngestMode::Replace if records.is_empty() => {
                warn!(batch = %batch_id, "No admissible records, store left unchanged");
                (0, 0)
            }
            IngestMode::Replace => {
                let outcome = self.store.replace_all(&records, batch_id).await?;
                (outcome.removed, outcome.inserted)
            }
            IngestMode::Append => (0, self.store.insert_all(&records, batch_id).await?),
        };

        info!(
            batch = %batch_id,
            mode = ?mode,
            seen = breakdown.total,
            admitted = breakdown.admitted,
            rejected = breakdown.rejected,
            missing_identity = breakdown.missing_identity,
            invalid_grade = breakdown.invalid_grade,
            missing_item_type = breakdown.missing_item_type,
            removed,
            inserted,
            "Ingestion complete"
        );

        Ok(IngestSummary {
            batch_id,
            mode,
            removed,
            inserted,
            breakdown,
        })
    }

    /// Distinct non-blank artist names, sorted
    pub async fn artists(&self) -> Result<Vec<String>> {
        let artists = self.store.distinct_values(RecordField::Artist, None).await?;
        Ok(artists.into_iter().collect())
    }

    pub async fn stats(&self) -> Result<CollectionStats> {
        let total_items = self.store.count_all().await?;
        let total_artists = self.store.distinct_values(RecordField::Artist, None).await?.len() as u64;
        let total_albums = self.store.distinct_values(RecordField::Album, None).await?.len() as u64;

        let item_types = self
            .store
            .item_type_counts()
            .await?
            .into_iter()
            .map(|(item_type, count)| ItemTypeCount { item_type, count })
            .collect();

        let grade_distribution = self
            .store
            .grade_distribution()
            .await?
            .into_iter()
            .map(|(grade, count)| GradeCount { grade, count })
            .collect();

        Ok(CollectionStats {
            total_items,
            total_artists,
            total_albums,
            item_types,
            grade_distribution,
        })
    }
}
