//! Record store
//!
//! [`RecordStore`] is the persistence seam of the service. The SQLite
//! implementation pushes the predicate's conservative pre-filter down into
//! SQL and then applies the predicate itself to every streamed row.

use std::collections::BTreeSet;
use std::future::Future;

use futures::TryStreamExt;
use popreport_common::db::models::{RecordField, MAX_GRADE};
use popreport_common::{CanonicalRecord, Result};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::normalizer::check_admissible;
use crate::predicate::MatchPredicate;

/// Rows removed and inserted by [`RecordStore::replace_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceOutcome {
    pub removed: u64,
    pub inserted: u64,
}

/// Storage of admitted canonical records
pub trait RecordStore: Send + Sync {
    /// Bulk insert under one import batch id; returns rows inserted
    fn insert_all(
        &self,
        records: &[CanonicalRecord],
        batch: Uuid,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Remove every record; returns rows removed
    fn clear_all(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Clear then insert, atomically
    fn replace_all(
        &self,
        records: &[CanonicalRecord],
        batch: Uuid,
    ) -> impl Future<Output = Result<ReplaceOutcome>> + Send;

    /// Snapshot of all records accepted by `predicate`
    fn query_matching(
        &self,
        predicate: &MatchPredicate,
    ) -> impl Future<Output = Result<Vec<CanonicalRecord>>> + Send;

    /// Distinct non-blank values of `field`, optionally among matching records
    fn distinct_values(
        &self,
        field: RecordField,
        predicate: Option<&MatchPredicate>,
    ) -> impl Future<Output = Result<BTreeSet<String>>> + Send;

    fn count_all(&self) -> impl Future<Output = Result<u64>> + Send;

    /// `(grade, count)` for every grade 0..=10, zero-filled
    fn grade_distribution(&self) -> impl Future<Output = Result<Vec<(u8, u64)>>> + Send;

    /// `(item_type, count)` ordered by item type
    fn item_type_counts(&self) -> impl Future<Output = Result<Vec<(String, u64)>>> + Send;
}

/// [`RecordStore`] backed by the SQLite `items` table
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const INSERT_ITEM: &str = r#"
    INSERT INTO items (
        guid, import_batch,
        member_id, holo_id, discog_id,
        master_grade, item_type, series, variation,
        artist, album,
        release_year, label, tier,
        date_entered, grade_complete_date,
        approved, archived, export_to_web
    )
    VALUES (
        ?, ?,
        ?, ?, ?,
        ?, ?, ?, ?,
        ?, ?,
        ?, ?, ?,
        ?, ?,
        ?, ?, ?
    )
"#;

async fn insert_records(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[CanonicalRecord],
    batch: Uuid,
) -> Result<u64> {
    let batch = batch.to_string();
    let mut inserted = 0;

    for record in records {
        let result = sqlx::query(INSERT_ITEM)
            .bind(Uuid::new_v4().to_string())
            .bind(&batch)
            .bind(&record.member_id)
            .bind(&record.holo_id)
            .bind(&record.discog_id)
            .bind(record.master_grade.map(i64::from))
            .bind(&record.item_type)
            .bind(&record.series)
            .bind(&record.variation)
            .bind(&record.artist)
            .bind(&record.album)
            .bind(&record.release_year)
            .bind(&record.label)
            .bind(&record.tier)
            .bind(record.date_entered)
            .bind(record.grade_complete_date)
            .bind(record.approved)
            .bind(record.archived)
            .bind(record.export_to_web)
            .execute(&mut **tx)
            .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Only admissible records reach the table; check the whole batch first
fn ensure_admissible(records: &[CanonicalRecord]) -> Result<()> {
    for record in records {
        check_admissible(record)?;
    }
    Ok(())
}

impl RecordStore for SqliteRecordStore {
    async fn insert_all(&self, records: &[CanonicalRecord], batch: Uuid) -> Result<u64> {
        ensure_admissible(records)?;

        let mut tx = self.pool.begin().await?;
        let inserted = insert_records(&mut tx, records, batch).await?;
        tx.commit().await?;

        debug!(inserted, batch = %batch, "Inserted records");
        Ok(inserted)
    }

    async fn clear_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM items").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn replace_all(&self, records: &[CanonicalRecord], batch: Uuid) -> Result<ReplaceOutcome> {
        ensure_admissible(records)?;

        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM items")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let inserted = insert_records(&mut tx, records, batch).await?;
        tx.commit().await?;

        debug!(removed, inserted, batch = %batch, "Replaced records");
        Ok(ReplaceOutcome { removed, inserted })
    }

    async fn query_matching(&self, predicate: &MatchPredicate) -> Result<Vec<CanonicalRecord>> {
        let prefilter = predicate.sql_prefilter();

        let mut clauses = Vec::new();
        if prefilter.like_pattern.is_some() {
            clauses.push(r"(artist LIKE ? ESCAPE '\' OR album LIKE ? ESCAPE '\')");
        }
        if prefilter.item_type.is_some() {
            clauses.push("item_type = ?");
        }

        let mut sql = String::from("SELECT * FROM items");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        if let Some(pattern) = &prefilter.like_pattern {
            query = query.bind(pattern.clone()).bind(pattern.clone());
        }
        if let Some(item_type) = &prefilter.item_type {
            query = query.bind(item_type.clone());
        }

        let mut rows = query.fetch(&self.pool);
        let mut scanned = 0usize;
        let mut matched = Vec::new();

        while let Some(row) = rows.try_next().await? {
            scanned += 1;
            let record = CanonicalRecord::from_row(&row)?;
            if predicate.matches(&record) {
                matched.push(record);
            }
        }

        debug!(
            term = %predicate.term(),
            scanned,
            matched = matched.len(),
            "Matched records"
        );
        Ok(matched)
    }

    async fn distinct_values(
        &self,
        field: RecordField,
        predicate: Option<&MatchPredicate>,
    ) -> Result<BTreeSet<String>> {
        if let Some(predicate) = predicate {
            let records = self.query_matching(predicate).await?;
            return Ok(records
                .iter()
                .filter_map(|r| field.get(r))
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .collect());
        }

        let column = field.column();
        let values: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT {col} FROM items WHERE {col} IS NOT NULL AND TRIM({col}) <> ''",
            col = column
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(values.into_iter().collect())
    }

    async fn count_all(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn grade_distribution(&self) -> Result<Vec<(u8, u64)>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT master_grade, COUNT(*) FROM items GROUP BY master_grade",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut distribution: Vec<(u8, u64)> = (0..=MAX_GRADE).map(|g| (g, 0)).collect();
        for (grade, count) in rows {
            if let Some(slot) = usize::try_from(grade).ok().and_then(|g| distribution.get_mut(g)) {
                slot.1 = count as u64;
            }
        }

        Ok(distribution)
    }

    async fn item_type_counts(&self) -> Result<Vec<(String, u64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT item_type, COUNT(*) FROM items GROUP BY item_type ORDER BY item_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(t, c)| (t, c as u64)).collect())
    }
}
