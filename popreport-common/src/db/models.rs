//! Canonical record model and row mapping

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{Error, Result};

/// Grade value representing "Authentic" (verified genuine, not graded 1..10)
pub const AUTHENTIC_GRADE: u8 = 0;

/// Highest numeric grade tier
pub const MAX_GRADE: u8 = 10;

/// Normalized, store-ready representation of one graded item
///
/// Immutable once stored. Produced only by the normalizer; the store never
/// rewrites individual records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    #[serde(rename = "memberID")]
    pub member_id: Option<String>,
    #[serde(rename = "holoID")]
    pub holo_id: Option<String>,
    #[serde(rename = "discogID")]
    pub discog_id: Option<String>,

    /// 0..=10, where 0 means Authentic
    pub master_grade: Option<u8>,

    pub item_type: Option<String>,
    pub series: Option<String>,
    pub variation: Option<String>,

    pub artist: Option<String>,
    pub album: Option<String>,

    pub release_year: Option<String>,
    pub label: Option<String>,
    pub tier: Option<String>,
    pub date_entered: Option<NaiveDate>,
    pub grade_complete_date: Option<NaiveDate>,

    pub approved: Option<bool>,
    pub archived: Option<bool>,
    pub export_to_web: Option<bool>,
}

impl CanonicalRecord {
    /// True when artist or album is present
    pub fn has_identity(&self) -> bool {
        self.artist.is_some() || self.album.is_some()
    }

    /// True for the Authentic sentinel grade
    pub fn is_authentic(&self) -> bool {
        self.master_grade == Some(AUTHENTIC_GRADE)
    }

    /// Map a row of the `items` table
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let grade: Option<i64> = row.try_get("master_grade")?;
        let master_grade = grade
            .map(|g| {
                u8::try_from(g)
                    .ok()
                    .filter(|g| *g <= MAX_GRADE)
                    .ok_or_else(|| Error::Internal(format!("Stored grade out of range: {}", g)))
            })
            .transpose()?;

        Ok(Self {
            member_id: row.try_get("member_id")?,
            holo_id: row.try_get("holo_id")?,
            discog_id: row.try_get("discog_id")?,
            master_grade,
            item_type: row.try_get("item_type")?,
            series: row.try_get("series")?,
            variation: row.try_get("variation")?,
            artist: row.try_get("artist")?,
            album: row.try_get("album")?,
            release_year: row.try_get("release_year")?,
            label: row.try_get("label")?,
            tier: row.try_get("tier")?,
            date_entered: row.try_get("date_entered")?,
            grade_complete_date: row.try_get("grade_complete_date")?,
            approved: row.try_get("approved")?,
            archived: row.try_get("archived")?,
            export_to_web: row.try_get("export_to_web")?,
        })
    }
}

/// Text fields that support distinct-value listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Artist,
    Album,
    Series,
    Variation,
    ItemType,
}

impl RecordField {
    /// Column name in the `items` table
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::Artist => "artist",
            RecordField::Album => "album",
            RecordField::Series => "series",
            RecordField::Variation => "variation",
            RecordField::ItemType => "item_type",
        }
    }

    /// Read the field from a record
    pub fn get<'a>(&self, record: &'a CanonicalRecord) -> Option<&'a str> {
        match self {
            RecordField::Artist => record.artist.as_deref(),
            RecordField::Album => record.album.as_deref(),
            RecordField::Series => record.series.as_deref(),
            RecordField::Variation => record.variation.as_deref(),
            RecordField::ItemType => record.item_type.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_legacy_field_names() {
        let record = CanonicalRecord {
            member_id: Some("M1".to_string()),
            master_grade: Some(9),
            artist: Some("Prince".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["memberID"], "M1");
        assert_eq!(json["masterGrade"], 9);
        assert_eq!(json["artist"], "Prince");
        assert!(json["itemType"].is_null());
    }

    #[test]
    fn test_identity_and_authentic_helpers() {
        let mut record = CanonicalRecord::default();
        assert!(!record.has_identity());

        record.album = Some("1999".to_string());
        record.master_grade = Some(AUTHENTIC_GRADE);
        assert!(record.has_identity());
        assert!(record.is_authentic());
    }

    #[test]
    fn test_record_field_accessors() {
        let record = CanonicalRecord {
            series: Some("Vinyl Record".to_string()),
            ..Default::default()
        };
        assert_eq!(RecordField::Series.get(&record), Some("Vinyl Record"));
        assert_eq!(RecordField::Variation.get(&record), None);
        assert_eq!(RecordField::ItemType.column(), "item_type");
    }
}
