//! Hierarchical grade aggregation
//!
//! Matching records are folded into a four-level tree:
//! `(artist, album)` -> series -> variation. Only the variation leaves are
//! touched while records stream in; [`Aggregator::finish`] then rolls every
//! leaf tally up into its series, album and the grand total. Absent values
//! share one `None` key per level.

use std::collections::BTreeMap;

use popreport_common::db::models::MAX_GRADE;
use popreport_common::CanonicalRecord;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::predicate::MatchPredicate;

/// Number of numeric grade tiers (1..=10)
pub const GRADE_BUCKETS: usize = MAX_GRADE as usize;

/// Group key component; `None` is the shared "missing" group
pub type GroupLabel = Option<String>;

/// Counts for grades 1..=10
///
/// Serializes as a dense map `{"1": n, ..., "10": n}` with every bucket present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeHistogram {
    buckets: [u64; GRADE_BUCKETS],
}

impl GradeHistogram {
    /// Count one grade; 0 (Authentic) and out-of-range values are ignored
    pub fn record(&mut self, grade: u8) {
        if (1..=MAX_GRADE).contains(&grade) {
            self.buckets[usize::from(grade) - 1] += 1;
        }
    }

    /// Count for one grade tier; 0 for anything outside 1..=10
    pub fn get(&self, grade: u8) -> u64 {
        if (1..=MAX_GRADE).contains(&grade) {
            self.buckets[usize::from(grade) - 1]
        } else {
            0
        }
    }

    /// Sum over all buckets
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Bucket-wise sum
    pub fn merge(&mut self, other: &GradeHistogram) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *mine += theirs;
        }
    }

    /// `(grade, count)` for grades 1..=10, in order
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (1..=MAX_GRADE).zip(self.buckets.iter().copied())
    }

    pub fn from_grades<I: IntoIterator<Item = u8>>(grades: I) -> Self {
        let mut histogram = Self::default();
        for grade in grades {
            histogram.record(grade);
        }
        histogram
    }
}

impl Serialize for GradeHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(GRADE_BUCKETS))?;
        for (grade, count) in self.iter() {
            map.serialize_entry(&grade.to_string(), &count)?;
        }
        map.end()
    }
}

/// Item count, Authentic count and histogram of one node
///
/// `histogram.total() + authentic == total_items` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTally {
    pub total_items: u64,
    pub authentic: u64,
    #[serde(rename = "grades")]
    pub histogram: GradeHistogram,
}

impl GradeTally {
    pub fn add_grade(&mut self, grade: u8) {
        self.total_items += 1;
        if grade == 0 {
            self.authentic += 1;
        } else {
            self.histogram.record(grade);
        }
    }

    pub fn merge(&mut self, other: &GradeTally) {
        self.total_items += other.total_items;
        self.authentic += other.authentic;
        self.histogram.merge(&other.histogram);
    }
}

/// Series node: rolled-up tally plus variation leaves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesNode {
    pub tally: GradeTally,
    pub variations: BTreeMap<GroupLabel, GradeTally>,
}

/// `(artist, album)` node: rolled-up tally plus series children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumNode {
    pub tally: GradeTally,
    pub series: BTreeMap<GroupLabel, SeriesNode>,
}

/// Result of one aggregation pass
///
/// Albums iterate in `(artist, album)` order with `None` first and strings in
/// byte order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationTree {
    pub albums: BTreeMap<(GroupLabel, GroupLabel), AlbumNode>,
    pub totals: GradeTally,
}

impl AggregationTree {
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

/// Streaming fold of records into an [`AggregationTree`]
pub struct Aggregator<'p> {
    predicate: &'p MatchPredicate,
    albums: BTreeMap<(GroupLabel, GroupLabel), AlbumNode>,
}

impl<'p> Aggregator<'p> {
    pub fn new(predicate: &'p MatchPredicate) -> Self {
        Self {
            predicate,
            albums: BTreeMap::new(),
        }
    }

    /// Fold one record; returns whether it was counted
    pub fn push(&mut self, record: &CanonicalRecord) -> bool {
        if !self.predicate.matches(record) {
            return false;
        }

        let Some(grade) = record.master_grade else {
            debug!(artist = ?record.artist, album = ?record.album, "Skipping record without grade");
            return false;
        };

        self.albums
            .entry((record.artist.clone(), record.album.clone()))
            .or_default()
            .series
            .entry(record.series.clone())
            .or_default()
            .variations
            .entry(record.variation.clone())
            .or_default()
            .add_grade(grade);

        true
    }

    /// Roll leaf tallies up to series, albums and the grand total
    pub fn finish(mut self) -> AggregationTree {
        let mut totals = GradeTally::default();

        for album in self.albums.values_mut() {
            album.tally = GradeTally::default();
            for series in album.series.values_mut() {
                series.tally = GradeTally::default();
                for leaf in series.variations.values() {
                    series.tally.merge(leaf);
                }
                album.tally.merge(&series.tally);
            }
            totals.merge(&album.tally);
        }

        AggregationTree {
            albums: self.albums,
            totals,
        }
    }
}

/// Filter `records` by `predicate` and aggregate them
pub fn aggregate<'a, I>(records: I, predicate: &MatchPredicate) -> AggregationTree
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut aggregator = Aggregator::new(predicate);
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}
