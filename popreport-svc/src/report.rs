//! Report assembly
//!
//! Shapes an [`AggregationTree`] into the wire report. Grade histograms are
//! always dense (`"1"` .. `"10"`), and groups keep the tree's ordering.

use serde::Serialize;

use crate::aggregator::{AggregationTree, GradeHistogram, GradeTally, SeriesNode};

/// Population report for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopReport {
    pub term: String,
    /// Item-type filter that was applied; `None` for all types
    pub item_type: Option<String>,
    /// Every matched item, Authentic included
    pub count: u64,
    pub authentic: u64,
    pub grades: GradeHistogram,
    pub data: Vec<AlbumReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumReport {
    pub artist: Option<String>,
    pub album: Option<String>,
    #[serde(flatten)]
    pub tally: GradeTally,
    pub series: Vec<SeriesReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub series: Option<String>,
    #[serde(flatten)]
    pub tally: GradeTally,
    pub variations: Vec<VariationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationReport {
    pub variation: Option<String>,
    #[serde(flatten)]
    pub tally: GradeTally,
}

/// Build the report for `term` from an aggregation tree
///
/// An empty tree yields `count = 0` and no groups.
pub fn assemble(term: &str, item_type: Option<&str>, tree: &AggregationTree) -> PopReport {
    let data = tree
        .albums
        .iter()
        .map(|((artist, album), node)| AlbumReport {
            artist: artist.clone(),
            album: album.clone(),
            tally: node.tally,
            series: node
                .series
                .iter()
                .map(|(series, node)| series_report(series.clone(), node))
                .collect(),
        })
        .collect();

    PopReport {
        term: term.to_string(),
        item_type: item_type.map(str::to_string),
        count: tree.totals.total_items,
        authentic: tree.totals.authentic,
        grades: tree.totals.histogram,
        data,
    }
}

fn series_report(series: Option<String>, node: &SeriesNode) -> SeriesReport {
    SeriesReport {
        series,
        tally: node.tally,
        variations: node
            .variations
            .iter()
            .map(|(variation, tally)| VariationReport {
                variation: variation.clone(),
                tally: *tally,
            })
            .collect(),
    }
}
