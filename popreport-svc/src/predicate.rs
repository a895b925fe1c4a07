//! Search-term match predicate
//!
//! A record matches when the term, compared case-insensitively, hits the
//! artist or album field by any of these rules:
//!
//! - `Exact`: the whole field equals the term
//! - `ArticlePrefixed`: the artist equals `"The " + term`
//! - `WholeWord`: the term appears bounded by non-word characters
//! - `Substring`: the term appears anywhere
//!
//! Substring is a superset of the others. All rules count equally for
//! inclusion; [`MatchPredicate::match_kind`] reports the strongest one for
//! diagnostics only.

use popreport_common::{CanonicalRecord, Error, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::normalizer::title_case;

/// Item-type filter value meaning "no filter"
pub const TOTAL_ITEM_TYPE: &str = "Total";

/// Leading article tried against artist names
const ARTICLE: &str = "The ";

/// Match rule that fired, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Substring,
    WholeWord,
    ArticlePrefixed,
    Exact,
}

/// Conditions a store can evaluate natively before the predicate runs
///
/// Always a superset of what the predicate accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlPrefilter {
    /// `LIKE` pattern for artist/album, escaped with `\`
    pub like_pattern: Option<String>,
    /// Exact item type
    pub item_type: Option<String>,
}

/// Compiled match rules for one search term
#[derive(Debug, Clone)]
pub struct MatchPredicate {
    term: String,
    exact: Regex,
    article_prefixed: Regex,
    whole_word: Regex,
    substring: Regex,
    item_type: Option<String>,
}

impl MatchPredicate {
    /// Build the predicate for `term` with an optional item-type constraint
    ///
    /// A blank term is an [`Error::InvalidQuery`]. A missing, blank or
    /// `"Total"` item type means no constraint.
    pub fn build(term: &str, item_type: Option<&str>) -> Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::InvalidQuery("Search term is required".to_string()));
        }

        let escaped = regex::escape(term);

        Ok(Self {
            term: term.to_string(),
            exact: compile(&format!("^{}$", escaped))?,
            article_prefixed: compile(&format!("^{}{}$", regex::escape(ARTICLE), escaped))?,
            whole_word: compile(&format!(r"(?:^|\W){}(?:\W|$)", escaped))?,
            substring: compile(&escaped)?,
            item_type: item_type_constraint(item_type),
        })
    }

    /// The trimmed search term
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Item type the predicate requires, if any
    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    /// Same identity rules without the item-type constraint
    pub fn identity_only(&self) -> Self {
        Self {
            item_type: None,
            ..self.clone()
        }
    }

    /// Full inclusion test: identity rules and item-type constraint
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        self.matches_item_type(record) && self.match_kind(record).is_some()
    }

    pub fn matches_item_type(&self, record: &CanonicalRecord) -> bool {
        match &self.item_type {
            Some(required) => record.item_type.as_deref() == Some(required.as_str()),
            None => true,
        }
    }

    /// Strongest identity rule hitting artist or album
    pub fn match_kind(&self, record: &CanonicalRecord) -> Option<MatchKind> {
        let artist = record.artist.as_deref().and_then(|a| {
            if self.article_prefixed.is_match(a) {
                Some(MatchKind::ArticlePrefixed).max(self.field_kind(a))
            } else {
                self.field_kind(a)
            }
        });
        let album = record.album.as_deref().and_then(|a| self.field_kind(a));

        artist.max(album)
    }

    fn field_kind(&self, value: &str) -> Option<MatchKind> {
        if self.exact.is_match(value) {
            Some(MatchKind::Exact)
        } else if self.whole_word.is_match(value) {
            Some(MatchKind::WholeWord)
        } else if self.substring.is_match(value) {
            Some(MatchKind::Substring)
        } else {
            None
        }
    }

    /// Native pre-filter for SQL stores
    ///
    /// SQLite's `LIKE` folds ASCII case only, so the pattern is produced only
    /// when every character of the term folds within ASCII.
    pub fn sql_prefilter(&self) -> SqlPrefilter {
        let like_pattern = self
            .term
            .chars()
            .all(folds_within_ascii)
            .then(|| format!("%{}%", escape_like(&self.term)));

        SqlPrefilter {
            like_pattern,
            item_type: self.item_type.clone(),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::InvalidQuery(format!("Search term rejected: {}", e)))
}

/// Normalize the requested item type; `"Total"` and blanks mean no filter
///
/// Normalized like ingested item types so "sealed" finds "Sealed". No
/// sentinel removal: a request for "Unknown" matches nothing.
fn item_type_constraint(item_type: Option<&str>) -> Option<String> {
    let value = item_type?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(TOTAL_ITEM_TYPE) {
        return None;
    }
    Some(title_case(value))
}

/// ASCII characters whose case-insensitive class stays ASCII
///
/// `k` also matches the Kelvin sign (U+212A) and `s` the long s (U+017F).
fn folds_within_ascii(c: char) -> bool {
    c.is_ascii() && !matches!(c, 'k' | 'K' | 's' | 'S')
}

/// Escape `LIKE` wildcards with `\`
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
