//! Raw record normalization and admissibility
//!
//! Import files from different years name and type their fields differently
//! (`Grade_PopReport` vs `MasterGrade`, grades as numbers or strings, dates as
//! `30-Jan-26` or ISO). Every canonical field has an ordered alias list; the
//! first alias holding a non-null value wins and missing fields resolve to
//! `None`. There is no per-vintage type.
//!
//! Normalization is a pure function of one raw record.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use popreport_common::db::models::{AUTHENTIC_GRADE, MAX_GRADE};
use popreport_common::{CanonicalRecord, MalformedRecord, RejectionReason};
use serde::Serialize;
use serde_json::{Map, Value};

/// Untyped import record
pub type RawRecord = Map<String, Value>;

/// Grade string meaning "verified genuine, not graded"
pub const AUTHENTIC_LABEL: &str = "Authentic";

/// Item type sentinel treated as absent
pub const UNKNOWN_ITEM_TYPE: &str = "Unknown";

/// Rejected records kept as diagnostic samples per batch
pub const MAX_REJECTED_SAMPLES: usize = 5;

const MEMBER_ID: &[&str] = &["memberid", "memberID", "MemberID"];
const HOLO_ID: &[&str] = &["holoid", "holoID", "HoloID"];
const DISCOG_ID: &[&str] = &["discogid", "discogID", "DiscogID"];
const GRADE: &[&str] = &["Grade_PopReport", "MasterGrade", "masterGrade", "grade"];
const ITEM_TYPE: &[&str] = &["Type_PopReport", "itemType", "type"];
const SERIES: &[&str] = &["ToySeries", "series"];
const VARIATION: &[&str] = &["Variation_PopReport", "variation"];
const ARTIST: &[&str] = &["Artist_PopReport", "artistPopReport", "artist"];
const ALBUM: &[&str] = &["Album_PopReport", "albumPopReport", "album"];
const RELEASE_YEAR: &[&str] = &["ryear", "releaseYear"];
const LABEL: &[&str] = &["label", "Label"];
const TIER: &[&str] = &["tier", "Tier"];
const DATE_ENTERED: &[&str] = &["DateEntered", "dateEntered"];
const GRADE_COMPLETE_DATE: &[&str] = &[
    "GradeCompleteDateScan",
    "gradeCompleteDate",
    "GradeDate",
    "gradeDate",
];
const APPROVED: &[&str] = &["Approved", "approved"];
const ARCHIVED: &[&str] = &["Archived", "archived"];
const EXPORT_TO_WEB: &[&str] = &["ExportToWeb", "exportToWeb"];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Transform and admit one raw record
pub fn normalize(raw: &Value) -> Result<CanonicalRecord, MalformedRecord> {
    let record = transform(raw);
    check_admissible(&record)?;
    Ok(record)
}

/// Convert a raw record into canonical shape without judging admissibility
///
/// A value that is not a JSON object yields a record with every field absent.
pub fn transform(raw: &Value) -> CanonicalRecord {
    let empty = RawRecord::new();
    let raw = raw.as_object().unwrap_or(&empty);

    CanonicalRecord {
        member_id: lookup(raw, MEMBER_ID).and_then(text),
        holo_id: lookup(raw, HOLO_ID).and_then(text),
        discog_id: lookup(raw, DISCOG_ID).and_then(text),
        master_grade: lookup(raw, GRADE).and_then(parse_grade),
        item_type: lookup(raw, ITEM_TYPE)
            .and_then(text)
            .and_then(|t| normalize_item_type(&t)),
        series: lookup(raw, SERIES).and_then(text),
        variation: lookup(raw, VARIATION).and_then(text),
        artist: lookup(raw, ARTIST).and_then(text),
        album: lookup(raw, ALBUM).and_then(text),
        release_year: lookup(raw, RELEASE_YEAR).and_then(text),
        label: lookup(raw, LABEL).and_then(text),
        tier: lookup(raw, TIER).and_then(text),
        date_entered: lookup(raw, DATE_ENTERED).and_then(parse_date),
        grade_complete_date: lookup(raw, GRADE_COMPLETE_DATE).and_then(parse_date),
        approved: lookup(raw, APPROVED).map(parse_flag),
        archived: lookup(raw, ARCHIVED).map(parse_flag),
        export_to_web: lookup(raw, EXPORT_TO_WEB).map(parse_flag),
    }
}

/// Apply the admissibility policy
///
/// Admissible iff artist or album is present, the grade is in 0..=10 and the
/// item type is present. Every failed clause is reported.
pub fn check_admissible(record: &CanonicalRecord) -> Result<(), MalformedRecord> {
    let mut reasons = Vec::new();

    if !record.has_identity() {
        reasons.push(RejectionReason::MissingIdentity);
    }
    if !matches!(record.master_grade, Some(g) if g <= MAX_GRADE) {
        reasons.push(RejectionReason::InvalidGrade);
    }
    if record.item_type.is_none() {
        reasons.push(RejectionReason::MissingItemType);
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(MalformedRecord { reasons })
    }
}

/// Parse a grade value
///
/// `"Authentic"` is 0; integers pass through; numeric strings must be
/// integral (`"7"`, `"+7"`, `"7.0"`). Signs other than `+`, fractions,
/// exponents and anything outside 0..=10 are `None`.
pub fn parse_grade(value: &Value) -> Option<u8> {
    let grade = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        Value::String(s) => {
            let s = s.trim();
            if s == AUTHENTIC_LABEL {
                return Some(AUTHENTIC_GRADE);
            }
            parse_integral(s)?
        }
        _ => return None,
    };

    u8::try_from(grade).ok().filter(|g| *g <= MAX_GRADE)
}

/// Unsigned integer text with an optional `+` and an all-zero fraction
fn parse_integral(s: &str) -> Option<i64> {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    let digits = whole.strip_prefix('+').unwrap_or(whole);

    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b == b'0')
    {
        return None;
    }
    digits.parse().ok()
}

/// Parse a date, failing closed to `None`
///
/// Accepts `DD-Mon-YY` (years below 50 are 2000s, others 1900s),
/// `DD-Mon-YYYY`, `YYYY-MM-DD`, RFC 3339, ISO date-times and the
/// `{"$date": ...}` wrapper of database exports.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = match value {
        Value::String(s) => s.trim(),
        Value::Object(map) => return map.get("$date").and_then(parse_date),
        _ => return None,
    };

    if s.is_empty() {
        return None;
    }

    if let Some(date) = parse_day_month_year(s) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    None
}

fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('-');
    let day = parts.next()?.parse::<u32>().ok()?;
    let month_str = parts.next()?;
    let year_str = parts.next()?;
    if parts.next().is_some() || month_str.len() != 3 {
        return None;
    }

    let month_lower = month_str.to_ascii_lowercase();
    let month = MONTHS.iter().position(|m| *m == month_lower)? as u32 + 1;

    if !year_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = match year_str.len() {
        2 => {
            let yy = year_str.parse::<i32>().ok()?;
            if yy < 50 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        4 => year_str.parse::<i32>().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// True iff the raw flag is exactly the string `"TRUE"`
pub fn parse_flag(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == "TRUE")
}

/// Normalize an item type; blank and `"Unknown"` are absent
pub fn normalize_item_type(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(UNKNOWN_ITEM_TYPE) {
        return None;
    }
    Some(title_case(value))
}

/// Capitalize each word, lowercase the rest ("sealed" -> "Sealed")
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn lookup<'a>(raw: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

/// Trimmed text; numbers render as decimal text, blanks are absent
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A rejected input kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedSample {
    /// Position in the input batch
    pub index: usize,
    pub reasons: Vec<RejectionReason>,
}

/// Admission counts for one batch
///
/// Per-clause counters count every failed clause, so a record failing two
/// clauses raises both counters and `multiple`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBreakdown {
    pub total: usize,
    pub admitted: usize,
    pub rejected: usize,
    pub missing_identity: usize,
    pub invalid_grade: usize,
    pub missing_item_type: usize,
    pub multiple: usize,
    pub samples: Vec<RejectedSample>,
}

impl RejectionBreakdown {
    fn record_rejection(&mut self, index: usize, err: MalformedRecord) {
        self.rejected += 1;
        for reason in &err.reasons {
            match reason {
                RejectionReason::MissingIdentity => self.missing_identity += 1,
                RejectionReason::InvalidGrade => self.invalid_grade += 1,
                RejectionReason::MissingItemType => self.missing_item_type += 1,
            }
        }
        if err.reasons.len() > 1 {
            self.multiple += 1;
        }
        if self.samples.len() < MAX_REJECTED_SAMPLES {
            self.samples.push(RejectedSample {
                index,
                reasons: err.reasons,
            });
        }
    }
}

/// Admitted records plus the rejection breakdown
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<CanonicalRecord>,
    pub breakdown: RejectionBreakdown,
}

/// Normalize a batch; one bad record never stops the rest
pub fn normalize_and_filter<'a, I>(raws: I) -> NormalizedBatch
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut batch = NormalizedBatch::default();

    for (index, raw) in raws.into_iter().enumerate() {
        batch.breakdown.total += 1;
        match normalize(raw) {
            Ok(record) => {
                batch.breakdown.admitted += 1;
                batch.records.push(record);
            }
            Err(err) => batch.breakdown.record_rejection(index, err),
        }
    }

    batch
}
