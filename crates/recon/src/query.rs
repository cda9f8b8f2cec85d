//! Filter, sort and page derivations over an immutable record list.
//!
//! Everything here is a pure function of (records, query, sort state, page).
//! Results are index vectors into the source list; the list itself is never
//! reordered or copied.

use std::cmp::Ordering;
use std::ops::Range;

use serde::Serialize;

use crate::model::{Record, Value, ValueKind};
use crate::schema::Column;

/// Fixed number of rows per page.
pub const PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// True if any value's text form contains `needle_lower`.
/// `needle_lower` must already be lowercased.
pub fn matches(record: &Record, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    record
        .values()
        .filter_map(Value::to_text)
        .any(|text| text.to_lowercase().contains(needle_lower))
}

/// Indices of records matching `query`, case-insensitively, in source order.
pub fn filter(records: &[Record], query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| matches(r, &needle))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Header indicator glyph.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "↑",
            Self::Desc => "↓",
        }
    }
}

/// Active sort column and direction. No key means source order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    /// Header click: a new key starts ascending, the same key flips direction.
    pub fn toggled(&self, key: &str) -> SortState {
        let direction = if self.key.as_deref() == Some(key) {
            self.direction.flipped()
        } else {
            SortDirection::Asc
        };
        SortState { key: Some(key.to_string()), direction }
    }

    pub fn direction_for(&self, column: &str) -> Option<SortDirection> {
        (self.key.as_deref() == Some(column)).then_some(self.direction)
    }
}

/// Sort rank: values of the declared kind, then other kinds, then nulls.
/// Ranks hold in both directions; direction only reverses order within a rank.
fn rank(value: &Value, kind: ValueKind) -> u8 {
    match value.kind() {
        Some(k) if k == kind => 0,
        Some(_) => 1,
        None => 2,
    }
}

fn compare_same_rank(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        // Mixed off-kind values: order by text form.
        _ => a.to_text().cmp(&b.to_text()),
    }
}

/// Compare two cells of a column of declared `kind` under `direction`.
/// Missing cells compare as `Null`.
pub fn compare(a: Option<&Value>, b: Option<&Value>, kind: ValueKind, direction: SortDirection) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    let (ra, rb) = (rank(a, kind), rank(b, kind));
    if ra != rb {
        return ra.cmp(&rb);
    }
    if ra == 2 {
        return Ordering::Equal;
    }
    let ord = compare_same_rank(a, b);
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

/// Stable sort of `indices` by `column`.
pub fn sort(records: &[Record], indices: &mut [usize], column: &Column, direction: SortDirection) {
    indices.sort_by(|&i, &j| {
        compare(records[i].get(&column.name), records[j].get(&column.name), column.kind, direction)
    });
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// `ceil(len / PAGE_SIZE)`; zero for an empty set.
pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// Clamp a requested 1-based page into `[1, total_pages]` (1 when empty).
pub fn clamp_page(page: usize, len: usize) -> usize {
    page.clamp(1, total_pages(len).max(1))
}

/// Slice bounds of 1-based `page` within a set of `len` rows.
pub fn page_range(len: usize, page: usize) -> Range<usize> {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE).min(len);
    let end = start.saturating_add(PAGE_SIZE).min(len);
    start..end
}
