//! Rank-based color bucketing.
//!
//! Records with a value for the chosen attribute are sorted ascending and cut
//! into K contiguous rank bands, one per palette color. The mapping is a step
//! function over rank, not over value magnitude, so a few outliers cannot
//! squash every other record into one color.

mod pass;

pub use pass::ChoroplethPass;

use crate::data::{AttributeColumn, Record};
use rgb::RGB8;

/// Records split by whether the attribute has a value
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub with_value: Vec<&'a Record>,
    pub without_value: Vec<&'a Record>,
}

/// Split records into those with and without a value for `column`.
/// Input order is kept on both sides.
pub fn partition<'a, I>(records: I, column: AttributeColumn) -> Partition<'a>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out = Partition::default();
    for record in records {
        if column.is_missing(record) {
            out.without_value.push(record);
        } else {
            out.with_value.push(record);
        }
    }
    out
}

/// Stable ascending sort by `column`; ties keep their load order.
/// Missing values sort last.
pub fn sort_ascending(records: &mut [&Record], column: AttributeColumn) {
    records.sort_by(|a, b| {
        let a = column.value(a).unwrap_or(f64::INFINITY);
        let b = column.value(b).unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
}

/// Bucket for rank `i` of `n` records over `k` buckets: `i / floor(n / k)`,
/// clamped to `k - 1`. Every band but the last holds exactly `floor(n / k)`
/// records and the last absorbs the remainder. With fewer records than
/// buckets each record gets its own bucket, so no index reaches `n`.
/// Requires `i < n` and `k >= 1`.
#[inline(always)]
pub fn bucket_index(i: usize, n: usize, k: usize) -> usize {
    let band = n / k;
    let idx = if band == 0 { i } else { i / band };
    idx.min(k - 1)
}

/// A record's bucket and color, keyed by its row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColoredRecord {
    pub row: usize,
    pub value: f64,
    pub bucket: usize,
    pub color: RGB8,
}

/// Assign each record of an ascending-sorted slice to a palette color by rank.
///
/// Records stay untouched; the result carries the row, the attribute value,
/// the bucket index and the color for each input position.
pub fn bucketize(
    sorted: &[&Record],
    column: AttributeColumn,
    palette: &[RGB8],
) -> Vec<ColoredRecord> {
    debug_assert!(!palette.is_empty(), "bucketize needs at least one color");
    let n = sorted.len();
    let k = palette.len();
    if n == 0 || k == 0 {
        return Vec::new();
    }

    sorted
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let bucket = bucket_index(i, n, k);
            ColoredRecord {
                row: record.row,
                value: column.value(record).unwrap_or(f64::NAN),
                bucket,
                color: palette[bucket],
            }
        })
        .collect()
}
