use crate::choropleth::{bucketize, partition, sort_ascending, ColoredRecord};
use crate::data::{DataError, Record, RecordSet};
use rgb::RGB8;
use std::sync::Arc;
use tracing::debug;

/// One rendering pass: the loaded set split into a colored layer and a
/// no-data layer. Rebuilt from scratch on every interaction.
pub struct ChoroplethPass {
    pub records: Arc<RecordSet>,
    pub attribute: String,
    pub palette: Vec<RGB8>,
    /// Records with a value, in ascending rank order
    pub colored: Vec<ColoredRecord>,
    /// Rows without a value
    pub missing: Vec<usize>,
    /// (min, max) over the colored layer
    pub value_range: Option<(f64, f64)>,
    /// Row -> position in `colored`
    by_row: Vec<Option<usize>>,
}

impl ChoroplethPass {
    pub fn compute(
        records: Arc<RecordSet>,
        attribute: &str,
        palette: Vec<RGB8>,
    ) -> Result<Self, DataError> {
        let column = records.schema.column(attribute)?;

        let mut part = partition(&records.records, column);
        sort_ascending(&mut part.with_value, column);
        let colored = bucketize(&part.with_value, column, &palette);
        let missing: Vec<usize> = part.without_value.iter().map(|r| r.row).collect();

        let value_range = colored.first().zip(colored.last()).map(|(lo, hi)| (lo.value, hi.value));

        let mut by_row = vec![None; records.len()];
        for (pos, c) in colored.iter().enumerate() {
            by_row[c.row] = Some(pos);
        }

        debug!(
            attribute,
            colored = colored.len(),
            missing = missing.len(),
            buckets = palette.len(),
            "computed choropleth pass"
        );

        Ok(Self {
            records,
            attribute: attribute.to_string(),
            palette,
            colored,
            missing,
            value_range,
            by_row,
        })
    }

    #[inline]
    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Bucket and color for a row, `None` if the row has no value
    pub fn colored_for_row(&self, row: usize) -> Option<&ColoredRecord> {
        self.by_row.get(row).copied().flatten().map(|pos| &self.colored[pos])
    }

    /// Number of records per bucket
    pub fn bucket_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.palette.len()];
        for c in &self.colored {
            counts[c.bucket] += 1;
        }
        counts
    }

    /// Value span of each bucket, `None` for unused buckets
    pub fn bucket_ranges(&self) -> Vec<Option<(f64, f64)>> {
        let mut ranges: Vec<Option<(f64, f64)>> = vec![None; self.palette.len()];
        for c in &self.colored {
            let slot = &mut ranges[c.bucket];
            *slot = Some(match *slot {
                Some((lo, hi)) => (lo.min(c.value), hi.max(c.value)),
                None => (c.value, c.value),
            });
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_demo_hex_grid;

    fn palette(k: usize) -> Vec<RGB8> {
        (0..k).map(|i| RGB8 { r: i as u8, g: 0, b: 0 }).collect()
    }

    #[test]
    fn test_pass_covers_every_row() {
        let set = Arc::new(generate_demo_hex_grid());
        let pass = ChoroplethPass::compute(set.clone(), "electricity_kwh", palette(8)).unwrap();
        assert_eq!(pass.colored.len() + pass.missing.len(), set.len());
        for &row in &pass.missing {
            assert!(pass.colored_for_row(row).is_none());
        }
        for c in &pass.colored {
            assert_eq!(pass.colored_for_row(c.row), Some(c));
        }
    }

    #[test]
    fn test_value_range_and_counts() {
        let set = Arc::new(generate_demo_hex_grid());
        let pass = ChoroplethPass::compute(set, "households", palette(4)).unwrap();
        let (lo, hi) = pass.value_range.unwrap();
        assert!(pass.colored.iter().all(|c| c.value >= lo && c.value <= hi));

        let counts = pass.bucket_counts();
        assert_eq!(counts.iter().sum::<usize>(), pass.colored.len());
        let band = pass.colored.len() / 4;
        assert!(counts[..3].iter().all(|&c| c == band));

        let ranges = pass.bucket_ranges();
        assert!(ranges.windows(2).all(|w| w[0].unwrap().1 <= w[1].unwrap().0));
    }

    #[test]
    fn test_unknown_attribute() {
        let set = Arc::new(generate_demo_hex_grid());
        let result = ChoroplethPass::compute(set, "hex_id", palette(2));
        assert!(matches!(result, Err(DataError::NotNumeric(_))));
    }
}
