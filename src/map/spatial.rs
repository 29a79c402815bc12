use crate::data::RecordSet;
use crate::map::geometry::point_in_polygon;
use std::collections::HashMap;

/// Spatial index for record geometries using conservative approximation.
/// Each record's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the point-in-polygon test in `hit_test`).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from every record of a set, keyed by row.
    /// Cell size is chosen from the average record extent.
    pub fn build(set: &RecordSet) -> Self {
        let bboxes: Vec<(usize, (f64, f64, f64, f64))> = set
            .records
            .iter()
            .filter_map(|r| r.bbox().map(|b| (r.row, b)))
            .collect();

        let mean_extent = if bboxes.is_empty() {
            1.0
        } else {
            bboxes
                .iter()
                .map(|(_, (a, b, c, d))| (c - a).max(d - b))
                .sum::<f64>()
                / bboxes.len() as f64
        };

        let mut grid = Self::new((mean_extent * 2.0).max(1e-6));
        for (row, (min_lon, min_lat, max_lon, max_lat)) in bboxes {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(row);
                }
            }
        }
        grid
    }

    /// Candidate rows whose bounding box cell contains the point
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Row of the first record whose geometry contains the point
    pub fn hit_test(&self, set: &RecordSet, lon: f64, lat: f64) -> Option<usize> {
        self.query_point(lon, lat).iter().copied().find(|&row| {
            set.get(row).is_some_and(|record| {
                record
                    .polygons
                    .iter()
                    .any(|polygon| point_in_polygon(lon, lat, polygon))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_demo_hex_grid;
    use crate::map::geometry::centroid;

    #[test]
    fn test_hit_test_finds_each_cell_center() {
        let set = generate_demo_hex_grid();
        let grid = FeatureGrid::build(&set);
        for record in &set.records {
            let (lon, lat) = centroid([record]).unwrap();
            assert_eq!(grid.hit_test(&set, lon, lat), Some(record.row));
        }
    }

    #[test]
    fn test_hit_test_outside() {
        let set = generate_demo_hex_grid();
        let grid = FeatureGrid::build(&set);
        assert_eq!(grid.hit_test(&set, 0.0, 0.0), None);
        assert!(grid.query_point(0.0, 0.0).is_empty());
    }
}
