use crate::data::{Polygon, Record};
use glam::DVec2;

/// Walk a line with Bresenham's algorithm, calling `plot` for each pixel
pub fn draw_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Fill projected rings with the even-odd rule, scanning pixel centers.
/// Only rows in `0..height` and columns in `0..width` are visited.
pub fn fill_rings(rings: &[Vec<(i32, i32)>], width: i32, height: i32, mut plot: impl FnMut(i32, i32)) {
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if min_y > max_y {
        return;
    }

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_y.max(0)..=max_y.min(height - 1) {
        let scan = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            for edge in ring.windows(2) {
                let (x0, y0) = (edge[0].0 as f64, edge[0].1 as f64);
                let (x1, y1) = (edge[1].0 as f64, edge[1].1 as f64);
                // Half-open test so shared vertices count once
                if (y0 <= scan) != (y1 <= scan) {
                    crossings.push(x0 + (scan - y0) / (y1 - y0) * (x1 - x0));
                }
            }
        }

        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as i32;
            let end = ((pair[1] - 0.5).floor() as i32).min(width - 1);
            for x in start..=end {
                plot(x, y);
            }
        }
    }
}

/// Even-odd point-in-polygon test over all rings
pub fn point_in_polygon(lon: f64, lat: f64, polygon: &Polygon) -> bool {
    let mut inside = false;
    for ring in polygon {
        for edge in ring.windows(2) {
            let (x0, y0) = edge[0];
            let (x1, y1) = edge[1];
            if (y0 > lat) != (y1 > lat) && lon < x0 + (lat - y0) / (y1 - y0) * (x1 - x0) {
                inside = !inside;
            }
        }
    }
    inside
}

/// Signed area and area-weighted centroid sum of a ring (shoelace)
fn ring_moments(ring: &[(f64, f64)]) -> (f64, DVec2) {
    let mut area2 = 0.0;
    let mut sum = DVec2::ZERO;
    for edge in ring.windows(2) {
        let a = DVec2::new(edge[0].0, edge[0].1);
        let b = DVec2::new(edge[1].0, edge[1].1);
        let cross = a.perp_dot(b);
        area2 += cross;
        sum += (a + b) * cross;
    }
    (area2 / 2.0, sum / 6.0)
}

/// Area-weighted centroid over many records' polygons, in lon/lat.
/// Exterior rings add area and holes subtract it, whatever their winding.
/// Falls back to the bounding box center when the total area vanishes.
pub fn centroid<'a>(records: impl IntoIterator<Item = &'a Record>) -> Option<(f64, f64)> {
    let mut total_area = 0.0;
    let mut moment = DVec2::ZERO;
    let mut bounds: Option<(f64, f64, f64, f64)> = None;

    for record in records {
        if let Some(b) = record.bbox() {
            bounds = Some(union_bbox(bounds, b));
        }
        for polygon in &record.polygons {
            for (i, ring) in polygon.iter().enumerate() {
                let (area, m) = ring_moments(ring);
                if area == 0.0 {
                    continue;
                }
                // Normalize orientation: exterior positive, holes negative
                let sign = if (i == 0) == (area > 0.0) { 1.0 } else { -1.0 };
                total_area += sign * area;
                moment += m * sign;
            }
        }
    }

    if total_area.abs() > f64::EPSILON {
        let c = moment / total_area;
        return Some((c.x, c.y));
    }
    bounds.map(|(a, b, c, d)| ((a + c) / 2.0, (b + d) / 2.0))
}

pub fn union_bbox(acc: Option<(f64, f64, f64, f64)>, b: (f64, f64, f64, f64)) -> (f64, f64, f64, f64) {
    match acc {
        Some((a0, a1, a2, a3)) => (a0.min(b.0), a1.min(b.1), a2.max(b.2), a3.max(b.3)),
        None => b,
    }
}

/// Bounding box of many records
pub fn bounds<'a>(records: impl IntoIterator<Item = &'a Record>) -> Option<(f64, f64, f64, f64)> {
    records
        .into_iter()
        .filter_map(Record::bbox)
        .fold(None, |acc, b| Some(union_bbox(acc, b)))
}
