use crate::data::{Field, FieldType, FieldValue, Record, RecordSet, Schema};

/// Center of the generated grid (Incheon)
const DEMO_CENTER: (f64, f64) = (126.68, 37.46);
const DEMO_COLS: usize = 16;
const DEMO_ROWS: usize = 12;
/// Hexagon circumradius in degrees of latitude
const DEMO_RADIUS: f64 = 0.012;

/// Fast deterministic random using splitmix64 - handles small seeds properly
#[inline(always)]
fn rand_simple(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}

/// Generate a flat-top hex grid with synthetic usage columns.
/// Used when no dataset is given on the command line.
pub fn generate_demo_hex_grid() -> RecordSet {
    let schema = Schema::new(vec![
        Field { name: "hex_id".into(), ty: FieldType::Text },
        Field { name: "electricity_kwh".into(), ty: FieldType::Number },
        Field { name: "households".into(), ty: FieldType::Number },
        Field { name: "usage_per_household".into(), ty: FieldType::Number },
    ]);

    let (lon0, lat0) = DEMO_CENTER;
    let cos_lat = lat0.to_radians().cos();
    let r = DEMO_RADIUS;
    let dx = 1.5 * r / cos_lat;
    let dy = 3f64.sqrt() * r;

    let mut records = Vec::with_capacity(DEMO_COLS * DEMO_ROWS);
    for col in 0..DEMO_COLS {
        for row in 0..DEMO_ROWS {
            let cx = lon0 + (col as f64 - DEMO_COLS as f64 / 2.0) * dx;
            let offset = if col % 2 == 1 { dy / 2.0 } else { 0.0 };
            let cy = lat0 + (row as f64 - DEMO_ROWS as f64 / 2.0) * dy + offset;

            let ring: Vec<(f64, f64)> = (0..=6)
                .map(|k| {
                    let a = (k % 6) as f64 * std::f64::consts::FRAC_PI_3;
                    (cx + r * a.cos() / cos_lat, cy + r * a.sin())
                })
                .collect();

            let seed = (col * DEMO_ROWS + row) as u64;
            // Denser usage towards the center, with noise
            let dist = ((cx - lon0) * cos_lat).hypot(cy - lat0) / (r * DEMO_COLS as f64);
            let households = (200.0 + 1800.0 * (1.0 - dist).max(0.0) + rand_simple(seed) * 300.0).round();
            let kwh = households * (180.0 + rand_simple(seed.wrapping_add(7919)) * 120.0);

            // Roughly one cell in eight has no metering data
            let metered = rand_simple(seed.wrapping_mul(31337)) > 0.125;
            let value = |v: f64| if metered { FieldValue::Number(v) } else { FieldValue::Null };

            records.push(Record {
                row: records.len(),
                polygons: vec![vec![ring]],
                values: vec![
                    FieldValue::Text(format!("h{:02}{:02}", col, row)),
                    value(kwh.round()),
                    FieldValue::Number(households),
                    value((kwh / households).round()),
                ],
            });
        }
    }

    RecordSet::new(schema, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_grid_shape() {
        let set = generate_demo_hex_grid();
        assert_eq!(set.len(), DEMO_COLS * DEMO_ROWS);
        assert!(set.records.iter().enumerate().all(|(i, r)| r.row == i));
        assert_eq!(set.records[0].polygons[0][0].len(), 7);
    }

    #[test]
    fn test_demo_grid_has_missing_values() {
        let set = generate_demo_hex_grid();
        let kwh = set.schema.column("electricity_kwh").unwrap();
        let households = set.schema.column("households").unwrap();
        assert!(set.records.iter().any(|r| kwh.is_missing(r)));
        assert!(set.records.iter().any(|r| !kwh.is_missing(r)));
        assert!(set.records.iter().all(|r| !households.is_missing(r)));
    }
}
