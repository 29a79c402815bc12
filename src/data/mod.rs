mod cache;
mod demo;
mod record;

pub use cache::GeometryCache;
pub use demo::generate_demo_hex_grid;
pub use record::{
    AttributeColumn, Field, FieldType, FieldValue, Polygon, Record, RecordSet, Ring, Schema,
};

use geojson::{Feature, GeoJson, Geometry, JsonValue, Value};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Identifier and geometry columns that are never offered as attributes
pub const EXCLUDED_COLUMNS: [&str; 9] = [
    "fid", "NAME_3", "x", "y", "gu_name", "dong_name", "hex_id", "area", "geometry",
];

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column is not numeric: {0}")]
    NotNumeric(String),
}

/// Load a GeoJSON FeatureCollection of polygons into a record set
pub fn load_record_set(path: &Path) -> Result<RecordSet, DataError> {
    let mut bytes = fs::read(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson =
        simd_json::serde::from_slice(&mut bytes).map_err(|e| DataError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let set = record_set_from_geojson(geojson)?;
    info!(
        path = %path.display(),
        records = set.len(),
        fields = set.schema.len(),
        "loaded record set"
    );
    Ok(set)
}

/// Build a record set from already parsed GeoJSON
pub fn record_set_from_geojson(geojson: GeoJson) -> Result<RecordSet, DataError> {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        _ => return Err(DataError::NotFeatureCollection),
    };

    let schema = infer_schema(&features);

    // Collected in feature order, so row indices stay stable
    let rows: Vec<Option<(Vec<Polygon>, Vec<FieldValue>)>> = features
        .par_iter()
        .map(|feature| convert_feature(feature, &schema))
        .collect();

    let skipped = rows.iter().filter(|r| r.is_none()).count();
    if skipped > 0 {
        warn!(skipped, "skipped features without polygon geometry");
    }

    let records = rows
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(row, (polygons, values))| Record {
            row,
            polygons,
            values,
        })
        .collect();

    Ok(RecordSet::new(schema, records))
}

/// Attributes offered for visualization: numeric columns minus identifiers
pub fn data_columns(schema: &Schema) -> Vec<String> {
    schema
        .numeric_columns()
        .filter(|name| !EXCLUDED_COLUMNS.contains(&name.trim()))
        .map(str::to_string)
        .collect()
}

/// Type evidence gathered while scanning properties
#[derive(Clone, Copy, PartialEq, Eq)]
enum Seen {
    OnlyNulls,
    Number,
    Bool,
    Text,
}

impl Seen {
    fn merge(self, value: &JsonValue) -> Self {
        let observed = match value {
            JsonValue::Null => return self,
            JsonValue::Number(_) => Seen::Number,
            JsonValue::Bool(_) => Seen::Bool,
            _ => Seen::Text,
        };
        match self {
            Seen::OnlyNulls => observed,
            s if s == observed => s,
            _ => Seen::Text,
        }
    }

    fn field_type(self) -> FieldType {
        match self {
            // An all-null column is still a valid, entirely missing, attribute
            Seen::OnlyNulls | Seen::Number => FieldType::Number,
            Seen::Bool => FieldType::Bool,
            Seen::Text => FieldType::Text,
        }
    }
}

/// Scan every feature's properties and fix one type per column
fn infer_schema(features: &[Feature]) -> Schema {
    let mut names: Vec<String> = Vec::new();
    let mut seen: Vec<Seen> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for props in features.iter().filter_map(|f| f.properties.as_ref()) {
        for (name, value) in props {
            let idx = *index.entry(name.clone()).or_insert_with(|| {
                names.push(name.clone());
                seen.push(Seen::OnlyNulls);
                names.len() - 1
            });
            seen[idx] = seen[idx].merge(value);
        }
    }

    let fields = names
        .into_iter()
        .zip(seen)
        .map(|(name, s)| Field {
            name,
            ty: s.field_type(),
        })
        .collect::<Vec<_>>();
    debug!(fields = fields.len(), "inferred schema");
    Schema::new(fields)
}

fn convert_feature(feature: &Feature, schema: &Schema) -> Option<(Vec<Polygon>, Vec<FieldValue>)> {
    let mut polygons = Vec::new();
    if let Some(ref geometry) = feature.geometry {
        collect_polygons(geometry, &mut polygons);
    }
    if polygons.is_empty() {
        return None;
    }

    let props = feature.properties.as_ref();
    let values = schema
        .fields()
        .iter()
        .map(|field| {
            props
                .and_then(|p| p.get(&field.name))
                .map_or(FieldValue::Null, |v| convert_value(v, field.ty))
        })
        .collect();

    Some((polygons, values))
}

fn convert_value(value: &JsonValue, ty: FieldType) -> FieldValue {
    match (ty, value) {
        (_, JsonValue::Null) => FieldValue::Null,
        (FieldType::Number, JsonValue::Number(n)) => {
            n.as_f64().map_or(FieldValue::Null, FieldValue::Number)
        }
        (FieldType::Bool, JsonValue::Bool(b)) => FieldValue::Bool(*b),
        (_, JsonValue::String(s)) => FieldValue::Text(s.clone()),
        (_, other) => FieldValue::Text(other.to_string()),
    }
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => out.push(convert_rings(rings)),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().map(|rings| convert_rings(rings)));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

fn convert_rings(rings: &[Vec<Vec<f64>>]) -> Polygon {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|c| c.len() >= 2)
                .map(|c| (c[0], c[1]))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"fid": 1, "dong_name": "A", "usage": 10.5, "flag": true},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature",
             "properties": {"fid": 2, "dong_name": "B", "usage": null, "flag": false},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[2,2],[3,2],[3,3],[2,2]]]]}},
            {"type": "Feature",
             "properties": {"fid": 3, "dong_name": "C", "usage": 7},
             "geometry": {"type": "Point", "coordinates": [5,5]}}
        ]
    }"#;

    fn sample() -> RecordSet {
        record_set_from_geojson(SAMPLE.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_schema_inference() {
        let set = sample();
        let ty = |name: &str| {
            let idx = set.schema.position(name).unwrap();
            set.schema.fields()[idx].ty
        };
        assert_eq!(ty("usage"), FieldType::Number);
        assert_eq!(ty("dong_name"), FieldType::Text);
        assert_eq!(ty("flag"), FieldType::Bool);
    }

    #[test]
    fn test_point_features_skipped() {
        let set = sample();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[1].row, 1);
        assert_eq!(set.records[1].polygons.len(), 1);
    }

    #[test]
    fn test_null_and_absent_values() {
        let set = sample();
        let usage = set.schema.column("usage").unwrap();
        assert_eq!(usage.value(&set.records[0]), Some(10.5));
        assert!(usage.is_missing(&set.records[1]));
    }

    #[test]
    fn test_data_columns_excludes_identifiers() {
        let set = sample();
        assert_eq!(data_columns(&set.schema), vec!["usage".to_string()]);
    }

    #[test]
    fn test_only_listed_identifiers_excluded() {
        let schema = Schema::new(
            ["fid", " x ", "id", "population"]
                .into_iter()
                .map(|name| Field { name: name.into(), ty: FieldType::Number })
                .collect(),
        );
        assert_eq!(data_columns(&schema), vec!["id".to_string(), "population".to_string()]);
    }

    #[test]
    fn test_rejects_bare_geometry() {
        let geojson: GeoJson = r#"{"type": "Point", "coordinates": [0, 0]}"#.parse().unwrap();
        assert!(matches!(
            record_set_from_geojson(geojson),
            Err(DataError::NotFeatureCollection)
        ));
    }

    #[test]
    fn test_mixed_column_becomes_text() {
        let geojson: GeoJson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"v": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"v": "n/a"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
        ]}"#
        .parse()
        .unwrap();
        let set = record_set_from_geojson(geojson).unwrap();
        assert!(matches!(set.schema.column("v"), Err(DataError::NotNumeric(_))));
        assert_eq!(set.records[0].values[0], FieldValue::Text("1".into()));
    }
}
