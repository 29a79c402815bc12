use crate::data::DataError;

/// A closed ring of lon/lat coordinates
pub type Ring = Vec<(f64, f64)>;

/// A polygon: exterior ring first, holes after
pub type Polygon = Vec<Ring>;

/// Column type inferred once at load time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Number,
    Text,
    Bool,
}

/// A single attribute value. `Null` marks a missing value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    /// Numeric view of the value. NaN counts as missing.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Number(v) => v.is_nan(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// Ordered, named, typed fields shared by every record of a set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

/// Validated handle to a numeric column. Obtained from [`Schema::column`],
/// so lookups through it never need to re-check the name or type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeColumn {
    index: usize,
}

impl AttributeColumn {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.index
    }

    /// Read this column from a record
    #[inline(always)]
    pub fn value(self, record: &Record) -> Option<f64> {
        record.values.get(self.index).and_then(FieldValue::as_number)
    }

    #[inline(always)]
    pub fn is_missing(self, record: &Record) -> bool {
        record
            .values
            .get(self.index)
            .map_or(true, FieldValue::is_missing)
    }
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a numeric column by name
    pub fn column(&self, name: &str) -> Result<AttributeColumn, DataError> {
        let index = self
            .position(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))?;
        if self.fields[index].ty != FieldType::Number {
            return Err(DataError::NotNumeric(name.to_string()));
        }
        Ok(AttributeColumn { index })
    }

    /// Names of all numeric columns, in schema order
    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.ty == FieldType::Number)
            .map(|f| f.name.as_str())
    }
}

/// One geometry-bearing row
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Stable row index within its set
    pub row: usize,
    pub polygons: Vec<Polygon>,
    /// Values indexed by schema position
    pub values: Vec<FieldValue>,
}

impl Record {
    /// Bounding box as (min_lon, min_lat, max_lon, max_lat), `None` without geometry
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .polygons
            .iter()
            .flat_map(|p| p.first())
            .flat_map(|ring| ring.iter());
        let &(lon, lat) = points.next()?;
        Some(points.fold((lon, lat, lon, lat), |(a, b, c, d), &(x, y)| {
            (a.min(x), b.min(y), c.max(x), d.max(y))
        }))
    }
}

/// An ordered table of records plus its schema
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    pub schema: Schema,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Field { name: "name".into(), ty: FieldType::Text },
            Field { name: "usage".into(), ty: FieldType::Number },
        ])
    }

    #[test]
    fn test_column_lookup() {
        let schema = schema();
        assert_eq!(schema.column("usage").unwrap().index(), 1);
        assert!(matches!(schema.column("name"), Err(DataError::NotNumeric(_))));
        assert!(matches!(schema.column("nope"), Err(DataError::UnknownColumn(_))));
    }

    #[test]
    fn test_nan_is_missing() {
        let column = schema().column("usage").unwrap();
        let record = Record {
            row: 0,
            polygons: Vec::new(),
            values: vec![FieldValue::Text("a".into()), FieldValue::Number(f64::NAN)],
        };
        assert!(column.is_missing(&record));
        assert_eq!(column.value(&record), None);
    }

    #[test]
    fn test_bbox() {
        let record = Record {
            row: 0,
            polygons: vec![vec![vec![(0.0, 0.0), (2.0, 1.0), (1.0, 3.0), (0.0, 0.0)]]],
            values: Vec::new(),
        };
        assert_eq!(record.bbox(), Some((0.0, 0.0, 2.0, 3.0)));
    }
}
