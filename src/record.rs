use crate::data::Table;
use serde::Serialize;
use tracing::debug;

/// Semantic type of a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Category,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn category(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::Category }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::Number }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Category(String),
    Number(f64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Category(_) => None,
        }
    }
}

/// One validated row, projected onto a schema's fields (same order).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, field: usize) -> &Value {
        &self.values[field]
    }

    /// Category value of `field`; empty if the schema declared it numeric.
    pub fn category(&self, field: usize) -> &str {
        self.values[field].as_str().unwrap_or_default()
    }

    pub fn number(&self, field: usize) -> f64 {
        self.values[field].as_f64().unwrap_or(f64::NAN)
    }

    pub fn set_category(&mut self, field: usize, value: String) {
        self.values[field] = Value::Category(value);
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// The fields a chart needs, in the order records store them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record slot of a field name (exact, then ASCII case-insensitive).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| self.fields.iter().position(|f| f.name.eq_ignore_ascii_case(name)))
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.index_of(name).map(|i| self.fields[i].kind)
    }

    /// Coerce every row of `table`, dropping rows that are not valid.
    ///
    /// A schema field with no matching column makes every row invalid.
    pub fn coerce(&self, table: &Table) -> Vec<Record> {
        let columns: Option<Vec<usize>> = self
            .fields
            .iter()
            .map(|f| table.column_index(&f.name))
            .collect();

        let Some(columns) = columns else {
            debug!(fields = ?self.names(), "schema column missing from table; no rows survive");
            return Vec::new();
        };

        let records: Vec<Record> = table
            .rows
            .iter()
            .filter_map(|row| self.coerce_row(&columns, row))
            .collect();

        debug!(
            total = table.rows.len(),
            kept = records.len(),
            dropped = table.rows.len() - records.len(),
            "coerced rows"
        );
        records
    }

    /// Coerce a single row. `None` is the discard sentinel.
    pub fn coerce_row(&self, columns: &[usize], row: &[String]) -> Option<Record> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (spec, &col) in self.fields.iter().zip(columns) {
            let cell = row.get(col).map(|s| s.trim())?;
            if cell.is_empty() {
                return None;
            }
            let value = match spec.kind {
                FieldKind::Category => Value::Category(cell.to_string()),
                FieldKind::Number => Value::Number(parse_number(cell)?),
            };
            values.push(value);
        }
        Some(Record { values })
    }

    fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Strict numeric parse: the whole cell must be a finite number.
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
