use tracing::debug;

use crate::domain::DashboardError;
use crate::value::Value;

/// The full in-memory row collection of one loaded file or sample.
///
/// The column set is the key order of the first record. Every row holds
/// exactly one value per column; keys missing from a record become
/// [`Value::Empty`] and keys absent from the first record are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Columns split by the kind of values observed in them.
///
/// A column holding both numbers and text is listed in both sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnClasses {
    pub numeric: Vec<usize>,
    pub categorical: Vec<usize>,
}

impl ColumnClasses {
    pub fn first_numeric(&self) -> Option<usize> {
        self.numeric.first().copied()
    }

    pub fn first_categorical(&self) -> Option<usize> {
        self.categorical.first().copied()
    }
}

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        mut rows: Vec<Vec<Value>>,
    ) -> Result<Self, DashboardError> {
        if rows.is_empty() || columns.is_empty() {
            return Err(DashboardError::NoRows);
        }
        for row in rows.iter_mut() {
            row.resize(columns.len(), Value::Empty);
        }
        let dataset = Self {
            name: name.into(),
            columns,
            rows,
        };
        debug!(
            "Dataset \"{}\": {} rows x {} columns",
            dataset.name,
            dataset.row_count(),
            dataset.column_count()
        );
        Ok(dataset)
    }

    /// Build a dataset from records of (key, value) pairs. The first record
    /// defines the schema.
    pub fn from_records(
        name: impl Into<String>,
        records: Vec<Vec<(String, Value)>>,
    ) -> Result<Self, DashboardError> {
        let columns: Vec<String> = match records.first() {
            Some(first) => first.iter().map(|(k, _)| k.clone()).collect(),
            None => return Err(DashboardError::NoRows),
        };
        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = vec![Value::Empty; columns.len()];
                for (key, value) in record {
                    if let Some(idx) = columns.iter().position(|c| *c == key) {
                        row[idx] = value;
                    }
                }
                row
            })
            .collect();
        Self::new(name, columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    /// Iterate over all values of one column in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[column])
    }

    /// Tag every column as numeric and/or categorical. A single number makes
    /// a column numeric, a single text value makes it categorical.
    pub fn classify(&self) -> ColumnClasses {
        let mut classes = ColumnClasses::default();
        for column in 0..self.column_count() {
            if self.column_values(column).any(Value::is_number) {
                classes.numeric.push(column);
            }
            if self.column_values(column).any(Value::is_text) {
                classes.categorical.push(column);
            }
        }
        debug!(
            "Classified columns: numeric {:?}, categorical {:?}",
            classes.numeric, classes.categorical
        );
        classes
    }
}
