//! Dataset and frame types.
//!
//! A [`Dataset`] is an externally owned table indexed by `(entity, time)` row
//! keys. Stages never mutate it; they exchange [`Frame`]s, which share the
//! dataset's index and carry only the columns a feature is working on.

use crate::error::{PipelineError, TransformError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Row key of the dataset index: one observation of one entity at one time step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    /// Entity (city) identifier.
    pub entity: String,
    /// Time index (e.g. week number), ascending in time.
    pub time: i64,
}

impl RowKey {
    pub fn new(entity: impl Into<String>, time: i64) -> Self {
        Self {
            entity: entity.into(),
            time,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.entity, self.time)
    }
}

/// A named numeric series aligned to an index. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a column with no missing values.
    pub fn dense(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Return a copy of this column under a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.values.clone())
    }
}

/// The unit of data exchanged between chain stages.
///
/// All frames produced during one run share the dataset's index; only the
/// column set changes from stage to stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Arc<[RowKey]>,
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame over `index`, checking that every column is aligned to it.
    pub fn new(index: Arc<[RowKey]>, columns: Vec<Column>) -> Result<Self, TransformError> {
        if let Some(col) = columns.iter().find(|c| c.len() != index.len()) {
            return Err(TransformError::new(format!(
                "column '{}' has {} values but the index has {} rows",
                col.name,
                col.len(),
                index.len()
            )));
        }
        Ok(Self { index, columns })
    }

    /// Replace the columns, keeping the index.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, TransformError> {
        Self::new(Arc::clone(&self.index), columns)
    }

    /// Apply `f` to every column's values, keeping names and index.
    pub fn map_columns<F>(&self, mut f: F) -> Result<Self, TransformError>
    where
        F: FnMut(usize, &Column) -> Result<Vec<Option<f64>>, TransformError>,
    {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| Ok(Column::new(col.name.clone(), f(i, col)?)))
            .collect::<Result<Vec<_>, TransformError>>()?;
        self.with_columns(columns)
    }

    /// Rename columns positionally; extra names are ignored.
    pub(crate) fn rename_columns(mut self, names: &[String]) -> Self {
        for (col, name) in self.columns.iter_mut().zip(names) {
            col.name.clone_from(name);
        }
        self
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    pub(crate) fn shared_index(&self) -> &Arc<[RowKey]> {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Values of row `row` across all columns.
    pub fn row(&self, row: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|c| c.values[row]).collect()
    }
}

/// Raw input table indexed by unique `(entity, time)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    frame: Frame,
}

impl Dataset {
    /// Build a dataset, validating index uniqueness and column alignment.
    ///
    /// `Some(NaN)` is stored as missing. Infinite values are rejected.
    pub fn new(index: Vec<RowKey>, mut columns: Vec<Column>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::with_capacity(index.len());
        for key in &index {
            if !seen.insert(key) {
                return Err(PipelineError::invalid_dataset(format!(
                    "duplicate index entry {key}"
                )));
            }
        }

        let mut names = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !names.insert(col.name.as_str()) {
                return Err(PipelineError::invalid_dataset(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }

        for col in &mut columns {
            for value in &mut col.values {
                if value.is_some_and(f64::is_nan) {
                    *value = None;
                }
            }
        }

        let frame = Frame::new(index.into(), columns)
            .map_err(|e| PipelineError::invalid_dataset(e.message))?;
        for col in frame.columns() {
            let infinite = frame
                .index()
                .iter()
                .zip(&col.values)
                .find_map(|(key, v)| v.filter(|x| x.is_infinite()).map(|x| (key, x)));
            if let Some((key, value)) = infinite {
                return Err(PipelineError::invalid_dataset(format!(
                    "column '{}' has non-finite value {value} at {key}",
                    col.name
                )));
            }
        }
        Ok(Self { frame })
    }

    /// Build a dataset from row-major records.
    pub fn from_rows<I>(column_names: &[&str], rows: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (RowKey, Vec<Option<f64>>)>,
    {
        let mut index = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); column_names.len()];
        for (key, row) in rows {
            if row.len() != column_names.len() {
                return Err(PipelineError::invalid_dataset(format!(
                    "row {key} has {} values, expected {}",
                    row.len(),
                    column_names.len()
                )));
            }
            for (slot, value) in values.iter_mut().zip(row) {
                slot.push(value);
            }
            index.push(key);
        }
        let columns = column_names
            .iter()
            .zip(values)
            .map(|(name, vals)| Column::new(*name, vals))
            .collect();
        Self::new(index, columns)
    }

    pub fn index(&self) -> &[RowKey] {
        self.frame.index()
    }

    pub(crate) fn shared_index(&self) -> &Arc<[RowKey]> {
        self.frame.shared_index()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.frame.column(name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.frame.column_names()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn as_frame(&self) -> &Frame {
        &self.frame
    }

    /// Slice the named columns, in the given order, into a new frame.
    ///
    /// On failure returns the first name that is not a column of this dataset.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame, String> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column(name).cloned().ok_or_else(|| name.to_string())
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Frame {
            index: Arc::clone(self.shared_index()),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_city_dataset() -> Dataset {
        Dataset::from_rows(
            &["x", "y"],
            vec![
                (RowKey::new("sj", 1), vec![Some(1.0), None]),
                (RowKey::new("sj", 2), vec![Some(2.0), Some(20.0)]),
                (RowKey::new("iq", 1), vec![None, Some(30.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_builds_columns() {
        let ds = two_city_dataset();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.column_names(), vec!["x", "y"]);
        assert_eq!(ds.column("x").unwrap().values, vec![Some(1.0), Some(2.0), None]);
        assert_eq!(ds.column("y").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let result = Dataset::from_rows(
            &["x"],
            vec![
                (RowKey::new("sj", 1), vec![Some(1.0)]),
                (RowKey::new("sj", 1), vec![Some(2.0)]),
            ],
        );
        assert!(matches!(result, Err(PipelineError::InvalidDataset(_))));
    }

    #[test]
    fn test_nan_is_stored_as_missing() {
        let ds = Dataset::from_rows(
            &["x"],
            vec![
                (RowKey::new("sj", 1), vec![Some(1.0)]),
                (RowKey::new("sj", 2), vec![Some(f64::NAN)]),
            ],
        )
        .unwrap();
        assert_eq!(ds.column("x").unwrap().values, vec![Some(1.0), None]);
        assert_eq!(ds.column("x").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_infinite_value_rejected() {
        for value in [f64::INFINITY, f64::NEG_INFINITY] {
            let err = Dataset::new(
                vec![RowKey::new("sj", 1), RowKey::new("iq", 4)],
                vec![Column::new("x", vec![Some(1.0), Some(value)])],
            )
            .unwrap_err();
            match err {
                PipelineError::InvalidDataset(message) => {
                    assert!(message.contains("'x'"), "{message}");
                    assert!(message.contains("(iq, 4)"), "{message}");
                }
                other => panic!("expected invalid dataset, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_misaligned_column_rejected() {
        let result = Dataset::new(
            vec![RowKey::new("sj", 1)],
            vec![Column::dense("x", [1.0, 2.0])],
        );
        assert!(matches!(result, Err(PipelineError::InvalidDataset(_))));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Dataset::new(
            vec![RowKey::new("sj", 1)],
            vec![Column::dense("x", [1.0]), Column::dense("x", [2.0])],
        );
        assert!(matches!(result, Err(PipelineError::InvalidDataset(_))));
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let ds = two_city_dataset();
        let frame = ds.select(&["y", "x"]).unwrap();
        assert_eq!(frame.column_names(), vec!["y", "x"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.row(0), vec![None, Some(1.0)]);
    }

    #[test]
    fn test_select_reports_missing_column() {
        let ds = two_city_dataset();
        assert_eq!(ds.select(&["x", "nope"]), Err("nope".to_string()));
    }

    #[test]
    fn test_frame_rejects_misaligned_columns() {
        let ds = two_city_dataset();
        let frame = ds.select(&["x"]).unwrap();
        assert!(frame.with_columns(vec![Column::dense("z", [1.0])]).is_err());
    }
}
