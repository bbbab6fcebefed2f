//! Grouping and temporal ordering derived from the dataset index.

use crate::dataset::RowKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Key of the single partition used by [`GroupBy::Global`].
pub const GLOBAL_GROUP: &str = "*";

/// How a group-aware transformer partitions the rows it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One independent series per entity, ordered by time.
    #[default]
    Entity,
    /// All rows as a single series, in dataset row order.
    Global,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("entity"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// One partition of the dataset: row positions of a single entity sorted by time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    /// Row positions into the dataset, in ascending time order.
    pub rows: Vec<usize>,
    /// Time value of each entry in `rows`.
    pub times: Vec<i64>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Gather this group's values out of a full-length column, in time order.
    pub fn gather(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        self.rows.iter().map(|&r| values[r]).collect()
    }

    /// Write time-ordered group values back to their row positions.
    pub fn scatter(&self, series: &[Option<f64>], out: &mut [Option<f64>]) {
        for (&row, value) in self.rows.iter().zip(series) {
            out[row] = *value;
        }
    }

    pub fn first_time(&self) -> Option<i64> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.times.last().copied()
    }
}

/// Grouping key and temporal order for one pipeline invocation.
///
/// Recomputed from the index on every run; never stored on a feature.
#[derive(Debug, Clone)]
pub struct GroupedTemporalContext {
    index: Arc<[RowKey]>,
    by_entity: Vec<Group>,
    global: Vec<Group>,
}

impl GroupedTemporalContext {
    /// Partition `index` by entity, ordering each partition by time.
    ///
    /// Groups are sorted by entity key so iteration order does not depend on
    /// the dataset's row order.
    pub fn from_index(index: Arc<[RowKey]>) -> Self {
        let mut partitions: BTreeMap<&str, Vec<(i64, usize)>> = BTreeMap::new();
        for (row, key) in index.iter().enumerate() {
            partitions
                .entry(key.entity.as_str())
                .or_default()
                .push((key.time, row));
        }

        let by_entity = partitions
            .into_iter()
            .map(|(entity, mut entries)| {
                entries.sort_unstable();
                Group {
                    key: entity.to_string(),
                    rows: entries.iter().map(|&(_, row)| row).collect(),
                    times: entries.iter().map(|&(time, _)| time).collect(),
                }
            })
            .collect();

        let global = vec![Group {
            key: GLOBAL_GROUP.to_string(),
            rows: (0..index.len()).collect(),
            times: index.iter().map(|k| k.time).collect(),
        }];

        Self {
            index,
            by_entity,
            global,
        }
    }

    /// Partitions for the given grouping.
    pub fn groups(&self, by: GroupBy) -> &[Group] {
        match by {
            GroupBy::Entity => &self.by_entity,
            GroupBy::Global => &self.global,
        }
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    /// Number of rows in the underlying dataset.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.by_entity.len()
    }
}
