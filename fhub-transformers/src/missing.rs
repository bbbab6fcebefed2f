//! Missing-value handling: lag imputation, mean imputation, constant fill, null flags.

use crate::check_width;
use fhub_core::{
    Column, Frame, FittedTransformer, Group, GroupBy, GroupedTemporalContext, TransformError,
    Transformer,
};
use std::collections::HashMap;

/// Forward-fills missing values from the most recent prior observation in the same group.
///
/// Leading gaps (no earlier observation in the group) stay missing; pair this
/// stage with a fallback imputer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LagImputer {
    group_by: GroupBy,
}

impl LagImputer {
    pub fn new(group_by: GroupBy) -> Self {
        Self { group_by }
    }

    /// Impute independently within each entity.
    pub fn by_entity() -> Self {
        Self::new(GroupBy::Entity)
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }
}

/// Last observation `(time, value)` per entity, one map per column.
#[derive(Debug, Clone)]
struct FittedLagImputer {
    group_by: GroupBy,
    last_seen: Vec<HashMap<String, (i64, f64)>>,
}

impl Transformer for LagImputer {
    fn describe(&self) -> String {
        format!("lag_imputer(by={})", self.group_by)
    }

    fn is_group_aware(&self) -> bool {
        self.group_by == GroupBy::Entity
    }

    fn fit(
        &self,
        input: &Frame,
        ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        let groups = ctx.groups(self.group_by);
        let mut last_seen = Vec::with_capacity(input.width());
        for col in input.columns() {
            let mut per_group = HashMap::with_capacity(groups.len());
            for group in groups {
                check_observed(self.group_by, group, col)?;
                let last = group
                    .rows
                    .iter()
                    .zip(&group.times)
                    .rev()
                    .find_map(|(&row, &time)| col.values[row].map(|v| (time, v)));
                if let Some(last) = last {
                    per_group.insert(group.key.clone(), last);
                }
            }
            last_seen.push(per_group);
        }
        Ok(Box::new(FittedLagImputer {
            group_by: self.group_by,
            last_seen,
        }))
    }
}

impl FittedTransformer for FittedLagImputer {
    fn transform(
        &self,
        input: &Frame,
        ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        check_width(self.last_seen.len(), input)?;
        let groups = ctx.groups(self.group_by);

        input.map_columns(|i, col| {
            let mut out = col.values.clone();
            for group in groups {
                check_observed(self.group_by, group, col)?;
                // Carry the fitted observation only into strictly later data.
                let mut carry = match (self.group_by, group.first_time()) {
                    (GroupBy::Entity, Some(first)) => self.last_seen[i]
                        .get(&group.key)
                        .filter(|(time, _)| *time < first)
                        .map(|&(_, v)| v),
                    _ => None,
                };
                for &row in &group.rows {
                    match out[row] {
                        Some(v) => carry = Some(v),
                        None => out[row] = carry,
                    }
                }
            }
            Ok(out)
        })
    }
}

/// Only finite observations may be carried forward.
fn check_observed(group_by: GroupBy, group: &Group, col: &Column) -> Result<(), TransformError> {
    let bad = group
        .rows
        .iter()
        .zip(&group.times)
        .find(|&(&row, _)| col.values[row].is_some_and(|v| !v.is_finite()));
    let Some((_, time)) = bad else {
        return Ok(());
    };
    let message = format!("column '{}' has a non-finite value at time {time}", col.name);
    Err(match group_by {
        GroupBy::Entity => TransformError::in_group(group.key.clone(), message),
        GroupBy::Global => TransformError::new(message),
    })
}

/// Replaces missing values with the per-column mean learned at fit time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanImputer;

#[derive(Debug, Clone)]
struct FittedMeanImputer {
    means: Vec<f64>,
}

impl Transformer for MeanImputer {
    fn describe(&self) -> String {
        "mean_imputer".into()
    }

    fn fit(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        let means = input
            .columns()
            .iter()
            .map(|col| {
                crate::observed_mean(&col.values).ok_or_else(|| {
                    TransformError::new(format!(
                        "cannot impute column '{}': no observed values",
                        col.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(FittedMeanImputer { means }))
    }
}

impl FittedTransformer for FittedMeanImputer {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        check_width(self.means.len(), input)?;
        input.map_columns(|i, col| {
            Ok(col
                .values
                .iter()
                .map(|v| Some(v.unwrap_or(self.means[i])))
                .collect())
        })
    }
}

/// Replaces missing values with a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullFiller {
    replacement: f64,
}

impl NullFiller {
    pub fn new(replacement: f64) -> Self {
        Self { replacement }
    }

    pub fn replacement(&self) -> f64 {
        self.replacement
    }
}

impl Transformer for NullFiller {
    fn describe(&self) -> String {
        format!("null_filler({})", self.replacement)
    }

    fn fit(
        &self,
        _input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        Ok(Box::new(*self))
    }
}

impl FittedTransformer for NullFiller {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        input.map_columns(|_, col| {
            Ok(col
                .values
                .iter()
                .map(|v| Some(v.unwrap_or(self.replacement)))
                .collect())
        })
    }
}

/// Emits `1.0` where the input is missing and `0.0` elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullIndicator;

impl Transformer for NullIndicator {
    fn describe(&self) -> String {
        "null_indicator".into()
    }

    fn fit(
        &self,
        _input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        Ok(Box::new(*self))
    }
}

impl FittedTransformer for NullIndicator {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        input.map_columns(|_, col| {
            Ok(col
                .values
                .iter()
                .map(|v| Some(if v.is_none() { 1.0 } else { 0.0 }))
                .collect())
        })
    }
}
