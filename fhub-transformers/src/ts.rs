//! Time-series stages.

use crate::check_width;
use fhub_core::{
    Frame, FittedTransformer, GroupBy, GroupedTemporalContext, TransformError, Transformer,
};
use std::collections::HashMap;

/// Shifts each group's series forward by a fixed number of periods.
///
/// Position `i` of a group receives the value at position `i - lag`; the first
/// `lag` positions become missing. Groups shorter than `lag` come out
/// all-missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleLagger {
    lag: usize,
    group_by: GroupBy,
}

impl SingleLagger {
    pub fn new(lag: usize, group_by: GroupBy) -> Self {
        Self { lag, group_by }
    }

    /// Lag independently within each entity.
    pub fn by_entity(lag: usize) -> Self {
        Self::new(lag, GroupBy::Entity)
    }

    pub fn lag(&self) -> usize {
        self.lag
    }
}

/// Trailing values of one entity's series at fit time.
#[derive(Debug, Clone)]
struct Tail {
    last_time: i64,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
struct FittedSingleLagger {
    lag: usize,
    group_by: GroupBy,
    tails: Vec<HashMap<String, Tail>>,
}

impl Transformer for SingleLagger {
    fn describe(&self) -> String {
        format!("single_lagger({}, by={})", self.lag, self.group_by)
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
        for group in groups.iter().filter(|g| g.len() < self.lag) {
            tracing::debug!(
                group = %group.key,
                rows = group.len(),
                lag = self.lag,
                "Group shorter than lag; shifted series is all missing"
            );
        }

        let tails = input
            .columns()
            .iter()
            .map(|col| {
                groups
                    .iter()
                    .filter_map(|group| {
                        let last_time = group.last_time()?;
                        let series = group.gather(&col.values);
                        let start = series.len().saturating_sub(self.lag);
                        Some((
                            group.key.clone(),
                            Tail {
                                last_time,
                                values: series[start..].to_vec(),
                            },
                        ))
                    })
                    .collect()
            })
            .collect();

        Ok(Box::new(FittedSingleLagger {
            lag: self.lag,
            group_by: self.group_by,
            tails,
        }))
    }
}

impl FittedSingleLagger {
    /// Fitted tail that may precede `group`'s data, if any.
    fn seed(&self, column: usize, key: &str, first_time: Option<i64>) -> Option<&Tail> {
        if self.group_by != GroupBy::Entity {
            return None;
        }
        let first = first_time?;
        self.tails[column]
            .get(key)
            .filter(|tail| tail.last_time < first)
    }
}

impl FittedTransformer for FittedSingleLagger {
    fn transform(
        &self,
        input: &Frame,
        ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        check_width(self.tails.len(), input)?;
        let groups = ctx.groups(self.group_by);
        let lag = self.lag;

        input.map_columns(|i, col| {
            let mut out = vec![None; col.len()];
            for group in groups {
                let series = group.gather(&col.values);
                let tail = self.seed(i, &group.key, group.first_time());
                let shifted: Vec<Option<f64>> = (0..series.len())
                    .map(|pos| {
                        if pos >= lag {
                            return series[pos - lag];
                        }
                        // Reach back into the fitted tail: `back` steps before this batch.
                        let back = lag - pos;
                        tail.and_then(|t| {
                            t.values
                                .len()
                                .checked_sub(back)
                                .and_then(|idx| t.values[idx])
                        })
                    })
                    .collect();
                group.scatter(&shifted, &mut out);
            }
            Ok(out)
        })
    }
}
