//! Population Model
//!
//! Polars-backed population table. Each row carries attribute values, an
//! indicator value and the number of individuals sharing them; rows with the
//! same attribute values are re-aggregated on every grouping request.

use crate::config::ModelSchema;
use crate::error::{DecompositionError, Result};
use crate::ingestion::{AggregateSource, GroupAggregate};
use polars::prelude::*;
use tracing::{debug, info};

const GROUP_COUNT: &str = "__group_count";
const GROUP_WEIGHTED: &str = "__group_weighted_indicator";

/// Population table with its indicator and count columns
#[derive(Debug, Clone)]
pub struct PopulationModel {
    frame: DataFrame,
    indicator_column: String,
    count_column: String,
}

impl PopulationModel {
    /// Wrap an in-memory frame
    pub fn from_frame(
        frame: DataFrame,
        indicator_column: impl Into<String>,
        count_column: impl Into<String>,
    ) -> Result<Self> {
        let model = Self {
            frame,
            indicator_column: indicator_column.into(),
            count_column: count_column.into(),
        };
        model.require_column(&model.indicator_column)?;
        model.require_column(&model.count_column)?;
        Ok(model)
    }

    /// Load the model CSV described by `schema`
    pub fn from_csv(schema: &ModelSchema) -> Result<Self> {
        info!("Loading population model from {:?}", schema.path);
        let frame = LazyCsvReader::new(&schema.path)
            .with_separator(schema.separator()?)
            .with_infer_schema_length(Some(1000))
            .finish()?
            .collect()?;
        debug!("Loaded {} rows, columns {:?}", frame.height(), frame.get_column_names());

        Self::from_frame(frame, schema.indicator_column.clone(), schema.count_column.clone())
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn indicator_column(&self) -> &str {
        &self.indicator_column
    }

    pub fn count_column(&self) -> &str {
        &self.count_column
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if self.frame.column(name).is_err() {
            return Err(DecompositionError::MissingColumn(name.to_string()));
        }
        Ok(())
    }

    /// Group by the attribute columns, summing counts and count-weighted
    /// indicator values. Groups keep first-appearance order. Rows with a
    /// null value in any grouping column belong to no group and are dropped.
    fn group_frame(&self, attributes: &[String]) -> Result<DataFrame> {
        for attribute in attributes {
            self.require_column(attribute)?;
        }

        let keys: Vec<Expr> = attributes.iter().map(|a| col(a)).collect();
        let count = col(&self.count_column).cast(DataType::Float64);
        let indicator = col(&self.indicator_column).cast(DataType::Float64);

        let mut rows = self.frame.clone().lazy();
        if let Some(complete) = keys
            .iter()
            .map(|key| key.clone().is_not_null())
            .reduce(|all, next| all.and(next))
        {
            rows = rows.filter(complete);
        }

        let grouped = rows
            .group_by_stable(keys)
            .agg([
                count.clone().sum().alias(GROUP_COUNT),
                (indicator * count).sum().alias(GROUP_WEIGHTED),
            ])
            .collect()?;

        Ok(grouped)
    }
}

impl AggregateSource for PopulationModel {
    fn grouped_aggregates(&self, attributes: &[String]) -> Result<Vec<GroupAggregate>> {
        let grouped = self.group_frame(attributes)?;

        let counts = grouped.column(GROUP_COUNT)?.f64()?;
        let weighted = grouped.column(GROUP_WEIGHTED)?.f64()?;
        let keys = attributes
            .iter()
            .map(|a| grouped.column(a).and_then(|s| s.cast(&DataType::String)))
            .collect::<PolarsResult<Vec<Series>>>()?;

        let mut groups = Vec::with_capacity(grouped.height());
        for row in 0..grouped.height() {
            let count = counts.get(row).unwrap_or(0.0);
            let weighted_indicator = weighted.get(row).unwrap_or(0.0);
            let key = keys
                .iter()
                .map(|s| {
                    s.str()
                        .ok()
                        .and_then(|values| values.get(row))
                        .unwrap_or("")
                        .to_string()
                })
                .collect();
            let mean_indicator = if count != 0.0 {
                weighted_indicator / count
            } else {
                0.0
            };
            groups.push(GroupAggregate::new(key, count, mean_indicator));
        }

        debug!("Grouped population by {:?} into {} groups", attributes, groups.len());
        Ok(groups)
    }
}
