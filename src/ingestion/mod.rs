//! Population ingestion
//!
//! The decomposition engine reads its population through `AggregateSource`:
//! for a requested attribute list it wants one aggregate per group of the
//! population partitioned by those attributes.

pub mod population;

pub use population::PopulationModel;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One group of the population partitioned by some attribute list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    /// Attribute values identifying the group
    pub key: Vec<String>,

    /// Number of individuals in the group
    pub count: f64,

    /// Count-weighted mean of the indicator within the group
    pub mean_indicator: f64,
}

impl GroupAggregate {
    pub fn new(key: Vec<String>, count: f64, mean_indicator: f64) -> Self {
        Self {
            key,
            count,
            mean_indicator,
        }
    }

    /// Total indicator mass carried by the group
    pub fn weighted_indicator(&self) -> f64 {
        self.count * self.mean_indicator
    }
}

/// Source of grouped population aggregates
pub trait AggregateSource {
    /// Group the population by `attributes` (never empty) and aggregate.
    fn grouped_aggregates(&self, attributes: &[String]) -> Result<Vec<GroupAggregate>>;
}

impl<S: AggregateSource + ?Sized> AggregateSource for &S {
    fn grouped_aggregates(&self, attributes: &[String]) -> Result<Vec<GroupAggregate>> {
        (**self).grouped_aggregates(attributes)
    }
}
