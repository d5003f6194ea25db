//! Distributions
//!
//! A distribution ("stochastic matrix") pairs, for every group of a
//! partitioned population, its share of the population with its share of the
//! indicator. Both columns sum to one.

use crate::error::{DecompositionError, Result};
use crate::ingestion::{AggregateSource, GroupAggregate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Population share and indicator share of one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharePair {
    pub population: f64,
    pub indicator: f64,
}

impl SharePair {
    pub fn new(population: f64, indicator: f64) -> Self {
        Self {
            population,
            indicator,
        }
    }
}

/// Ordered sequence of share pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pairs: Vec<SharePair>,
}

impl Distribution {
    pub fn new(pairs: Vec<SharePair>) -> Self {
        Self { pairs }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(pairs.iter().map(|&(x, y)| SharePair::new(x, y)).collect())
    }

    /// The whole population as a single group: `[(1, 1)]`
    pub fn identity() -> Self {
        Self::new(vec![SharePair::new(1.0, 1.0)])
    }

    pub fn pairs(&self) -> &[SharePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn population_total(&self) -> f64 {
        self.pairs.iter().map(|p| p.population).sum()
    }

    pub fn indicator_total(&self) -> f64 {
        self.pairs.iter().map(|p| p.indicator).sum()
    }

    /// Both columns sum to one within `tolerance`
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.population_total() - 1.0).abs() <= tolerance
            && (self.indicator_total() - 1.0).abs() <= tolerance
    }

    /// Distribution of the population partitioned by `attributes`.
    ///
    /// An empty attribute list collapses the population into one group.
    pub fn extract<S>(source: &S, attributes: &[String]) -> Result<Self>
    where
        S: AggregateSource + ?Sized,
    {
        if attributes.is_empty() {
            return Ok(Self::identity());
        }
        let groups = source.grouped_aggregates(attributes)?;
        Self::from_aggregates(attributes, &groups)
    }

    /// Normalize grouped aggregates into share pairs.
    ///
    /// Aggregates sharing a key are merged first (counts summed, indicator
    /// re-weighted by count). Fails when the population or its total
    /// indicator mass is zero.
    pub fn from_aggregates(attributes: &[String], groups: &[GroupAggregate]) -> Result<Self> {
        // (count, weighted indicator) per key, in first-appearance order
        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(groups.len());
        let mut positions: HashMap<&[String], usize> = HashMap::with_capacity(groups.len());
        for group in groups {
            match positions.get(group.key.as_slice()) {
                Some(&index) => {
                    merged[index].0 += group.count;
                    merged[index].1 += group.weighted_indicator();
                }
                None => {
                    positions.insert(group.key.as_slice(), merged.len());
                    merged.push((group.count, group.weighted_indicator()));
                }
            }
        }

        let total_count: f64 = merged.iter().map(|(count, _)| count).sum();
        if total_count == 0.0 {
            return Err(DecompositionError::EmptyPopulation {
                attributes: attributes.to_vec(),
            });
        }
        let total_indicator: f64 = merged.iter().map(|(_, weighted)| weighted).sum();
        if total_indicator == 0.0 {
            return Err(DecompositionError::DegenerateIndicator {
                attributes: attributes.to_vec(),
            });
        }

        Ok(Self::new(
            merged
                .iter()
                .map(|&(count, weighted)| {
                    SharePair::new(count / total_count, weighted / total_indicator)
                })
                .collect(),
        ))
    }
}
