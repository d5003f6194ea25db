//! Decomposition Engine
//!
//! Computes, for every atom of the attribute lattice, the cumulative
//! f-inequality of the joined distribution and its partial contribution by
//! inclusion-exclusion over the dual atom. Partials of all atoms add up to
//! the cumulative value of the top atom.

use crate::core::distribution::Distribution;
use crate::core::lattice::{power_set, reduce_atom, Atom, AttributeLattice, AttributeSet};
use crate::core::measure::{fineq, mixing_parameter};
use crate::core::zonogon::join;
use crate::error::Result;
use crate::ingestion::AggregateSource;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Decimal digits partial contributions are rounded to by default
pub const DEFAULT_PARTIAL_PRECISION: i32 = 15;

/// One row of a decomposition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionRecord {
    #[serde(skip)]
    pub atom: Atom,

    /// Attribute names of every member subset
    pub members: Vec<Vec<String>>,

    pub label: String,

    /// f-inequality of the joined distribution of the atom
    pub cumulative: f64,

    /// Exclusive contribution of the atom
    pub partial: f64,
}

/// Counters collected during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub atoms: usize,
    pub cumulative_evaluations: usize,
    pub cache_hits: usize,
    pub distributions_extracted: usize,
    pub joins: usize,
}

/// Result of a decomposition run, records in lattice enumeration order
#[derive(Debug, Clone, Serialize)]
pub struct Decomposition {
    pub records: Vec<DecompositionRecord>,
    pub stats: RunStats,

    /// Mixing parameter the values were computed with, after the p = 0
    /// substitution
    pub effective_p: f64,
}

impl Decomposition {
    /// Record of the top atom; the first in enumeration order
    pub fn top(&self) -> Option<&DecompositionRecord> {
        self.records.first()
    }

    pub fn partial_sum(&self) -> f64 {
        self.records.iter().map(|r| r.partial).sum()
    }
}

/// Decomposition over one population, generator and mixing parameter.
///
/// Distributions and cumulative values are memoized for the lifetime of the
/// engine; build a new engine for every run.
pub struct DecompositionEngine<'a, S: ?Sized, F> {
    source: &'a S,
    generator: F,
    p: f64,
    lattice: AttributeLattice,
    distributions: HashMap<AttributeSet, Distribution>,
    cumulative_cache: HashMap<Atom, f64>,
    stats: RunStats,
    precision: i32,
}

impl<'a, S, F> DecompositionEngine<'a, S, F>
where
    S: AggregateSource + ?Sized,
    F: Fn(f64) -> f64,
{
    /// Validate `p` and build the lattice over the deduplicated attributes.
    pub fn new(source: &'a S, generator: F, p: f64, attributes: &[String]) -> Result<Self> {
        let p = mixing_parameter(p)?;
        let lattice = AttributeLattice::new(attributes)?;
        Ok(Self {
            source,
            generator,
            p,
            lattice,
            distributions: HashMap::new(),
            cumulative_cache: HashMap::new(),
            stats: RunStats::default(),
            precision: DEFAULT_PARTIAL_PRECISION,
        })
    }

    pub fn with_partial_precision(mut self, digits: i32) -> Self {
        self.precision = digits;
        self
    }

    pub fn lattice(&self) -> &AttributeLattice {
        &self.lattice
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Effective mixing parameter after the p = 0 substitution
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Decompose over every atom of the lattice
    pub fn run(mut self) -> Result<Decomposition> {
        let atoms = self.lattice.enumerate_atoms();
        info!(
            "Decomposing over {} attributes ({} atoms), p={}",
            self.lattice.attributes().len(),
            atoms.len(),
            self.p
        );

        let top = self.lattice.top();
        let mut records = Vec::with_capacity(atoms.len());
        for atom in atoms {
            let cumulative = self.cumulative(&atom)?;
            let partial = if self.lattice.is_empty() {
                cumulative
            } else if atom == top {
                0.0
            } else {
                round_partial(self.partial(&atom)?, self.precision)
            };
            debug!(
                "{}: cumulative={} partial={}",
                self.lattice.label(&atom),
                cumulative,
                partial
            );
            records.push(DecompositionRecord {
                members: self.lattice.member_names(&atom),
                label: self.lattice.label(&atom),
                atom,
                cumulative,
                partial,
            });
        }

        self.stats.atoms = records.len();
        info!(
            "Decomposition finished: {} cumulative evaluations, {} cache hits",
            self.stats.cumulative_evaluations, self.stats.cache_hits
        );
        Ok(Decomposition {
            records,
            stats: self.stats,
            effective_p: self.p,
        })
    }

    /// Cumulative f-inequality of an atom: its members' distributions
    /// joined and measured. Memoized by the canonical atom.
    pub fn cumulative(&mut self, atom: &Atom) -> Result<f64> {
        if let Some(&value) = self.cumulative_cache.get(atom) {
            self.stats.cache_hits += 1;
            return Ok(value);
        }

        let mut joined = Distribution::identity();
        for &member in atom.members() {
            let distribution = self.distribution(member)?;
            joined = join(&joined, &distribution);
            self.stats.joins += 1;
        }

        let value = fineq(&self.generator, self.p, &joined);
        self.stats.cumulative_evaluations += 1;
        self.cumulative_cache.insert(atom.clone(), value);
        Ok(value)
    }

    /// Exclusive contribution of a non-top atom.
    ///
    /// Sums `(-1)^(|b|-1) * cumulative(reduce(b + atom))` over every
    /// sub-collection `b` of the dual atom, the empty one included.
    pub fn partial(&mut self, atom: &Atom) -> Result<f64> {
        let dual = self.lattice.dual(atom);
        let mut total = 0.0;
        for beta in power_set(dual.members()) {
            let sign = if beta.len() % 2 == 1 { 1.0 } else { -1.0 };
            let mut union = beta;
            union.extend_from_slice(atom.members());
            let reduced = Atom::new(reduce_atom(|a, b| a.is_proper_subset(b), &union));
            total += sign * self.cumulative(&reduced)?;
        }
        Ok(total)
    }

    fn distribution(&mut self, set: AttributeSet) -> Result<Distribution> {
        if let Some(distribution) = self.distributions.get(&set) {
            return Ok(distribution.clone());
        }
        let names = self.lattice.names(set);
        let distribution = Distribution::extract(self.source, &names)?;
        self.stats.distributions_extracted += 1;
        self.distributions.insert(set, distribution.clone());
        Ok(distribution)
    }
}

/// Round to `digits` decimals; adding 0.0 turns -0.0 into 0.0. Digit
/// counts beyond f64 range leave the value unrounded.
pub fn round_partial(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    let scaled = value * scale;
    if !scale.is_finite() || scale == 0.0 || !scaled.is_finite() {
        return value + 0.0;
    }
    scaled.round() / scale + 0.0
}

/// Decompose the f-inequality of `source` over `attributes`
pub fn compute_decomposition<S, F>(
    generator: F,
    p: f64,
    source: &S,
    attributes: &[String],
) -> Result<Decomposition>
where
    S: AggregateSource + ?Sized,
    F: Fn(f64) -> f64,
{
    DecompositionEngine::new(source, generator, p, attributes)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::measure::ZERO_P_SUBSTITUTE;
    use crate::error::DecompositionError;
    use crate::ingestion::PopulationModel;
    use polars::prelude::*;

    fn chi(x: f64) -> f64 {
        (x - 1.0).powi(2)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn two_attribute_model() -> PopulationModel {
        let frame = df! [
            "Attribute 1" => ["a", "a", "b", "b"],
            "Attribute 2" => ["x", "y", "x", "y"],
            "Indicator value" => [0.2, 0.4, 0.6, 0.8],
            "Number of individuals" => [25i64, 25, 25, 25]
        ]
        .unwrap();
        PopulationModel::from_frame(frame, "Indicator value", "Number of individuals").unwrap()
    }

    fn three_attribute_model() -> PopulationModel {
        let frame = df! [
            "A" => ["a", "a", "a", "a", "b", "b", "b", "b"],
            "B" => ["x", "x", "y", "y", "x", "x", "y", "y"],
            "C" => ["u", "v", "u", "v", "u", "v", "u", "v"],
            "ind" => [0.2, 0.5, 0.4, 0.9, 0.6, 0.1, 0.8, 0.3],
            "n" => [10i64, 30, 25, 5, 20, 15, 40, 12]
        ]
        .unwrap();
        PopulationModel::from_frame(frame, "ind", "n").unwrap()
    }

    #[test]
    fn test_two_attribute_scenario() {
        let model = two_attribute_model();
        let attributes = names(&["Attribute 1", "Attribute 2"]);
        let result = compute_decomposition(chi, 0.4, &model, &attributes).unwrap();

        let expected = [
            ("[[Attribute 1, Attribute 2]]", 0.0817537242169595, 0.0),
            ("[[Attribute 2]]", 0.014610389610389631, 0.046510153683329),
            ("[[Attribute 1]]", 0.061120543293718174, 0.0),
            ("[[Attribute 1], [Attribute 2]]", 0.061120543293718174, 0.020633180923241),
            ("[[]]", 0.0, 0.01461038961039),
        ];
        assert_eq!(result.records.len(), expected.len());
        for (record, (label, cumulative, partial)) in result.records.iter().zip(expected) {
            assert_eq!(record.label, label);
            assert!((record.cumulative - cumulative).abs() < 1e-14, "{}", label);
            assert!((record.partial - partial).abs() < 1e-14, "{}", label);
        }
        assert!((result.partial_sum() - 0.0817537242169595).abs() < 1e-12);
    }

    #[test]
    fn test_three_attribute_additivity() {
        let model = three_attribute_model();
        let result = compute_decomposition(chi, 0.4, &model, &names(&["A", "B", "C"])).unwrap();
        assert_eq!(result.records.len(), 19);

        let top = result.top().unwrap();
        assert_eq!(top.label, "[[A, B, C]]");
        assert!((top.cumulative - 0.09331009868637928).abs() < 1e-14);
        assert!((result.partial_sum() - top.cumulative).abs() < 1e-10);

        let by_label: HashMap<&str, &DecompositionRecord> =
            result.records.iter().map(|r| (r.label.as_str(), r)).collect();
        let single = by_label["[[A]]"];
        assert!((single.cumulative - 0.00449923421623851).abs() < 1e-14);
        assert!((single.partial - 0.007954183508087).abs() < 1e-14);
        let pair = by_label["[[A, B], [B, C]]"];
        assert!((pair.cumulative - 0.022088815400658574).abs() < 1e-14);
        assert!((pair.partial - 0.049459146807732).abs() < 1e-14);
        assert!((by_label["[[]]"].partial - 0.004499234216239).abs() < 1e-14);
    }

    #[test]
    fn test_additivity_for_other_generators() {
        let model = three_attribute_model();
        let attributes = names(&["A", "B", "C"]);
        let generators: [fn(f64) -> f64; 2] = [
            |x| if x == 0.0 { 0.0 } else { x * x.ln() },
            |x| (x.sqrt() - 1.0).powi(2),
        ];
        for generator in generators {
            for p in [0.1, 0.5, 1.0] {
                let result = compute_decomposition(generator, p, &model, &attributes).unwrap();
                let top = result.top().unwrap().cumulative;
                assert!((result.partial_sum() - top).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_cumulative_cache_is_used() {
        let model = two_attribute_model();
        let result =
            compute_decomposition(chi, 0.4, &model, &names(&["Attribute 1", "Attribute 2"]))
                .unwrap();
        assert_eq!(result.stats.atoms, 5);
        assert!(result.stats.cache_hits > 0);
        // one distribution per subset: {}, {1}, {2}, {1, 2}
        assert_eq!(result.stats.distributions_extracted, 4);
        assert!(result.stats.cumulative_evaluations <= 5);
    }

    #[test]
    fn test_cache_key_ignores_member_order() {
        let model = two_attribute_model();
        let attributes = names(&["Attribute 1", "Attribute 2"]);
        let mut engine = DecompositionEngine::new(&model, chi, 0.4, &attributes).unwrap();
        let first = AttributeSet::singleton(0);
        let second = AttributeSet::singleton(1);
        let a = engine.cumulative(&Atom::new([first, second])).unwrap();
        let b = engine.cumulative(&Atom::new([second, first, second])).unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.stats().cumulative_evaluations, 1);
        assert_eq!(engine.stats().cache_hits, 1);
    }

    #[test]
    fn test_empty_attribute_list() {
        let model = two_attribute_model();
        let result = compute_decomposition(chi, 0.4, &model, &[]).unwrap();
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.label, "[[]]");
        assert_eq!(record.cumulative, 0.0);
        assert_eq!(record.partial, record.cumulative);
    }

    #[test]
    fn test_duplicate_attributes_are_ignored() {
        let model = two_attribute_model();
        let once = compute_decomposition(chi, 0.4, &model, &names(&["Attribute 1", "Attribute 2"]))
            .unwrap();
        let twice = compute_decomposition(
            chi,
            0.4,
            &model,
            &names(&["Attribute 1", "Attribute 2", "Attribute 1"]),
        )
        .unwrap();
        assert_eq!(once.records, twice.records);
    }

    #[test]
    fn test_invalid_p_fails_before_reading_data() {
        struct Unreachable;
        impl AggregateSource for Unreachable {
            fn grouped_aggregates(
                &self,
                _attributes: &[String],
            ) -> Result<Vec<crate::ingestion::GroupAggregate>> {
                panic!("data must not be read");
            }
        }
        let err = compute_decomposition(chi, 1.2, &Unreachable, &names(&["A"])).unwrap_err();
        assert!(matches!(err, DecompositionError::InvalidMixingParameter(_)));
    }

    #[test]
    fn test_zero_p_is_substituted() {
        let model = two_attribute_model();
        let attributes = names(&["Attribute 1", "Attribute 2"]);
        let engine = DecompositionEngine::new(&model, chi, 0.0, &attributes).unwrap();
        assert_eq!(engine.p(), ZERO_P_SUBSTITUTE);
        let result = engine.run().unwrap();
        assert_eq!(result.effective_p, ZERO_P_SUBSTITUTE);
        assert!(result.records.iter().all(|r| r.cumulative.is_finite()));
    }

    #[test]
    fn test_degenerate_indicator() {
        let frame = df! [
            "A" => ["a", "b"],
            "ind" => [0.0, 0.0],
            "n" => [3i64, 4]
        ]
        .unwrap();
        let model = PopulationModel::from_frame(frame, "ind", "n").unwrap();
        let err = compute_decomposition(chi, 0.4, &model, &names(&["A"])).unwrap_err();
        assert!(matches!(err, DecompositionError::DegenerateIndicator { .. }));
    }

    #[test]
    fn test_round_partial() {
        assert_eq!(round_partial(-1e-17, 15).to_bits(), 0.0f64.to_bits());
        assert!((round_partial(0.1234567890123456789, 15) - 0.123456789012346).abs() < 1e-16);
        assert_eq!(round_partial(0.25, 400), 0.25);
        assert_eq!(round_partial(0.25, -400), 0.25);
    }

    #[test]
    fn test_oversized_precision_keeps_partials_finite() {
        let model = two_attribute_model();
        let attributes = names(&["Attribute 1", "Attribute 2"]);
        let result = DecompositionEngine::new(&model, chi, 0.4, &attributes)
            .unwrap()
            .with_partial_precision(400)
            .run()
            .unwrap();
        assert!(result.records.iter().all(|r| r.partial.is_finite()));
        assert!((result.partial_sum() - 0.0817537242169595).abs() < 1e-12);
        assert_eq!(result.effective_p, 0.4);
    }
}
