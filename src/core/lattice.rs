//! Attribute Lattice
//!
//! Atoms are antichains of attribute subsets. Subsets are encoded as bitmasks
//! over attribute positions so that atoms stay compact and hashable; the
//! canonical (sorted, deduplicated) member list of an atom doubles as its
//! memoization key.

use crate::error::{DecompositionError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of attributes a bitmask can address
pub const MAX_ATTRIBUTE_BITS: usize = 63;

/// A subset of the attribute positions of a lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttributeSet(u64);

impl AttributeSet {
    pub const EMPTY: AttributeSet = AttributeSet(0);

    pub fn from_bits(bits: u64) -> Self {
        AttributeSet(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Set containing the first `count` positions
    pub fn full(count: usize) -> Self {
        if count >= 64 {
            AttributeSet(u64::MAX)
        } else {
            AttributeSet((1u64 << count) - 1)
        }
    }

    pub fn singleton(position: usize) -> Self {
        AttributeSet(1u64 << position)
    }

    pub fn from_positions<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        positions
            .into_iter()
            .fold(AttributeSet::EMPTY, |set, position| set.with(position))
    }

    pub fn with(self, position: usize) -> Self {
        AttributeSet(self.0 | (1u64 << position))
    }

    pub fn contains(self, position: usize) -> bool {
        position < 64 && self.0 & (1u64 << position) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Positions in ascending order
    pub fn positions(self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..64).filter(move |position| bits & (1u64 << position) != 0)
    }

    pub fn is_subset(self, other: AttributeSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_proper_subset(self, other: AttributeSet) -> bool {
        self != other && self.is_subset(other)
    }

    pub fn is_proper_superset(self, other: AttributeSet) -> bool {
        other.is_proper_subset(self)
    }

    pub fn union(self, other: AttributeSet) -> Self {
        AttributeSet(self.0 | other.0)
    }

    pub fn difference(self, other: AttributeSet) -> Self {
        AttributeSet(self.0 & !other.0)
    }
}

/// Power-set order: by size, then lexicographically by position.
impl Ord for AttributeSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.positions().cmp(other.positions()))
    }
}

impl PartialOrd for AttributeSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A collection of distinct attribute subsets, kept in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Atom {
    members: Vec<AttributeSet>,
}

impl Atom {
    /// Build an atom from any member list. Order and duplicates are
    /// irrelevant: two constructions of the same family compare equal.
    pub fn new<I: IntoIterator<Item = AttributeSet>>(members: I) -> Self {
        let mut members: Vec<AttributeSet> = members.into_iter().collect();
        members.sort();
        members.dedup();
        Atom { members }
    }

    pub fn members(&self) -> &[AttributeSet] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, set: AttributeSet) -> bool {
        self.members.binary_search(&set).is_ok()
    }

    /// True when no member is a proper subset of another
    pub fn is_antichain(&self) -> bool {
        self.members.iter().all(|a| {
            self.members.iter().all(|b| !a.is_proper_subset(*b))
        })
    }
}

/// Every sub-collection of `items`, smallest first, each in input order
pub fn power_set<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    items.iter().cloned().powerset().collect()
}

/// Keep the candidates that are not dominated by any other candidate.
///
/// With `is_proper_subset` this keeps the maximal elements, with
/// `is_proper_superset` the minimal ones. Equal candidates never dominate
/// each other, so duplicates survive and are removed by `Atom::new`.
pub fn reduce_atom<F>(dominated: F, candidates: &[AttributeSet]) -> Vec<AttributeSet>
where
    F: Fn(AttributeSet, AttributeSet) -> bool,
{
    candidates
        .iter()
        .copied()
        .filter(|&a| !candidates.iter().any(|&b| dominated(a, b)))
        .collect()
}

/// The lattice of atoms over a fixed, deduplicated attribute list
#[derive(Debug, Clone)]
pub struct AttributeLattice {
    attributes: Vec<String>,
    full: AttributeSet,
}

impl AttributeLattice {
    /// Create a lattice; duplicate attribute names keep their first position.
    pub fn new(attributes: &[String]) -> Result<Self> {
        let attributes: Vec<String> = attributes.iter().unique().cloned().collect();
        if attributes.len() > MAX_ATTRIBUTE_BITS {
            return Err(DecompositionError::TooManyAttributes {
                count: attributes.len(),
                limit: MAX_ATTRIBUTE_BITS,
            });
        }
        let full = AttributeSet::full(attributes.len());
        Ok(Self { attributes, full })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn full_set(&self) -> AttributeSet {
        self.full
    }

    /// The singleton atom holding the full attribute set
    pub fn top(&self) -> Atom {
        Atom::new([self.full])
    }

    /// The singleton atom holding the empty attribute set
    pub fn bottom(&self) -> Atom {
        Atom::new([AttributeSet::EMPTY])
    }

    /// Every attribute subset, empty and full set included, in power-set order
    pub fn subsets(&self) -> Vec<AttributeSet> {
        let positions: Vec<usize> = (0..self.attributes.len()).collect();
        power_set(&positions)
            .into_iter()
            .map(AttributeSet::from_positions)
            .collect()
    }

    /// Replace every member by its complement within the attribute set
    pub fn complement(&self, atom: &Atom) -> Atom {
        Atom::new(atom.members().iter().map(|m| self.full.difference(*m)))
    }

    /// Minimal subsets that pick one attribute from every complemented
    /// member. Equivalently the minimal subsets of the attribute set that are
    /// contained in no member of `atom`.
    pub fn dual(&self, atom: &Atom) -> Atom {
        // Cartesian product of the complements, deduplicated per factor.
        let transversals = atom
            .members()
            .iter()
            .map(|m| self.full.difference(*m))
            .fold(vec![AttributeSet::EMPTY], |partial, factor| {
                partial
                    .iter()
                    .flat_map(|chosen| factor.positions().map(move |p| chosen.with(p)))
                    .unique()
                    .collect()
            });

        Atom::new(reduce_atom(
            |a, b| a.is_proper_superset(b),
            &transversals,
        ))
    }

    /// Enumerate every non-empty antichain of attribute subsets.
    ///
    /// Candidates are taken from the back of the power set. Each step keeps
    /// every family built so far and appends the compatible families extended
    /// by the candidate, so incompatible extensions are pruned immediately.
    pub fn enumerate_atoms(&self) -> Vec<Atom> {
        let candidates = self.subsets();
        let mut families: Vec<Vec<AttributeSet>> = vec![Vec::new()];

        for &candidate in candidates.iter().rev() {
            let extended: Vec<Vec<AttributeSet>> = families
                .iter()
                .filter(|family| {
                    family.iter().all(|&member| {
                        !member.is_proper_subset(candidate) && !candidate.is_proper_subset(member)
                    })
                })
                .map(|family| {
                    let mut next = Vec::with_capacity(family.len() + 1);
                    next.push(candidate);
                    next.extend_from_slice(family);
                    next
                })
                .collect();
            families.extend(extended);
        }

        families
            .into_iter()
            .filter(|family| !family.is_empty())
            .map(Atom::new)
            .collect()
    }

    /// Attribute names of a subset, in attribute order
    pub fn names(&self, set: AttributeSet) -> Vec<String> {
        set.positions()
            .filter_map(|position| self.attributes.get(position).cloned())
            .collect()
    }

    /// Attribute names of every member of an atom
    pub fn member_names(&self, atom: &Atom) -> Vec<Vec<String>> {
        atom.members().iter().map(|m| self.names(*m)).collect()
    }

    /// Human readable atom label, e.g. `[[Region], [Age, Sex]]`
    pub fn label(&self, atom: &Atom) -> String {
        let members = atom
            .members()
            .iter()
            .map(|m| format!("[{}]", self.names(*m).join(", ")))
            .join(", ");
        format!("[{}]", members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(names: &[&str]) -> AttributeLattice {
        let attributes: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        AttributeLattice::new(&attributes).unwrap()
    }

    fn set(positions: &[usize]) -> AttributeSet {
        AttributeSet::from_positions(positions.iter().copied())
    }

    /// Maximal subsets containing no member of `dual`
    fn undual(lattice: &AttributeLattice, dual: &Atom) -> Atom {
        let free: Vec<AttributeSet> = lattice
            .subsets()
            .into_iter()
            .filter(|s| dual.members().iter().all(|d| !d.is_subset(*s)))
            .collect();
        Atom::new(reduce_atom(|a, b| a.is_proper_subset(b), &free))
    }

    #[test]
    fn test_power_set_order() {
        let subsets = lattice(&["a", "b", "c"]).subsets();
        assert_eq!(subsets.len(), 8);
        assert_eq!(subsets[0], AttributeSet::EMPTY);
        assert_eq!(subsets[1], set(&[0]));
        assert_eq!(subsets[4], set(&[0, 1]));
        assert_eq!(subsets[7], set(&[0, 1, 2]));
        let mut sorted = subsets.clone();
        sorted.sort();
        assert_eq!(sorted, subsets);
    }

    #[test]
    fn test_atom_is_canonical() {
        let a = Atom::new([set(&[1]), set(&[0]), set(&[1])]);
        let b = Atom::new([set(&[0]), set(&[1])]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_reduce_atom() {
        let candidates = [set(&[0]), set(&[0, 1]), set(&[2])];
        let maximal = reduce_atom(|a, b| a.is_proper_subset(b), &candidates);
        assert_eq!(maximal, vec![set(&[0, 1]), set(&[2])]);
        let minimal = reduce_atom(|a, b| a.is_proper_superset(b), &candidates);
        assert_eq!(minimal, vec![set(&[0]), set(&[2])]);
    }

    #[test]
    fn test_enumeration_counts() {
        // Dedekind numbers minus the empty family
        assert_eq!(lattice(&[]).enumerate_atoms().len(), 1);
        assert_eq!(lattice(&["a"]).enumerate_atoms().len(), 2);
        assert_eq!(lattice(&["a", "b"]).enumerate_atoms().len(), 5);
        assert_eq!(lattice(&["a", "b", "c"]).enumerate_atoms().len(), 19);
        assert_eq!(lattice(&["a", "b", "c", "d"]).enumerate_atoms().len(), 167);
    }

    #[test]
    fn test_enumeration_order_two_attributes() {
        let lattice = lattice(&["a", "b"]);
        let labels: Vec<String> = lattice
            .enumerate_atoms()
            .iter()
            .map(|atom| lattice.label(atom))
            .collect();
        assert_eq!(labels, vec!["[[a, b]]", "[[b]]", "[[a]]", "[[a], [b]]", "[[]]"]);
    }

    #[test]
    fn test_enumerated_atoms_are_antichains() {
        let lattice = lattice(&["a", "b", "c", "d"]);
        let atoms = lattice.enumerate_atoms();
        assert!(atoms.iter().all(Atom::is_antichain));
        let unique: std::collections::HashSet<&Atom> = atoms.iter().collect();
        assert_eq!(unique.len(), atoms.len());
        assert_eq!(atoms[0], lattice.top());
        assert_eq!(atoms[atoms.len() - 1], lattice.bottom());
    }

    #[test]
    fn test_complement() {
        let lattice = lattice(&["a", "b", "c"]);
        let atom = Atom::new([set(&[0]), set(&[1, 2])]);
        assert_eq!(lattice.complement(&atom), Atom::new([set(&[1, 2]), set(&[0])]));
        assert_eq!(lattice.complement(&lattice.top()), lattice.bottom());
    }

    #[test]
    fn test_dual_examples() {
        let lattice = lattice(&["a", "b"]);
        let singletons = Atom::new([set(&[0]), set(&[1])]);
        assert_eq!(lattice.dual(&lattice.bottom()), singletons);
        assert_eq!(lattice.dual(&singletons), lattice.top());
        assert!(lattice.dual(&lattice.top()).is_empty());
        assert_eq!(lattice.dual(&Atom::new([set(&[0])])), Atom::new([set(&[1])]));
    }

    #[test]
    fn test_dual_is_minimal_uncovered_family() {
        let lattice = lattice(&["a", "b", "c"]);
        for atom in lattice.enumerate_atoms() {
            let dual = lattice.dual(&atom);
            assert!(dual.is_antichain());
            for member in dual.members() {
                assert!(atom.members().iter().all(|m| !member.is_subset(*m)));
            }
            assert_eq!(undual(&lattice, &dual), atom, "atom {}", lattice.label(&atom));
        }
    }

    #[test]
    fn test_duplicate_attributes_are_dropped() {
        let lattice = lattice(&["a", "b", "a"]);
        assert_eq!(lattice.attributes(), &["a".to_string(), "b".to_string()]);
        assert_eq!(lattice.full_set(), set(&[0, 1]));
    }

    #[test]
    fn test_too_many_attributes() {
        let attributes: Vec<String> = (0..64).map(|i| format!("a{}", i)).collect();
        assert!(matches!(
            AttributeLattice::new(&attributes),
            Err(DecompositionError::TooManyAttributes { count: 64, .. })
        ));
    }
}
