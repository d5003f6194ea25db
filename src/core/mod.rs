//! Core Decomposition Modules
//!
//! This module contains the foundational components of the decomposition:
//! - Distributions extracted from grouped aggregates
//! - The zonogon join of distributions
//! - The lattice of attribute-subset atoms
//! - The f-inequality measure and the decomposition engine

pub mod decomposition;
pub mod distribution;
pub mod lattice;
pub mod measure;
pub mod zonogon;

pub use decomposition::{
    compute_decomposition, Decomposition, DecompositionEngine, DecompositionRecord, RunStats,
};
pub use distribution::{Distribution, SharePair};
pub use lattice::{Atom, AttributeLattice, AttributeSet};
pub use measure::{fineq, FGenerator};
pub use zonogon::{join, join_all};
