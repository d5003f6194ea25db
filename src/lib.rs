pub mod config;
pub mod core;
pub mod error;
pub mod ingestion;
pub mod report;

pub use crate::config::{DecompositionConfig, ModelSchema};
pub use crate::core::{
    compute_decomposition, Atom, AttributeLattice, Decomposition, DecompositionEngine,
    DecompositionRecord, Distribution, FGenerator, RunStats,
};
pub use crate::error::{DecompositionError, Result};
pub use crate::ingestion::{AggregateSource, GroupAggregate, PopulationModel};
pub use crate::report::DecompositionReport;
