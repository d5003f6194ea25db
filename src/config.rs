//! Decomposition Configuration
//!
//! Run settings for one decomposition: where the population model lives,
//! which attributes to decompose over, the f-generator and mixing parameter.
//! Settings come from a JSON file, environment overrides and CLI flags, in
//! that order.

use crate::core::measure::FGenerator;
use crate::error::{DecompositionError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Most decimal digits an f64 partial can meaningfully be rounded to
pub const MAX_PARTIAL_PRECISION: i32 = 17;

/// Location and column layout of the population model CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSchema {
    /// Path to the model CSV
    pub path: PathBuf,

    /// Field delimiter (single ASCII character)
    pub delimiter: char,

    /// Column holding the indicator value
    pub indicator_column: String,

    /// Column holding the number of individuals
    pub count_column: String,
}

impl Default for ModelSchema {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model.csv"),
            delimiter: ',',
            indicator_column: "Indicator value".to_string(),
            count_column: "Number of individuals".to_string(),
        }
    }
}

impl ModelSchema {
    /// Delimiter as the byte the CSV reader expects
    pub fn separator(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(DecompositionError::Config(format!(
                "Delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )))
        }
    }
}

/// Decomposition run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Population model location
    pub model: ModelSchema,

    /// Attributes to decompose over
    pub attributes: Vec<String>,

    /// Mixing parameter between population and indicator shares (0 <= p <= 1)
    pub p: f64,

    /// Generator of the f-divergence
    pub generator: FGenerator,

    /// Upper bound on the number of attributes; the lattice grows
    /// doubly exponentially
    pub max_attributes: usize,

    /// Decimal digits partial contributions are rounded to
    pub partial_precision: i32,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            model: ModelSchema::default(),
            attributes: Vec::new(),
            p: 0.5,
            generator: FGenerator::PearsonChiSquared,
            max_attributes: 5,
            partial_precision: 15,
        }
    }
}

impl DecompositionConfig {
    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Apply `DECOMPOSE_P`, `DECOMPOSE_GENERATOR` and `DECOMPOSE_ALPHA`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name. An alpha without a
    /// generator name retunes a configured generalized entropy generator.
    pub fn apply_overrides<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DECOMPOSE_P") {
            self.p = value.trim().parse().map_err(|_| {
                DecompositionError::Config(format!("DECOMPOSE_P is not a number: {}", value))
            })?;
        }

        let alpha = match lookup("DECOMPOSE_ALPHA") {
            Some(value) => Some(value.trim().parse::<f64>().map_err(|_| {
                DecompositionError::Config(format!("DECOMPOSE_ALPHA is not a number: {}", value))
            })?),
            None => None,
        };

        match lookup("DECOMPOSE_GENERATOR") {
            Some(name) => self.generator = FGenerator::parse(&name, alpha)?,
            None => {
                if let Some(alpha) = alpha {
                    self.generator = self.generator.with_alpha(alpha);
                }
            }
        }

        Ok(())
    }

    /// Attribute list with duplicates removed, first occurrence kept
    pub fn deduplicated_attributes(&self) -> Vec<String> {
        self.attributes.iter().unique().cloned().collect()
    }

    /// Check the run preconditions before any data is read
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.p) {
            return Err(DecompositionError::InvalidMixingParameter(self.p));
        }

        let count = self.deduplicated_attributes().len();
        if count > self.max_attributes {
            return Err(DecompositionError::TooManyAttributes {
                count,
                limit: self.max_attributes,
            });
        }

        if !(0..=MAX_PARTIAL_PRECISION).contains(&self.partial_precision) {
            return Err(DecompositionError::Config(format!(
                "partial_precision must lie in [0, {}], got {}",
                MAX_PARTIAL_PRECISION, self.partial_precision
            )));
        }

        self.model.separator()?;
        self.generator.validate()?;
        Ok(())
    }
}
