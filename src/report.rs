//! Decomposition Report
//!
//! Presentation of a finished decomposition: a plain-text table, a JSON
//! document with run metadata, and the Atkinson transform of the values.

use crate::core::decomposition::{Decomposition, DecompositionRecord, RunStats};
use crate::error::{DecompositionError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Decomposition results with the settings that produced them
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionReport {
    pub generated_at: DateTime<Utc>,
    pub attributes: Vec<String>,

    /// Mixing parameter as configured
    pub p: f64,

    /// Mixing parameter the values were computed with
    pub effective_p: f64,

    pub generator: String,

    /// Set when the values are Atkinson transformed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atkinson_epsilon: Option<f64>,

    pub records: Vec<DecompositionRecord>,
    pub stats: RunStats,
}

impl DecompositionReport {
    pub fn new(
        attributes: Vec<String>,
        p: f64,
        generator: impl Into<String>,
        decomposition: Decomposition,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            attributes,
            p,
            effective_p: decomposition.effective_p,
            generator: generator.into(),
            atkinson_epsilon: None,
            records: decomposition.records,
            stats: decomposition.stats,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_table(&self) -> String {
        render_table(&self.records)
    }

    /// Copy of the report with cumulative and partial values Atkinson
    /// transformed. Transformed partials only add up under the transformed
    /// addition.
    pub fn atkinson(&self, epsilon: f64) -> Result<Self> {
        if epsilon == 1.0 || !epsilon.is_finite() {
            return Err(DecompositionError::Config(format!(
                "Atkinson epsilon must be finite and differ from 1, got {}",
                epsilon
            )));
        }

        let records = self
            .records
            .iter()
            .map(|record| DecompositionRecord {
                cumulative: atkinson_transform(epsilon, record.cumulative),
                partial: atkinson_transform(epsilon, record.partial),
                ..record.clone()
            })
            .collect();

        Ok(Self {
            atkinson_epsilon: Some(epsilon),
            records,
            ..self.clone()
        })
    }
}

/// t(v) = 1 - (e(e-1)v + 1)^(1/(1-e)); maps GE(e) values to Atkinson indices
pub fn atkinson_transform(epsilon: f64, value: f64) -> f64 {
    1.0 - (epsilon * (epsilon - 1.0) * value + 1.0).powf(1.0 / (1.0 - epsilon))
}

/// Table of `Atom, cumulative, partial` rows with centred atom labels
pub fn render_table(records: &[DecompositionRecord]) -> String {
    let width = records
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = format!("{:^width$}, cumulative, partial\n", "Atom", width = width);
    for record in records {
        out.push_str(&format!(
            "{:^width$},   {:.6}, {:.6}\n",
            record.label,
            record.cumulative,
            record.partial,
            width = width
        ));
    }
    out
}
