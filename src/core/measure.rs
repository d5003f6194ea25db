//! f-Inequality Measure
//!
//! The generalized f-divergence between the population-share and the
//! indicator-share channel of a distribution, with the channels mixed by a
//! weight p.

use crate::core::distribution::Distribution;
use crate::error::{DecompositionError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Value used in place of p = 0, where f's argument divides by zero
pub const ZERO_P_SUBSTITUTE: f64 = 1e-20;

/// Validate the mixing parameter, substituting a near-zero value for p = 0
pub fn mixing_parameter(p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(DecompositionError::InvalidMixingParameter(p));
    }
    if p == 0.0 {
        warn!(
            "Substituted p=0 with p={:e}. The use of p=0 may require simplifying r(f,p) for the specific f to avoid a division by zero.",
            ZERO_P_SUBSTITUTE
        );
        return Ok(ZERO_P_SUBSTITUTE);
    }
    Ok(p)
}

/// f-inequality of a distribution.
///
/// Sums `m * f(x / m)` with `m = p*x + (1-p)*y` over every pair `(x, y)`
/// except the exact pair `(0, 0)`.
pub fn fineq<F>(f: &F, p: f64, distribution: &Distribution) -> f64
where
    F: Fn(f64) -> f64 + ?Sized,
{
    distribution
        .pairs()
        .iter()
        .filter(|pair| !(pair.population == 0.0 && pair.indicator == 0.0))
        .map(|pair| {
            let mixed = p * pair.population + (1.0 - p) * pair.indicator;
            mixed * f(pair.population / mixed)
        })
        .sum()
}

/// Named convex generators with f(1) = 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FGenerator {
    /// f(x) = (x - 1)^2
    PearsonChiSquared,

    /// f(x) = x ln x
    KullbackLeibler,

    /// f(x) = -ln x
    ReverseKullbackLeibler,

    /// f(x) = (sqrt(x) - 1)^2
    SquaredHellinger,

    /// f(x) = |x - 1| / 2
    TotalVariation,

    /// f(x) = (x^(1-alpha) - x) / (alpha (alpha - 1)); the generalized
    /// entropy index GE(alpha) when used with p -> 0
    GeneralizedEntropy { alpha: f64 },
}

impl FGenerator {
    pub fn evaluate(&self, x: f64) -> f64 {
        match *self {
            FGenerator::PearsonChiSquared => (x - 1.0).powi(2),
            FGenerator::KullbackLeibler => {
                if x == 0.0 {
                    0.0
                } else {
                    x * x.ln()
                }
            }
            FGenerator::ReverseKullbackLeibler => -x.ln(),
            FGenerator::SquaredHellinger => (x.sqrt() - 1.0).powi(2),
            FGenerator::TotalVariation => (x - 1.0).abs() / 2.0,
            FGenerator::GeneralizedEntropy { alpha } => {
                (x.powf(1.0 - alpha) - x) / (alpha * (alpha - 1.0))
            }
        }
    }

    /// Parse a generator name as accepted on the command line
    pub fn parse(name: &str, alpha: Option<f64>) -> Result<Self> {
        let generator = match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "chi-squared" | "pearson" | "pearson-chi-squared" => FGenerator::PearsonChiSquared,
            "kl" | "kullback-leibler" => FGenerator::KullbackLeibler,
            "reverse-kl" | "reverse-kullback-leibler" => FGenerator::ReverseKullbackLeibler,
            "hellinger" | "squared-hellinger" => FGenerator::SquaredHellinger,
            "tv" | "total-variation" => FGenerator::TotalVariation,
            "ge" | "generalized-entropy" => FGenerator::GeneralizedEntropy {
                alpha: alpha.ok_or_else(|| {
                    DecompositionError::Config("generalized entropy needs an alpha".to_string())
                })?,
            },
            other => return Err(DecompositionError::UnknownGenerator(other.to_string())),
        };
        generator.validate()?;
        Ok(generator)
    }

    /// Same generator with a new alpha; generators without one are unchanged
    pub fn with_alpha(self, alpha: f64) -> Self {
        match self {
            FGenerator::GeneralizedEntropy { .. } => FGenerator::GeneralizedEntropy { alpha },
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let FGenerator::GeneralizedEntropy { alpha } = *self {
            if alpha == 0.0 || alpha == 1.0 || !alpha.is_finite() {
                return Err(DecompositionError::Config(format!(
                    "generalized entropy alpha must be finite and differ from 0 and 1, got {}",
                    alpha
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> String {
        match self {
            FGenerator::PearsonChiSquared => "chi-squared".to_string(),
            FGenerator::KullbackLeibler => "kullback-leibler".to_string(),
            FGenerator::ReverseKullbackLeibler => "reverse-kullback-leibler".to_string(),
            FGenerator::SquaredHellinger => "squared-hellinger".to_string(),
            FGenerator::TotalVariation => "total-variation".to_string(),
            FGenerator::GeneralizedEntropy { alpha } => format!("generalized-entropy({})", alpha),
        }
    }
}
