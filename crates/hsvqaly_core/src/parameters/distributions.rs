//! Parametric distributions fitted from published mean and standard deviation

use rand::Rng;
use rand::distr::Distribution as _;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// A scalar model input, either fixed or sampled each PSA iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Distribution {
    Fixed { value: f64 },
    /// Beta fitted by the method of moments
    Beta { mean: f64, std_dev: f64 },
    /// LogNormal whose variable has the given mean and standard deviation
    LogNormal { mean: f64, std_dev: f64 },
    /// LogNormal given the parameters of the underlying normal
    LogNormalLog { mu: f64, sigma: f64 },
}

impl Distribution {
    #[must_use]
    pub const fn beta(mean: f64, std_dev: f64) -> Self {
        Distribution::Beta { mean, std_dev }
    }

    #[must_use]
    pub const fn log_normal(mean: f64, std_dev: f64) -> Self {
        Distribution::LogNormal { mean, std_dev }
    }

    /// Expected value of the distribution
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Fixed { value } => *value,
            Distribution::Beta { mean, .. } | Distribution::LogNormal { mean, .. } => *mean,
            Distribution::LogNormalLog { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, ParameterError> {
        match self {
            Distribution::Fixed { value } => Ok(*value),
            Distribution::Beta { mean, std_dev } => {
                let (alpha, beta) = beta_shape(*mean, *std_dev)?;
                rand_distr::Beta::new(alpha, beta)
                    .map(|d| d.sample(rng))
                    .map_err(|_| ParameterError::InvalidDistribution {
                        distribution: "Beta",
                        mean: *mean,
                        std_dev: *std_dev,
                        reason: "shape parameters must be positive and finite",
                    })
            }
            Distribution::LogNormal { mean, std_dev } => {
                let (mu, sigma) = log_normal_shape(*mean, *std_dev)?;
                rand_distr::LogNormal::new(mu, sigma)
                    .map(|d| d.sample(rng))
                    .map_err(|_| ParameterError::InvalidDistribution {
                        distribution: "LogNormal",
                        mean: *mean,
                        std_dev: *std_dev,
                        reason: "sigma must be non-negative and finite",
                    })
            }
            Distribution::LogNormalLog { mu, sigma } => rand_distr::LogNormal::new(*mu, *sigma)
                .map(|d| d.sample(rng))
                .map_err(|_| ParameterError::InvalidDistribution {
                    distribution: "LogNormal",
                    mean: *mu,
                    std_dev: *sigma,
                    reason: "sigma must be non-negative and finite",
                }),
        }
    }
}

/// Method-of-moments Beta shape parameters
pub fn beta_shape(mean: f64, std_dev: f64) -> Result<(f64, f64), ParameterError> {
    let invalid = |reason| ParameterError::InvalidDistribution {
        distribution: "Beta",
        mean,
        std_dev,
        reason,
    };
    if !(mean > 0.0 && mean < 1.0) {
        return Err(invalid("mean must be within (0, 1)"));
    }
    let variance = std_dev * std_dev;
    if !(variance > 0.0 && variance < mean * (1.0 - mean)) {
        return Err(invalid("variance must be positive and below mean * (1 - mean)"));
    }
    let k = mean * (1.0 - mean) / variance - 1.0;
    Ok((mean * k, (1.0 - mean) * k))
}

/// Parameters of the underlying normal for a LogNormal with the given moments
pub fn log_normal_shape(mean: f64, std_dev: f64) -> Result<(f64, f64), ParameterError> {
    if !(mean > 0.0 && std_dev >= 0.0 && mean.is_finite() && std_dev.is_finite()) {
        return Err(ParameterError::InvalidDistribution {
            distribution: "LogNormal",
            mean,
            std_dev,
            reason: "mean must be positive and std_dev non-negative",
        });
    }
    let sigma_sq = (1.0 + (std_dev * std_dev) / (mean * mean)).ln();
    Ok((mean.ln() - sigma_sq / 2.0, sigma_sq.sqrt()))
}

/// Dirichlet over outcome probabilities with concentration `n * p_i`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletDistribution {
    /// Effective sample size the probabilities were observed over
    pub n: f64,
    pub probabilities: Vec<f64>,
}

impl DirichletDistribution {
    #[must_use]
    pub fn new(n: f64, probabilities: Vec<f64>) -> Self {
        Self { n, probabilities }
    }

    /// Draw a probability vector summing to one.
    ///
    /// Implemented as normalised independent Gamma(α_i, 1) draws.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>, ParameterError> {
        let invalid = |reason| ParameterError::InvalidDistribution {
            distribution: "Dirichlet",
            mean: self.n,
            std_dev: 0.0,
            reason,
        };
        if self.probabilities.is_empty() {
            return Err(invalid("at least one category is required"));
        }

        let mut draws = Vec::with_capacity(self.probabilities.len());
        for p in &self.probabilities {
            let alpha = self.n * p;
            let gamma = rand_distr::Gamma::new(alpha, 1.0)
                .map_err(|_| invalid("concentration n * p must be positive and finite"))?;
            draws.push(gamma.sample(rng));
        }

        let total: f64 = draws.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(invalid("degenerate sample"));
        }
        Ok(draws.into_iter().map(|d| d / total).collect())
    }
}
