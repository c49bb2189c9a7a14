//! Utility correlation induction
//!
//! Independently sampled disutilities of mutually exclusive health states can
//! contradict an assumed preference order within a single PSA iteration (a
//! "mild" state drawing a larger disutility than "severe"). This module
//! reorders each column's samples across iterations so that the order holds in
//! all but a bounded fraction of rows, leaving every column's marginal
//! distribution untouched.
//!
//! The procedure is rank-correlation induction (Iman-Conover): a standard
//! normal reference matrix is given the target correlation through its
//! Cholesky factor, and each column of the input is re-sorted into the rank
//! order of the matching reference column. Pairwise target correlations are
//! found by stepping down from 1 until the violation rate reaches the
//! tolerance, then the assembled matrix is repaired to positive definiteness.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ParameterError;

/// Eigenvalue floor used when repairing the target correlation matrix
pub const EIGENVALUE_FLOOR: f64 = 1e-4;

/// Signed pairwise order between health-state columns.
///
/// `+1` at `(j, k)` means samples of column `j` should be at least those of
/// column `k`, `-1` the reverse, `0` leaves the pair unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceOrder {
    states: usize,
    signs: Vec<i8>,
}

impl PreferenceOrder {
    /// No ordered pairs
    #[must_use]
    pub fn unordered(states: usize) -> Self {
        Self {
            states,
            signs: vec![0; states * states],
        }
    }

    /// Every column at least the one before it (e.g. mild < moderate < severe)
    #[must_use]
    pub fn increasing(states: usize) -> Self {
        let mut order = Self::unordered(states);
        for j in 1..states {
            for k in 0..j {
                order = order.at_least(j, k);
            }
        }
        order
    }

    /// Require column `higher` to be at least column `lower`
    #[must_use]
    pub fn at_least(mut self, higher: usize, lower: usize) -> Self {
        if higher < self.states && lower < self.states && higher != lower {
            self.signs[higher * self.states + lower] = 1;
            self.signs[lower * self.states + higher] = -1;
        }
        self
    }

    /// Build from a square signed matrix
    pub fn from_matrix(rows: &[Vec<i8>]) -> Result<Self, ParameterError> {
        let states = rows.len();
        let mut signs = Vec::with_capacity(states * states);
        for row in rows {
            if row.len() != states {
                return Err(ParameterError::ShapeMismatch {
                    name: "preference_order",
                    expected: (states, states),
                    found: (states, row.len()),
                });
            }
            signs.extend(row.iter().map(|s| s.signum()));
        }
        Ok(Self { states, signs })
    }

    #[must_use]
    pub fn states(&self) -> usize {
        self.states
    }

    #[must_use]
    pub fn sign(&self, j: usize, k: usize) -> i8 {
        self.signs[j * self.states + k]
    }
}

/// Search parameters for [`correlate_utilities`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    /// Tolerated fraction of rows violating a pairwise order
    pub epsilon: f64,
    /// Correlation decrement per search step
    pub delta: f64,
    /// Seed of the standard normal reference matrix
    pub seed: u64,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            epsilon: 0.05,
            delta: 0.01,
            seed: 0,
        }
    }
}

/// A state pair for which no searched correlation met the violation tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    pub states: (usize, usize),
    /// Violation rate of the first (highest) candidate correlation
    pub violation_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedUtilities {
    /// Column-wise permutation of the input samples
    pub matrix: DMatrix<f64>,
    /// Repaired target correlation matrix that was induced
    pub target: DMatrix<f64>,
    pub warnings: Vec<ConvergenceWarning>,
}

/// Reorder each column of `samples` into the rank order of `reference`
/// after giving `reference` the correlation structure of `target`.
///
/// The output holds exactly the same multiset of values per column.
pub fn induce_rank_correlation(
    samples: &DMatrix<f64>,
    reference: &DMatrix<f64>,
    target: &DMatrix<f64>,
) -> Result<DMatrix<f64>, ParameterError> {
    let (rows, cols) = samples.shape();
    if reference.shape() != (rows, cols) {
        return Err(ParameterError::ShapeMismatch {
            name: "reference",
            expected: (rows, cols),
            found: reference.shape(),
        });
    }
    if target.shape() != (cols, cols) {
        return Err(ParameterError::ShapeMismatch {
            name: "target_correlation",
            expected: (cols, cols),
            found: target.shape(),
        });
    }

    // target = L Lᵀ; scores = R Lᵀ has covariance target
    let lower = Cholesky::new(target.clone())
        .ok_or(ParameterError::NotPositiveDefinite)?
        .l();
    let scores = reference * lower.transpose();

    let mut induced = DMatrix::zeros(rows, cols);
    for c in 0..cols {
        let mut sorted: Vec<f64> = samples.column(c).iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let score = scores.column(c);
        let mut by_rank: Vec<usize> = (0..rows).collect();
        by_rank.sort_by(|&a, &b| score[a].total_cmp(&score[b]));

        for (rank, row) in by_rank.into_iter().enumerate() {
            induced[(row, c)] = sorted[rank];
        }
    }

    Ok(induced)
}

fn pair_violation_rate(matrix: &DMatrix<f64>, j: usize, k: usize, sign: i8) -> f64 {
    let rows = matrix.nrows();
    if rows == 0 {
        return 0.0;
    }
    let sign = f64::from(sign);
    let violations = (0..rows)
        .filter(|&r| sign * matrix[(r, j)] < sign * matrix[(r, k)])
        .count();
    violations as f64 / rows as f64
}

/// Fraction of rows violating at least one ordered pair
#[must_use]
pub fn violation_rate(matrix: &DMatrix<f64>, order: &PreferenceOrder) -> f64 {
    let rows = matrix.nrows();
    if rows == 0 {
        return 0.0;
    }
    let states = order.states().min(matrix.ncols());
    let violating = (0..rows)
        .filter(|&r| {
            (1..states).any(|j| {
                (0..j).any(|k| {
                    let sign = f64::from(order.sign(j, k));
                    sign * matrix[(r, j)] < sign * matrix[(r, k)]
                })
            })
        })
        .count();
    violating as f64 / rows as f64
}

/// Floor non-positive eigenvalues and rebuild `V diag(λ) Vᵀ`
fn repair_correlation(matrix: DMatrix<f64>) -> DMatrix<f64> {
    let eigen = SymmetricEigen::new(matrix);
    let floored = eigen
        .eigenvalues
        .map(|value| if value <= 0.0 { EIGENVALUE_FLOOR } else { value });
    &eigen.eigenvectors * DMatrix::from_diagonal(&floored) * eigen.eigenvectors.transpose()
}

fn validate_settings(settings: &CorrelationSettings) -> Result<(), ParameterError> {
    if !(settings.epsilon > 0.0 && settings.epsilon <= 1.0) {
        return Err(ParameterError::InvalidValue {
            name: "correlation.epsilon",
            value: settings.epsilon,
            reason: "must be within (0, 1]",
        });
    }
    if !(settings.delta > 0.0 && settings.delta <= 1.0) {
        return Err(ParameterError::InvalidValue {
            name: "correlation.delta",
            value: settings.delta,
            reason: "must be within (0, 1]",
        });
    }
    Ok(())
}

/// Reorder independently sampled utilities so `order` holds in all but about
/// `epsilon` of the rows.
///
/// For a pair whose very first candidate correlation already violates the
/// tolerance, the pair falls back to zero correlation and a
/// [`ConvergenceWarning`] is reported.
pub fn correlate_utilities(
    samples: &DMatrix<f64>,
    order: &PreferenceOrder,
    settings: &CorrelationSettings,
) -> Result<CorrelatedUtilities, ParameterError> {
    validate_settings(settings)?;
    let (rows, states) = samples.shape();
    if order.states() != states {
        return Err(ParameterError::ShapeMismatch {
            name: "preference_order",
            expected: (states, states),
            found: (order.states(), order.states()),
        });
    }

    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let reference = DMatrix::from_fn(rows, states, |_, _| {
        let z: f64 = StandardNormal.sample(&mut rng);
        z
    });

    let steps = (1.0 / settings.delta).floor() as usize;
    let mut target = DMatrix::<f64>::identity(states, states);
    let mut warnings = Vec::new();

    for j in 1..states {
        for k in 0..j {
            let sign = order.sign(j, k);
            if sign == 0 {
                continue;
            }

            let pair_samples = samples.select_columns(&[j, k]);
            let pair_reference = reference.select_columns(&[j, k]);

            let mut accepted = None;
            let mut first_violation = None;
            for step in 1..=steps {
                let rho = (1.0 - step as f64 * settings.delta).max(0.0);
                let pair_target = DMatrix::from_row_slice(2, 2, &[1.0, rho, rho, 1.0]);
                let induced = induce_rank_correlation(&pair_samples, &pair_reference, &pair_target)?;
                let violation = pair_violation_rate(&induced, 0, 1, sign);
                first_violation.get_or_insert(violation);

                if violation < settings.epsilon {
                    accepted = Some(rho);
                } else {
                    break;
                }
            }

            let rho = match accepted {
                Some(rho) => rho,
                None => {
                    let warning = ConvergenceWarning {
                        states: (j, k),
                        violation_rate: first_violation.unwrap_or(1.0),
                    };
                    warn!(
                        state_j = j,
                        state_k = k,
                        violation_rate = warning.violation_rate,
                        epsilon = settings.epsilon,
                        "no correlation met the violation tolerance, using 0"
                    );
                    warnings.push(warning);
                    0.0
                }
            };
            debug!(state_j = j, state_k = k, rho, "pairwise target correlation");

            target[(j, k)] = rho;
            target[(k, j)] = rho;
        }
    }

    let target = repair_correlation(target);
    let matrix = induce_rank_correlation(samples, &reference, &target)?;

    Ok(CorrelatedUtilities {
        matrix,
        target,
        warnings,
    })
}
