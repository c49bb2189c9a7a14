use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::life_table::age_adjusted_disutility;

use super::distributions::Distribution;

/// Inputs shared by the HSV-1 and HSV-2 models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonParameters {
    /// Probability a symptomatic primary infection is diagnosed
    pub diagnosis: Distribution,
    pub primary_treated_duration: Distribution,
    pub primary_untreated_duration: Distribution,
    pub urinary_retention_duration: Distribution,
    pub aseptic_meningitis_duration: Distribution,
    /// Psychosocial disutility of a diagnosis
    pub diagnosis_disutility: Distribution,
    pub diagnosis_disutility_reduction: Distribution,
    /// Symptomatic outbreak disutility, drawn separately for each use
    pub outbreak_disutility: Distribution,
    pub aseptic_meningitis_disutility: Distribution,
    pub urinary_retention_disutility: Distribution,
}

impl Default for CommonParameters {
    fn default() -> Self {
        Self {
            diagnosis: Distribution::beta(0.89, 0.045),
            primary_treated_duration: Distribution::log_normal(12.0 / 365.0, 1.0 / 365.0),
            primary_untreated_duration: Distribution::log_normal(18.0 / 365.0, 2.65 / 365.0),
            urinary_retention_duration: Distribution::log_normal(5.0 / 365.0, 2.5 / 365.0),
            aseptic_meningitis_duration: Distribution::log_normal(8.0 / 365.0, 2.5 / 365.0),
            diagnosis_disutility: Distribution::beta(0.01, 0.0025),
            diagnosis_disutility_reduction: Distribution::beta(0.005, 0.00265),
            outbreak_disutility: Distribution::beta(0.15, 0.0375),
            aseptic_meningitis_disutility: Distribution::beta(0.05, 0.0125),
            urinary_retention_disutility: Distribution::beta(0.03, 0.01),
        }
    }
}

/// One PSA draw of [`CommonParameters`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonSample {
    pub diagnosis: f64,
    pub primary_treated_duration: f64,
    pub primary_untreated_duration: f64,
    pub urinary_retention_duration: f64,
    pub aseptic_meningitis_duration: f64,
    pub diagnosis_disutility: f64,
    pub diagnosis_disutility_reduction: f64,
    pub primary_untreated_disutility: f64,
    pub primary_treated_disutility: f64,
    pub recurrence_disutility: f64,
    pub aseptic_meningitis_disutility: f64,
    pub urinary_retention_disutility: f64,
}

impl CommonParameters {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CommonSample, ParameterError> {
        Ok(CommonSample {
            diagnosis: self.diagnosis.sample(rng)?,
            diagnosis_disutility: self.diagnosis_disutility.sample(rng)?,
            diagnosis_disutility_reduction: self.diagnosis_disutility_reduction.sample(rng)?,
            primary_untreated_disutility: self.outbreak_disutility.sample(rng)?,
            primary_treated_disutility: self.outbreak_disutility.sample(rng)?,
            recurrence_disutility: self.outbreak_disutility.sample(rng)?,
            primary_treated_duration: self.primary_treated_duration.sample(rng)?,
            primary_untreated_duration: self.primary_untreated_duration.sample(rng)?,
            urinary_retention_disutility: self.urinary_retention_disutility.sample(rng)?,
            urinary_retention_duration: self.urinary_retention_duration.sample(rng)?,
            aseptic_meningitis_disutility: self.aseptic_meningitis_disutility.sample(rng)?,
            aseptic_meningitis_duration: self.aseptic_meningitis_duration.sample(rng)?,
        })
    }
}

impl CommonSample {
    /// `[undiagnosed, diagnosed]`
    #[must_use]
    pub fn diagnosis_split(&self) -> Vec<f64> {
        vec![1.0 - self.diagnosis, self.diagnosis]
    }
}

/// One-off QALY losses of the primary episode, age-adjusted at infection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryLosses {
    /// Symptomatic, undiagnosed and untreated
    pub untreated: f64,
    /// Symptomatic, diagnosed and treated
    pub treated: f64,
    pub urinary_retention: f64,
    pub aseptic_meningitis: f64,
}

impl PrimaryLosses {
    #[must_use]
    pub fn at_age(common: &CommonSample, age: f64) -> Self {
        Self {
            untreated: age_adjusted_disutility(age, common.primary_untreated_disutility)
                * common.primary_untreated_duration,
            treated: age_adjusted_disutility(age, common.primary_treated_disutility)
                * common.primary_treated_duration,
            urinary_retention: age_adjusted_disutility(age, common.urinary_retention_disutility)
                * common.urinary_retention_duration,
            aseptic_meningitis: age_adjusted_disutility(age, common.aseptic_meningitis_disutility)
                * common.aseptic_meningitis_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_losses_are_age_adjusted() {
        let common = CommonSample {
            primary_treated_disutility: 0.15,
            primary_treated_duration: 12.0 / 365.0,
            ..Default::default()
        };
        let young = PrimaryLosses::at_age(&common, 21.0);
        let older = PrimaryLosses::at_age(&common, 42.0);
        assert!((young.treated - 0.922 * 0.15 * 12.0 / 365.0).abs() < 1e-15);
        assert!(older.treated < young.treated);
        assert_eq!(young.untreated, 0.0);
    }
}
