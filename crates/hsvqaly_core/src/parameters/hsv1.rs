//! HSV-1 genital infection inputs

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::recurrence::{RecurrenceDisutilities, RecurrenceRates};

use super::common::{CommonParameters, CommonSample};
use super::distributions::{DirichletDistribution, Distribution};
use super::incidence::{Hsv1Incidence, IncidenceSample};
use super::SexSpecific;

/// Adult US population the encephalitis rate is expressed over
pub const US_POPULATION: f64 = 327_115_193.0;

/// First- and second-year infrequent recurrence counts for one sex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv1RecurrenceParameters {
    pub first_year: Distribution,
    pub second_year: Distribution,
}

impl Hsv1RecurrenceParameters {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(f64, f64), ParameterError> {
        Ok((self.first_year.sample(rng)?, self.second_year.sample(rng)?))
    }
}

/// Late-life HSV-1 encephalitis inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncephalitisParameters {
    pub onset_age: f64,
    pub cases_per_million: Distribution,
    /// Share of encephalitis cases caused by HSV-1
    pub hsv1_share: Distribution,
    pub adult_share: Distribution,
    /// `[normal, mild, moderate, severe, death]`
    pub outcomes: DirichletDistribution,
    pub acute_disutility: Distribution,
    pub mild_disutility: Distribution,
    pub moderate_disutility: Distribution,
    pub severe_disutility: Distribution,
    /// Remaining life expectancy with severe sequelae
    pub severe_life_expectancy: Distribution,
}

impl Default for EncephalitisParameters {
    fn default() -> Self {
        Self {
            onset_age: 61.0,
            cases_per_million: Distribution::log_normal(3.0, 0.5),
            hsv1_share: Distribution::beta(0.9, 0.002),
            adult_share: Distribution::beta(0.915, 0.002),
            outcomes: DirichletDistribution::new(182.0, vec![0.187, 0.275, 0.231, 0.192, 0.115]),
            acute_disutility: Distribution::beta(0.13, 0.0255),
            mild_disutility: Distribution::beta(0.03, 0.0075),
            moderate_disutility: Distribution::beta(0.20, 0.04),
            severe_disutility: Distribution::beta(0.54, 0.0825),
            severe_life_expectancy: Distribution::log_normal(3.8, 1.25),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncephalitisSample {
    pub onset_age: f64,
    /// Probability an infected adult develops encephalitis at `onset_age`
    pub probability: f64,
    pub outcomes: Vec<f64>,
    pub acute_disutility: f64,
    pub mild_disutility: f64,
    pub moderate_disutility: f64,
    pub severe_disutility: f64,
    pub severe_life_expectancy: f64,
}

impl EncephalitisParameters {
    /// Draw encephalitis inputs; the risk is scaled by this iteration's genital cases
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        genital_cases: f64,
    ) -> Result<EncephalitisSample, ParameterError> {
        let cases = self.cases_per_million.sample(rng)? / 1_000_000.0;
        let hsv1_share = self.hsv1_share.sample(rng)?;
        let adult_share = self.adult_share.sample(rng)?;

        let probability = hsv1_share * adult_share * cases * US_POPULATION / genital_cases;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ParameterError::InvalidValue {
                name: "encephalitis_probability",
                value: probability,
                reason: "must be within [0, 1]",
            });
        }

        Ok(EncephalitisSample {
            onset_age: self.onset_age,
            probability,
            outcomes: self.outcomes.sample(rng)?,
            acute_disutility: self.acute_disutility.sample(rng)?,
            mild_disutility: self.mild_disutility.sample(rng)?,
            moderate_disutility: self.moderate_disutility.sample(rng)?,
            severe_disutility: self.severe_disutility.sample(rng)?,
            severe_life_expectancy: self.severe_life_expectancy.sample(rng)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv1Parameters {
    pub common: CommonParameters,
    pub incidence: Hsv1Incidence,
    pub recurrence: SexSpecific<Hsv1RecurrenceParameters>,
    pub annual_recurrence_reduction: Distribution,
    pub symptomatic_primary: Distribution,
    /// After a symptomatic primary: `[normal, aseptic meningitis, urinary retention]`
    pub primary_outcome: DirichletDistribution,
    pub infrequent_after_asymptomatic: Distribution,
    pub infrequent_after_symptomatic: Distribution,
    pub urinary_retention_per_recurrence: Distribution,
    pub recurrence_duration: Distribution,
    pub encephalitis: EncephalitisParameters,
}

impl Default for Hsv1Parameters {
    fn default() -> Self {
        Self {
            common: CommonParameters::default(),
            incidence: Hsv1Incidence::default(),
            recurrence: SexSpecific {
                male: Hsv1RecurrenceParameters {
                    first_year: Distribution::log_normal(1.14, 0.05),
                    second_year: Distribution::log_normal(1.0, 0.05),
                },
                female: Hsv1RecurrenceParameters {
                    first_year: Distribution::log_normal(2.62, 0.05),
                    second_year: Distribution::log_normal(2.29, 0.05),
                },
            },
            annual_recurrence_reduction: Distribution::log_normal(0.5, 0.025),
            symptomatic_primary: Distribution::beta(0.25, 0.075),
            primary_outcome: DirichletDistribution::new(100.0, vec![0.8575, 0.05, 0.0925]),
            infrequent_after_asymptomatic: Distribution::beta(0.3, 0.05),
            infrequent_after_symptomatic: Distribution::beta(0.57, 0.05),
            urinary_retention_per_recurrence: Distribution::beta(0.045, 0.0025),
            recurrence_duration: Distribution::log_normal(7.0 / 365.0, 2.15 / 365.0),
            encephalitis: EncephalitisParameters::default(),
        }
    }
}

/// One PSA draw of [`Hsv1Parameters`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv1Sample {
    pub common: CommonSample,
    pub incidence: IncidenceSample,
    pub annual_recurrence_reduction: f64,
    pub symptomatic_primary: f64,
    pub primary_outcome: Vec<f64>,
    pub infrequent_after_asymptomatic: f64,
    pub infrequent_after_symptomatic: f64,
    pub urinary_retention_per_recurrence: f64,
    pub recurrence_duration: f64,
    pub encephalitis: Option<EncephalitisSample>,
    /// Sampled `(first_year, second_year)` counts per sex
    pub recurrence: SexSpecific<(f64, f64)>,
}

impl Hsv1Parameters {
    /// Draw every input for one iteration.
    ///
    /// Shared inputs and incidence come first, then male and female
    /// recurrence rates, all from the same generator.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        include_encephalitis: bool,
    ) -> Result<Hsv1Sample, ParameterError> {
        let common = self.common.sample(rng)?;
        let incidence = self.incidence.sample(rng)?;
        let annual_recurrence_reduction = self.annual_recurrence_reduction.sample(rng)?;
        let symptomatic_primary = self.symptomatic_primary.sample(rng)?;
        let primary_outcome = self.primary_outcome.sample(rng)?;
        let infrequent_after_asymptomatic = self.infrequent_after_asymptomatic.sample(rng)?;
        let infrequent_after_symptomatic = self.infrequent_after_symptomatic.sample(rng)?;
        let urinary_retention_per_recurrence = self.urinary_retention_per_recurrence.sample(rng)?;
        let encephalitis = if include_encephalitis {
            Some(self.encephalitis.sample(rng, incidence.total_cases)?)
        } else {
            None
        };
        let recurrence_duration = self.recurrence_duration.sample(rng)?;

        let male = self.recurrence.male.sample(rng)?;
        let female = self.recurrence.female.sample(rng)?;

        Ok(Hsv1Sample {
            common,
            incidence,
            annual_recurrence_reduction,
            symptomatic_primary,
            primary_outcome,
            infrequent_after_asymptomatic,
            infrequent_after_symptomatic,
            urinary_retention_per_recurrence,
            recurrence_duration,
            encephalitis,
            recurrence: SexSpecific { male, female },
        })
    }
}

impl Hsv1Sample {
    /// `[symptomatic, asymptomatic]`
    #[must_use]
    pub fn primary_type(&self) -> Vec<f64> {
        vec![self.symptomatic_primary, 1.0 - self.symptomatic_primary]
    }

    /// `[no recurrence, infrequent]` after an asymptomatic primary
    #[must_use]
    pub fn recurrence_after_asymptomatic(&self) -> Vec<f64> {
        vec![
            1.0 - self.infrequent_after_asymptomatic,
            self.infrequent_after_asymptomatic,
        ]
    }

    /// `[no recurrence, infrequent]` after a symptomatic primary
    #[must_use]
    pub fn recurrence_after_symptomatic(&self) -> Vec<f64> {
        vec![
            1.0 - self.infrequent_after_symptomatic,
            self.infrequent_after_symptomatic,
        ]
    }

    #[must_use]
    pub fn recurrence_rates(&self, first_year: f64, second_year: f64) -> RecurrenceRates {
        RecurrenceRates {
            first_year,
            second_year,
            annual_reduction: self.annual_recurrence_reduction,
        }
    }

    #[must_use]
    pub fn recurrence_disutilities(&self) -> RecurrenceDisutilities {
        RecurrenceDisutilities {
            outbreak: self.common.recurrence_disutility,
            outbreak_duration: self.recurrence_duration,
            urinary_retention_probability: self.urinary_retention_per_recurrence,
            urinary_retention: self.common.urinary_retention_disutility,
            urinary_retention_duration: self.common.urinary_retention_duration,
            psychosocial: self.common.diagnosis_disutility,
            psychosocial_reduction: self.common.diagnosis_disutility_reduction,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn test_sample_is_deterministic_per_seed() {
        let params = Hsv1Parameters::default();
        let a = params.sample(&mut SmallRng::seed_from_u64(11), false).unwrap();
        let b = params.sample(&mut SmallRng::seed_from_u64(11), false).unwrap();
        assert_eq!(a, b);
        assert!(a.encephalitis.is_none());
    }

    #[test]
    fn test_encephalitis_probability_is_small() {
        let params = Hsv1Parameters::default();
        let sample = params.sample(&mut SmallRng::seed_from_u64(5), true).unwrap();
        let encephalitis = sample.encephalitis.unwrap();
        assert!(encephalitis.probability > 0.0 && encephalitis.probability < 0.1);
        assert_eq!(encephalitis.outcomes.len(), 5);
    }
}
