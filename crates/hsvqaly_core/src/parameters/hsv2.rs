//! HSV-2 genital infection inputs

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::recurrence::{RecurrenceDisutilities, RecurrenceRates, RecurrenceType, RecurrentMeningitis};

use super::SexSpecific;
use super::common::{CommonParameters, CommonSample};
use super::distributions::{DirichletDistribution, Distribution};
use super::incidence::{Hsv2Incidence, IncidenceSample};

/// Sex-specific HSV-2 inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsv2SexParameters {
    /// After a symptomatic primary: `[normal, aseptic meningitis, urinary retention]`
    pub primary_outcome: DirichletDistribution,
    pub urinary_retention_per_recurrence: Distribution,
    pub infrequent_first_year: Distribution,
    pub frequent_first_year: Distribution,
    pub frequent_cst_first_year: Distribution,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv2SexSample {
    pub primary_outcome: Vec<f64>,
    pub urinary_retention_per_recurrence: f64,
    pub infrequent_first_year: f64,
    pub frequent_first_year: f64,
    pub frequent_cst_first_year: f64,
}

impl Hsv2SexParameters {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Hsv2SexSample, ParameterError> {
        Ok(Hsv2SexSample {
            primary_outcome: self.primary_outcome.sample(rng)?,
            urinary_retention_per_recurrence: self.urinary_retention_per_recurrence.sample(rng)?,
            infrequent_first_year: self.infrequent_first_year.sample(rng)?,
            frequent_first_year: self.frequent_first_year.sample(rng)?,
            frequent_cst_first_year: self.frequent_cst_first_year.sample(rng)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv2Parameters {
    pub common: CommonParameters,
    pub incidence: Hsv2Incidence,
    pub annual_recurrence_reduction: Distribution,
    pub meningitis_episodes: Distribution,
    pub meningitis_years: Distribution,
    pub meningitis_duration: Distribution,
    pub meningitis_disutility: Distribution,
    pub symptomatic_primary: Distribution,
    pub infrequent_after_asymptomatic: Distribution,
    /// After a symptomatic primary: `[none, infrequent, frequent]`
    pub recurrence_after_symptomatic: DirichletDistribution,
    /// Share of frequent recurrers on chronic suppressive therapy
    pub suppressive_therapy: Distribution,
    /// Recurrent meningitis after aseptic meningitis at primary infection
    pub recurrent_meningitis: Distribution,
    pub recurrence_duration: Distribution,
    pub sex: SexSpecific<Hsv2SexParameters>,
}

impl Default for Hsv2Parameters {
    fn default() -> Self {
        Self {
            common: CommonParameters::default(),
            incidence: Hsv2Incidence::default(),
            annual_recurrence_reduction: Distribution::log_normal(0.5, 0.025),
            meningitis_episodes: Distribution::log_normal(4.6, 1.5),
            meningitis_years: Distribution::log_normal(8.4, 4.75),
            meningitis_duration: Distribution::log_normal(6.0 / 365.0, 2.75 / 365.0),
            meningitis_disutility: Distribution::beta(0.13, 0.0255),
            symptomatic_primary: Distribution::beta(0.17, 0.04),
            infrequent_after_asymptomatic: Distribution::beta(0.62, 0.05),
            recurrence_after_symptomatic: DirichletDistribution::new(203.0, vec![0.11, 0.51, 0.38]),
            suppressive_therapy: Distribution::beta(0.133, 0.004),
            recurrent_meningitis: Distribution::beta(0.3, 0.06),
            recurrence_duration: Distribution::log_normal(8.5 / 365.0, 1.75 / 365.0),
            sex: SexSpecific {
                male: Hsv2SexParameters {
                    primary_outcome: DirichletDistribution::new(100.0, vec![0.924, 0.016, 0.06]),
                    urinary_retention_per_recurrence: Distribution::beta(0.03, 0.015),
                    infrequent_first_year: Distribution::log_normal(3.09, 0.05),
                    frequent_first_year: Distribution::log_normal(9.76, 0.05),
                    frequent_cst_first_year: Distribution::log_normal(2.44, 0.05),
                },
                female: Hsv2SexParameters {
                    primary_outcome: DirichletDistribution::new(100.0, vec![0.811, 0.064, 0.125]),
                    urinary_retention_per_recurrence: Distribution::beta(0.06, 0.03),
                    infrequent_first_year: Distribution::log_normal(2.29, 0.05),
                    frequent_first_year: Distribution::log_normal(9.87, 0.05),
                    frequent_cst_first_year: Distribution::log_normal(2.47, 0.05),
                },
            },
        }
    }
}

/// One PSA draw of [`Hsv2Parameters`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsv2Sample {
    pub common: CommonSample,
    pub incidence: IncidenceSample,
    pub annual_recurrence_reduction: f64,
    pub symptomatic_primary: f64,
    pub infrequent_after_asymptomatic: f64,
    /// `[none, infrequent, frequent without CST, frequent with CST]`
    pub recurrence_after_symptomatic: Vec<f64>,
    pub recurrent_meningitis: f64,
    pub recurrence_duration: f64,
    pub meningitis: RecurrentMeningitis,
    pub sex: SexSpecific<Hsv2SexSample>,
}

/// Split the trailing "frequent" share into `[.., no CST, CST]`
#[must_use]
pub fn split_suppressive_therapy(shares: &[f64], cst: f64) -> Vec<f64> {
    let Some((frequent, rest)) = shares.split_last() else {
        return Vec::new();
    };
    let mut split = rest.to_vec();
    let with_cst = frequent * cst;
    split.push(frequent - with_cst);
    split.push(with_cst);
    split
}

impl Hsv2Parameters {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Hsv2Sample, ParameterError> {
        let common = self.common.sample(rng)?;
        let incidence = self.incidence.sample(rng)?;

        let symptomatic_primary = self.symptomatic_primary.sample(rng)?;
        let infrequent_after_asymptomatic = self.infrequent_after_asymptomatic.sample(rng)?;
        let recurrent_meningitis = self.recurrent_meningitis.sample(rng)?;
        let suppressive_therapy = self.suppressive_therapy.sample(rng)?;
        let recurrence_duration = self.recurrence_duration.sample(rng)?;
        let recurrence_after_symptomatic = split_suppressive_therapy(
            &self.recurrence_after_symptomatic.sample(rng)?,
            suppressive_therapy,
        );
        let total_episodes = self.meningitis_episodes.sample(rng)?;
        let disutility = self.meningitis_disutility.sample(rng)?;
        let episode_duration = self.meningitis_duration.sample(rng)?;
        let total_years = self.meningitis_years.sample(rng)?;
        let annual_recurrence_reduction = self.annual_recurrence_reduction.sample(rng)?;

        let male = self.sex.male.sample(rng)?;
        let female = self.sex.female.sample(rng)?;

        Ok(Hsv2Sample {
            common,
            incidence,
            annual_recurrence_reduction,
            symptomatic_primary,
            infrequent_after_asymptomatic,
            recurrence_after_symptomatic,
            recurrent_meningitis,
            recurrence_duration,
            meningitis: RecurrentMeningitis {
                total_years,
                total_episodes,
                episode_duration,
                disutility,
            },
            sex: SexSpecific { male, female },
        })
    }
}

impl Hsv2Sample {
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

    /// `[no recurrent meningitis, recurrent meningitis]`
    #[must_use]
    pub fn meningitis_split(&self) -> Vec<f64> {
        vec![1.0 - self.recurrent_meningitis, self.recurrent_meningitis]
    }

    /// First-year rate for `kind`; the second year is one annual reduction lower
    #[must_use]
    pub fn recurrence_rates(&self, cohort: &Hsv2SexSample, kind: RecurrenceType) -> Option<RecurrenceRates> {
        let first_year = match kind {
            RecurrenceType::None => return None,
            RecurrenceType::Infrequent => cohort.infrequent_first_year,
            RecurrenceType::Frequent => cohort.frequent_first_year,
            RecurrenceType::FrequentCst => cohort.frequent_cst_first_year,
        };
        Some(RecurrenceRates {
            first_year,
            second_year: first_year - self.annual_recurrence_reduction,
            annual_reduction: self.annual_recurrence_reduction,
        })
    }

    #[must_use]
    pub fn recurrence_disutilities(&self, cohort: &Hsv2SexSample) -> RecurrenceDisutilities {
        RecurrenceDisutilities {
            outbreak: self.common.recurrence_disutility,
            outbreak_duration: self.recurrence_duration,
            urinary_retention_probability: cohort.urinary_retention_per_recurrence,
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
    fn test_split_suppressive_therapy() {
        let split = split_suppressive_therapy(&[0.11, 0.51, 0.38], 0.25);
        assert_eq!(split.len(), 4);
        assert!((split[2] - 0.285).abs() < 1e-12);
        assert!((split[3] - 0.095).abs() < 1e-12);
        assert!((split.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_second_year_is_first_minus_reduction() {
        let sample = Hsv2Parameters::default()
            .sample(&mut SmallRng::seed_from_u64(2))
            .unwrap();
        let rates = sample
            .recurrence_rates(&sample.sex.female, RecurrenceType::Frequent)
            .unwrap();
        assert!(
            (rates.first_year - rates.second_year - sample.annual_recurrence_reduction).abs() < 1e-12
        );
        assert!(sample.recurrence_rates(&sample.sex.male, RecurrenceType::None).is_none());
    }
}
