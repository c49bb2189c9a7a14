//! Annual incident genital cases by sex and age group

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ParameterError};
use crate::model::Sex;

use super::distributions::{DirichletDistribution, Distribution};

fn female_age_split() -> DirichletDistribution {
    DirichletDistribution::new(1000.0, vec![0.540, 0.219, 0.074, 0.167])
}

fn male_age_split() -> DirichletDistribution {
    DirichletDistribution::new(1000.0, vec![0.300, 0.232, 0.112, 0.356])
}

/// HSV-1: total genital cases split by sex, then by age group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv1Incidence {
    pub genital_cases: Distribution,
    pub female_share: Distribution,
    pub female_age_split: DirichletDistribution,
    pub male_age_split: DirichletDistribution,
}

impl Default for Hsv1Incidence {
    fn default() -> Self {
        Self {
            genital_cases: Distribution::LogNormalLog {
                mu: 11.556,
                sigma: 0.766,
            },
            female_share: Distribution::beta(0.49, 0.05),
            female_age_split: female_age_split(),
            male_age_split: male_age_split(),
        }
    }
}

/// HSV-2: cases sampled per sex, then split by age group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv2Incidence {
    pub male_cases: Distribution,
    pub female_cases: Distribution,
    pub female_age_split: DirichletDistribution,
    pub male_age_split: DirichletDistribution,
}

impl Default for Hsv2Incidence {
    fn default() -> Self {
        Self {
            male_cases: Distribution::LogNormalLog {
                mu: 12.60,
                sigma: 0.37,
            },
            female_cases: Distribution::LogNormalLog {
                mu: 12.46,
                sigma: 0.35,
            },
            female_age_split: female_age_split(),
            male_age_split: male_age_split(),
        }
    }
}

/// Incident cases per age group for one PSA iteration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncidenceSample {
    pub total_cases: f64,
    pub male: Vec<f64>,
    pub female: Vec<f64>,
}

impl IncidenceSample {
    /// Cases per age group for one sex
    pub fn for_sex(&self, sex: Sex) -> Result<&[f64], LookupError> {
        match sex {
            Sex::Male => Ok(&self.male),
            Sex::Female => Ok(&self.female),
            Sex::General => Err(LookupError::UnknownSex(sex.to_string())),
        }
    }
}

fn split(total: f64, shares: &[f64]) -> Vec<f64> {
    shares.iter().map(|share| share * total).collect()
}

impl Hsv1Incidence {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<IncidenceSample, ParameterError> {
        let total_cases = self.genital_cases.sample(rng)?;
        let female_share = self.female_share.sample(rng)?;
        let female_split = self.female_age_split.sample(rng)?;
        let male_split = self.male_age_split.sample(rng)?;

        Ok(IncidenceSample {
            total_cases,
            female: split(total_cases * female_share, &female_split),
            male: split(total_cases * (1.0 - female_share), &male_split),
        })
    }
}

impl Hsv2Incidence {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<IncidenceSample, ParameterError> {
        let female_total = self.female_cases.sample(rng)?;
        let male_total = self.male_cases.sample(rng)?;
        let female_split = self.female_age_split.sample(rng)?;
        let male_split = self.male_age_split.sample(rng)?;

        Ok(IncidenceSample {
            total_cases: female_total + male_total,
            female: split(female_total, &female_split),
            male: split(male_total, &male_split),
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn test_hsv1_cases_add_up() {
        let mut rng = SmallRng::seed_from_u64(3);
        let sample = Hsv1Incidence::default().sample(&mut rng).unwrap();
        let split: f64 = sample.male.iter().chain(&sample.female).sum();
        assert!((split - sample.total_cases).abs() < 1e-6 * sample.total_cases);
        assert_eq!(sample.male.len(), 4);
    }

    #[test]
    fn test_general_has_no_cases() {
        let sample = IncidenceSample::default();
        assert!(sample.for_sex(Sex::General).is_err());
    }
}
