//! Neonatal herpes inputs, including the maternal perspective

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::correlation::{CorrelationSettings, PreferenceOrder, correlate_utilities};
use crate::error::{LookupError, ParameterError};

use super::distributions::{DirichletDistribution, Distribution};

/// Long-term outcome of an infected neonate, as seen by the valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeonatalOutcome {
    Normal,
    Mild,
    Moderate,
    Severe,
    Death,
    /// Neurological impairment after intrauterine infection
    Neurological,
}

impl NeonatalOutcome {
    pub const ALL: [NeonatalOutcome; 6] = [
        NeonatalOutcome::Normal,
        NeonatalOutcome::Mild,
        NeonatalOutcome::Moderate,
        NeonatalOutcome::Severe,
        NeonatalOutcome::Death,
        NeonatalOutcome::Neurological,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NeonatalOutcome::Normal => "nor",
            NeonatalOutcome::Mild => "mil",
            NeonatalOutcome::Moderate => "mod",
            NeonatalOutcome::Severe => "sev",
            NeonatalOutcome::Death => "dea",
            NeonatalOutcome::Neurological => "neuro",
        }
    }
}

impl fmt::Display for NeonatalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeonatalOutcome {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NeonatalOutcome::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| LookupError::UnknownSequelae(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeonatalParameters {
    /// Annual neonatal herpes cases per 100,000 live births
    pub incidence: Distribution,
    /// `[intrauterine, intrapartum, postpartum]`
    pub route_of_transmission: DirichletDistribution,
    pub intrauterine_demise: Distribution,
    /// `[normal, neurological impairment, death]`
    pub intrauterine_outcomes: DirichletDistribution,
    /// `[SEM, CNS, disseminated]`
    pub intrapartum_manifestations: DirichletDistribution,
    /// `[normal, mild, moderate]`
    pub after_sem: DirichletDistribution,
    /// `[normal, mild, moderate, severe, death]`
    pub after_cns: DirichletDistribution,
    /// `[normal, mild, moderate, severe, death]`
    pub after_disseminated: DirichletDistribution,
    pub severe_life_expectancy: Distribution,
    pub maternal_grief_duration: Distribution,
    pub maternal_moderate_initial_period: Distribution,
    pub maternal_life_expectancy: Distribution,
    pub maternal_age: Distribution,
    pub maternal_death_disutility: Distribution,
    pub maternal_mild_disutility: Distribution,
    pub maternal_moderate_disutility: Distribution,
    pub maternal_severe_disutility: Distribution,
    pub intrauterine_neurological_disutility: Distribution,
    pub intrapartum_mild_disutility: Distribution,
    pub intrapartum_moderate_disutility: Distribution,
    pub intrapartum_severe_disutility: Distribution,
}

impl Default for NeonatalParameters {
    fn default() -> Self {
        Self {
            incidence: Distribution::log_normal(11.5, 1.5),
            route_of_transmission: DirichletDistribution::new(500.0, vec![0.05, 0.85, 0.10]),
            intrauterine_demise: Distribution::beta(0.078, 0.015),
            intrauterine_outcomes: DirichletDistribution::new(51.0, vec![0.16, 0.25, 0.59]),
            intrapartum_manifestations: DirichletDistribution::new(200.0, vec![0.45, 0.30, 0.25]),
            after_sem: DirichletDistribution::new(200.0, vec![0.98, 0.01, 0.01]),
            after_cns: DirichletDistribution::new(200.0, vec![0.30, 0.13, 0.17, 0.36, 0.04]),
            after_disseminated: DirichletDistribution::new(
                200.0,
                vec![0.59, 0.01, 0.03, 0.08, 0.29],
            ),
            severe_life_expectancy: Distribution::log_normal(20.0, 10.0),
            maternal_grief_duration: Distribution::log_normal(0.6, 0.475),
            maternal_moderate_initial_period: Distribution::log_normal(1.0, 0.5),
            maternal_life_expectancy: Distribution::log_normal(53.1, 1.0),
            maternal_age: Distribution::log_normal(29.03, 1.0),
            maternal_death_disutility: Distribution::beta(0.08, 0.035),
            maternal_mild_disutility: Distribution::beta(0.06, 0.025),
            maternal_moderate_disutility: Distribution::beta(0.13, 0.025),
            maternal_severe_disutility: Distribution::beta(0.24, 0.07),
            intrauterine_neurological_disutility: Distribution::beta(0.38, 0.1075),
            intrapartum_mild_disutility: Distribution::beta(0.18, 0.05),
            intrapartum_moderate_disutility: Distribution::beta(0.48, 0.05),
            intrapartum_severe_disutility: Distribution::beta(0.84, 0.05),
        }
    }
}

/// Maternal disutilities of a mildly, moderately or severely impaired child
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaternalDisutilities {
    pub mild: f64,
    pub moderate: f64,
    pub severe: f64,
}

/// Rank-correlated maternal disutilities, one row per PSA iteration
#[derive(Debug, Clone, PartialEq)]
pub struct MaternalDisutilityTable {
    matrix: DMatrix<f64>,
}

impl MaternalDisutilityTable {
    /// Wrap an `iterations x 3` matrix of `[mild, moderate, severe]` columns
    pub fn from_matrix(matrix: DMatrix<f64>) -> Result<Self, ParameterError> {
        if matrix.ncols() != 3 {
            return Err(ParameterError::ShapeMismatch {
                name: "maternal_disutilities",
                expected: (matrix.nrows(), 3),
                found: matrix.shape(),
            });
        }
        Ok(Self { matrix })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn row(&self, iteration: usize) -> Result<MaternalDisutilities, LookupError> {
        if iteration >= self.matrix.nrows() {
            return Err(LookupError::MissingPsaRow {
                row: iteration,
                rows: self.matrix.nrows(),
            });
        }
        Ok(MaternalDisutilities {
            mild: self.matrix[(iteration, 0)],
            moderate: self.matrix[(iteration, 1)],
            severe: self.matrix[(iteration, 2)],
        })
    }
}

/// Maternal inputs for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaternalSample {
    /// Mean age at pregnancy
    pub age: f64,
    pub life_expectancy: f64,
    pub grief_duration: f64,
    pub moderate_initial_period: f64,
    pub death_disutility: f64,
    pub disutilities: MaternalDisutilities,
}

/// One PSA draw of [`NeonatalParameters`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NeonatalSample {
    /// Intrauterine plus intrapartum cases per 100,000 live births
    pub incidence: f64,
    /// `[intrauterine, intrapartum]`, renormalised without postpartum
    pub route: Vec<f64>,
    pub intrauterine_demise: f64,
    pub intrauterine_outcomes: Vec<f64>,
    pub intrapartum_manifestations: Vec<f64>,
    pub after_sem: Vec<f64>,
    pub after_cns: Vec<f64>,
    pub after_disseminated: Vec<f64>,
    pub severe_life_expectancy: f64,
    pub intrauterine_neurological_disutility: f64,
    pub intrapartum_mild_disutility: f64,
    pub intrapartum_moderate_disutility: f64,
    pub intrapartum_severe_disutility: f64,
    pub maternal: MaternalSample,
}

impl NeonatalSample {
    /// `[intrauterine demise, infected live birth]`
    #[must_use]
    pub fn demise_split(&self) -> Vec<f64> {
        vec![self.intrauterine_demise, 1.0 - self.intrauterine_demise]
    }

    /// Neonatal sequelae disutility of an outcome
    #[must_use]
    pub fn disutility(&self, outcome: NeonatalOutcome) -> f64 {
        match outcome {
            NeonatalOutcome::Normal | NeonatalOutcome::Death => 0.0,
            NeonatalOutcome::Mild => self.intrapartum_mild_disutility,
            NeonatalOutcome::Moderate => self.intrapartum_moderate_disutility,
            NeonatalOutcome::Severe => self.intrapartum_severe_disutility,
            NeonatalOutcome::Neurological => self.intrauterine_neurological_disutility,
        }
    }
}

impl NeonatalParameters {
    /// Draw maternal mild/moderate/severe disutilities for every iteration
    /// and reorder them so mild <= moderate <= severe in most rows.
    ///
    /// Row `i` comes from a generator seeded with `i`, so it matches the
    /// per-iteration seeding of the PSA loop.
    pub fn maternal_disutilities(
        &self,
        iterations: usize,
        settings: &CorrelationSettings,
    ) -> Result<MaternalDisutilityTable, ParameterError> {
        let mut samples = DMatrix::zeros(iterations, 3);
        for i in 0..iterations {
            let mut rng = SmallRng::seed_from_u64(i as u64);
            samples[(i, 0)] = self.maternal_mild_disutility.sample(&mut rng)?;
            samples[(i, 1)] = self.maternal_moderate_disutility.sample(&mut rng)?;
            samples[(i, 2)] = self.maternal_severe_disutility.sample(&mut rng)?;
        }
        if iterations == 0 {
            return MaternalDisutilityTable::from_matrix(samples);
        }

        let correlated = correlate_utilities(&samples, &PreferenceOrder::increasing(3), settings)?;
        for warning in &correlated.warnings {
            warn!(
                states = ?warning.states,
                violation_rate = warning.violation_rate,
                "maternal disutility order could not be induced, using zero correlation"
            );
        }
        MaternalDisutilityTable::from_matrix(correlated.matrix)
    }

    /// Draw one iteration; maternal impairment disutilities come pre-correlated
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        maternal_disutilities: MaternalDisutilities,
    ) -> Result<NeonatalSample, ParameterError> {
        let route = self.route_of_transmission.sample(rng)?;
        let (intrauterine, intrapartum) = match route.as_slice() {
            [intrauterine, intrapartum, ..] => (*intrauterine, *intrapartum),
            _ => {
                return Err(ParameterError::InvalidValue {
                    name: "route_of_transmission",
                    value: route.len() as f64,
                    reason: "at least two routes are required",
                });
            }
        };
        let vertical = intrauterine + intrapartum;
        let incidence = self.incidence.sample(rng)? * vertical;

        let intrauterine_demise = self.intrauterine_demise.sample(rng)?;
        let intrauterine_outcomes = self.intrauterine_outcomes.sample(rng)?;
        let intrapartum_manifestations = self.intrapartum_manifestations.sample(rng)?;
        let after_sem = self.after_sem.sample(rng)?;
        let after_cns = self.after_cns.sample(rng)?;
        let after_disseminated = self.after_disseminated.sample(rng)?;

        let severe_life_expectancy = self.severe_life_expectancy.sample(rng)?;

        let intrauterine_neurological_disutility =
            self.intrauterine_neurological_disutility.sample(rng)?;
        let intrapartum_mild_disutility = self.intrapartum_mild_disutility.sample(rng)?;
        let intrapartum_moderate_disutility = self.intrapartum_moderate_disutility.sample(rng)?;
        let intrapartum_severe_disutility = self.intrapartum_severe_disutility.sample(rng)?;

        let grief_duration = self.maternal_grief_duration.sample(rng)?;
        let moderate_initial_period = self.maternal_moderate_initial_period.sample(rng)?;
        let age = self.maternal_age.sample(rng)?;
        let life_expectancy = self.maternal_life_expectancy.sample(rng)?;
        let death_disutility = self.maternal_death_disutility.sample(rng)?;

        Ok(NeonatalSample {
            incidence,
            route: vec![intrauterine / vertical, intrapartum / vertical],
            intrauterine_demise,
            intrauterine_outcomes,
            intrapartum_manifestations,
            after_sem,
            after_cns,
            after_disseminated,
            severe_life_expectancy,
            intrauterine_neurological_disutility,
            intrapartum_mild_disutility,
            intrapartum_moderate_disutility,
            intrapartum_severe_disutility,
            maternal: MaternalSample {
                age,
                life_expectancy,
                grief_duration,
                moderate_initial_period,
                death_disutility,
                disutilities: maternal_disutilities,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_is_renormalised() {
        let params = NeonatalParameters::default();
        let sample = params
            .sample(&mut SmallRng::seed_from_u64(4), MaternalDisutilities::default())
            .unwrap();
        assert_eq!(sample.route.len(), 2);
        assert!((sample.route.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(sample.route[1] > sample.route[0]);
    }

    #[test]
    fn test_maternal_disutilities_are_mostly_ordered() {
        let params = NeonatalParameters::default();
        let table = params
            .maternal_disutilities(300, &CorrelationSettings::default())
            .unwrap();
        assert_eq!(table.rows(), 300);

        let ordered = (0..table.rows())
            .filter(|&i| {
                let row = table.row(i).unwrap();
                row.mild <= row.moderate && row.moderate <= row.severe
            })
            .count();
        assert!(ordered as f64 / 300.0 > 0.8, "only {ordered} ordered rows");
        assert!(matches!(
            table.row(300),
            Err(LookupError::MissingPsaRow { row: 300, rows: 300 })
        ));
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("sev".parse::<NeonatalOutcome>().unwrap(), NeonatalOutcome::Severe);
        assert!(matches!(
            "fatal".parse::<NeonatalOutcome>(),
            Err(LookupError::UnknownSequelae(_))
        ));
    }
}
