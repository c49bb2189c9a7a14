use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::life_table::{LifeTables, LongTermLoss, SequelaeDuration, age_adjusted_disutility};
use crate::model::Sex;
use crate::parameters::{NeonatalOutcome, NeonatalSample};
use crate::tree::{DecisionGraph, Node, Payoff};

use super::ROOT;

/// Intrapartum long-term outcomes in branch order
const INTRAPARTUM_OUTCOMES: [NeonatalOutcome; 5] = [
    NeonatalOutcome::Normal,
    NeonatalOutcome::Mild,
    NeonatalOutcome::Moderate,
    NeonatalOutcome::Severe,
    NeonatalOutcome::Death,
];

/// Values neonatal outcomes for the infant (sex-mixed, from birth) and the mother
#[derive(Debug, Clone, Copy)]
pub struct NeonatalValuation<'a> {
    tables: &'a LifeTables,
    sample: &'a NeonatalSample,
    discount: f64,
    horizon: SequelaeDuration,
}

impl<'a> NeonatalValuation<'a> {
    #[must_use]
    pub fn new(
        tables: &'a LifeTables,
        sample: &'a NeonatalSample,
        discount: f64,
        horizon: SequelaeDuration,
    ) -> Self {
        Self {
            tables,
            sample,
            discount,
            horizon,
        }
    }

    /// Quality-adjusted life expectancy at birth, the loss of a neonatal death
    pub fn death_qalys(&self) -> Result<f64, ModelError> {
        LongTermLoss::new(0.0, 0.0, self.discount)
            .qalys()
            .evaluate_mixed_sex(self.tables)
    }

    /// Infant loss of an outcome within the simulation horizon
    pub fn neonatal_loss(&self, outcome: NeonatalOutcome) -> Result<f64, ModelError> {
        match outcome {
            NeonatalOutcome::Death => self.death_qalys(),
            NeonatalOutcome::Normal => Ok(0.0),
            NeonatalOutcome::Severe => {
                // severe sequelae shorten life, but only a finite horizon is capped
                let duration = match self.horizon {
                    SequelaeDuration::Years(years) => {
                        SequelaeDuration::Years(years.min(self.sample.severe_life_expectancy))
                    }
                    SequelaeDuration::Lifetime => SequelaeDuration::Lifetime,
                };
                self.sequelae_loss(self.sample.disutility(outcome), duration)
            }
            _ => self.sequelae_loss(self.sample.disutility(outcome), self.horizon),
        }
    }

    fn sequelae_loss(&self, disutility: f64, duration: SequelaeDuration) -> Result<f64, ModelError> {
        LongTermLoss::new(0.0, disutility, self.discount)
            .duration(duration)
            .evaluate_mixed_sex(self.tables)
    }

    /// Maternal loss of a child's outcome, from the mother's age at pregnancy.
    ///
    /// Death and moderate impairment open with an initial period at the death
    /// disutility, followed by the mild-impairment loss. A fixed horizon
    /// replaces every maternal duration.
    pub fn maternal_loss(&self, outcome: NeonatalOutcome) -> Result<f64, ModelError> {
        let maternal = &self.sample.maternal;
        let duration = |years: f64| match self.horizon {
            SequelaeDuration::Years(fixed) => SequelaeDuration::Years(fixed),
            SequelaeDuration::Lifetime => SequelaeDuration::Years(years),
        };
        let long_term = |age: f64, disutility: f64, years: f64| {
            LongTermLoss::new(age, disutility, self.discount)
                .duration(duration(years))
                .evaluate(self.tables, Sex::Female)
        };

        match outcome {
            NeonatalOutcome::Normal => Ok(0.0),
            NeonatalOutcome::Death | NeonatalOutcome::Moderate => {
                let initial_period = if outcome == NeonatalOutcome::Death {
                    maternal.grief_duration
                } else {
                    maternal.moderate_initial_period
                };
                let initial = age_adjusted_disutility(maternal.age, maternal.death_disutility)
                    * initial_period;
                let later = long_term(
                    maternal.age + initial_period,
                    maternal.disutilities.mild,
                    maternal.life_expectancy,
                )?;
                Ok(initial + later)
            }
            NeonatalOutcome::Mild => long_term(
                maternal.age,
                maternal.disutilities.mild,
                maternal.life_expectancy,
            ),
            NeonatalOutcome::Severe => long_term(
                maternal.age,
                maternal.disutilities.severe,
                self.sample.severe_life_expectancy.min(maternal.life_expectancy),
            ),
            NeonatalOutcome::Neurological => long_term(
                maternal.age,
                maternal.disutilities.moderate,
                maternal.life_expectancy,
            ),
        }
    }

    /// Infant plus maternal loss
    pub fn combined_loss(&self, outcome: NeonatalOutcome) -> Result<f64, ModelError> {
        Ok(self.neonatal_loss(outcome)? + self.maternal_loss(outcome)?)
    }

    /// Expected loss of an infected live birth after intrauterine infection,
    /// weighted over `[normal, neurological impairment, death]`
    pub fn intrauterine_loss(&self, include_neonatal: bool) -> Result<f64, ModelError> {
        let outcomes = &self.sample.intrauterine_outcomes;
        let weight = |i: usize| outcomes.get(i).copied().unwrap_or(0.0);
        let loss = |outcome| {
            if include_neonatal {
                self.combined_loss(outcome)
            } else {
                self.maternal_loss(outcome)
            }
        };
        Ok(weight(1) * loss(NeonatalOutcome::Neurological)? + weight(2) * loss(NeonatalOutcome::Death)?)
    }
}

/// Neonatal graph valued twice: infant plus mother, and mother alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeonatalTrees {
    pub combined: DecisionGraph,
    pub maternal: DecisionGraph,
}

struct TerminalValues {
    demise: f64,
    intrauterine: f64,
    /// In [`INTRAPARTUM_OUTCOMES`] order
    intrapartum: [f64; 5],
}

fn neonatal_graph(sample: &NeonatalSample, values: &TerminalValues) -> DecisionGraph {
    let [normal, mild, moderate, severe, death] = values.intrapartum;
    let terminal = |value: f64| Node::terminal(Payoff::loss(value));

    DecisionGraph::new(ROOT)
        .with(ROOT, Node::decision("c0"))
        .with("c0", Node::chance(Payoff::default(), ["c1", "c2"], sample.route.clone()))
        .with("c1", Node::chance(Payoff::default(), ["t1", "t2"], sample.demise_split()))
        .with(
            "c2",
            Node::chance(
                Payoff::default(),
                ["c4", "c5", "c6"],
                sample.intrapartum_manifestations.clone(),
            ),
        )
        .with(
            "c4",
            Node::chance(Payoff::default(), ["t5", "t6", "t7"], sample.after_sem.clone()),
        )
        .with(
            "c5",
            Node::chance(
                Payoff::default(),
                ["t10", "t11", "t12", "t13", "t14"],
                sample.after_cns.clone(),
            ),
        )
        .with(
            "c6",
            Node::chance(
                Payoff::default(),
                ["t15", "t16", "t17", "t18", "t19"],
                sample.after_disseminated.clone(),
            ),
        )
        .with("t1", terminal(values.demise))
        .with("t2", terminal(values.intrauterine))
        .with("t5", terminal(normal))
        .with("t6", terminal(mild))
        .with("t7", terminal(moderate))
        .with("t10", terminal(normal))
        .with("t11", terminal(mild))
        .with("t12", terminal(moderate))
        .with("t13", terminal(severe))
        .with("t14", terminal(death))
        .with("t15", terminal(normal))
        .with("t16", terminal(mild))
        .with("t17", terminal(moderate))
        .with("t18", terminal(severe))
        .with("t19", terminal(death))
}

/// Assemble both neonatal graphs.
///
/// ```text
/// d1 -> c0 [intrauterine, intrapartum]
///   c1 [demise, infected] -> t1 / t2
///   c2 [SEM, CNS, disseminated]
///     c4 [normal, mild, moderate]                 -> t5..t7
///     c5 [normal, mild, moderate, severe, death]  -> t10..t14
///     c6 [normal, mild, moderate, severe, death]  -> t15..t19
/// ```
pub fn build_neonatal_trees(valuation: &NeonatalValuation<'_>) -> Result<NeonatalTrees, ModelError> {
    let mut combined = [0.0; 5];
    let mut maternal = [0.0; 5];
    for (i, outcome) in INTRAPARTUM_OUTCOMES.into_iter().enumerate() {
        maternal[i] = valuation.maternal_loss(outcome)?;
        combined[i] = valuation.neonatal_loss(outcome)? + maternal[i];
    }

    let combined_values = TerminalValues {
        demise: combined[4],
        intrauterine: valuation.intrauterine_loss(true)?,
        intrapartum: combined,
    };
    let maternal_values = TerminalValues {
        demise: maternal[4],
        intrauterine: valuation.intrauterine_loss(false)?,
        intrapartum: maternal,
    };

    Ok(NeonatalTrees {
        combined: neonatal_graph(valuation.sample, &combined_values),
        maternal: neonatal_graph(valuation.sample, &maternal_values),
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::parameters::{MaternalDisutilities, NeonatalParameters};
    use crate::tree::{evaluate, validate};

    fn sample() -> NeonatalSample {
        let maternal = MaternalDisutilities {
            mild: 0.06,
            moderate: 0.13,
            severe: 0.24,
        };
        NeonatalParameters::default()
            .sample(&mut SmallRng::seed_from_u64(3), maternal)
            .unwrap()
    }

    #[test]
    fn test_combined_exceeds_maternal() {
        let tables = LifeTables::reference();
        let sample = sample();
        let valuation = NeonatalValuation::new(&tables, &sample, 0.03, SequelaeDuration::Years(15.0));
        let trees = build_neonatal_trees(&valuation).unwrap();
        validate(&trees.combined).unwrap();
        validate(&trees.maternal).unwrap();

        let combined = evaluate(&trees.combined).unwrap().root_outcome().value;
        let maternal = evaluate(&trees.maternal).unwrap().root_outcome().value;
        assert!(maternal > 0.0);
        assert!(combined > maternal);
    }

    #[test]
    fn test_severe_horizon_capped_by_life_expectancy() {
        let tables = LifeTables::reference();
        let mut sample = sample();
        sample.severe_life_expectancy = 2.0;
        let capped = NeonatalValuation::new(&tables, &sample, 0.0, SequelaeDuration::Years(15.0));
        let direct = LongTermLoss::new(0.0, sample.intrapartum_severe_disutility, 0.0)
            .duration(SequelaeDuration::Years(2.0))
            .evaluate_mixed_sex(&tables)
            .unwrap();
        let loss = capped.neonatal_loss(NeonatalOutcome::Severe).unwrap();
        assert!((loss - direct).abs() < 1e-12);
    }

    #[test]
    fn test_death_is_lifetime_qalys() {
        let tables = LifeTables::reference();
        let sample = sample();
        let short = NeonatalValuation::new(&tables, &sample, 0.03, SequelaeDuration::Years(15.0));
        let lifetime = NeonatalValuation::new(&tables, &sample, 0.03, SequelaeDuration::Lifetime);
        let death = short.neonatal_loss(NeonatalOutcome::Death).unwrap();
        assert_eq!(death, lifetime.neonatal_loss(NeonatalOutcome::Death).unwrap());
        // discounted quality-adjusted life expectancy at birth
        assert!(death > 20.0 && death < 35.0, "death QALYs {death}");
        assert_eq!(short.maternal_loss(NeonatalOutcome::Normal).unwrap(), 0.0);
    }
}
