//! Probabilistic sensitivity analysis driver
//!
//! Each iteration is a pure function of its index: the index seeds a
//! `SmallRng`, parameters are drawn from it, and trees are built and evaluated
//! against shared read-only life tables. With the `parallel` feature the
//! iterations run on the rayon pool; results always come back in iteration
//! order.

use rand::SeedableRng;
use rand::rngs::SmallRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builders::{
    Cohort, Hsv2RecurrenceRates, NeonatalValuation, build_hsv1_tree, build_hsv2_tree,
    build_neonatal_trees,
};
use crate::correlation::CorrelationSettings;
use crate::error::{IterationError, ModelError, ParameterError, PsaError};
use crate::life_table::{LifeTables, SequelaeDuration};
use crate::model::{ComponentMap, Sex};
use crate::parameters::{
    Hsv1Parameters, Hsv2Parameters, MaternalDisutilityTable, NeonatalParameters, SexSpecific,
};
use crate::tree::{DecisionGraph, evaluate};

/// What to do when a single iteration fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationFailure {
    /// Stop the run with the first failed iteration
    #[default]
    Abort,
    /// Log the failure and drop the iteration from the results
    Skip,
}

/// Run settings shared by the HSV-1 and HSV-2 analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsaSettings {
    pub num_psa: usize,
    pub discount: f64,
    /// Representative age of infection per incidence age group
    pub ages: Vec<f64>,
    pub iteration_failure: IterationFailure,
}

impl Default for PsaSettings {
    fn default() -> Self {
        Self {
            num_psa: 1000,
            discount: 0.03,
            ages: vec![21.0, 27.0, 32.0, 42.0],
            iteration_failure: IterationFailure::Abort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeonatalSettings {
    pub num_psa: usize,
    pub discount: f64,
    /// Simulation length for the infant and the mother
    pub horizon: SequelaeDuration,
    /// Annual live births the per-100,000 incidence is scaled to
    pub births: f64,
    pub correlation: CorrelationSettings,
    pub iteration_failure: IterationFailure,
}

impl Default for NeonatalSettings {
    fn default() -> Self {
        Self {
            num_psa: 1000,
            discount: 0.03,
            horizon: SequelaeDuration::Years(15.0),
            births: 3_791_712.0,
            correlation: CorrelationSettings::default(),
            iteration_failure: IterationFailure::Abort,
        }
    }
}

/// Expected outcome of one (sex, age) cell in one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellResult {
    pub sex: Sex,
    pub age: f64,
    /// Expected QALY loss per incident case
    pub loss: f64,
    pub components: ComponentMap,
    /// Incident cases in this cell
    pub cases: f64,
}

/// One HSV iteration; `R` is the recurrence sequence type of the virus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsvIteration<R> {
    pub iteration: usize,
    pub cells: Vec<CellResult>,
    /// Recurrence sequences of the oldest age group, per sex
    pub recurrence_rates: SexSpecific<R>,
}

pub type Hsv1Iteration = HsvIteration<Vec<f64>>;
pub type Hsv2Iteration = HsvIteration<Hsv2RecurrenceRates>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeonatalIteration {
    pub iteration: usize,
    /// Infected births this year
    pub cases: f64,
    /// Infant plus maternal loss per case
    pub loss_per_case: f64,
    pub total_loss: f64,
    pub maternal_loss_per_case: f64,
    pub maternal_total_loss: f64,
}

/// Completed iterations in order, plus any that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct PsaRun<T> {
    pub iterations: Vec<T>,
    pub failures: Vec<IterationError>,
}

impl<T> PsaRun<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }
}

fn run_iterations<T, F>(
    num_psa: usize,
    failure: IterationFailure,
    run: F,
) -> Result<PsaRun<T>, IterationError>
where
    T: Send,
    F: Fn(usize) -> Result<T, ModelError> + Sync,
{
    #[cfg(feature = "parallel")]
    let outcomes: Vec<Result<T, ModelError>> = (0..num_psa).into_par_iter().map(&run).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Result<T, ModelError>> = (0..num_psa).map(&run).collect();

    let mut psa = PsaRun {
        iterations: Vec::with_capacity(num_psa),
        failures: Vec::new(),
    };
    for (iteration, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => psa.iterations.push(result),
            Err(error) => {
                let error = IterationError { iteration, error };
                match failure {
                    IterationFailure::Abort => return Err(error),
                    IterationFailure::Skip => {
                        warn!(iteration, %error, "skipping failed PSA iteration");
                        psa.failures.push(error);
                    }
                }
            }
        }
    }
    Ok(psa)
}

fn root_result(graph: &DecisionGraph) -> Result<(f64, ComponentMap), ModelError> {
    let evaluated = evaluate(graph)?;
    let root = evaluated.root_outcome();
    Ok((root.value, root.components.clone()))
}

fn check_age_groups(ages: &[f64], cases: &[f64]) -> Result<(), ParameterError> {
    if ages.len() != cases.len() {
        return Err(ParameterError::ShapeMismatch {
            name: "ages",
            expected: (cases.len(), 1),
            found: (ages.len(), 1),
        });
    }
    Ok(())
}

/// Evaluate every (sex, age) cell of one HSV iteration
fn hsv_cells<R, B>(
    settings: &PsaSettings,
    cases: impl Fn(Sex) -> Result<Vec<f64>, ModelError>,
    build: B,
) -> Result<(Vec<CellResult>, SexSpecific<R>), ModelError>
where
    R: Default,
    B: Fn(&Cohort) -> Result<(DecisionGraph, R), ModelError>,
{
    let mut cells = Vec::with_capacity(Sex::COHORTS.len() * settings.ages.len());
    let mut recurrence_rates = SexSpecific::<R>::default();

    for sex in Sex::COHORTS {
        let cases = cases(sex)?;
        check_age_groups(&settings.ages, &cases)?;

        for (&age, &cases) in settings.ages.iter().zip(&cases) {
            let (graph, rates) = build(&Cohort::new(sex, age, settings.discount))?;
            let (loss, components) = root_result(&graph)?;
            cells.push(CellResult {
                sex,
                age,
                loss,
                components,
                cases,
            });
            *recurrence_rates.get_mut(sex)? = rates;
        }
    }

    Ok((cells, recurrence_rates))
}

/// One HSV-1 iteration seeded with `iteration`
pub fn hsv1_iteration(
    iteration: usize,
    params: &Hsv1Parameters,
    settings: &PsaSettings,
    include_encephalitis: bool,
    tables: &LifeTables,
) -> Result<Hsv1Iteration, ModelError> {
    let mut rng = SmallRng::seed_from_u64(iteration as u64);
    let sample = params.sample(&mut rng, include_encephalitis)?;

    let (cells, recurrence_rates) = hsv_cells(
        settings,
        |sex| Ok(sample.incidence.for_sex(sex)?.to_vec()),
        |cohort| {
            let tree = build_hsv1_tree(&sample, tables, cohort)?;
            Ok((tree.graph, tree.recurrence_rates))
        },
    )?;

    debug!(iteration, cells = cells.len(), "HSV-1 iteration evaluated");
    Ok(HsvIteration {
        iteration,
        cells,
        recurrence_rates,
    })
}

/// One HSV-2 iteration seeded with `iteration`
pub fn hsv2_iteration(
    iteration: usize,
    params: &Hsv2Parameters,
    settings: &PsaSettings,
    tables: &LifeTables,
) -> Result<Hsv2Iteration, ModelError> {
    let mut rng = SmallRng::seed_from_u64(iteration as u64);
    let sample = params.sample(&mut rng)?;

    let (cells, recurrence_rates) = hsv_cells(
        settings,
        |sex| Ok(sample.incidence.for_sex(sex)?.to_vec()),
        |cohort| {
            let tree = build_hsv2_tree(&sample, tables, cohort)?;
            Ok((tree.graph, tree.recurrence_rates))
        },
    )?;

    debug!(iteration, cells = cells.len(), "HSV-2 iteration evaluated");
    Ok(HsvIteration {
        iteration,
        cells,
        recurrence_rates,
    })
}

/// One neonatal iteration; maternal impairment disutilities come from row `iteration`
pub fn neonatal_iteration(
    iteration: usize,
    params: &NeonatalParameters,
    maternal: &MaternalDisutilityTable,
    settings: &NeonatalSettings,
    tables: &LifeTables,
) -> Result<NeonatalIteration, ModelError> {
    let mut rng = SmallRng::seed_from_u64(iteration as u64);
    let sample = params.sample(&mut rng, maternal.row(iteration)?)?;

    let valuation = NeonatalValuation::new(tables, &sample, settings.discount, settings.horizon);
    let trees = build_neonatal_trees(&valuation)?;
    let (loss_per_case, _) = root_result(&trees.combined)?;
    let (maternal_loss_per_case, _) = root_result(&trees.maternal)?;

    let cases = sample.incidence / 100_000.0 * settings.births;
    debug!(iteration, cases, loss_per_case, "neonatal iteration evaluated");

    Ok(NeonatalIteration {
        iteration,
        cases,
        loss_per_case,
        total_loss: cases * loss_per_case,
        maternal_loss_per_case,
        maternal_total_loss: cases * maternal_loss_per_case,
    })
}

pub fn run_hsv1_psa(
    params: &Hsv1Parameters,
    settings: &PsaSettings,
    include_encephalitis: bool,
    tables: &LifeTables,
) -> Result<PsaRun<Hsv1Iteration>, PsaError> {
    info!(
        iterations = settings.num_psa,
        discount = settings.discount,
        include_encephalitis,
        "starting HSV-1 PSA"
    );
    let run = run_iterations(settings.num_psa, settings.iteration_failure, |i| {
        hsv1_iteration(i, params, settings, include_encephalitis, tables)
    })?;
    info!(completed = run.len(), skipped = run.failures.len(), "HSV-1 PSA finished");
    Ok(run)
}

pub fn run_hsv2_psa(
    params: &Hsv2Parameters,
    settings: &PsaSettings,
    tables: &LifeTables,
) -> Result<PsaRun<Hsv2Iteration>, PsaError> {
    info!(
        iterations = settings.num_psa,
        discount = settings.discount,
        "starting HSV-2 PSA"
    );
    let run = run_iterations(settings.num_psa, settings.iteration_failure, |i| {
        hsv2_iteration(i, params, settings, tables)
    })?;
    info!(completed = run.len(), skipped = run.failures.len(), "HSV-2 PSA finished");
    Ok(run)
}

pub fn run_neonatal_psa(
    params: &NeonatalParameters,
    settings: &NeonatalSettings,
    tables: &LifeTables,
) -> Result<PsaRun<NeonatalIteration>, PsaError> {
    info!(
        iterations = settings.num_psa,
        discount = settings.discount,
        horizon = ?settings.horizon,
        "starting neonatal PSA"
    );
    let maternal = params
        .maternal_disutilities(settings.num_psa, &settings.correlation)
        .map_err(|e| PsaError::Setup(e.into()))?;

    let run = run_iterations(settings.num_psa, settings.iteration_failure, |i| {
        neonatal_iteration(i, params, &maternal, settings, tables)
    })?;
    info!(completed = run.len(), skipped = run.failures.len(), "neonatal PSA finished");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;

    #[test]
    fn test_skip_drops_failed_iterations() {
        let run = run_iterations(5, IterationFailure::Skip, |i| {
            if i % 2 == 1 {
                Err(ModelError::Lookup(LookupError::UnknownSex(i.to_string())))
            } else {
                Ok(i)
            }
        })
        .unwrap();
        assert_eq!(run.iterations, vec![0, 2, 4]);
        assert_eq!(run.failures.len(), 2);
        assert_eq!(run.failures[0].iteration, 1);
    }

    #[test]
    fn test_abort_returns_first_failure() {
        let err = run_iterations(5, IterationFailure::Abort, |i| {
            if i >= 3 {
                Err(ModelError::Lookup(LookupError::UnknownSex(i.to_string())))
            } else {
                Ok(i)
            }
        })
        .unwrap_err();
        assert_eq!(err.iteration, 3);
    }

    #[test]
    fn test_mismatched_ages_fail_the_iteration() {
        let settings = PsaSettings {
            ages: vec![21.0, 27.0],
            ..Default::default()
        };
        let err = hsv2_iteration(0, &Hsv2Parameters::default(), &settings, &LifeTables::reference())
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Parameter(ParameterError::ShapeMismatch { name: "ages", .. })
        ));
    }
}
