//! Cross-iteration summary statistics
//!
//! Every statistic is a mean with a 95% percentile interval over the completed
//! PSA iterations.

use serde::{Deserialize, Serialize};

use crate::model::{ComponentMap, Sex, merge_weighted};
use crate::parameters::SexSpecific;
use crate::psa::{Hsv1Iteration, Hsv2Iteration, HsvIteration, NeonatalIteration, PsaRun};

pub const LOWER_PERCENTILE: f64 = 0.025;
pub const UPPER_PERCENTILE: f64 = 0.975;

/// Mean and 95% percentile interval of one output across iterations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStat {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl SummaryStat {
    /// Summarise `values`; every field is NaN when there are none
    #[must_use]
    pub fn new(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: f64::NAN,
                lower: f64::NAN,
                upper: f64::NAN,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            lower: percentile(&sorted, LOWER_PERCENTILE),
            upper: percentile(&sorted, UPPER_PERCENTILE),
        }
    }

    /// `mean (lower, upper)` with a fixed number of decimals
    #[must_use]
    pub fn formatted(&self, decimals: usize) -> String {
        format!(
            "{:.*} ({:.*}, {:.*})",
            decimals, self.mean, decimals, self.lower, decimals, self.upper
        )
    }
}

/// Percentile of sorted values, interpolating linearly between order statistics
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] + fraction * (sorted[above] - sorted[below])
}

/// One (sex, age) cell summarised across iterations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub sex: Sex,
    pub age: f64,
    pub loss_per_case: SummaryStat,
    pub cases: SummaryStat,
    pub total_loss: SummaryStat,
    /// Mean component breakdown per case
    pub components: ComponentMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsvSummary {
    pub iterations: usize,
    pub cells: Vec<CellSummary>,
    /// Case-weighted loss per case within each sex
    pub loss_per_case: SexSpecific<SummaryStat>,
    pub total_loss: SexSpecific<SummaryStat>,
    pub overall_loss_per_case: SummaryStat,
    pub overall_total_loss: SummaryStat,
}

/// Per-iteration population totals of one HSV run
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    loss: f64,
    cases: f64,
}

impl Totals {
    fn add(&mut self, loss_per_case: f64, cases: f64) {
        self.loss += loss_per_case * cases;
        self.cases += cases;
    }

    fn per_case(&self) -> f64 {
        if self.cases > 0.0 {
            self.loss / self.cases
        } else {
            0.0
        }
    }
}

/// Per-sex and overall totals of one iteration
#[derive(Debug, Clone, Copy, Default)]
struct IterationTotals {
    by_sex: SexSpecific<Totals>,
    /// Every cell, including any without a per-sex slot
    overall: Totals,
}

fn iteration_totals<R>(iteration: &HsvIteration<R>) -> IterationTotals {
    let mut totals = IterationTotals::default();
    for cell in &iteration.cells {
        totals.overall.add(cell.loss, cell.cases);
        // General-population cells have no per-sex slot and count only overall
        if let Ok(sex) = totals.by_sex.get_mut(cell.sex) {
            sex.add(cell.loss, cell.cases);
        }
    }
    totals
}

impl HsvSummary {
    /// Summarise an HSV-1 or HSV-2 run.
    ///
    /// Cells are matched by position; every iteration of a run evaluates the
    /// same (sex, age) grid in the same order.
    #[must_use]
    pub fn from_psa<R>(run: &PsaRun<HsvIteration<R>>) -> Self {
        let n = run.iterations.len();
        let grid = run.iterations.first().map_or(0, |it| it.cells.len());

        let cells = (0..grid)
            .filter_map(|j| {
                let cells: Vec<_> = run.iterations.iter().filter_map(|it| it.cells.get(j)).collect();
                let first = cells.first()?;

                let loss: Vec<f64> = cells.iter().map(|c| c.loss).collect();
                let cases: Vec<f64> = cells.iter().map(|c| c.cases).collect();
                let total: Vec<f64> = cells.iter().map(|c| c.loss * c.cases).collect();
                let mut components = ComponentMap::new();
                for cell in &cells {
                    merge_weighted(&mut components, &cell.components, 1.0 / cells.len() as f64);
                }

                Some(CellSummary {
                    sex: first.sex,
                    age: first.age,
                    loss_per_case: SummaryStat::new(&loss),
                    cases: SummaryStat::new(&cases),
                    total_loss: SummaryStat::new(&total),
                    components,
                })
            })
            .collect();

        let totals: Vec<IterationTotals> = run.iterations.iter().map(iteration_totals).collect();
        let stat = |f: &dyn Fn(&IterationTotals) -> f64| {
            SummaryStat::new(&totals.iter().map(f).collect::<Vec<_>>())
        };

        Self {
            iterations: n,
            cells,
            loss_per_case: SexSpecific {
                male: stat(&|t| t.by_sex.male.per_case()),
                female: stat(&|t| t.by_sex.female.per_case()),
            },
            total_loss: SexSpecific {
                male: stat(&|t| t.by_sex.male.loss),
                female: stat(&|t| t.by_sex.female.loss),
            },
            overall_loss_per_case: stat(&|t| t.overall.per_case()),
            overall_total_loss: stat(&|t| t.overall.loss),
        }
    }
}

/// Both viruses together, per HSV infection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedSummary {
    /// Iterations completed by both runs
    pub iterations: usize,
    pub loss_per_case: SummaryStat,
    pub total_loss: SummaryStat,
}

/// Combine HSV-1 and HSV-2 runs iteration by iteration.
///
/// Iterations skipped by either run are left out of both.
#[must_use]
pub fn combined_loss_per_case(
    hsv1: &PsaRun<Hsv1Iteration>,
    hsv2: &PsaRun<Hsv2Iteration>,
) -> CombinedSummary {
    let mut per_case = Vec::new();
    let mut total = Vec::new();

    let mut hsv2_iterations = hsv2.iterations.iter().peekable();
    for a in &hsv1.iterations {
        while hsv2_iterations.next_if(|b| b.iteration < a.iteration).is_some() {}
        let Some(b) = hsv2_iterations.next_if(|b| b.iteration == a.iteration) else {
            continue;
        };

        let (a, b) = (iteration_totals(a).overall, iteration_totals(b).overall);
        let combined = Totals {
            loss: a.loss + b.loss,
            cases: a.cases + b.cases,
        };
        per_case.push(combined.per_case());
        total.push(combined.loss);
    }

    CombinedSummary {
        iterations: per_case.len(),
        loss_per_case: SummaryStat::new(&per_case),
        total_loss: SummaryStat::new(&total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeonatalSummary {
    pub iterations: usize,
    pub cases: SummaryStat,
    pub loss_per_case: SummaryStat,
    pub total_loss: SummaryStat,
    pub maternal_loss_per_case: SummaryStat,
    pub maternal_total_loss: SummaryStat,
}

impl NeonatalSummary {
    #[must_use]
    pub fn from_psa(run: &PsaRun<NeonatalIteration>) -> Self {
        let stat = |f: fn(&NeonatalIteration) -> f64| {
            SummaryStat::new(&run.iterations.iter().map(f).collect::<Vec<_>>())
        };
        Self {
            iterations: run.iterations.len(),
            cases: stat(|it| it.cases),
            loss_per_case: stat(|it| it.loss_per_case),
            total_loss: stat(|it| it.total_loss),
            maternal_loss_per_case: stat(|it| it.maternal_loss_per_case),
            maternal_total_loss: stat(|it| it.maternal_total_loss),
        }
    }
}
