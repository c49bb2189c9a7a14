//! Runs the selected analyses and condenses them into a report

use hsvqaly_core::error::PsaError;
use hsvqaly_core::life_table::LifeTables;
use hsvqaly_core::psa::{
    Hsv1Iteration, Hsv2Iteration, NeonatalIteration, PsaRun, run_hsv1_psa, run_hsv2_psa,
    run_neonatal_psa,
};
use hsvqaly_core::summary::{
    CombinedSummary, HsvSummary, NeonatalSummary, combined_loss_per_case,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Analysis, RunConfig};

/// Raw PSA runs of one invocation
#[derive(Debug, Default)]
pub struct Results {
    pub hsv1: Option<PsaRun<Hsv1Iteration>>,
    pub hsv2: Option<PsaRun<Hsv2Iteration>>,
    pub neonatal: Option<PsaRun<NeonatalIteration>>,
}

/// Summary of one analysis plus the iterations it had to skip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport<S> {
    pub summary: S,
    pub skipped: Vec<usize>,
}

impl<S> AnalysisReport<S> {
    fn new<T>(run: &PsaRun<T>, summarize: impl Fn(&PsaRun<T>) -> S) -> Self {
        Self {
            summary: summarize(run),
            skipped: run.failures.iter().map(|f| f.iteration).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub num_psa: usize,
    pub age_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsv1: Option<AnalysisReport<HsvSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsv2: Option<AnalysisReport<HsvSummary>>,
    /// HSV-1 and HSV-2 together, when both ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neonatal: Option<AnalysisReport<NeonatalSummary>>,
}

/// Run every analysis `analysis` selects, in HSV-1, HSV-2, neonatal order
pub fn run_analyses(
    config: &RunConfig,
    analysis: Analysis,
    tables: &LifeTables,
) -> Result<Results, PsaError> {
    let mut results = Results::default();

    if analysis.includes_hsv1() {
        results.hsv1 = Some(run_hsv1_psa(
            &config.hsv1,
            &config.hsv1_settings(),
            config.include_encephalitis,
            tables,
        )?);
    }
    if analysis.includes_hsv2() {
        results.hsv2 = Some(run_hsv2_psa(&config.hsv2, &config.hsv2_settings(), tables)?);
    }
    if analysis.includes_neonatal() {
        results.neonatal = Some(run_neonatal_psa(
            &config.neonatal,
            &config.neonatal_settings(),
            tables,
        )?);
    }

    Ok(results)
}

impl Results {
    pub fn report(&self, config: &RunConfig) -> Report {
        let combined = match (&self.hsv1, &self.hsv2) {
            (Some(hsv1), Some(hsv2)) => Some(combined_loss_per_case(hsv1, hsv2)),
            _ => None,
        };

        Report {
            num_psa: config.num_psa,
            age_labels: config.age_labels.clone(),
            hsv1: self
                .hsv1
                .as_ref()
                .map(|run| AnalysisReport::new(run, HsvSummary::from_psa)),
            hsv2: self
                .hsv2
                .as_ref()
                .map(|run| AnalysisReport::new(run, HsvSummary::from_psa)),
            combined,
            neonatal: self
                .neonatal
                .as_ref()
                .map(|run| AnalysisReport::new(run, NeonatalSummary::from_psa)),
        }
    }
}

fn log_hsv(name: &str, report: &AnalysisReport<HsvSummary>, labels: &[String]) {
    let summary = &report.summary;
    for (cell, label) in summary.cells.iter().zip(labels.iter().cycle()) {
        info!(
            "{name} {} {label}: QALYs lost per case {}",
            cell.sex,
            cell.loss_per_case.formatted(4)
        );
    }
    info!(
        "{name} loss per case {}, total {}",
        summary.overall_loss_per_case.formatted(4),
        summary.overall_total_loss.formatted(0)
    );
}

/// Log headline numbers of a report
pub fn log_report(report: &Report) {
    if let Some(hsv1) = &report.hsv1 {
        log_hsv("HSV-1", hsv1, &report.age_labels);
    }
    if let Some(hsv2) = &report.hsv2 {
        log_hsv("HSV-2", hsv2, &report.age_labels);
    }
    if let Some(combined) = &report.combined {
        info!(
            "HSV-1 and HSV-2 loss per case {}, total {}",
            combined.loss_per_case.formatted(4),
            combined.total_loss.formatted(0)
        );
    }
    if let Some(neonatal) = &report.neonatal {
        let summary = &neonatal.summary;
        info!(
            "Neonatal cases {}, loss per case {}, total {} (maternal {})",
            summary.cases.formatted(0),
            summary.loss_per_case.formatted(3),
            summary.total_loss.formatted(0),
            summary.maternal_total_loss.formatted(0)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RunConfig {
        RunConfig {
            num_psa: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_analysis_has_no_combined_summary() {
        let config = small_config();
        let results = run_analyses(&config, Analysis::Hsv2, &LifeTables::reference()).unwrap();
        assert!(results.hsv1.is_none() && results.neonatal.is_none());

        let report = results.report(&config);
        assert!(report.combined.is_none());
        let hsv2 = report.hsv2.unwrap();
        assert_eq!(hsv2.summary.iterations, 4);
        assert!(hsv2.skipped.is_empty());
    }

    #[test]
    fn test_all_analyses() {
        let config = small_config();
        let report = run_analyses(&config, Analysis::All, &LifeTables::reference())
            .unwrap()
            .report(&config);
        assert_eq!(report.combined.unwrap().iterations, 4);
        assert_eq!(report.neonatal.unwrap().summary.iterations, 4);
        assert_eq!(report.age_labels.len(), 4);
    }
}
