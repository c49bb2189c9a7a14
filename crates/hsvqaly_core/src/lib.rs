//! QALY losses of genital herpes and neonatal herpes
//!
//! This crate estimates the quality-adjusted life years lost per incident case
//! of HSV-1 and HSV-2 genital infection, and per case of neonatal herpes, under
//! probabilistic sensitivity analysis (PSA). It provides:
//! - A generic expected-value decision tree engine with per-component breakdowns
//! - A life-table engine for survival-weighted, discounted long-term losses
//! - Recurrent outbreak and recurrent meningitis loss over the recurrent period
//! - A rank-correlation inducer for ordered utility samples
//! - Tree builders for HSV-1, HSV-2 and neonatal herpes
//! - Published parameter distributions and a seeded, optionally parallel PSA driver
//!
//! # Example
//!
//! ```ignore
//! use hsvqaly_core::{Hsv2Parameters, HsvSummary, LifeTables, PsaSettings, run_hsv2_psa};
//!
//! let tables = LifeTables::reference();
//! let run = run_hsv2_psa(&Hsv2Parameters::default(), &PsaSettings::default(), &tables)?;
//! println!("{}", HsvSummary::from_psa(&run).overall_loss_per_case.formatted(3));
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod builders;
pub mod correlation;
pub mod error;
pub mod life_table;
pub mod psa;
pub mod recurrence;
pub mod summary;
pub mod tree;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;
pub mod parameters;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use builders::{Cohort, build_hsv1_tree, build_hsv2_tree, build_neonatal_trees};
pub use correlation::{CorrelationSettings, PreferenceOrder, correlate_utilities};
pub use error::{
    GraphIntegrityError, IterationError, LookupError, ModelError, ParameterError, PsaError,
};
pub use life_table::{LifeTable, LifeTableRow, LifeTables, LongTermLoss, SequelaeDuration};
pub use model::{Component, ComponentMap, NodeId, Sex};
pub use parameters::{Hsv1Parameters, Hsv2Parameters, NeonatalParameters, SexSpecific};
pub use psa::{
    IterationFailure, NeonatalSettings, PsaRun, PsaSettings, run_hsv1_psa, run_hsv2_psa,
    run_neonatal_psa,
};
pub use recurrence::{RecurrenceType, RecurrentPeriod};
pub use summary::{CombinedSummary, HsvSummary, NeonatalSummary, SummaryStat, combined_loss_per_case};
pub use tree::{DecisionGraph, Node, Payoff, evaluate, validate};
