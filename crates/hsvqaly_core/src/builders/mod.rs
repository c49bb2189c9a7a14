//! Virus-specific decision tree assembly
//!
//! Builders wire one iteration's sampled probabilities and computed terminal
//! losses into a fixed topology. All graphs are rooted at [`ROOT`], a
//! degenerate decision node leading to `c0`.

mod hsv1;
mod hsv2;
mod neonatal;

use serde::{Deserialize, Serialize};

use crate::model::Sex;

pub use hsv1::{Hsv1Tree, build_hsv1_tree, encephalitis_loss};
pub use hsv2::{Hsv2RecurrenceRates, Hsv2Tree, build_hsv2_tree};
pub use neonatal::{NeonatalTrees, NeonatalValuation, build_neonatal_trees};

/// Root decision node of every built graph
pub const ROOT: &str = "d1";

/// The (sex, age of infection) cell a tree is built for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub sex: Sex,
    pub age_of_infection: f64,
    pub discount: f64,
}

impl Cohort {
    #[must_use]
    pub fn new(sex: Sex, age_of_infection: f64, discount: f64) -> Self {
        Self {
            sex,
            age_of_infection,
            discount,
        }
    }
}
