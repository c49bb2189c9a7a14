//! Parameter distributions and their per-iteration samples
//!
//! Every `*Parameters` type carries the published distributions as its
//! `Default` and can be overridden from a config file. `sample` draws one PSA
//! iteration's worth of values from a caller-seeded generator.

mod common;
mod distributions;
mod hsv1;
mod hsv2;
mod incidence;
mod neonatal;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::model::Sex;

pub use common::{CommonParameters, CommonSample, PrimaryLosses};
pub use distributions::{DirichletDistribution, Distribution, beta_shape, log_normal_shape};
pub use hsv1::{
    EncephalitisParameters, EncephalitisSample, Hsv1Parameters, Hsv1RecurrenceParameters,
    Hsv1Sample, US_POPULATION,
};
pub use hsv2::{
    Hsv2Parameters, Hsv2Sample, Hsv2SexParameters, Hsv2SexSample, split_suppressive_therapy,
};
pub use incidence::{Hsv1Incidence, Hsv2Incidence, IncidenceSample};
pub use neonatal::{
    MaternalDisutilities, MaternalDisutilityTable, MaternalSample, NeonatalOutcome,
    NeonatalParameters, NeonatalSample,
};

/// A value held separately for the male and female cohorts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SexSpecific<T> {
    pub male: T,
    pub female: T,
}

impl<T> SexSpecific<T> {
    /// Value for a cohort; the combined population has no cohort of its own
    pub fn get(&self, sex: Sex) -> Result<&T, LookupError> {
        match sex {
            Sex::Male => Ok(&self.male),
            Sex::Female => Ok(&self.female),
            Sex::General => Err(LookupError::UnknownSex(sex.to_string())),
        }
    }

    pub fn get_mut(&mut self, sex: Sex) -> Result<&mut T, LookupError> {
        match sex {
            Sex::Male => Ok(&mut self.male),
            Sex::Female => Ok(&mut self.female),
            Sex::General => Err(LookupError::UnknownSex(sex.to_string())),
        }
    }
}
