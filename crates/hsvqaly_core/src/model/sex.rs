use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Sex-at-birth ratios used to mix male and female life-table results
pub const MALE_BIRTH_RATIO: f64 = 0.511480215;
pub const FEMALE_BIRTH_RATIO: f64 = 0.488519785;

/// Life-table population selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    /// Combined population table
    General,
}

impl Sex {
    /// The two sexes modelled as separate cohorts
    pub const COHORTS: [Sex; 2] = [Sex::Male, Sex::Female];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::General => "general",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "general" => Ok(Sex::General),
            other => Err(LookupError::UnknownSex(other.to_string())),
        }
    }
}
