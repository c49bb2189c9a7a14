//! Recurrent-period QALY loss
//!
//! After the primary outbreak a cohort experiences symptomatic recurrences at a
//! linearly declining annual rate, each carrying a risk of urinary retention,
//! alongside a psychosocial disutility from diagnosis. HSV-2 cohorts that had
//! aseptic meningitis may also suffer recurrent meningitis episodes, spaced
//! evenly over an expected affliction period. Every yearly contribution is
//! survival-weighted, age-adjusted and discounted back to the year of infection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ModelError, ParameterError};
use crate::life_table::{LifeTables, age_adjusted_disutility};
use crate::model::{Component, ComponentMap, Sex};

/// Recurrence pattern of a cohort after the primary outbreak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    /// No (or undetected) symptomatic recurrences
    None,
    Infrequent,
    /// Frequent recurrences without chronic suppressive therapy
    Frequent,
    /// Frequent recurrences on chronic suppressive therapy
    FrequentCst,
}

impl RecurrenceType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::None => "no",
            RecurrenceType::Infrequent => "infrequent",
            RecurrenceType::Frequent => "frequent",
            RecurrenceType::FrequentCst => "frequent_cst",
        }
    }

    #[must_use]
    pub fn has_recurrences(&self) -> bool {
        !matches!(self, RecurrenceType::None)
    }

    /// Breakdown category for HSV-2 recurrence losses
    #[must_use]
    pub fn hsv2_component(&self) -> Option<Component> {
        match self {
            RecurrenceType::None => None,
            RecurrenceType::Infrequent => Some(Component::Infrequent),
            RecurrenceType::Frequent => Some(Component::FrequentNoCst),
            RecurrenceType::FrequentCst => Some(Component::FrequentCst),
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" | "none" => Ok(RecurrenceType::None),
            "infrequent" => Ok(RecurrenceType::Infrequent),
            "frequent" => Ok(RecurrenceType::Frequent),
            "frequent_cst" => Ok(RecurrenceType::FrequentCst),
            other => Err(LookupError::UnknownRecurrenceType(other.to_string())),
        }
    }
}

/// Annual symptomatic recurrence counts.
///
/// `ceil(second / reduction)` years have recurrences: the first-year rate,
/// then the second-year rate declining by `reduction` each year. Every entry
/// after the first is positive by construction. A non-positive second-year
/// rate yields no recurrence years at all.
pub fn recurrence_rates(
    first_year: f64,
    second_year: f64,
    reduction: f64,
) -> Result<Vec<f64>, ParameterError> {
    if !(reduction > 0.0 && reduction.is_finite()) {
        return Err(ParameterError::InvalidValue {
            name: "annual_recurrence_reduction",
            value: reduction,
            reason: "must be positive and finite",
        });
    }
    if !first_year.is_finite() || !second_year.is_finite() {
        return Err(ParameterError::InvalidValue {
            name: "recurrence_rate",
            value: if first_year.is_finite() { second_year } else { first_year },
            reason: "must be finite",
        });
    }

    let years = (second_year / reduction).ceil();
    if years < 1.0 {
        return Ok(Vec::new());
    }
    let years = years as usize;

    let mut rates = Vec::with_capacity(years);
    rates.push(first_year);
    rates.extend((0..years - 1).map(|i| second_year - i as f64 * reduction));
    Ok(rates)
}

/// First- and second-year recurrence counts and their annual decline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecurrenceRates {
    pub first_year: f64,
    pub second_year: f64,
    pub annual_reduction: f64,
}

impl RecurrenceRates {
    /// Declining annual sequence, see [`recurrence_rates`]
    pub fn sequence(&self) -> Result<Vec<f64>, ParameterError> {
        recurrence_rates(self.first_year, self.second_year, self.annual_reduction)
    }
}

/// Per-recurrence and psychosocial disutility inputs for one cohort
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecurrenceDisutilities {
    /// Disutility of a treated symptomatic recurrence
    pub outbreak: f64,
    /// Duration of one recurrence, in years
    pub outbreak_duration: f64,
    /// Probability that a recurrence is complicated by urinary retention
    pub urinary_retention_probability: f64,
    pub urinary_retention: f64,
    pub urinary_retention_duration: f64,
    /// Psychosocial disutility in the year of diagnosis
    pub psychosocial: f64,
    /// One-time reduction of the psychosocial disutility after the first year
    pub psychosocial_reduction: f64,
}

/// Recurrent meningitis inputs (HSV-2)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecurrentMeningitis {
    /// Expected number of years over which episodes occur
    pub total_years: f64,
    /// Expected number of episodes
    pub total_episodes: f64,
    pub episode_duration: f64,
    pub disutility: f64,
}

/// Discounted losses of the symptomatic recurrent period, by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomaticLoss {
    /// Annual recurrence counts the losses were accrued over
    pub rates: Vec<f64>,
    pub recurrence: f64,
    pub urinary_retention: f64,
    pub psychosocial: f64,
    pub total: f64,
}

/// Loss calculator for one (sex, age of infection) cohort
#[derive(Debug, Clone, Copy)]
pub struct RecurrentPeriod<'a> {
    tables: &'a LifeTables,
    sex: Sex,
    age_of_infection: f64,
    discount: f64,
}

impl<'a> RecurrentPeriod<'a> {
    #[must_use]
    pub fn new(tables: &'a LifeTables, sex: Sex, age_of_infection: f64, discount: f64) -> Self {
        Self {
            tables,
            sex,
            age_of_infection,
            discount,
        }
    }

    /// Losses from declining symptomatic recurrences, their urinary retention
    /// risk and the psychosocial impact of diagnosis
    pub fn symptomatic_loss(
        &self,
        rates: &RecurrenceRates,
        disutilities: &RecurrenceDisutilities,
    ) -> Result<SymptomaticLoss, ModelError> {
        let rates = rates.sequence()?;
        let mut loss = SymptomaticLoss::default();

        // Not floored: a reduction above the initial disutility yields a gain
        let later_psychosocial = disutilities.psychosocial - disutilities.psychosocial_reduction;

        for (year, rate) in rates.iter().enumerate() {
            let t = year as f64;
            let age = self.age_of_infection + t;
            let (survival, psychosocial) = if year == 0 {
                (1.0, disutilities.psychosocial)
            } else {
                (
                    self.tables
                        .conditional_survival(self.age_of_infection, age, self.sex)?,
                    later_psychosocial,
                )
            };

            let recurrence =
                rate * age_adjusted_disutility(age, disutilities.outbreak) * disutilities.outbreak_duration;
            let urinary_retention = rate
                * disutilities.urinary_retention_probability
                * age_adjusted_disutility(age, disutilities.urinary_retention)
                * disutilities.urinary_retention_duration;
            let psychosocial = age_adjusted_disutility(age, psychosocial);

            let weight = survival / (1.0 + self.discount).powf(t);
            loss.recurrence += weight * recurrence;
            loss.urinary_retention += weight * urinary_retention;
            loss.psychosocial += weight * psychosocial;
            loss.total += weight * (recurrence + urinary_retention + psychosocial);
        }

        loss.rates = rates;
        Ok(loss)
    }

    /// Loss from `round(total_episodes)` evenly spaced meningitis episodes
    pub fn recurrent_meningitis_loss(&self, meningitis: &RecurrentMeningitis) -> Result<f64, ModelError> {
        let episodes = meningitis.total_episodes.round();
        if !(episodes >= 1.0) {
            return Ok(0.0);
        }
        if !(meningitis.total_years >= 0.0) {
            return Err(ParameterError::InvalidValue {
                name: "recurrent_meningitis_years",
                value: meningitis.total_years,
                reason: "must be non-negative",
            }
            .into());
        }

        let interval = meningitis.total_years / episodes;
        let mut age = self.age_of_infection;
        let mut total = 0.0;

        for _ in 0..episodes as u32 {
            let previous = age.round();
            age += interval;
            let current = age.round();

            let survival = self.tables.conditional_survival(previous, current, self.sex)?;
            let disutility = age_adjusted_disutility(current, meningitis.disutility);
            total += survival * disutility * meningitis.episode_duration
                / (1.0 + self.discount).powf(current - self.age_of_infection);
        }

        Ok(total)
    }

    /// Full recurrent-period outcome for a terminal branch
    pub fn outcome(
        &self,
        kind: RecurrenceType,
        rates: Option<&RecurrenceRates>,
        disutilities: &RecurrenceDisutilities,
        meningitis: Option<&RecurrentMeningitis>,
    ) -> Result<RecurrenceOutcome, ModelError> {
        let symptomatic = match (kind.has_recurrences(), rates) {
            (true, Some(rates)) => self.symptomatic_loss(rates, disutilities)?,
            _ => SymptomaticLoss::default(),
        };
        let meningitis = meningitis
            .map(|m| self.recurrent_meningitis_loss(m))
            .transpose()?;

        Ok(RecurrenceOutcome {
            kind,
            symptomatic,
            meningitis,
        })
    }
}

/// Recurrent-period losses attached to one terminal outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceOutcome {
    pub kind: RecurrenceType,
    pub symptomatic: SymptomaticLoss,
    /// Recurrent meningitis loss, when the branch carries that risk
    pub meningitis: Option<f64>,
}

impl RecurrenceOutcome {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.symptomatic.total + self.meningitis.unwrap_or(0.0)
    }

    /// Breakdown with recurrence losses filed under `recurrence_component`
    #[must_use]
    pub fn components(&self, recurrence_component: Component) -> ComponentMap {
        let mut map = ComponentMap::new();
        if self.kind.has_recurrences() {
            map.insert(recurrence_component, self.symptomatic.recurrence);
            map.insert(Component::UrinaryRetention, self.symptomatic.urinary_retention);
            map.insert(Component::Psychosocial, self.symptomatic.psychosocial);
        }
        if let Some(meningitis) = self.meningitis {
            map.insert(Component::RecurrentMeningitis, meningitis);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_recurrence_sequence() {
        let rates = recurrence_rates(2.62, 2.29, 0.5).unwrap();
        assert!(
            close(&rates, &[2.62, 2.29, 1.79, 1.29, 0.79]),
            "unexpected sequence {rates:?}"
        );
    }

    #[test]
    fn test_recurrence_sequence_integer_ratio() {
        // 1.0 / 0.5 is exactly two years: first and second year only
        let rates = recurrence_rates(1.14, 1.0, 0.5).unwrap();
        assert!(close(&rates, &[1.14, 1.0]), "{rates:?}");
    }

    #[test]
    fn test_recurrence_sequence_short() {
        assert!(close(&recurrence_rates(0.6, 0.3, 0.5).unwrap(), &[0.6]));
        assert!(recurrence_rates(0.4, -0.1, 0.5).unwrap().is_empty());
        assert!(recurrence_rates(0.4, 0.0, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_reduction() {
        assert!(recurrence_rates(2.0, 1.5, 0.0).is_err());
        assert!(recurrence_rates(2.0, 1.5, f64::NAN).is_err());
    }

    #[test]
    fn test_parse_recurrence_type() {
        assert_eq!("infrequent".parse::<RecurrenceType>().unwrap(), RecurrenceType::Infrequent);
        assert_eq!("no".parse::<RecurrenceType>().unwrap(), RecurrenceType::None);
        assert!(matches!(
            "weekly".parse::<RecurrenceType>(),
            Err(LookupError::UnknownRecurrenceType(_))
        ));
    }
}
