//! Background utility and long-horizon QALY integration over a life table

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ModelError, ParameterError};
use crate::model::{FEMALE_BIRTH_RATIO, MALE_BIRTH_RATIO, Sex};

use super::table::LifeTables;

/// Background (population norm) utility weight for an age.
///
/// Under 18 there is no age-related decline and the weight is 1.0.
#[must_use]
pub fn background_utility(age: f64) -> f64 {
    match age {
        a if a < 18.0 => 1.0,
        a if a < 30.0 => 0.922,
        a if a < 40.0 => 0.901,
        a if a < 50.0 => 0.871,
        a if a < 60.0 => 0.842,
        a if a < 70.0 => 0.823,
        a if a < 80.0 => 0.790,
        _ => 0.736,
    }
}

/// Disutility scaled by the background utility weight at `age`
#[must_use]
pub fn age_adjusted_disutility(age: f64, disutility: f64) -> f64 {
    background_utility(age) * disutility
}

/// How long the sequelae last after onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequelaeDuration {
    Lifetime,
    /// Whole years are counted in full, a fractional final year pro rata
    Years(f64),
}

/// Mortality added on top of the life table from onset
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExcessMortality {
    #[default]
    None,
    /// Fixed probability added to every `qx`
    Additive { rate: f64, years: Option<f64> },
    /// Total mortality floor; the excess is `max(rate - qx, 0)`
    Total { rate: f64, years: Option<f64> },
}

impl ExcessMortality {
    fn excess(&self, qx: f64, years_since_onset: f64) -> f64 {
        let within = |years: &Option<f64>| years.is_none_or(|y| years_since_onset < y);
        match self {
            ExcessMortality::None => 0.0,
            ExcessMortality::Additive { rate, years } if within(years) => *rate,
            ExcessMortality::Total { rate, years } if within(years) => (rate - qx).max(0.0),
            _ => 0.0,
        }
    }
}

/// Whether to report QALYs lost to the sequelae or QALYs lived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossMode {
    #[default]
    Loss,
    Qalys,
}

/// Query for the discounted, background-adjusted QALYs of a long-term condition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongTermLoss {
    pub age_onset: f64,
    /// Sequelae disutility applied every year from onset
    pub disutility: f64,
    /// Extra disutility carried in the onset year only
    pub acute_disutility: f64,
    pub discount: f64,
    pub duration: SequelaeDuration,
    pub excess_mortality: ExcessMortality,
    pub mode: LossMode,
}

impl LongTermLoss {
    #[must_use]
    pub fn new(age_onset: f64, disutility: f64, discount: f64) -> Self {
        Self {
            age_onset,
            disutility,
            acute_disutility: 0.0,
            discount,
            duration: SequelaeDuration::Lifetime,
            excess_mortality: ExcessMortality::None,
            mode: LossMode::Loss,
        }
    }

    #[must_use]
    pub fn acute(mut self, acute_disutility: f64) -> Self {
        self.acute_disutility = acute_disutility;
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: SequelaeDuration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn excess_mortality(mut self, excess_mortality: ExcessMortality) -> Self {
        self.excess_mortality = excess_mortality;
        self
    }

    /// Report QALYs lived instead of QALYs lost
    #[must_use]
    pub fn qalys(mut self) -> Self {
        self.mode = LossMode::Qalys;
        self
    }

    /// Integrate year by year from onset over the table for `sex`
    pub fn evaluate(&self, tables: &LifeTables, sex: Sex) -> Result<f64, ModelError> {
        if !(self.discount >= 0.0 && self.discount < 1.0) {
            return Err(ParameterError::InvalidValue {
                name: "discount",
                value: self.discount,
                reason: "discount rate must be within [0, 1)",
            }
            .into());
        }
        if let SequelaeDuration::Years(years) = self.duration
            && !(years >= 0.0)
        {
            return Err(ParameterError::InvalidValue {
                name: "sequelae_duration",
                value: years,
                reason: "duration must be non-negative",
            }
            .into());
        }

        let table = tables.get(sex);
        let onset = table.index_of(self.age_onset)?;
        let rows = &table.rows()[onset..];

        let mut total = 0.0;
        let mut alive = 1.0;
        let mut cumulative_years = 0.0;

        for (years_since_onset, row) in rows.iter().enumerate() {
            let elapsed = years_since_onset as f64;
            let qx = (row.qx + self.excess_mortality.excess(row.qx, elapsed)).min(1.0);
            let person_years = (row.ax * qx + row.bx * (1.0 - qx)) * alive;

            let start = cumulative_years;
            cumulative_years += person_years;
            let discounted = discounted_person_years(start, cumulative_years, self.discount);

            let weight = match self.duration {
                SequelaeDuration::Lifetime => 1.0,
                SequelaeDuration::Years(years) => (years - elapsed).clamp(0.0, 1.0),
            };
            if weight <= 0.0 {
                break;
            }

            let disutility = if years_since_onset == 0 {
                self.disutility + self.acute_disutility
            } else {
                self.disutility
            };
            let quality = match self.mode {
                LossMode::Loss => disutility,
                LossMode::Qalys => 1.0 - disutility,
            };

            total += weight * discounted * background_utility(f64::from(row.age)) * quality;
            alive *= 1.0 - qx;
        }

        Ok(total)
    }

    /// Combine male and female results with the sex ratio at birth
    pub fn evaluate_mixed_sex(&self, tables: &LifeTables) -> Result<f64, ModelError> {
        let male = self.evaluate(tables, Sex::Male)?;
        let female = self.evaluate(tables, Sex::Female)?;
        Ok(MALE_BIRTH_RATIO * male + FEMALE_BIRTH_RATIO * female)
    }
}

/// Discounted person-years between cumulative person-year marks `from` and `to`
fn discounted_person_years(from: f64, to: f64, discount: f64) -> f64 {
    if discount == 0.0 {
        return to - from;
    }
    let v = 1.0 - discount;
    ((1.0 - v.powf(to)) - (1.0 - v.powf(from))) / discount
}

/// Discounted, age-adjusted loss over `round(years)` whole years, no survival weighting.
///
/// `years_since_infection` offsets the discount exponent so the result is
/// expressed at the time of infection.
pub fn fixed_horizon_loss(
    start_age: f64,
    years: f64,
    disutility: f64,
    years_since_infection: f64,
    discount: f64,
) -> Result<f64, LookupError> {
    if !start_age.is_finite() {
        return Err(LookupError::AgeOutOfRange {
            age: start_age,
            min: 0,
            max: u8::MAX,
        });
    }
    let whole_years = if years.is_finite() && years > 0.0 {
        years.round() as u32
    } else {
        0
    };

    Ok((0..whole_years)
        .map(|i| {
            let i = f64::from(i);
            age_adjusted_disutility(start_age + i, disutility)
                / (1.0 + discount).powf(years_since_infection + i)
        })
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_utility_bands() {
        assert_eq!(background_utility(0.0), 1.0);
        assert_eq!(background_utility(17.9), 1.0);
        assert_eq!(background_utility(18.0), 0.922);
        assert_eq!(background_utility(42.0), 0.871);
        assert_eq!(background_utility(79.5), 0.790);
        assert_eq!(background_utility(95.0), 0.736);
    }

    #[test]
    fn test_age_adjusted_disutility() {
        assert!((age_adjusted_disutility(32.0, 0.15) - 0.901 * 0.15).abs() < 1e-15);
    }

    #[test]
    fn test_zero_disutility_has_no_loss() {
        let tables = LifeTables::reference();
        let loss = LongTermLoss::new(30.0, 0.0, 0.03)
            .evaluate(&tables, Sex::Female)
            .unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_acute_disutility_only_in_onset_year() {
        let tables = LifeTables::reference();
        let acute = LongTermLoss::new(61.0, 0.0, 0.03)
            .acute(0.13)
            .evaluate(&tables, Sex::Male)
            .unwrap();
        let onset_row = tables.male.rows()[61];
        let person_years = onset_row.ax * onset_row.qx + onset_row.bx * (1.0 - onset_row.qx);
        let expected = discounted_person_years(0.0, person_years, 0.03) * 0.823 * 0.13;
        assert!((acute - expected).abs() < 1e-12, "{acute} vs {expected}");
    }

    #[test]
    fn test_limited_duration_is_bounded_by_years() {
        let tables = LifeTables::reference();
        let five = LongTermLoss::new(0.0, 0.5, 0.0)
            .duration(SequelaeDuration::Years(5.0))
            .evaluate(&tables, Sex::General)
            .unwrap();
        assert!(five < 2.5 && five > 2.4, "five years at 0.5 disutility: {five}");

        let half = LongTermLoss::new(0.0, 0.5, 0.0)
            .duration(SequelaeDuration::Years(5.5))
            .evaluate(&tables, Sex::General)
            .unwrap();
        assert!(half > five && half < five + 0.25 + 1e-9);
    }

    #[test]
    fn test_excess_mortality_reduces_qalys() {
        let tables = LifeTables::reference();
        let base = LongTermLoss::new(40.0, 0.0, 0.03).qalys();
        let plain = base.evaluate(&tables, Sex::Male).unwrap();
        let additive = base
            .excess_mortality(ExcessMortality::Additive {
                rate: 0.05,
                years: None,
            })
            .evaluate(&tables, Sex::Male)
            .unwrap();
        let limited = base
            .excess_mortality(ExcessMortality::Additive {
                rate: 0.05,
                years: Some(5.0),
            })
            .evaluate(&tables, Sex::Male)
            .unwrap();
        assert!(additive < limited && limited < plain);
    }

    #[test]
    fn test_total_mortality_floor() {
        let excess = ExcessMortality::Total {
            rate: 0.1,
            years: None,
        };
        assert!((excess.excess(0.02, 0.0) - 0.08).abs() < 1e-15);
        assert_eq!(excess.excess(0.3, 0.0), 0.0);
    }

    #[test]
    fn test_invalid_discount_rejected() {
        let tables = LifeTables::reference();
        assert!(
            LongTermLoss::new(20.0, 0.1, 1.5)
                .evaluate(&tables, Sex::Male)
                .is_err()
        );
    }

    #[test]
    fn test_fixed_horizon_loss() {
        let loss = fixed_horizon_loss(61.0, 3.8, 0.54, 0.0, 0.0).unwrap();
        // round(3.8) = 4 years in the 60-69 band
        assert!((loss - 4.0 * 0.823 * 0.54).abs() < 1e-12);

        let discounted = fixed_horizon_loss(61.0, 2.0, 0.5, 10.0, 0.03).unwrap();
        let expected = 0.823 * 0.5 / 1.03_f64.powi(10) + 0.823 * 0.5 / 1.03_f64.powi(11);
        assert!((discounted - expected).abs() < 1e-12);
    }
}
