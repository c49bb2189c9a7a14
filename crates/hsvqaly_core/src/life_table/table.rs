use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ParameterError};
use crate::model::Sex;

/// One single-year interval `[age, age + 1)` of a period life table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeTableRow {
    pub age: u8,
    /// Probability of dying within the interval
    pub qx: f64,
    /// Fraction of the interval lived by those who die in it
    pub ax: f64,
    /// Fraction of the interval lived by those who survive it
    #[serde(default = "default_bx")]
    pub bx: f64,
}

fn default_bx() -> f64 {
    1.0
}

/// Age-indexed life table with precomputed survivorship
///
/// Rows are contiguous single-year intervals. `survivors[i]` is the fraction of
/// a birth cohort alive at the start of row `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LifeTableRow>", into = "Vec<LifeTableRow>")]
pub struct LifeTable {
    rows: Vec<LifeTableRow>,
    survivors: Vec<f64>,
}

impl LifeTable {
    pub fn new(rows: Vec<LifeTableRow>) -> Result<Self, ParameterError> {
        let Some(first) = rows.first() else {
            return Err(ParameterError::InvalidValue {
                name: "life_table",
                value: 0.0,
                reason: "table has no rows",
            });
        };

        let start = first.age;
        for (offset, row) in rows.iter().enumerate() {
            if usize::from(row.age) != usize::from(start) + offset {
                return Err(ParameterError::InvalidValue {
                    name: "life_table.age",
                    value: f64::from(row.age),
                    reason: "ages must be contiguous single years",
                });
            }
            if !(0.0..=1.0).contains(&row.qx) {
                return Err(ParameterError::InvalidValue {
                    name: "life_table.qx",
                    value: row.qx,
                    reason: "mortality must be within [0, 1]",
                });
            }
            if !(0.0..=1.0).contains(&row.ax) || !(row.bx > 0.0) {
                return Err(ParameterError::InvalidValue {
                    name: "life_table.ax",
                    value: row.ax,
                    reason: "interval factors out of range",
                });
            }
        }

        let mut survivors = Vec::with_capacity(rows.len());
        let mut alive = 1.0;
        for row in &rows {
            survivors.push(alive);
            alive *= 1.0 - row.qx;
        }

        Ok(Self { rows, survivors })
    }

    #[must_use]
    pub fn rows(&self) -> &[LifeTableRow] {
        &self.rows
    }

    #[must_use]
    pub fn min_age(&self) -> u8 {
        self.rows[0].age
    }

    #[must_use]
    pub fn max_age(&self) -> u8 {
        self.rows[self.rows.len() - 1].age
    }

    /// Row index for an age, rounded half away from zero
    pub fn index_of(&self, age: f64) -> Result<usize, LookupError> {
        let out_of_range = || LookupError::AgeOutOfRange {
            age,
            min: self.min_age(),
            max: self.max_age(),
        };

        let rounded = age.round();
        if !rounded.is_finite()
            || rounded < f64::from(self.min_age())
            || rounded > f64::from(self.max_age())
        {
            return Err(out_of_range());
        }
        Ok(rounded as usize - usize::from(self.min_age()))
    }

    /// Fraction of the cohort alive at the start of the interval containing `age`
    pub fn survivors(&self, age: f64) -> Result<f64, LookupError> {
        self.index_of(age).map(|i| self.survivors[i])
    }

    /// Probability of surviving from `age_young` to `age_old`.
    ///
    /// Returns 1.0 when the rounded ages coincide or `age_old` precedes
    /// `age_young`.
    pub fn conditional_survival(&self, age_young: f64, age_old: f64) -> Result<f64, LookupError> {
        let young = self.index_of(age_young)?;
        let old = self.index_of(age_old)?;
        if old <= young {
            return Ok(1.0);
        }
        let base = self.survivors[young];
        if base <= 0.0 {
            return Ok(0.0);
        }
        Ok((self.survivors[old] / base).clamp(0.0, 1.0))
    }
}

impl TryFrom<Vec<LifeTableRow>> for LifeTable {
    type Error = ParameterError;

    fn try_from(rows: Vec<LifeTableRow>) -> Result<Self, Self::Error> {
        LifeTable::new(rows)
    }
}

impl From<LifeTable> for Vec<LifeTableRow> {
    fn from(table: LifeTable) -> Self {
        table.rows
    }
}

/// Male, female and general-population tables
///
/// Loaded once before a run and shared read-only by every PSA iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeTables {
    pub male: LifeTable,
    pub female: LifeTable,
    pub general: LifeTable,
}

impl LifeTables {
    #[must_use]
    pub fn get(&self, sex: Sex) -> &LifeTable {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
            Sex::General => &self.general,
        }
    }

    /// `survivors(age_old) / survivors(age_young)` from the table for `sex`
    pub fn conditional_survival(
        &self,
        age_young: f64,
        age_old: f64,
        sex: Sex,
    ) -> Result<f64, LookupError> {
        self.get(sex).conditional_survival(age_young, age_old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_table(qx: f64) -> LifeTable {
        let rows = (0..=10)
            .map(|age| LifeTableRow {
                age,
                qx: if age == 10 { 1.0 } else { qx },
                ax: 0.5,
                bx: 1.0,
            })
            .collect();
        LifeTable::new(rows).unwrap()
    }

    #[test]
    fn test_survivors_compound() {
        let table = flat_table(0.1);
        let s3 = table.survivors(3.0).unwrap();
        assert!((s3 - 0.9_f64.powi(3)).abs() < 1e-12);
    }

    #[test]
    fn test_conditional_survival_ratio() {
        let table = flat_table(0.1);
        let p = table.conditional_survival(2.0, 5.0).unwrap();
        assert!((p - 0.9_f64.powi(3)).abs() < 1e-12, "got {p}");
    }

    #[test]
    fn test_ages_round_half_away_from_zero() {
        let table = flat_table(0.1);
        assert_eq!(table.index_of(2.5).unwrap(), 3);
        assert_eq!(table.index_of(2.49).unwrap(), 2);
    }

    #[test]
    fn test_out_of_range_age() {
        let table = flat_table(0.1);
        assert!(matches!(
            table.conditional_survival(0.0, 11.0),
            Err(LookupError::AgeOutOfRange { max: 10, .. })
        ));
        assert!(table.index_of(-1.0).is_err());
        assert!(table.index_of(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_gapped_ages() {
        let rows = vec![
            LifeTableRow {
                age: 0,
                qx: 0.01,
                ax: 0.1,
                bx: 1.0,
            },
            LifeTableRow {
                age: 2,
                qx: 0.01,
                ax: 0.5,
                bx: 1.0,
            },
        ];
        assert!(LifeTable::new(rows).is_err());
    }
}
