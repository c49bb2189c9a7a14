//! Built-in reference life tables
//!
//! Gompertz-Makeham mortality fitted to recent US period tables, used when no
//! tables are supplied. Intervals are single years from birth to the closing
//! age, where everybody dies.

use crate::model::{FEMALE_BIRTH_RATIO, MALE_BIRTH_RATIO};

use super::table::{LifeTable, LifeTableRow, LifeTables};

/// Last age of the reference tables (closing interval, `qx = 1`)
pub const REFERENCE_MAX_AGE: u8 = 110;

#[derive(Debug, Clone, Copy)]
struct Mortality {
    infant_qx: f64,
    infant_ax: f64,
    /// Age-independent (Makeham) hazard
    background: f64,
    /// Gompertz level and slope
    level: f64,
    slope: f64,
}

const MALE: Mortality = Mortality {
    infant_qx: 0.0062,
    infant_ax: 0.09,
    background: 0.0008,
    level: 0.000_067,
    slope: 0.085,
};

const FEMALE: Mortality = Mortality {
    infant_qx: 0.0052,
    infant_ax: 0.10,
    background: 0.0004,
    level: 0.000_040,
    slope: 0.088,
};

impl Mortality {
    fn qx(&self, age: u8) -> f64 {
        if age == 0 {
            return self.infant_qx;
        }
        if age >= REFERENCE_MAX_AGE {
            return 1.0;
        }
        let hazard = self.background + self.level * (self.slope * f64::from(age)).exp();
        (1.0 - (-hazard).exp()).min(1.0)
    }

    fn ax(&self, age: u8) -> f64 {
        if age == 0 { self.infant_ax } else { 0.5 }
    }
}

fn build(qx: impl Fn(u8) -> f64, ax: impl Fn(u8) -> f64) -> LifeTable {
    let rows = (0..=REFERENCE_MAX_AGE)
        .map(|age| LifeTableRow {
            age,
            qx: qx(age),
            ax: ax(age),
            bx: 1.0,
        })
        .collect();
    // Rows are contiguous and in range by construction
    match LifeTable::new(rows) {
        Ok(table) => table,
        Err(err) => unreachable!("reference life table is malformed: {err}"),
    }
}

impl LifeTables {
    /// Reference male, female and birth-ratio mixed general tables
    #[must_use]
    pub fn reference() -> Self {
        let general_qx = |age| MALE_BIRTH_RATIO * MALE.qx(age) + FEMALE_BIRTH_RATIO * FEMALE.qx(age);
        let general_ax = |age| MALE_BIRTH_RATIO * MALE.ax(age) + FEMALE_BIRTH_RATIO * FEMALE.ax(age);

        LifeTables {
            male: build(|age| MALE.qx(age), |age| MALE.ax(age)),
            female: build(|age| FEMALE.qx(age), |age| FEMALE.ax(age)),
            general: build(general_qx, general_ax),
        }
    }
}

impl Default for LifeTables {
    fn default() -> Self {
        LifeTables::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;

    #[test]
    fn test_reference_covers_full_range() {
        let tables = LifeTables::reference();
        for sex in [Sex::Male, Sex::Female, Sex::General] {
            let table = tables.get(sex);
            assert_eq!(table.min_age(), 0);
            assert_eq!(table.max_age(), REFERENCE_MAX_AGE);
            assert_eq!(table.rows()[usize::from(REFERENCE_MAX_AGE)].qx, 1.0);
        }
    }

    #[test]
    fn test_female_outlives_male() {
        let tables = LifeTables::reference();
        let male = tables.conditional_survival(30.0, 80.0, Sex::Male).unwrap();
        let female = tables.conditional_survival(30.0, 80.0, Sex::Female).unwrap();
        assert!(female > male, "female {female} should exceed male {male}");
        // Plausible order of magnitude for a modern population
        assert!(male > 0.4 && male < 0.8, "male 30->80 survival {male}");
    }
}
