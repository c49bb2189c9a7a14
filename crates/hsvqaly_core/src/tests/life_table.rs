//! Tests for the life-table engine against the reference tables
//!
//! These tests verify:
//! - Conditional survival is 1 on the diagonal and non-increasing with age
//! - Undiscounted long-term integrals match a direct survival-weighted sum
//! - Discounting, durations and sex mixing move losses the expected way

use crate::life_table::{
    LifeTable, LifeTables, LongTermLoss, REFERENCE_MAX_AGE, SequelaeDuration, background_utility,
};
use crate::model::{FEMALE_BIRTH_RATIO, MALE_BIRTH_RATIO, Sex};

/// Survival-weighted background utility from `onset` to the end of the table
fn direct_integral(table: &LifeTable, onset: u8) -> f64 {
    let mut alive = 1.0;
    let mut total = 0.0;
    for row in table.rows().iter().filter(|row| row.age >= onset) {
        total += (row.ax * row.qx + row.bx * (1.0 - row.qx)) * alive * background_utility(f64::from(row.age));
        alive *= 1.0 - row.qx;
    }
    total
}

#[test]
fn test_survival_is_one_on_the_diagonal() {
    let tables = LifeTables::reference();
    for sex in [Sex::Male, Sex::Female, Sex::General] {
        for age in 0..=REFERENCE_MAX_AGE {
            let age = f64::from(age);
            assert_eq!(tables.conditional_survival(age, age, sex).unwrap(), 1.0);
        }
    }
}

#[test]
fn test_survival_non_increasing_with_age() {
    let tables = LifeTables::reference();
    for sex in Sex::COHORTS {
        for young in [0.0, 18.0, 45.0] {
            let mut previous = 1.0;
            for old in (young as u8)..=REFERENCE_MAX_AGE {
                let p = tables.conditional_survival(young, f64::from(old), sex).unwrap();
                assert!(p <= previous, "{sex}: S({young}, {old}) = {p} > {previous}");
                assert!((0.0..=1.0).contains(&p));
                previous = p;
            }
        }
    }
}

#[test]
fn test_undiscounted_qalys_match_direct_integral() {
    let tables = LifeTables::reference();
    for sex in Sex::COHORTS {
        let qalys = LongTermLoss::new(30.0, 0.0, 0.0)
            .qalys()
            .evaluate(&tables, sex)
            .unwrap();
        let direct = direct_integral(tables.get(sex), 30);
        assert!((qalys - direct).abs() < 1e-9, "{sex}: {qalys} vs {direct}");
    }
}

#[test]
fn test_undiscounted_loss_scales_with_disutility() {
    let tables = LifeTables::reference();
    let loss = LongTermLoss::new(40.0, 0.2, 0.0)
        .evaluate(&tables, Sex::Female)
        .unwrap();
    let direct = 0.2 * direct_integral(&tables.female, 40);
    assert!((loss - direct).abs() < 1e-9);
}

#[test]
fn test_discounting_reduces_loss() {
    let tables = LifeTables::reference();
    let undiscounted = LongTermLoss::new(25.0, 0.1, 0.0).evaluate(&tables, Sex::Male).unwrap();
    let discounted = LongTermLoss::new(25.0, 0.1, 0.03).evaluate(&tables, Sex::Male).unwrap();
    assert!(discounted < undiscounted);
    assert!(discounted > 0.0);
}

#[test]
fn test_limited_duration_grows_with_horizon() {
    let tables = LifeTables::reference();
    let loss = |years| {
        LongTermLoss::new(0.0, 0.3, 0.03)
            .duration(SequelaeDuration::Years(years))
            .evaluate_mixed_sex(&tables)
            .unwrap()
    };
    let lifetime = LongTermLoss::new(0.0, 0.3, 0.03)
        .evaluate_mixed_sex(&tables)
        .unwrap();

    assert!(loss(5.0) < loss(5.5));
    assert!(loss(5.5) < loss(15.0));
    assert!(loss(15.0) < lifetime);
    assert_eq!(loss(0.0), 0.0);
}

#[test]
fn test_mixed_sex_uses_birth_ratio() {
    let tables = LifeTables::reference();
    let query = LongTermLoss::new(10.0, 0.05, 0.03);
    let male = query.evaluate(&tables, Sex::Male).unwrap();
    let female = query.evaluate(&tables, Sex::Female).unwrap();
    let mixed = query.evaluate_mixed_sex(&tables).unwrap();
    assert!((mixed - (MALE_BIRTH_RATIO * male + FEMALE_BIRTH_RATIO * female)).abs() < 1e-12);
    assert!(mixed > male.min(female) && mixed < male.max(female));
}

#[test]
fn test_onset_outside_table_is_a_lookup_error() {
    let tables = LifeTables::reference();
    let result = LongTermLoss::new(f64::from(REFERENCE_MAX_AGE) + 5.0, 0.1, 0.03)
        .evaluate(&tables, Sex::Female);
    assert!(result.is_err());
}
