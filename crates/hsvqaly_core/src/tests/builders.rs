//! Tests for the virus-specific tree builders
//!
//! These tests verify:
//! - Every built graph passes integrity checks for all age groups
//! - Rebuilding from the same sample reproduces values bit for bit
//! - Root breakdowns add up to the expected loss

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::builders::{
    Cohort, NeonatalValuation, build_hsv1_tree, build_hsv2_tree, build_neonatal_trees,
};
use crate::life_table::{LifeTables, SequelaeDuration};
use crate::model::{Component, ComponentMap, NodeId, Sex};
use crate::parameters::{Hsv1Parameters, Hsv2Parameters, MaternalDisutilities, NeonatalParameters};
use crate::tree::{evaluate, validate};

const AGES: [f64; 4] = [21.0, 27.0, 32.0, 42.0];

fn assert_breakdown_matches(value: f64, components: &ComponentMap) {
    let sum: f64 = components.values().sum();
    assert!((sum - value).abs() < 1e-9, "components {sum} vs value {value}");
}

#[test]
fn test_hsv1_graphs_valid_and_decomposed() {
    let tables = LifeTables::reference();
    let sample = Hsv1Parameters::default()
        .sample(&mut SmallRng::seed_from_u64(4), true)
        .unwrap();

    for sex in Sex::COHORTS {
        for age in AGES {
            let tree = build_hsv1_tree(&sample, &tables, &Cohort::new(sex, age, 0.03)).unwrap();
            validate(&tree.graph).unwrap();
            let root = evaluate(&tree.graph).unwrap().root_outcome().clone();
            assert!(root.value > 0.0);
            assert_breakdown_matches(root.value, &root.components);
            assert!(root.components.contains_key(&Component::Primary));
            assert!(root.components.contains_key(&Component::Encephalitis));
        }
    }
}

#[test]
fn test_hsv2_graphs_valid_and_decomposed() {
    let tables = LifeTables::reference();
    let sample = Hsv2Parameters::default()
        .sample(&mut SmallRng::seed_from_u64(8))
        .unwrap();

    for sex in Sex::COHORTS {
        for age in AGES {
            let tree = build_hsv2_tree(&sample, &tables, &Cohort::new(sex, age, 0.03)).unwrap();
            validate(&tree.graph).unwrap();
            let root = evaluate(&tree.graph).unwrap().root_outcome().clone();
            assert_breakdown_matches(root.value, &root.components);
            for component in [
                Component::Infrequent,
                Component::FrequentNoCst,
                Component::FrequentCst,
                Component::Psychosocial,
            ] {
                assert!(root.components[&component] > 0.0, "{component:?} missing");
            }
        }
    }
}

#[test]
fn test_rebuild_is_bit_for_bit() {
    let tables = LifeTables::reference();
    let sample = Hsv2Parameters::default()
        .sample(&mut SmallRng::seed_from_u64(21))
        .unwrap();
    let cohort = Cohort::new(Sex::Female, 27.0, 0.03);

    let first = build_hsv2_tree(&sample, &tables, &cohort).unwrap();
    let second = build_hsv2_tree(&sample, &tables, &cohort).unwrap();
    assert_eq!(first, second);

    let a = evaluate(&first.graph).unwrap();
    let b = evaluate(&second.graph).unwrap();
    assert_eq!(a.root_outcome().value.to_bits(), b.root_outcome().value.to_bits());
}

#[test]
fn test_younger_cohorts_lose_more() {
    let tables = LifeTables::reference();
    let sample = Hsv1Parameters::default()
        .sample(&mut SmallRng::seed_from_u64(2), false)
        .unwrap();
    let loss = |age| {
        let tree = build_hsv1_tree(&sample, &tables, &Cohort::new(Sex::Male, age, 0.03)).unwrap();
        evaluate(&tree.graph).unwrap().root_outcome().value
    };
    // background utility weights are higher in younger age bands
    assert!(loss(21.0) > loss(42.0));
}

#[test]
fn test_neonatal_terminals_by_route() {
    let tables = LifeTables::reference();
    let maternal = MaternalDisutilities {
        mild: 0.05,
        moderate: 0.12,
        severe: 0.25,
    };
    let sample = NeonatalParameters::default()
        .sample(&mut SmallRng::seed_from_u64(6), maternal)
        .unwrap();
    let valuation = NeonatalValuation::new(&tables, &sample, 0.03, SequelaeDuration::Years(15.0));
    let trees = build_neonatal_trees(&valuation).unwrap();

    let combined = evaluate(&trees.combined).unwrap();
    let maternal_only = evaluate(&trees.maternal).unwrap();

    // normal outcomes cost nothing to infant or mother
    for id in ["t5", "t10", "t15"] {
        assert_eq!(combined.value(&NodeId::from_static(id)), Some(0.0));
        assert_eq!(maternal_only.value(&NodeId::from_static(id)), Some(0.0));
    }
    // demise and intrapartum death carry the same value
    assert_eq!(
        combined.value(&NodeId::from_static("t1")),
        combined.value(&NodeId::from_static("t19"))
    );
    for id in ["t11", "t12", "t13", "t14", "t2"] {
        let both = combined.value(&NodeId::from_static(id)).unwrap();
        let mother = maternal_only.value(&NodeId::from_static(id)).unwrap();
        assert!(both > mother, "{id}: {both} <= {mother}");
    }
}

#[test]
fn test_neonatal_lifetime_horizon_costs_more() {
    let tables = LifeTables::reference();
    let maternal = MaternalDisutilities {
        mild: 0.05,
        moderate: 0.12,
        severe: 0.25,
    };
    let sample = NeonatalParameters::default()
        .sample(&mut SmallRng::seed_from_u64(6), maternal)
        .unwrap();
    let root = |horizon| {
        let valuation = NeonatalValuation::new(&tables, &sample, 0.03, horizon);
        let trees = build_neonatal_trees(&valuation).unwrap();
        evaluate(&trees.combined).unwrap().root_outcome().value
    };
    assert!(root(SequelaeDuration::Lifetime) > root(SequelaeDuration::Years(15.0)));
}
