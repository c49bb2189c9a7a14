use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::life_table::{LifeTables, LongTermLoss, fixed_horizon_loss};
use crate::model::Component;
use crate::parameters::{EncephalitisSample, Hsv1Sample, PrimaryLosses};
use crate::recurrence::{RecurrenceOutcome, RecurrenceType, RecurrentPeriod};
use crate::tree::{DecisionGraph, Node, Payoff, evaluate};

use super::{Cohort, ROOT};

/// HSV-1 graph for one cohort plus the infrequent recurrence sequence it used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsv1Tree {
    pub graph: DecisionGraph,
    pub recurrence_rates: Vec<f64>,
}

/// Expected late-life encephalitis loss, valued at the time of infection.
///
/// Evaluated as its own small tree: `E0` splits on developing encephalitis at
/// the onset age, `E1` on the long-term outcome.
pub fn encephalitis_loss(
    encephalitis: &EncephalitisSample,
    tables: &LifeTables,
    cohort: &Cohort,
) -> Result<f64, ModelError> {
    let onset = encephalitis.onset_age;
    let acute = encephalitis.acute_disutility;
    let discount = cohort.discount;
    let sequelae = |disutility: f64| {
        LongTermLoss::new(onset, disutility, discount)
            .acute(acute)
            .evaluate(tables, cohort.sex)
    };

    let normal = sequelae(0.0)?;
    let mild = sequelae(encephalitis.mild_disutility)?;
    let moderate = sequelae(encephalitis.moderate_disutility)?;
    let severe = fixed_horizon_loss(
        onset,
        encephalitis.severe_life_expectancy,
        encephalitis.severe_disutility,
        onset - cohort.age_of_infection,
        discount,
    )?;
    let death = LongTermLoss::new(onset, 0.0, discount)
        .acute(acute)
        .qalys()
        .evaluate(tables, cohort.sex)?;

    let p = encephalitis.probability;
    let graph = DecisionGraph::new(ROOT)
        .with(ROOT, Node::decision("E0"))
        .with("E0", Node::chance(Payoff::default(), ["t0", "E1"], vec![1.0 - p, p]))
        .with(
            "E1",
            Node::chance(
                Payoff::default(),
                ["t1", "t2", "t3", "t4", "t5"],
                encephalitis.outcomes.clone(),
            ),
        )
        .with("t0", Node::terminal(Payoff::default()))
        .with("t1", Node::terminal(Payoff::attributed(Component::Encephalitis, normal)))
        .with("t2", Node::terminal(Payoff::attributed(Component::Encephalitis, mild)))
        .with("t3", Node::terminal(Payoff::attributed(Component::Encephalitis, moderate)))
        .with("t4", Node::terminal(Payoff::attributed(Component::Encephalitis, severe)))
        .with("t5", Node::terminal(Payoff::attributed(Component::Encephalitis, death)));

    Ok(evaluate(&graph)?.root_outcome().value)
}

/// Assemble the HSV-1 tree.
///
/// ```text
/// d1 -> c0 [symptomatic, asymptomatic]
///   c1 [normal, AM, UR] -> c3 [undiagnosed, diagnosed] -> c4 / c5
///                       -> c6 -> c8 (AM),  c7 -> c9 (UR)
///   c2 [no recurrence, infrequent] -> cn5 / cr5
/// c4, c5, c8, c9 -> [cnN, crN]
/// ```
pub fn build_hsv1_tree(
    sample: &Hsv1Sample,
    tables: &LifeTables,
    cohort: &Cohort,
) -> Result<Hsv1Tree, ModelError> {
    let &(first_year, second_year) = sample.recurrence.get(cohort.sex)?;
    let rates = sample.recurrence_rates(first_year, second_year);
    let disutilities = sample.recurrence_disutilities();

    let period = RecurrentPeriod::new(tables, cohort.sex, cohort.age_of_infection, cohort.discount);
    let no_recurrence = period.outcome(RecurrenceType::None, None, &disutilities, None)?;
    let infrequent = period.outcome(RecurrenceType::Infrequent, Some(&rates), &disutilities, None)?;

    let encephalitis = match &sample.encephalitis {
        Some(encephalitis) => encephalitis_loss(encephalitis, tables, cohort)?,
        None => 0.0,
    };

    let terminal = |outcome: &RecurrenceOutcome| {
        let mut components = outcome.components(Component::Recurrence);
        components.insert(Component::Encephalitis, encephalitis);
        Payoff::loss(outcome.total() + encephalitis).with_components(components)
    };
    let no_recurrence_payoff = terminal(&no_recurrence);
    let infrequent_payoff = terminal(&infrequent);

    let primary = PrimaryLosses::at_age(&sample.common, cohort.age_of_infection);
    let after_symptomatic = sample.recurrence_after_symptomatic();

    let mut graph = DecisionGraph::new(ROOT)
        .with(ROOT, Node::decision("c0"))
        .with("c0", Node::chance(Payoff::default(), ["c1", "c2"], sample.primary_type()))
        .with(
            "c1",
            Node::chance(Payoff::default(), ["c3", "c6", "c7"], sample.primary_outcome.clone()),
        )
        .with(
            "c2",
            Node::chance(Payoff::default(), ["cn5", "cr5"], sample.recurrence_after_asymptomatic()),
        )
        .with(
            "c3",
            Node::chance(Payoff::default(), ["c4", "c5"], sample.common.diagnosis_split()),
        )
        .with(
            "c4",
            Node::chance(
                Payoff::attributed(Component::Primary, primary.untreated),
                ["cn1", "cr1"],
                after_symptomatic.clone(),
            ),
        )
        .with(
            "c5",
            Node::chance(
                Payoff::attributed(Component::Primary, primary.treated),
                ["cn2", "cr2"],
                after_symptomatic.clone(),
            ),
        )
        .with(
            "c6",
            Node::chance(Payoff::attributed(Component::Primary, primary.treated), ["c8"], vec![1.0]),
        )
        .with(
            "c7",
            Node::chance(Payoff::attributed(Component::Primary, primary.treated), ["c9"], vec![1.0]),
        )
        .with(
            "c8",
            Node::chance(
                Payoff::attributed(Component::AsepticMeningitis, primary.aseptic_meningitis),
                ["cn3", "cr3"],
                after_symptomatic.clone(),
            ),
        )
        .with(
            "c9",
            Node::chance(
                Payoff::attributed(Component::UrinaryRetention, primary.urinary_retention),
                ["cn4", "cr4"],
                after_symptomatic,
            ),
        );

    for (none, recurrent) in [
        ("cn1", "cr1"),
        ("cn2", "cr2"),
        ("cn3", "cr3"),
        ("cn4", "cr4"),
        ("cn5", "cr5"),
    ] {
        graph.insert(none, Node::terminal(no_recurrence_payoff.clone()));
        graph.insert(recurrent, Node::terminal(infrequent_payoff.clone()));
    }

    Ok(Hsv1Tree {
        graph,
        recurrence_rates: infrequent.symptomatic.rates,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::model::Sex;
    use crate::parameters::Hsv1Parameters;
    use crate::tree::validate;

    #[test]
    fn test_tree_is_valid_for_every_cohort() {
        let tables = LifeTables::reference();
        let sample = Hsv1Parameters::default()
            .sample(&mut SmallRng::seed_from_u64(0), false)
            .unwrap();
        for sex in Sex::COHORTS {
            let tree = build_hsv1_tree(&sample, &tables, &Cohort::new(sex, 27.0, 0.03)).unwrap();
            assert_eq!(tree.graph.len(), 21);
            validate(&tree.graph).unwrap();
            assert!(!tree.recurrence_rates.is_empty());
        }
    }

    #[test]
    fn test_encephalitis_adds_to_terminals() {
        let tables = LifeTables::reference();
        let cohort = Cohort::new(Sex::Female, 21.0, 0.03);
        let params = Hsv1Parameters::default();
        let with = params.sample(&mut SmallRng::seed_from_u64(9), true).unwrap();
        let without = Hsv1Sample {
            encephalitis: None,
            ..with.clone()
        };

        let loss = encephalitis_loss(with.encephalitis.as_ref().unwrap(), &tables, &cohort).unwrap();
        assert!(loss > 0.0);

        let a = evaluate(&build_hsv1_tree(&with, &tables, &cohort).unwrap().graph).unwrap();
        let b = evaluate(&build_hsv1_tree(&without, &tables, &cohort).unwrap().graph).unwrap();
        let diff = a.root_outcome().value - b.root_outcome().value;
        assert!((diff - loss).abs() < 1e-12);
    }
}
