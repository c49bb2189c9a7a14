use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::life_table::LifeTables;
use crate::model::Component;
use crate::parameters::{Hsv2Sample, PrimaryLosses};
use crate::recurrence::{RecurrenceOutcome, RecurrenceType, RecurrentPeriod};
use crate::tree::{DecisionGraph, Node, Payoff};

use super::{Cohort, ROOT};

/// Recurrence kinds in the branch order of every post-primary split
const RECURRENCE_BRANCHES: [RecurrenceType; 4] = [
    RecurrenceType::None,
    RecurrenceType::Infrequent,
    RecurrenceType::Frequent,
    RecurrenceType::FrequentCst,
];

/// Annual recurrence counts per recurrence category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hsv2RecurrenceRates {
    pub infrequent: Vec<f64>,
    pub frequent: Vec<f64>,
    pub frequent_cst: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsv2Tree {
    pub graph: DecisionGraph,
    pub recurrence_rates: Hsv2RecurrenceRates,
}

fn terminal(outcome: &RecurrenceOutcome) -> Node {
    // cohorts without recurrences only carry the meningitis component
    let component = outcome
        .kind
        .hsv2_component()
        .unwrap_or(Component::Infrequent);
    Node::terminal(Payoff::loss(outcome.total()).with_components(outcome.components(component)))
}

/// Assemble the HSV-2 tree.
///
/// ```text
/// d1 -> c0 [symptomatic, asymptomatic]
///   c1 [normal, AM, UR]
///     c3 [undiagnosed, diagnosed] -> c6 (group 1) / c7 (group 2)
///     c4 -> c10 (AM) [no RM, RM] -> c8 (group 3) / c9 (group 4)
///     c5 -> c11 (UR) -> group 5
///   c2 [no recurrence, infrequent] -> t6 / ri6
/// group N: [tN, riN, rfN, rfcN] = [none, infrequent, frequent, frequent + CST]
/// ```
///
/// Only group 4 carries recurrent meningitis.
pub fn build_hsv2_tree(
    sample: &Hsv2Sample,
    tables: &LifeTables,
    cohort: &Cohort,
) -> Result<Hsv2Tree, ModelError> {
    let cohort_sample = sample.sex.get(cohort.sex)?;
    let disutilities = sample.recurrence_disutilities(cohort_sample);
    let period = RecurrentPeriod::new(tables, cohort.sex, cohort.age_of_infection, cohort.discount);

    let outcome = |kind: RecurrenceType, meningitis: bool| {
        let rates = sample.recurrence_rates(cohort_sample, kind);
        period.outcome(
            kind,
            rates.as_ref(),
            &disutilities,
            meningitis.then_some(&sample.meningitis),
        )
    };

    let mut without_meningitis = Vec::with_capacity(RECURRENCE_BRANCHES.len());
    let mut with_meningitis = Vec::with_capacity(RECURRENCE_BRANCHES.len());
    for kind in RECURRENCE_BRANCHES {
        without_meningitis.push(outcome(kind, false)?);
        with_meningitis.push(outcome(kind, true)?);
    }

    let primary = PrimaryLosses::at_age(&sample.common, cohort.age_of_infection);
    let after_symptomatic = sample.recurrence_after_symptomatic.clone();

    let mut graph = DecisionGraph::new(ROOT)
        .with(ROOT, Node::decision("c0"))
        .with("c0", Node::chance(Payoff::default(), ["c1", "c2"], sample.primary_type()))
        .with(
            "c1",
            Node::chance(
                Payoff::default(),
                ["c3", "c4", "c5"],
                cohort_sample.primary_outcome.clone(),
            ),
        )
        .with(
            "c2",
            Node::chance(Payoff::default(), ["t6", "ri6"], sample.recurrence_after_asymptomatic()),
        )
        .with(
            "c3",
            Node::chance(Payoff::default(), ["c6", "c7"], sample.common.diagnosis_split()),
        )
        .with(
            "c4",
            Node::chance(Payoff::attributed(Component::Primary, primary.treated), ["c10"], vec![1.0]),
        )
        .with(
            "c5",
            Node::chance(Payoff::attributed(Component::Primary, primary.treated), ["c11"], vec![1.0]),
        )
        .with(
            "c6",
            Node::chance(
                Payoff::attributed(Component::Primary, primary.untreated),
                ["t1", "ri1", "rf1", "rfc1"],
                after_symptomatic.clone(),
            ),
        )
        .with(
            "c7",
            Node::chance(
                Payoff::attributed(Component::Primary, primary.treated),
                ["t2", "ri2", "rf2", "rfc2"],
                after_symptomatic.clone(),
            ),
        )
        .with(
            "c8",
            Node::chance(Payoff::default(), ["t3", "ri3", "rf3", "rfc3"], after_symptomatic.clone()),
        )
        .with(
            "c9",
            Node::chance(Payoff::default(), ["t4", "ri4", "rf4", "rfc4"], after_symptomatic.clone()),
        )
        .with(
            "c10",
            Node::chance(
                Payoff::attributed(Component::AsepticMeningitis, primary.aseptic_meningitis),
                ["c8", "c9"],
                sample.meningitis_split(),
            ),
        )
        .with(
            "c11",
            Node::chance(
                Payoff::attributed(Component::UrinaryRetention, primary.urinary_retention),
                ["t5", "ri5", "rf5", "rfc5"],
                after_symptomatic,
            ),
        )
        .with("t6", Node::terminal(Payoff::default()))
        .with("ri6", terminal(&without_meningitis[1]));

    let groups: [([&'static str; 4], &[RecurrenceOutcome]); 5] = [
        (["t1", "ri1", "rf1", "rfc1"], &without_meningitis),
        (["t2", "ri2", "rf2", "rfc2"], &without_meningitis),
        (["t3", "ri3", "rf3", "rfc3"], &without_meningitis),
        (["t4", "ri4", "rf4", "rfc4"], &with_meningitis),
        (["t5", "ri5", "rf5", "rfc5"], &without_meningitis),
    ];
    for (ids, outcomes) in groups {
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            graph.insert(id, terminal(outcome));
        }
    }

    let recurrence_rates = Hsv2RecurrenceRates {
        infrequent: without_meningitis[1].symptomatic.rates.clone(),
        frequent: without_meningitis[2].symptomatic.rates.clone(),
        frequent_cst: without_meningitis[3].symptomatic.rates.clone(),
    };

    Ok(Hsv2Tree {
        graph,
        recurrence_rates,
    })
}
