use pra_engine::expr::{Deviate, Expression};
use pra_engine::model::{
    Alignment, ArgRef, Branch, Connective, EventTree, FaultTree, Formula, InitiatingEvent,
    Instruction, Model, Phase, Sequence, SetHouseEvent,
};
use pra_engine::orchestrator::{Approximation, Settings, Target};
use pra_engine::preprocess::Algorithm;

fn two_component_or_model() -> (Model, f64) {
    let mut model = Model::new("or-system", 1.0);
    let a = model.add_basic_event("A", Expression::constant(0.1)).unwrap();
    let b = model.add_basic_event("B", Expression::constant(0.2)).unwrap();
    let top = model
        .add_gate("TOP", Formula::new(Connective::Or, vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false)]))
        .unwrap();
    model.add_fault_tree(FaultTree::new("FT", vec![top])).unwrap();
    (model, 0.1 + 0.2 - 0.1 * 0.2)
}

#[test]
fn bdd_and_mocus_agree_on_or_gate_probability() {
    let (model, expected) = two_component_or_model();

    let bdd_settings = Settings {
        algorithm: Algorithm::Bdd,
        approximation: Approximation::None,
        ..Settings::default()
    };
    let bdd_results = pra_engine::analyze(&model, &bdd_settings).unwrap();
    assert_eq!(bdd_results.len(), 1);
    assert!((bdd_results[0].p_total - expected).abs() < 1e-9);

    let mocus_settings = Settings {
        algorithm: Algorithm::Mocus,
        approximation: Approximation::RareEvent,
        ..Settings::default()
    };
    let mocus_results = pra_engine::analyze(&model, &mocus_settings).unwrap();
    assert_eq!(mocus_results.len(), 1);
    // rare-event approximation over two non-overlapping minimal cut sets
    // of order 1 each degenerates to the exact sum here.
    assert!((mocus_results[0].p_total - 0.3).abs() < 1e-9);
    let products = mocus_results[0].products.as_ref().unwrap();
    assert_eq!(products.products.len(), 2);
}

#[test]
fn cut_off_drops_low_probability_pairs() {
    let mut model = Model::new("cutoff", 1.0);
    let e0 = model.add_basic_event("E0", Expression::constant(0.5)).unwrap();
    let e1 = model.add_basic_event("E1", Expression::constant(0.5)).unwrap();
    let e2 = model.add_basic_event("E2", Expression::constant(0.001)).unwrap();
    let top = model
        .add_gate(
            "TOP",
            Formula::new(
                Connective::Atleast(2),
                vec![ArgRef::Basic(e0, false), ArgRef::Basic(e1, false), ArgRef::Basic(e2, false)],
            ),
        )
        .unwrap();
    model.add_fault_tree(FaultTree::new("FT", vec![top])).unwrap();

    let settings = Settings {
        algorithm: Algorithm::Mocus,
        approximation: Approximation::RareEvent,
        cut_off: 0.01, // E0*E1 = 0.25 survives; E0*E2 and E1*E2 = 5e-4 do not
        ..Settings::default()
    };
    let results = pra_engine::analyze(&model, &settings).unwrap();
    let products = results[0].products.as_ref().unwrap();
    assert_eq!(products.products.len(), 1);
    assert_eq!(products.products[0].literals.len(), 2);
}

#[test]
fn negated_literal_round_trips_through_bdd_preprocessing() {
    let mut model = Model::new("not-gate", 1.0);
    let a = model.add_basic_event("A", Expression::constant(0.3)).unwrap();
    let not_a = model.add_gate("NOT-A", Formula::new(Connective::Not, vec![ArgRef::Basic(a, false)])).unwrap();
    let top = model
        .add_gate("TOP", Formula::new(Connective::And, vec![ArgRef::Gate(not_a, false), ArgRef::Basic(a, true)]))
        .unwrap();
    model.add_fault_tree(FaultTree::new("FT", vec![top])).unwrap();

    let settings = Settings { algorithm: Algorithm::Bdd, approximation: Approximation::None, ..Settings::default() };
    let results = pra_engine::analyze(&model, &settings).unwrap();
    // NOT-A == NOT(A), ANDed with NOT(A) again (via the true-complement arg):
    // this is just P(not A) twice, i.e. P(not A).
    assert!((results[0].p_total - 0.7).abs() < 1e-9);
}

#[test]
fn event_tree_sequence_scales_by_initiating_event_frequency() {
    let mut model = Model::new("et-model", 1.0);
    let fe1_be = model.add_basic_event("FE1-BE", Expression::constant(0.1)).unwrap();
    let fe = model
        .add_gate("FE1-FAILS", Formula::new(Connective::Null, vec![ArgRef::Basic(fe1_be, false)]))
        .unwrap();

    let tree = EventTree::new(
        "T1",
        Branch::Fork {
            functional_event: fe,
            on_success: (vec![], Box::new(Branch::End("OK".into()))),
            on_failure: (vec![], Box::new(Branch::End("CD".into()))),
        },
        vec![Sequence { name: "OK".into() }, Sequence { name: "CD".into() }],
    );
    model.add_event_tree(tree);
    model.add_initiating_event(InitiatingEvent {
        name: "IE1".into(),
        frequency: Expression::constant(2.0),
        event_tree: Some("T1".into()),
    });

    let settings = Settings::default();
    let results = pra_engine::analyze(&model, &settings).unwrap();

    let cd = results
        .iter()
        .find(|r| matches!(&r.target, Target::Sequence { sequence, .. } if sequence == "CD"))
        .unwrap();
    // sequence CD requires FE1 to fail: frequency 2.0 * P(FE1 fails) = 2.0 * 0.1
    assert!((cd.p_total - 0.2).abs() < 1e-9);
}

#[test]
fn alignment_phase_rescales_mission_time_for_house_event_gated_basic_event() {
    let mut model = Model::new("phased", 10.0);
    let a = model.add_basic_event("A", Expression::constant(0.01)).unwrap();
    let h = model.add_house_event("MAINTENANCE", false);
    let top = model
        .add_gate(
            "TOP",
            Formula::new(Connective::And, vec![ArgRef::Basic(a, false), ArgRef::House(h, false)]),
        )
        .unwrap();
    model.add_fault_tree(FaultTree::new("FT", vec![top])).unwrap();
    model
        .add_alignment(Alignment {
            name: "NORMAL-OPS".into(),
            phases: vec![
                Phase { name: "RUNNING".into(), time_fraction: 0.5, instructions: vec![SetHouseEvent { house_event: h, state: false }] },
                Phase { name: "MAINTENANCE".into(), time_fraction: 0.5, instructions: vec![SetHouseEvent { house_event: h, state: true }] },
            ],
        })
        .unwrap();

    let settings = Settings { algorithm: Algorithm::Bdd, approximation: Approximation::None, ..Settings::default() };
    let results = pra_engine::analyze(&model, &settings).unwrap();
    assert_eq!(results.len(), 2);
    let running = results.iter().find(|r| r.phase.as_ref().unwrap().phase == "RUNNING").unwrap();
    let maintenance = results.iter().find(|r| r.phase.as_ref().unwrap().phase == "MAINTENANCE").unwrap();
    assert_eq!(running.p_total, 0.0);
    assert!((maintenance.p_total - 0.01).abs() < 1e-9);
}

#[test]
fn uncertainty_analysis_runs_for_deviate_expressions() {
    let mut model = Model::new("uncertain", 1.0);
    let a = model
        .add_basic_event("A", Expression::cached(Expression::deviate(Deviate::uniform(0.01, 0.05).unwrap())))
        .unwrap();
    let top = model.add_gate("TOP", Formula::new(Connective::Null, vec![ArgRef::Basic(a, false)])).unwrap();
    model.add_fault_tree(FaultTree::new("FT", vec![top])).unwrap();

    let settings = Settings {
        algorithm: Algorithm::Mocus,
        approximation: Approximation::RareEvent,
        uncertainty_analysis: true,
        num_trials: 500,
        num_quantiles: 10,
        num_bins: 10,
        seed: 7,
        ..Settings::default()
    };
    let results = pra_engine::analyze(&model, &settings).unwrap();
    let uncertainty = results[0].uncertainty.as_ref().expect("deviate expression should produce an uncertainty report");
    assert!(uncertainty.mean > 0.0 && uncertainty.mean < 1.0);
    assert!(uncertainty.ci95.0 <= uncertainty.mean && uncertainty.mean <= uncertainty.ci95.1);
}
