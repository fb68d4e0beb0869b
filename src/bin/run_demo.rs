//! Builds two small models in-process and runs the engine over each,
//! printing the resulting point probabilities and cut sets.

use pra_engine::expr::{Deviate, Expression};
use pra_engine::model::{ArgRef, Connective, FaultTree, Formula, Model};
use pra_engine::orchestrator::{Approximation, Settings};
use pra_engine::preprocess::Algorithm;
use pra_engine::{analyze, logging};

fn two_out_of_three_system() -> Model {
    let mut model = Model::new("two-out-of-three", 8760.0);
    let a = model.add_basic_event("PUMP-A", Expression::constant(1e-3)).unwrap();
    let b = model.add_basic_event("PUMP-B", Expression::constant(1e-3)).unwrap();
    let c = model.add_basic_event("PUMP-C", Expression::constant(1e-3)).unwrap();
    let top = model
        .add_gate(
            "SYSTEM-FAILS",
            Formula::new(
                Connective::Atleast(2),
                vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false), ArgRef::Basic(c, false)],
            ),
        )
        .unwrap();
    model.add_fault_tree(FaultTree::new("TWO-OF-THREE", vec![top])).unwrap();
    model
}

fn uncertain_valve_model() -> Model {
    let mut model = Model::new("uncertain-valve", 8760.0);
    let valve = model
        .add_basic_event(
            "VALVE-STICKS",
            Expression::cached(Expression::deviate(Deviate::uniform(5e-4, 2e-3).unwrap())),
        )
        .unwrap();
    let sensor = model.add_basic_event("SENSOR-FAILS", Expression::constant(2e-4)).unwrap();
    let top = model
        .add_gate(
            "PROTECTION-FAILS",
            Formula::new(Connective::Or, vec![ArgRef::Basic(valve, false), ArgRef::Basic(sensor, false)]),
        )
        .unwrap();
    model.add_fault_tree(FaultTree::new("PROTECTION", vec![top])).unwrap();
    model
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let system = two_out_of_three_system();
    let settings = Settings {
        algorithm: Algorithm::Bdd,
        approximation: Approximation::None,
        importance_analysis: true,
        ..Settings::default()
    };
    let results = analyze(&system, &settings)?;
    for result in &results {
        log::info!("{:?}: p_total = {:.6e}", result.target, result.p_total);
        for (var, factors) in &result.importance {
            log::info!("  variable {var}: RAW={:.3} RRW={:.3}", factors.raw, factors.rrw);
        }
    }

    let valve_model = uncertain_valve_model();
    let settings = Settings {
        algorithm: Algorithm::Mocus,
        approximation: Approximation::RareEvent,
        uncertainty_analysis: true,
        num_trials: 2000,
        seed: 42,
        ..Settings::default()
    };
    let results = analyze(&valve_model, &settings)?;
    for result in &results {
        log::info!("{:?}: p_total = {:.6e}", result.target, result.p_total);
        if let Some(uncertainty) = &result.uncertainty {
            log::info!(
                "  mean={:.6e} sigma={:.6e} ci95=({:.6e}, {:.6e})",
                uncertainty.mean, uncertainty.sigma, uncertainty.ci95.0, uncertainty.ci95.1
            );
        }
    }

    Ok(())
}
