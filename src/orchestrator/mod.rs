//! Top-level driver: validates settings, walks alignments/phases, expands
//! every fault-tree top event and event-tree sequence into a PDAG, runs the
//! configured qualitative engine, and layers on probability/importance/
//! uncertainty analysis as requested.

mod event_tree;
mod guard;
mod settings;
mod types;

pub use event_tree::{synthesize, SequenceResult};
pub use guard::{HouseEventGuard, MissionTimeGuard};
pub use settings::{Approximation, Settings};
pub use types::{AnalysisResult, PhaseContext, Product, ProductContainer, Target, Timings};

use crate::analyze::{
    Calculator, ExactBdd, ImportanceAnalyzer, Mcub, ProbabilityAnalyzer, RareEvent,
    UncertaintyAnalyzer,
};
use crate::bdd::Bdd;
use crate::error::Result;
use crate::mocus::{self, MocusSettings};
use crate::model::{Formula, GateId, HouseEventId, Model};
use crate::pdag::{NodeId, PdagArtifacts, PdagBuilder, VariableSource};
use crate::preprocess::{preprocess_for, Algorithm, PreprocessOptions};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// `Formula::new(Connective::And/Null, [ArgRef::Gate(g, false)])` — a
/// sequence whose formula trivially wraps a single real gate, unwrapped so
/// we can suppress re-analyzing that gate as a fault-tree top.
fn as_bare_gate_wrapper(formula: &Formula) -> Option<GateId> {
    if formula.args().len() == 1 {
        if let crate::model::ArgRef::Gate(g, false) = formula.args()[0] {
            return Some(g);
        }
    }
    None
}

pub fn analyze(model: &Model, settings: &Settings) -> Result<Vec<AnalysisResult>> {
    settings.validate()?;
    if settings.seed >= 0 {
        crate::expr::seed_rng(settings.seed as u64);
    }

    let mut results = Vec::new();
    let mut analyzed_tops: HashSet<GateId> = HashSet::new();

    // Event-tree sequences first, so their bare-gate wrappers (if any) are
    // known before the fault-tree top loop runs.
    for ie in model.initiating_events() {
        let Some(tree_name) = &ie.event_tree else {
            continue;
        };
        let Some(tree) = model.event_tree(tree_name) else {
            continue;
        };
        for sequence in synthesize(tree) {
            if let Some(formula) = &sequence.formula {
                if let Some(g) = as_bare_gate_wrapper(formula) {
                    analyzed_tops.insert(g);
                }
            }
        }
    }

    if model.alignments().is_empty() {
        run_all_targets(model, settings, None, &analyzed_tops, &mut results)?;
    } else {
        for alignment in model.alignments() {
            for phase in &alignment.phases {
                let instructions: Vec<(HouseEventId, bool)> = phase
                    .instructions
                    .iter()
                    .map(|i| (i.house_event, i.state))
                    .collect();
                let _house_guard = HouseEventGuard::apply(model, &instructions);
                let _time_guard = MissionTimeGuard::scale(model.mission_time(), phase.time_fraction);
                let context = PhaseContext {
                    alignment: alignment.name.clone(),
                    phase: phase.name.clone(),
                };
                run_all_targets(model, settings, Some(context), &analyzed_tops, &mut results)?;
            }
        }
    }
    Ok(results)
}

fn run_all_targets(
    model: &Model,
    settings: &Settings,
    phase: Option<PhaseContext>,
    analyzed_tops: &HashSet<GateId>,
    results: &mut Vec<AnalysisResult>,
) -> Result<()> {
    for ie in model.initiating_events() {
        let Some(tree_name) = &ie.event_tree else {
            continue;
        };
        let Some(tree) = model.event_tree(tree_name) else {
            continue;
        };
        for sequence in synthesize(tree) {
            let target = Target::Sequence {
                initiating_event: ie.name.clone(),
                sequence: sequence.sequence.clone(),
            };
            let Some(formula) = &sequence.formula else {
                // Expression-only path: no boolean content to analyze, just
                // a frequency-scaled point value.
                results.push(AnalysisResult {
                    target,
                    phase: phase.clone(),
                    products: None,
                    p_total: ie.frequency_value() * sequence.expression_factor,
                    p_of_t: Vec::new(),
                    sil: None,
                    importance: HashMap::new(),
                    uncertainty: None,
                    timings: Timings::default(),
                });
                continue;
            };
            let house_instructions = &sequence.house_event_instructions;
            let _guard = HouseEventGuard::apply(model, house_instructions);
            let artifacts = PdagBuilder::build_virtual(model, formula);
            let freq = ie.frequency_value() * sequence.expression_factor;
            let result = run_analysis(model, settings, artifacts, target, phase.clone(), freq)?;
            results.push(result);
        }
    }

    for fault_tree in model.fault_trees() {
        for &top in &fault_tree.top_gates {
            if analyzed_tops.contains(&top) {
                continue;
            }
            let target = Target::FaultTreeTop {
                fault_tree: fault_tree.name.clone(),
                gate: model.gate(top).name.clone(),
            };
            let artifacts = PdagBuilder::build(top, model);
            let result = run_analysis(model, settings, artifacts, target, phase.clone(), 1.0)?;
            results.push(result);
        }
    }
    Ok(())
}

fn build_p_vars(
    artifacts: &PdagArtifacts,
    processed: &crate::pdag::Pdag,
    var_map: &HashMap<NodeId, NodeId>,
    model: &Model,
) -> HashMap<u32, f64> {
    let mut p_vars = HashMap::new();
    for (&source_var, built_var) in var_map {
        let Some(source) = artifacts.variable_source.get(&source_var) else {
            continue;
        };
        let p = match source {
            VariableSource::Basic(bid) => model.basic_event(*bid).probability(),
            VariableSource::CcfDerived(v) => *v,
        };
        p_vars.insert(processed.variable_order(*built_var), p);
    }
    p_vars
}

fn count_occurrences(products: &[Vec<u32>]) -> HashMap<u32, usize> {
    let mut occurrence = HashMap::new();
    for product in products {
        for &v in product {
            *occurrence.entry(v).or_insert(0) += 1;
        }
    }
    occurrence
}

fn collect_deviates(
    artifacts: &PdagArtifacts,
    processed: &crate::pdag::Pdag,
    var_map: &HashMap<NodeId, NodeId>,
    model: &Model,
) -> HashMap<u32, crate::expr::Expression> {
    let mut deviates = HashMap::new();
    for (&source_var, built_var) in var_map {
        if let Some(VariableSource::Basic(bid)) = artifacts.variable_source.get(&source_var) {
            let event = model.basic_event(*bid);
            if event.expression.is_deviate() {
                deviates.insert(processed.variable_order(*built_var), event.expression.clone());
            }
        }
    }
    deviates
}

fn run_analysis(
    model: &Model,
    settings: &Settings,
    artifacts: PdagArtifacts,
    target: Target,
    phase: Option<PhaseContext>,
    freq: f64,
) -> Result<AnalysisResult> {
    let mut timings = Timings::default();

    let preprocess_opts = PreprocessOptions {
        expand_atleast_gates: settings.expand_atleast_gates,
        expand_xor_gates: settings.expand_xor_gates,
        compilation_level: settings.compilation_level,
    };
    let t0 = Instant::now();
    let (processed, var_map) = preprocess_for(&artifacts.pdag, settings.algorithm, &preprocess_opts);
    timings.preprocessing = t0.elapsed();

    let p_vars = build_p_vars(&artifacts, &processed, &var_map, model);

    let t1 = Instant::now();
    let (bdd, bdd_root, zbdd, zbdd_root, products) = match settings.algorithm {
        Algorithm::Bdd => {
            let (bdd, root) = Bdd::build(&processed);
            (Some(bdd), Some(root), None, None, None)
        }
        Algorithm::Mocus | Algorithm::Zbdd => {
            let mocus_settings = MocusSettings {
                limit_order: settings.limit_order,
                cut_off: settings.cut_off,
                prime_implicants: settings.prime_implicants,
            };
            let (zbdd, root) = mocus::analyze(&processed, &p_vars, &mocus_settings);
            let products = zbdd.enumerate(root);
            (None, None, Some(zbdd), Some(root), Some(products))
        }
    };
    timings.qualitative = t1.elapsed();

    let reverse_var_map: HashMap<NodeId, NodeId> =
        var_map.iter().map(|(&src, &built)| (built, src)).collect();
    let name_of = |built_var_node: NodeId| -> String {
        reverse_var_map
            .get(&built_var_node)
            .and_then(|src| artifacts.variable_source.get(src))
            .map(|source| match source {
                VariableSource::Basic(bid) => model.basic_event(*bid).name.clone(),
                VariableSource::CcfDerived(_) => "ccf-derived".to_string(),
            })
            .unwrap_or_default()
    };

    let order_to_node: HashMap<u32, NodeId> = processed
        .variables()
        .map(|v| (processed.variable_order(v), v))
        .collect();

    let product_container = products.as_ref().map(|prods| {
        let mut container = ProductContainer::default();
        for product in prods {
            let literals = product
                .iter()
                .map(|&order| {
                    let node = order_to_node.get(&order).copied().unwrap_or(processed.true_node());
                    (name_of(node), false)
                })
                .collect();
            let probability = Some(
                product
                    .iter()
                    .map(|v| *p_vars.get(v).unwrap_or(&0.0))
                    .product(),
            );
            container.push(Product { literals, probability });
        }
        container
    });

    let occurrence = products
        .as_ref()
        .map(|p| count_occurrences(p))
        .unwrap_or_default();

    let t2 = Instant::now();
    let calculator: Box<dyn Calculator + '_> = match (&bdd, &zbdd) {
        (Some(bdd), _) => Box::new(ExactBdd {
            bdd,
            root: bdd_root.unwrap(),
        }),
        (None, Some(zbdd)) => match settings.approximation {
            Approximation::RareEvent => Box::new(RareEvent {
                zbdd,
                root: zbdd_root.unwrap(),
            }),
            Approximation::Mcub => Box::new(Mcub {
                zbdd,
                root: zbdd_root.unwrap(),
            }),
            Approximation::None => unreachable!("validated: MOCUS/ZBDD always pick an approximation"),
        },
        (None, None) => unreachable!("exactly one engine runs per algorithm"),
    };

    let mission_time_cell = model.mission_time();
    let mission_time = mission_time_cell.get();
    // Re-reads every basic event's probability after `cell.set(t)`, so
    // expressions built on `Expression::mission_time(model.mission_time())`
    // pick up the rescaled time instead of a frozen snapshot.
    let resample = |_t: f64| build_p_vars(&artifacts, &processed, &var_map, model);

    let (p_total, p_of_t, sil) = if settings.probability_analysis {
        let analyzer = ProbabilityAnalyzer::run(
            calculator.as_ref(),
            p_vars.clone(),
            Some(mission_time_cell.as_ref()),
            mission_time,
            settings.time_step,
            resample,
            settings.safety_integrity_levels,
        );
        let p_of_t: Vec<(f64, f64)> = analyzer.p_of_t.into_iter().map(|(t, p)| (t, p * freq)).collect();
        (analyzer.p_total * freq, p_of_t, analyzer.sil)
    } else {
        (calculator.p_total(&p_vars) * freq, Vec::new(), None)
    };

    let mut importance = HashMap::new();
    if settings.importance_analysis {
        let unscaled_total = calculator.p_total(&p_vars);
        importance = ImportanceAnalyzer::run(calculator.as_ref(), &p_vars, unscaled_total, &occurrence);
    }

    let mut uncertainty = None;
    if settings.uncertainty_analysis {
        let deviates = collect_deviates(&artifacts, &processed, &var_map, model);
        if !deviates.is_empty() {
            uncertainty = Some(UncertaintyAnalyzer::run(
                calculator.as_ref(),
                &p_vars,
                &deviates,
                settings.num_trials,
                settings.num_quantiles,
                settings.num_bins,
            ));
        }
    }
    timings.quantitative = t2.elapsed();

    Ok(AnalysisResult {
        target,
        phase,
        products: product_container,
        p_total,
        p_of_t,
        sil,
        importance,
        uncertainty,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;
    use crate::model::{ArgRef, Connective, FaultTree};

    fn two_event_or_model() -> Model {
        let mut model = Model::new("m", 8760.0);
        let a = model.add_basic_event("A", Expression::constant(0.1)).unwrap();
        let b = model.add_basic_event("B", Expression::constant(0.2)).unwrap();
        let top = model
            .add_gate("TOP", Formula::new(Connective::Or, vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false)]))
            .unwrap();
        model.add_fault_tree(FaultTree::new("FT1", vec![top])).unwrap();
        model
    }

    #[test]
    fn bdd_exact_or_probability_matches_inclusion_exclusion() {
        let model = two_event_or_model();
        let settings = Settings {
            algorithm: Algorithm::Bdd,
            approximation: Approximation::None,
            ..Settings::default()
        };
        let results = analyze(&model, &settings).unwrap();
        assert_eq!(results.len(), 1);
        let expected = 0.1 + 0.2 - 0.1 * 0.2;
        assert!((results[0].p_total - expected).abs() < 1e-9);
    }

    #[test]
    fn mocus_rare_event_upper_bounds_exact_probability() {
        let model = two_event_or_model();
        let settings = Settings {
            algorithm: Algorithm::Mocus,
            approximation: Approximation::RareEvent,
            ..Settings::default()
        };
        let results = analyze(&model, &settings).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].p_total - 0.3).abs() < 1e-9);
        assert_eq!(results[0].products.as_ref().unwrap().products.len(), 2);
    }
}
