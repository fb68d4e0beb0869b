//! Top-down module-based minimal-cut-set expansion, folding directly into a
//! [`Zbdd`] rather than materializing raw product lists: every gate is a
//! memoized module, AND-gates join by `Product`, OR-gates join by `Union`,
//! and `limit_order`/`cut_off` prune after every join so cut sets never grow
//! past the configured bound mid-expansion.

use crate::model::Connective;
use crate::pdag::{NodeKind, Pdag};
use crate::zbdd::{ZRef, Zbdd};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct MocusSettings {
    pub limit_order: usize,
    pub cut_off: f64,
    pub prime_implicants: bool,
}

impl Default for MocusSettings {
    fn default() -> Self {
        Self {
            limit_order: 20,
            cut_off: 1e-8,
            prime_implicants: false,
        }
    }
}

/// Expands `pdag` (already preprocessed to NNF) into the ZBDD family of its
/// minimal cut sets, pruned by `settings`.
pub fn analyze(pdag: &Pdag, p_vars: &HashMap<u32, f64>, settings: &MocusSettings) -> (Zbdd, ZRef) {
    assert!(!settings.prime_implicants, "MOCUS does not support prime implicants — use BDD");
    let mut zbdd = Zbdd::new();
    let mut memo: HashMap<crate::pdag::NodeId, ZRef> = HashMap::new();
    let mut root = build_node(&mut zbdd, pdag, pdag.root(), p_vars, settings, &mut memo);
    root = zbdd.minimize(root);
    (zbdd, root)
}

fn build_node(
    zbdd: &mut Zbdd,
    pdag: &Pdag,
    id: crate::pdag::NodeId,
    p_vars: &HashMap<u32, f64>,
    settings: &MocusSettings,
    memo: &mut HashMap<crate::pdag::NodeId, ZRef>,
) -> ZRef {
    if let Some(&r) = memo.get(&id) {
        return r;
    }
    let result = match pdag.node(id).kind.clone() {
        NodeKind::Variable { .. } => zbdd.singleton(pdag.variable_order(id)),
        NodeKind::Constant => {
            // unreachable under a valid NNF PDAG (`has_constants` is false),
            // but a trivially-TRUE/FALSE root is still a degenerate valid
            // model; treat the shared constant node as TRUE.
            ZRef::BASE
        }
        NodeKind::Gate(g) => {
            let child_refs: Vec<ZRef> = g
                .args()
                .map(|edge| {
                    debug_assert!(!edge.complement, "MOCUS requires positive literals only");
                    build_node(zbdd, pdag, edge.target, p_vars, settings, memo)
                })
                .collect();
            let mut acc = match g.connective {
                Connective::And => child_refs
                    .into_iter()
                    .fold(ZRef::BASE, |acc, r| zbdd.product(acc, r)),
                Connective::Or => {
                    let unioned = child_refs
                        .into_iter()
                        .fold(ZRef::EMPTY, |acc, r| zbdd.union(acc, r));
                    zbdd.minimize(unioned)
                }
                other => unreachable!("NNF permits only AND/OR, found {other:?}"),
            };
            if settings.limit_order > 0 {
                acc = zbdd.cardinality_cutoff(acc, settings.limit_order);
            }
            if settings.cut_off > 0.0 {
                acc = zbdd.probability_cutoff(acc, settings.cut_off, p_vars);
            }
            acc
        }
    };
    memo.insert(id, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArgRef, Formula, Model};
    use crate::pdag::PdagBuilder;
    use crate::preprocess::{preprocess_for, Algorithm, PreprocessOptions};

    #[test]
    fn two_independent_basic_events_or_gate_has_two_singleton_cut_sets() {
        let mut model = Model::new("m", 8760.0);
        let a = model.add_basic_event("A", crate::expr::Expression::constant(0.1)).unwrap();
        let b = model.add_basic_event("B", crate::expr::Expression::constant(0.2)).unwrap();
        let top = model
            .add_gate("TOP", Formula::new(Connective::Or, vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false)]))
            .unwrap();
        let artifacts = PdagBuilder::build(top, &model);
        let (nnf, var_map) = preprocess_for(&artifacts.pdag, Algorithm::Mocus, &PreprocessOptions::default());
        let mut p_vars = HashMap::new();
        for (source_var, built_var) in &var_map {
            if let Some(crate::pdag::VariableSource::Basic(bid)) = artifacts.variable_source.get(source_var) {
                p_vars.insert(nnf.variable_order(*built_var), model.basic_event(*bid).probability());
            }
        }
        let (zbdd, root) = analyze(&nnf, &p_vars, &MocusSettings::default());
        assert_eq!(zbdd.count(root), 2);
    }

    #[test]
    fn and_of_two_basic_events_has_one_cut_set_of_order_two() {
        let mut model = Model::new("m", 8760.0);
        let a = model.add_basic_event("A", crate::expr::Expression::constant(0.1)).unwrap();
        let b = model.add_basic_event("B", crate::expr::Expression::constant(0.2)).unwrap();
        let top = model
            .add_gate("TOP", Formula::new(Connective::And, vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false)]))
            .unwrap();
        let artifacts = PdagBuilder::build(top, &model);
        let (nnf, _var_map) = preprocess_for(&artifacts.pdag, Algorithm::Mocus, &PreprocessOptions::default());
        let mut p_vars = HashMap::new();
        for v in nnf.variables() {
            p_vars.insert(nnf.variable_order(v), 0.1);
        }
        let (zbdd, root) = analyze(&nnf, &p_vars, &MocusSettings::default());
        let products = zbdd.enumerate(root);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].len(), 2);
    }
}
