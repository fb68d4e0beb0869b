//! `ImportanceAnalyzer`: MIF/CIF/DIF/RAW/RRW per basic event.

use super::calculator::Calculator;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportanceFactors {
    pub occurrence: usize,
    pub probability: f64,
    pub mif: f64,
    pub cif: f64,
    pub dif: f64,
    pub raw: f64,
    pub rrw: f64,
}

pub struct ImportanceAnalyzer;

impl ImportanceAnalyzer {
    /// `occurrence[v]` is the number of products containing `v` (pass an
    /// empty map, defaulting every count to 1, for BDD-only paths where
    /// products aren't materialized).
    pub fn run(
        calculator: &dyn Calculator,
        p_vars: &HashMap<u32, f64>,
        p_total: f64,
        occurrence: &HashMap<u32, usize>,
    ) -> HashMap<u32, ImportanceFactors> {
        let mut out = HashMap::with_capacity(p_vars.len());
        for (&v, &pv) in p_vars {
            let p_on = calculator.cond(p_vars, v, true);
            let p_off = calculator.cond(p_vars, v, false);
            let mif = p_on - p_off;
            let cif = if p_total > 0.0 { pv * mif / p_total } else { 0.0 };
            let dif = if p_total > 0.0 {
                pv * (1.0 - p_off / p_total)
            } else {
                0.0
            };
            let raw = if p_total > 0.0 { p_on / p_total } else { 0.0 };
            let rrw = if p_off > 0.0 { p_total / p_off } else { f64::MAX };
            out.insert(
                v,
                ImportanceFactors {
                    occurrence: occurrence.get(&v).copied().unwrap_or(1),
                    probability: pv,
                    mif,
                    cif,
                    dif,
                    raw,
                    rrw,
                },
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::{Bdd, BddRef};
    use crate::analyze::calculator::ExactBdd;

    #[test]
    fn mif_identity_holds_for_or_gate() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let b = bdd.var_node(1);
        let top = bdd.ite(a, BddRef::TRUE, b);
        let mut p = HashMap::new();
        p.insert(0, 0.1);
        p.insert(1, 0.2);
        let calc = ExactBdd { bdd: &bdd, root: top };
        let p_total = calc.p_total(&p);
        let occ = HashMap::new();
        let factors = ImportanceAnalyzer::run(&calc, &p, p_total, &occ);
        for (&v, f) in &factors {
            let p_off = calc.cond(&p, v, false);
            let p_on = calc.cond(&p, v, true);
            assert!((f.mif + p_off - p_on).abs() < 1e-12);
            let expected_cif = *p.get(&v).unwrap() * f.mif / p_total;
            assert!((f.cif - expected_cif).abs() < 1e-12);
        }
    }
}
