//! `Calculator` capability: anything that can turn a variable -> probability
//! map into a total probability, with an optional conditional variant
//! importance analysis can specialize.

use crate::bdd::{Bdd, BddRef};
use crate::zbdd::{ZRef, Zbdd};
use std::collections::HashMap;

pub trait Calculator {
    fn p_total(&self, p_vars: &HashMap<u32, f64>) -> f64;

    /// Total probability conditional on variable `var` forced to `state`.
    /// Default falls back to overriding `p_vars` and re-running `p_total`;
    /// `ExactBdd` overrides this with a direct BDD cofactor.
    fn cond(&self, p_vars: &HashMap<u32, f64>, var: u32, state: bool) -> f64 {
        let mut overridden = p_vars.clone();
        overridden.insert(var, if state { 1.0 } else { 0.0 });
        self.p_total(&overridden)
    }
}

/// Exact probability-of-1 evaluation on a BDD root.
pub struct ExactBdd<'b> {
    pub bdd: &'b Bdd,
    pub root: BddRef,
}

impl<'b> Calculator for ExactBdd<'b> {
    fn p_total(&self, p_vars: &HashMap<u32, f64>) -> f64 {
        self.bdd.probability(self.root, p_vars)
    }

    fn cond(&self, p_vars: &HashMap<u32, f64>, var: u32, state: bool) -> f64 {
        self.bdd.probability_given(self.root, var, state, p_vars)
    }
}

fn each_product_probability(zbdd: &Zbdd, root: ZRef, p_vars: &HashMap<u32, f64>) -> Vec<f64> {
    zbdd.enumerate(root)
        .into_iter()
        .map(|product| {
            product
                .iter()
                .map(|v| *p_vars.get(v).unwrap_or(&0.0))
                .product::<f64>()
        })
        .collect()
}

/// `p_total = min(1, sum of per-product probabilities)`, clamped; a
/// rare-event upper bound valid when per-product probabilities are small.
pub struct RareEvent<'z> {
    pub zbdd: &'z Zbdd,
    pub root: ZRef,
}

impl<'z> Calculator for RareEvent<'z> {
    fn p_total(&self, p_vars: &HashMap<u32, f64>) -> f64 {
        let sum: f64 = each_product_probability(self.zbdd, self.root, p_vars).into_iter().sum();
        if sum > 1.0 {
            log::warn!("RareEvent approximation clamped from {sum} to 1.0");
            1.0
        } else {
            sum
        }
    }
}

/// Min-cut upper bound: `p_total = 1 - prod(1 - p(product))`.
pub struct Mcub<'z> {
    pub zbdd: &'z Zbdd,
    pub root: ZRef,
}

impl<'z> Calculator for Mcub<'z> {
    fn p_total(&self, p_vars: &HashMap<u32, f64>) -> f64 {
        let complement: f64 = each_product_probability(self.zbdd, self.root, p_vars)
            .into_iter()
            .map(|p| 1.0 - p)
            .product();
        1.0 - complement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::Bdd;

    #[test]
    fn exact_bdd_matches_rare_event_for_small_or_probabilities() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let b = bdd.var_node(1);
        let top = bdd.ite(a, BddRef::TRUE, b);
        let mut p = HashMap::new();
        p.insert(0, 1e-4);
        p.insert(1, 2e-4);
        let exact = ExactBdd { bdd: &bdd, root: top };
        let exact_p = exact.p_total(&p);

        let mut z = Zbdd::new();
        let root = z.from_products(&[vec![0], vec![1]]);
        let rare = RareEvent { zbdd: &z, root };
        let mcub = Mcub { zbdd: &z, root };
        let rare_p = rare.p_total(&p);
        let mcub_p = mcub.p_total(&p);
        assert!(exact_p <= rare_p + 1e-9);
        assert!(exact_p <= mcub_p + 1e-9);
        assert!(mcub_p <= rare_p + 1e-9);
    }
}
