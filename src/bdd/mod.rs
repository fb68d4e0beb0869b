//! Reduced-ordered BDD with complement edges and an ITE kernel.

use crate::model::Connective;
use crate::pdag::{Edge, NodeKind, Pdag};
use std::collections::HashMap;

/// A signed reference into a [`Bdd`]'s node arena. Index 0 is reserved for
/// the single shared terminal; `complement` toggles TRUE/FALSE and, for
/// non-terminal nodes, the polarity of the low edge (complement edges kept
/// canonically on low, never high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BddRef {
    index: u32,
    pub complement: bool,
}

impl BddRef {
    pub const TRUE: BddRef = BddRef {
        index: 0,
        complement: false,
    };
    pub const FALSE: BddRef = BddRef {
        index: 0,
        complement: true,
    };

    fn is_terminal(&self) -> bool {
        self.index == 0
    }

    pub fn negate(self) -> Self {
        Self {
            complement: !self.complement,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ite {
    var: u32,
    high: BddRef,
    low: BddRef,
}

/// Unique and compute tables; purged on a high-water mark rather than
/// tracked by generation, since each `Bdd` lives for one analysis target
/// only (no cross-target sharing).
pub struct Bdd {
    nodes: Vec<Ite>,
    unique: HashMap<(u32, BddRef, BddRef), u32>,
    compute: HashMap<(BddRef, BddRef, BddRef), BddRef>,
    compute_high_water: usize,
}

impl Default for Bdd {
    fn default() -> Self {
        Self::new()
    }
}

impl Bdd {
    pub fn new() -> Self {
        Self {
            // index 0 is an unused placeholder so BddRef::TRUE/FALSE can
            // point at a real (if never-read) slot.
            nodes: vec![Ite {
                var: u32::MAX,
                high: BddRef::TRUE,
                low: BddRef::FALSE,
            }],
            unique: HashMap::new(),
            compute: HashMap::new(),
            compute_high_water: 1 << 16,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn var_of(&self, r: BddRef) -> u32 {
        if r.is_terminal() {
            u32::MAX
        } else {
            self.nodes[r.index as usize].var
        }
    }

    fn restrict(&self, r: BddRef, x: u32) -> (BddRef, BddRef) {
        if r.is_terminal() {
            return (r, r);
        }
        let node = self.nodes[r.index as usize];
        if node.var == x {
            if r.complement {
                (node.high.negate(), node.low.negate())
            } else {
                (node.high, node.low)
            }
        } else {
            (r, r)
        }
    }

    /// Creates `Unique(var, TRUE, FALSE)` — the canonical node for a bare
    /// variable literal.
    pub fn var_node(&mut self, var: u32) -> BddRef {
        self.unique(var, BddRef::TRUE, BddRef::FALSE)
    }

    fn unique(&mut self, var: u32, mut high: BddRef, mut low: BddRef) -> BddRef {
        if high == low {
            return high;
        }
        let mut comp = false;
        if high.complement {
            high = high.negate();
            low = low.negate();
            comp = true;
        }
        let key = (var, high, low);
        let index = *self.unique.entry(key).or_insert_with(|| {
            self.nodes.push(Ite { var, high, low });
            (self.nodes.len() - 1) as u32
        });
        let r = BddRef {
            index,
            complement: false,
        };
        if comp {
            r.negate()
        } else {
            r
        }
    }

    /// The ITE kernel: `f ? g : h`, fully reduced and memoized.
    pub fn ite(&mut self, f: BddRef, g: BddRef, h: BddRef) -> BddRef {
        if f == BddRef::TRUE {
            return g;
        }
        if f == BddRef::FALSE {
            return h;
        }
        if g == h {
            return g;
        }
        if g == BddRef::TRUE && h == BddRef::FALSE {
            return f;
        }
        if g == BddRef::FALSE && h == BddRef::TRUE {
            return f.negate();
        }
        let key = (f, g, h);
        if let Some(&cached) = self.compute.get(&key) {
            return cached;
        }
        let x = self.var_of(f).min(self.var_of(g)).min(self.var_of(h));
        let (f1, f0) = self.restrict(f, x);
        let (g1, g0) = self.restrict(g, x);
        let (h1, h0) = self.restrict(h, x);
        let high = self.ite(f1, g1, h1);
        let low = self.ite(f0, g0, h0);
        let result = self.unique(x, high, low);
        if self.compute.len() >= self.compute_high_water {
            self.compute.clear();
        }
        self.compute.insert(key, result);
        result
    }

    fn and(&mut self, refs: &[BddRef]) -> BddRef {
        refs.iter()
            .fold(BddRef::TRUE, |acc, &r| self.ite(r, acc, BddRef::FALSE))
    }

    fn or(&mut self, refs: &[BddRef]) -> BddRef {
        refs.iter()
            .fold(BddRef::FALSE, |acc, &r| self.ite(r, BddRef::TRUE, acc))
    }

    fn xor(&mut self, refs: &[BddRef]) -> BddRef {
        refs.iter()
            .fold(BddRef::FALSE, |acc, &r| self.ite(r, acc.negate(), acc))
    }

    fn iff(&mut self, refs: &[BddRef]) -> BddRef {
        refs.iter()
            .fold(BddRef::TRUE, |acc, &r| self.ite(r, acc, acc.negate()))
    }

    /// `ATLEAST(k)` over `refs`, built by the standard head/tail threshold
    /// recursion; relies on the ITE compute cache rather than its own memo
    /// table since calls with identical `(f,g,h)` triples already share
    /// results.
    fn atleast(&mut self, refs: &[BddRef], k: usize) -> BddRef {
        if k == 0 {
            return BddRef::TRUE;
        }
        if refs.len() < k {
            return BddRef::FALSE;
        }
        let (head, tail) = refs.split_first().unwrap();
        let with_head = self.atleast(tail, k - 1);
        let without_head = self.atleast(tail, k);
        self.ite(*head, with_head, without_head)
    }

    fn build_gate(&mut self, connective: Connective, refs: &[BddRef]) -> BddRef {
        match connective {
            Connective::And | Connective::Null => self.and(refs),
            Connective::Or => self.or(refs),
            Connective::Not => refs[0].negate(),
            Connective::Xor => self.xor(refs),
            Connective::Nand => self.and(refs).negate(),
            Connective::Nor => self.or(refs).negate(),
            Connective::Iff => self.iff(refs),
            Connective::Imply => self.ite(refs[0], refs[1], BddRef::TRUE),
            Connective::Atleast(k) => self.atleast(refs, k),
            Connective::Cardinality(l, h) => {
                let lo = self.atleast(refs, l);
                let hi = self.atleast(refs, h + 1).negate();
                self.ite(lo, hi, BddRef::FALSE)
            }
        }
    }

    fn build_node(
        &mut self,
        pdag: &Pdag,
        id: crate::pdag::NodeId,
        memo: &mut HashMap<crate::pdag::NodeId, BddRef>,
    ) -> BddRef {
        if let Some(&r) = memo.get(&id) {
            return r;
        }
        let result = match pdag.node(id).kind.clone() {
            NodeKind::Constant => BddRef::TRUE,
            NodeKind::Variable { .. } => self.var_node(pdag.variable_order(id)),
            NodeKind::Gate(g) => {
                let refs: Vec<BddRef> = g
                    .args()
                    .map(|edge: Edge| self.edge_ref(pdag, edge, memo))
                    .collect();
                self.build_gate(g.connective, &refs)
            }
        };
        memo.insert(id, result);
        result
    }

    fn edge_ref(
        &mut self,
        pdag: &Pdag,
        edge: Edge,
        memo: &mut HashMap<crate::pdag::NodeId, BddRef>,
    ) -> BddRef {
        let base = self.build_node(pdag, edge.target, memo);
        if edge.complement {
            base.negate()
        } else {
            base
        }
    }

    /// Builds a BDD for `pdag`'s root by a post-order pass: each Gate maps
    /// to its ITE, each Variable to `Unique(var_order, TRUE, FALSE)`.
    pub fn build(pdag: &Pdag) -> (Bdd, BddRef) {
        let mut bdd = Bdd::new();
        let mut memo = HashMap::new();
        let mut root = bdd.build_node(pdag, pdag.root(), &mut memo);
        if pdag.complement {
            root = root.negate();
        }
        (bdd, root)
    }

    /// Probability of `root` evaluating TRUE given `p_vars` (variable order
    /// -> probability), via recursive evaluation with per-call memoization.
    pub fn probability(&self, root: BddRef, p_vars: &HashMap<u32, f64>) -> f64 {
        let mut memo = HashMap::new();
        self.probability_rec(root, p_vars, &mut memo)
    }

    fn probability_rec(
        &self,
        r: BddRef,
        p_vars: &HashMap<u32, f64>,
        memo: &mut HashMap<BddRef, f64>,
    ) -> f64 {
        if r == BddRef::TRUE {
            return 1.0;
        }
        if r == BddRef::FALSE {
            return 0.0;
        }
        if let Some(&v) = memo.get(&r) {
            return v;
        }
        let node = self.nodes[r.index as usize];
        let (high, low) = if r.complement {
            (node.high.negate(), node.low.negate())
        } else {
            (node.high, node.low)
        };
        let pv = *p_vars.get(&node.var).unwrap_or(&0.0);
        let result =
            pv * self.probability_rec(high, p_vars, memo) + (1.0 - pv) * self.probability_rec(low, p_vars, memo);
        memo.insert(r, result);
        result
    }

    /// Probability of `root` conditional on variable `var` being forced to
    /// `state`, by overriding `p_vars[var]` to 0/1 before evaluating — the
    /// generic path every `Calculator::cond` falls back to.
    pub fn probability_given(&self, root: BddRef, var: u32, state: bool, p_vars: &HashMap<u32, f64>) -> f64 {
        let mut overridden = p_vars.clone();
        overridden.insert(var, if state { 1.0 } else { 0.0 });
        self.probability(root, &overridden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_of_two_vars_matches_product_of_probabilities() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let b = bdd.var_node(1);
        let top = bdd.and(&[a, b]);
        let mut p = HashMap::new();
        p.insert(0, 0.01);
        p.insert(1, 0.02);
        assert!((bdd.probability(top, &p) - 2e-4).abs() < 1e-12);
    }

    #[test]
    fn or_of_two_vars_matches_inclusion_exclusion() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let b = bdd.var_node(1);
        let top = bdd.or(&[a, b]);
        let mut p = HashMap::new();
        p.insert(0, 0.01);
        p.insert(1, 0.02);
        let expected = 1.0 - (1.0 - 0.01) * (1.0 - 0.02);
        assert!((bdd.probability(top, &p) - expected).abs() < 1e-12);
    }

    #[test]
    fn not_and_matches_de_morgan() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let b = bdd.var_node(1);
        let and = bdd.and(&[a, b]);
        let not_and = and.negate();
        let mut p = HashMap::new();
        p.insert(0, 0.5);
        p.insert(1, 0.5);
        assert!((bdd.probability(not_and, &p) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn atleast_two_of_three_matches_majority_vote() {
        let mut bdd = Bdd::new();
        let refs: Vec<BddRef> = (0..3).map(|v| bdd.var_node(v)).collect();
        let top = bdd.atleast(&refs, 2);
        let mut p = HashMap::new();
        for v in 0..3 {
            p.insert(v, 0.5);
        }
        // P(at least 2 of 3 coin flips) = 0.5 (by symmetry)
        assert!((bdd.probability(top, &p) - 0.5).abs() < 1e-9);
    }
}
