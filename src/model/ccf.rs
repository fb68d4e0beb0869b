use crate::expr::Expression;

/// Common-cause-failure group model: a set of basic events plus a rule
/// that produces derived basic events for every non-empty subset up to the
/// group size.
#[derive(Debug, Clone)]
pub struct CcfGroup {
    pub name: String,
    pub members: Vec<String>,
    pub model: CcfModel,
}

/// `beta`-factor, MGL (multiple Greek letter), and `alpha`-factor models,
/// each parametrized by a factor table indexed by subset size `k`.
#[derive(Debug, Clone)]
pub enum CcfModel {
    Beta { beta: f64 },
    Mgl { factors: Vec<f64> },
    Alpha { factors: Vec<f64> },
}

impl CcfGroup {
    /// Produces, for every non-empty subset of `members` up to group size,
    /// a `(subset, probability expression)` pair, per the model's factor
    /// table. `base_p` is the independent (non-CCF) failure probability
    /// shared by every member.
    pub fn derive(&self, base_p: f64) -> Vec<(Vec<String>, Expression)> {
        let n = self.members.len();
        let factor = |k: usize| -> f64 {
            match &self.model {
                CcfModel::Beta { beta } => {
                    if k == 1 {
                        1.0 - beta
                    } else if k == n {
                        *beta
                    } else {
                        0.0
                    }
                }
                CcfModel::Mgl { factors } => factors.get(k - 1).copied().unwrap_or(0.0),
                CcfModel::Alpha { factors } => {
                    let total: f64 = factors.iter().sum();
                    if total <= 0.0 {
                        0.0
                    } else {
                        factors.get(k - 1).copied().unwrap_or(0.0) / total
                    }
                }
            }
        };

        subsets(&self.members)
            .into_iter()
            .map(|subset| {
                let k = subset.len();
                let p = (base_p * factor(k)).clamp(0.0, 1.0);
                (subset, Expression::constant(p))
            })
            .collect()
    }
}

fn subsets(items: &[String]) -> Vec<Vec<String>> {
    let n = items.len();
    let mut out = Vec::with_capacity((1 << n) - 1);
    for mask in 1..(1u32 << n) {
        let subset = (0..n)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| items[i].clone())
            .collect();
        out.push(subset);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_factor_model_splits_independent_and_common_terms() {
        let group = CcfGroup {
            name: "G".into(),
            members: vec!["A".into(), "B".into()],
            model: CcfModel::Beta { beta: 0.1 },
        };
        let derived = group.derive(0.01);
        // subsets of size 1 (x2) and size 2 (x1)
        assert_eq!(derived.len(), 3);
        let common = derived.iter().find(|(s, _)| s.len() == 2).unwrap();
        assert!((common.1.value() - 0.001).abs() < 1e-12);
    }
}
