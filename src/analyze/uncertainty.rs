//! Monte-Carlo `UncertaintyAnalyzer`.

use super::calculator::Calculator;
use crate::expr::Expression;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct UncertaintyReport {
    pub mean: f64,
    pub sigma: f64,
    pub ci95: (f64, f64),
    pub ef95: f64,
    pub quantiles: Vec<f64>,
    pub histogram: Vec<usize>,
}

pub struct UncertaintyAnalyzer;

impl UncertaintyAnalyzer {
    /// `deviates` maps a variable index to the `Expression` its probability
    /// is drawn from (only entries that are actually random deviates need
    /// be included — `is_deviate()` callers should filter beforehand).
    /// Runs `num_trials` draws, each resetting every deviate first so
    /// `Expression::cached` wrappers draw a fresh value per trial.
    pub fn run(
        calculator: &dyn Calculator,
        base_p_vars: &HashMap<u32, f64>,
        deviates: &HashMap<u32, Expression>,
        num_trials: usize,
        num_quantiles: usize,
        num_bins: usize,
    ) -> UncertaintyReport {
        let mut samples = Vec::with_capacity(num_trials);
        for _ in 0..num_trials {
            for e in deviates.values() {
                e.reset();
            }
            let mut trial_vars = base_p_vars.clone();
            for (&v, e) in deviates {
                trial_vars.insert(v, e.sample().clamp(0.0, 1.0));
            }
            samples.push(calculator.p_total(&trial_vars));
        }

        let n = samples.len().max(1) as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = if samples.len() > 1 {
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let sigma = variance.sqrt();
        let half_width = 1.96 * sigma / n.sqrt();
        let ci95 = (mean - half_width, mean + half_width);
        let ef95 = (1.96 * sigma).exp();

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let quantiles = (1..=num_quantiles.max(1))
            .map(|i| {
                let frac = i as f64 / (num_quantiles.max(1) + 1) as f64;
                let idx = ((frac * (sorted.len().saturating_sub(1)) as f64).round() as usize)
                    .min(sorted.len().saturating_sub(1));
                sorted.get(idx).copied().unwrap_or(mean)
            })
            .collect();

        let lo = sorted.first().copied().unwrap_or(0.0);
        let hi = sorted.last().copied().unwrap_or(0.0);
        let mut histogram = vec![0usize; num_bins.max(1)];
        let span = (hi - lo).max(f64::EPSILON);
        for &s in &samples {
            let bin = (((s - lo) / span) * num_bins.max(1) as f64) as usize;
            histogram[bin.min(num_bins.max(1) - 1)] += 1;
        }

        UncertaintyReport {
            mean,
            sigma,
            ci95,
            ef95,
            quantiles,
            histogram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::calculator::ExactBdd;
    use crate::bdd::Bdd;
    use crate::expr::Deviate;

    #[test]
    fn constant_expression_has_zero_spread() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let calc = ExactBdd { bdd: &bdd, root: a };
        let base = HashMap::new();
        let mut deviates = HashMap::new();
        deviates.insert(0, Expression::constant(0.4));
        let report = UncertaintyAnalyzer::run(&calc, &base, &deviates, 50, 3, 4);
        assert!((report.mean - 0.4).abs() < 1e-12);
        assert!(report.sigma.abs() < 1e-12);
        assert_eq!(report.histogram.iter().sum::<usize>(), 50);
    }

    #[test]
    fn uniform_deviate_mean_converges_near_midpoint() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let calc = ExactBdd { bdd: &bdd, root: a };
        let base = HashMap::new();
        let mut deviates = HashMap::new();
        deviates.insert(0, Expression::deviate(Deviate::Uniform { min: 0.2, max: 0.4 }));
        let report = UncertaintyAnalyzer::run(&calc, &base, &deviates, 2000, 5, 10);
        assert!((report.mean - 0.3).abs() < 0.02);
        assert_eq!(report.quantiles.len(), 5);
        assert_eq!(report.histogram.iter().sum::<usize>(), 2000);
    }
}
