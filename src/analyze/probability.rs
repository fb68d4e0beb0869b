//! `ProbabilityAnalyzer` and SIL post-processing.

use super::calculator::Calculator;
use std::collections::HashMap;

const PFD_BUCKETS: [f64; 6] = [1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 1.0];
const PFH_BUCKETS: [f64; 6] = [1e-9, 1e-8, 1e-7, 1e-6, 1e-5, 1.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct SilBucket {
    pub upper_bound: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Sil {
    pub pfd_avg: f64,
    pub pfh_avg: f64,
    pub pfd_histogram: [SilBucket; 6],
    pub pfh_histogram: [SilBucket; 6],
}

fn bucket_of(value: f64, bounds: &[f64; 6]) -> usize {
    bounds
        .iter()
        .position(|&b| value <= b)
        .unwrap_or(bounds.len() - 1)
}

fn build_histogram(bounds: [f64; 6], samples: &[f64]) -> [SilBucket; 6] {
    let mut hist = [SilBucket::default(); 6];
    for (i, b) in bounds.iter().enumerate() {
        hist[i].upper_bound = *b;
    }
    for &s in samples {
        hist[bucket_of(s, &bounds)].count += 1;
    }
    hist
}

pub struct ProbabilityAnalyzer {
    pub p_vars: HashMap<u32, f64>,
    pub p_total: f64,
    pub p_of_t: Vec<(f64, f64)>,
    pub sil: Option<Sil>,
}

impl ProbabilityAnalyzer {
    /// Extracts `p_vars[order] = probability` at construction, runs
    /// `calculator` once for `p_total`, then — if `time_step > 0` — samples
    /// `p(t)` across `{0, dt, 2dt, ..., mission_time}` by mutating
    /// `mission_time_cell` and re-reading the per-variable probabilities
    /// via `resample`.
    pub fn run(
        calculator: &dyn Calculator,
        p_vars: HashMap<u32, f64>,
        mission_time_cell: Option<&std::cell::Cell<f64>>,
        mission_time: f64,
        time_step: f64,
        resample: impl Fn(f64) -> HashMap<u32, f64>,
        safety_integrity_levels: bool,
    ) -> Self {
        let p_total = calculator.p_total(&p_vars);
        let mut p_of_t = Vec::new();
        let mut sil = None;

        if time_step > 0.0 {
            let mut t = 0.0;
            let mut samples = Vec::new();
            while t <= mission_time + 1e-12 {
                if let Some(cell) = mission_time_cell {
                    cell.set(t);
                }
                let vars_at_t = resample(t);
                let p_t = calculator.p_total(&vars_at_t);
                p_of_t.push((t, p_t));
                samples.push(p_t);
                t += time_step;
            }
            if let Some(cell) = mission_time_cell {
                cell.set(mission_time);
            }

            if safety_integrity_levels {
                let n = samples.len().max(1) as f64;
                let pfd_avg = samples.iter().sum::<f64>() / n;
                let hazards: Vec<f64> = samples
                    .iter()
                    .map(|&p| {
                        if p <= 0.0 {
                            0.0
                        } else {
                            -(1.0 - p).ln() / time_step
                        }
                    })
                    .collect();
                let pfh_avg = hazards.iter().sum::<f64>() / n;
                sil = Some(Sil {
                    pfd_avg,
                    pfh_avg,
                    pfd_histogram: build_histogram(PFD_BUCKETS, &samples),
                    pfh_histogram: build_histogram(PFH_BUCKETS, &hazards),
                });
            }
        }

        Self {
            p_vars,
            p_total,
            p_of_t,
            sil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::calculator::ExactBdd;
    use crate::bdd::Bdd;

    #[test]
    fn constant_probability_has_flat_p_of_t_curve() {
        let mut bdd = Bdd::new();
        let a = bdd.var_node(0);
        let mut p_vars = HashMap::new();
        p_vars.insert(0, 0.3);
        let calc = ExactBdd { bdd: &bdd, root: a };
        let analyzer = ProbabilityAnalyzer::run(&calc, p_vars.clone(), None, 10.0, 5.0, |_t| p_vars.clone(), true);
        assert_eq!(analyzer.p_of_t.len(), 3);
        assert!(analyzer.p_of_t.iter().all(|&(_, p)| (p - 0.3).abs() < 1e-12));
        let sil = analyzer.sil.unwrap();
        assert!((sil.pfd_avg - 0.3).abs() < 1e-12);
        let bucket_total: usize = sil.pfd_histogram.iter().map(|b| b.count).sum();
        assert_eq!(bucket_total, 3);
    }
}
