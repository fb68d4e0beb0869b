//! `Settings` surface: every recognized option, enumerated, with
//! `validate()` raising `AnalysisError::Settings` on conflicting input
//! before analysis starts.

use crate::error::{AnalysisError, Result};
use crate::preprocess::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approximation {
    None,
    RareEvent,
    Mcub,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub algorithm: Algorithm,
    pub approximation: Approximation,
    pub prime_implicants: bool,
    pub limit_order: usize,
    pub cut_off: f64,
    pub mission_time: f64,
    pub time_step: f64,
    pub safety_integrity_levels: bool,
    pub probability_analysis: bool,
    pub importance_analysis: bool,
    pub uncertainty_analysis: bool,
    pub ccf_analysis: bool,
    pub num_trials: usize,
    pub num_quantiles: usize,
    pub num_bins: usize,
    pub seed: i64,
    pub expand_atleast_gates: bool,
    pub expand_xor_gates: bool,
    pub keep_null_gates: bool,
    pub compilation_level: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Bdd,
            approximation: Approximation::None,
            prime_implicants: false,
            limit_order: 20,
            cut_off: 1e-8,
            mission_time: 8760.0,
            time_step: 0.0,
            safety_integrity_levels: false,
            probability_analysis: true,
            importance_analysis: false,
            uncertainty_analysis: false,
            ccf_analysis: false,
            num_trials: 1000,
            num_quantiles: 10,
            num_bins: 20,
            seed: -1,
            expand_atleast_gates: true,
            expand_xor_gates: true,
            keep_null_gates: false,
            compilation_level: 8,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.algorithm == Algorithm::Bdd && self.approximation != Approximation::None {
            return Err(AnalysisError::Settings(
                "approximation must be None when algorithm is BDD".into(),
            ));
        }
        if self.algorithm != Algorithm::Bdd && self.approximation == Approximation::None {
            return Err(AnalysisError::Settings(
                "MOCUS/ZBDD require an approximation calculator (RareEvent or MCUB)".into(),
            ));
        }
        if self.prime_implicants && self.algorithm != Algorithm::Bdd {
            return Err(AnalysisError::Settings(
                "prime_implicants is only valid with the BDD algorithm".into(),
            ));
        }
        if self.safety_integrity_levels && self.time_step <= 0.0 {
            return Err(AnalysisError::Settings(
                "safety_integrity_levels requires time_step > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cut_off) {
            return Err(AnalysisError::Settings(format!(
                "cut_off must be within [0, 1], got {}",
                self.cut_off
            )));
        }
        if self.mission_time < 0.0 {
            return Err(AnalysisError::Settings(
                "mission_time must be >= 0".into(),
            ));
        }
        if self.time_step < 0.0 {
            return Err(AnalysisError::Settings("time_step must be >= 0".into()));
        }
        if self.compilation_level > 8 {
            return Err(AnalysisError::Settings(format!(
                "compilation_level must be within [0, 8], got {}",
                self.compilation_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bdd_with_rare_event_approximation_is_rejected() {
        let settings = Settings {
            algorithm: Algorithm::Bdd,
            approximation: Approximation::RareEvent,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn mocus_requires_an_approximation() {
        let settings = Settings {
            algorithm: Algorithm::Mocus,
            approximation: Approximation::None,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn sil_without_time_step_is_rejected() {
        let settings = Settings {
            safety_integrity_levels: true,
            time_step: 0.0,
            approximation: Approximation::None,
            algorithm: Algorithm::Bdd,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn default_settings_validate() {
        assert!(Settings::default().validate().is_ok());
    }
}
