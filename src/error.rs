//! Error taxonomy for the analytical core.
//!
//! Only input- and configuration-caused failures are represented here.
//! Internal-consistency violations (the source's `LogicError`) are never
//! returned: they panic via `assert!`/`unreachable!`, matching a validated
//! model never reaching an inconsistent state once `Analyze()` begins.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("invalid model: {0}")]
    Validity(String),

    #[error("numeric domain violation: {0}")]
    Domain(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
