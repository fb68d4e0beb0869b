//! Deterministic and random numeric expressions for event probabilities.
//!
//! Mirrors the four-operation `Expression` contract: `value`, `sample`,
//! `reset`, `interval`, plus `is_deviate`. Random deviates draw from a
//! single process-wide RNG (see [`rng`]): `sample` is not thread-safe
//! across expressions that share the source, which is fine since the
//! analytical core runs single-threaded.

mod deviate;
mod rng;

pub use deviate::Deviate;
pub use rng::{seed_rng, with_rng};

use crate::error::{AnalysisError, Result};
use std::cell::Cell;
use std::rc::Rc;

/// Worst-case `[lo, hi]` envelope used for domain checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
    pub const UNIT: Interval = Interval::new(0.0, 1.0);

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

/// A numeric expression: a constant, a parameter reference, a mission-time
/// proxy, a random deviate, or an arithmetic combination of the above.
#[derive(Clone)]
pub enum Expression {
    Constant(f64),
    MissionTime(Rc<Cell<f64>>),
    Parameter(Rc<Expression>),
    Deviate(Rc<Deviate>),
    Sampled(Rc<Cell<Option<f64>>>, Rc<Expression>),
    Neg(Box<Expression>),
    Add(Vec<Expression>),
    Mul(Vec<Expression>),
}

impl Expression {
    pub fn constant(v: f64) -> Self {
        Expression::Constant(v)
    }

    pub fn mission_time(cell: Rc<Cell<f64>>) -> Self {
        Expression::MissionTime(cell)
    }

    pub fn deviate(d: Deviate) -> Self {
        Expression::Deviate(Rc::new(d))
    }

    pub fn parameter(e: Rc<Expression>) -> Self {
        Expression::Parameter(e)
    }

    /// Wraps `inner` so that repeated `sample()` calls within one trial
    /// return the same drawn value, until `reset()` clears the cache.
    pub fn cached(inner: Expression) -> Self {
        Expression::Sampled(Rc::new(Cell::new(None)), Rc::new(inner))
    }

    /// Current deterministic value using current parameter/mission-time state.
    pub fn value(&self) -> f64 {
        match self {
            Expression::Constant(v) => *v,
            Expression::MissionTime(t) => t.get(),
            Expression::Parameter(e) => e.value(),
            Expression::Deviate(d) => d.mean(),
            Expression::Sampled(cache, inner) => cache.get().unwrap_or_else(|| inner.value()),
            Expression::Neg(e) => -e.value(),
            Expression::Add(es) => es.iter().map(Expression::value).sum(),
            Expression::Mul(es) => es.iter().map(Expression::value).product(),
        }
    }

    /// Draws a value; cached until the next `reset()`. Non-deviate
    /// expressions simply return `value()`.
    pub fn sample(&self) -> f64 {
        match self {
            Expression::Deviate(d) => d.sample(),
            Expression::Sampled(cache, inner) => {
                if let Some(v) = cache.get() {
                    v
                } else {
                    let v = inner.sample();
                    cache.set(Some(v));
                    v
                }
            }
            Expression::Neg(e) => -e.sample(),
            Expression::Add(es) => es.iter().map(Expression::sample).sum(),
            Expression::Mul(es) => es.iter().map(Expression::sample).product(),
            _ => self.value(),
        }
    }

    /// Clears any sampled cache, recursively.
    pub fn reset(&self) {
        match self {
            Expression::Sampled(cache, inner) => {
                cache.set(None);
                inner.reset();
            }
            Expression::Neg(e) => e.reset(),
            Expression::Add(es) | Expression::Mul(es) => es.iter().for_each(Expression::reset),
            _ => {}
        }
    }

    /// Worst-case `[lo, hi]` envelope.
    pub fn interval(&self) -> Interval {
        match self {
            Expression::Constant(v) => Interval::new(*v, *v),
            Expression::MissionTime(t) => Interval::new(0.0, t.get().max(0.0)),
            Expression::Parameter(e) => e.interval(),
            Expression::Deviate(d) => d.interval(),
            Expression::Sampled(_, inner) => inner.interval(),
            Expression::Neg(e) => {
                let i = e.interval();
                Interval::new(-i.hi, -i.lo)
            }
            Expression::Add(es) => es.iter().map(Expression::interval).fold(
                Interval::new(0.0, 0.0),
                |acc, i| Interval::new(acc.lo + i.lo, acc.hi + i.hi),
            ),
            Expression::Mul(es) => es.iter().map(Expression::interval).fold(
                Interval::new(1.0, 1.0),
                |acc, i| Interval::new(acc.lo * i.lo, acc.hi * i.hi),
            ),
        }
    }

    /// True if any leaf is a random deviate.
    pub fn is_deviate(&self) -> bool {
        match self {
            Expression::Constant(_) | Expression::MissionTime(_) => false,
            Expression::Parameter(e) => e.is_deviate(),
            Expression::Deviate(_) => true,
            Expression::Sampled(_, inner) => inner.is_deviate(),
            Expression::Neg(e) => e.is_deviate(),
            Expression::Add(es) | Expression::Mul(es) => es.iter().any(Expression::is_deviate),
        }
    }
}

// Validators — run once per expression using `interval()`.

pub fn ensure_probability(e: &Expression) -> Result<()> {
    ensure_within(e, Interval::UNIT)
}

pub fn ensure_positive(e: &Expression) -> Result<()> {
    let i = e.interval();
    if i.lo > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::Domain(format!(
            "expected strictly positive interval, got [{}, {}]",
            i.lo, i.hi
        )))
    }
}

pub fn ensure_non_negative(e: &Expression) -> Result<()> {
    let i = e.interval();
    if i.lo >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::Domain(format!(
            "expected non-negative interval, got [{}, {}]",
            i.lo, i.hi
        )))
    }
}

pub fn ensure_within(e: &Expression, bound: Interval) -> Result<()> {
    let i = e.interval();
    if i.lo >= bound.lo && i.hi <= bound.hi {
        Ok(())
    } else {
        Err(AnalysisError::Domain(format!(
            "interval [{}, {}] outside required bound [{}, {}]",
            i.lo, i.hi, bound.lo, bound.hi
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_roundtrips() {
        let e = Expression::constant(0.5);
        assert_eq!(e.value(), 0.5);
        assert!(ensure_probability(&e).is_ok());
    }

    #[test]
    fn sum_of_two_probabilities_can_exceed_unit_interval() {
        let a = Expression::constant(0.6);
        let b = Expression::constant(0.6);
        let sum = Expression::Add(vec![a, b]);
        assert!(ensure_probability(&sum).is_err());
    }

    #[test]
    fn cached_sample_is_stable_until_reset() {
        let d = Expression::deviate(Deviate::Uniform { min: 0.0, max: 1.0 });
        let cached = Expression::cached(d);
        let first = cached.sample();
        let second = cached.sample();
        assert_eq!(first, second);
        cached.reset();
        // after reset, a fresh draw is taken (may coincide, but cache is cleared)
        let _ = cached.sample();
    }

    #[test]
    fn negative_mission_time_rejected_by_ensure_non_negative() {
        let t = Rc::new(Cell::new(-1.0));
        let e = Expression::mission_time(t);
        assert!(ensure_non_negative(&e).is_err());
    }
}
