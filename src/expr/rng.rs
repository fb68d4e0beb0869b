//! Process-wide RNG, seeded from `Settings.seed` when non-negative.
//!
//! A single thread-local `rand::rngs::SmallRng` seeded via `SeedableRng`:
//! deterministic given the same seed, and not safe to share across
//! concurrently sampled expressions.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

/// Re-seeds the process-wide RNG. Call once, before `Analyze()`, when
/// `Settings.seed >= 0`.
pub fn seed_rng(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = SmallRng::seed_from_u64(seed));
}

/// Runs `f` with mutable access to the shared RNG.
pub fn with_rng<R>(f: impl FnOnce(&mut SmallRng) -> R) -> R {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}
