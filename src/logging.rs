//! Logging initialization for binaries built on top of the core.
//!
//! The library itself never calls `init`; it only emits `log` records.
//! Binaries (and integration tests, if they want readable output) opt in.

pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
