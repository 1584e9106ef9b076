//! Tracing setup shared by hosts and tests of the erasure crates.
//!
//! `erasure-core` only emits events (registry activity); installing a
//! subscriber is left to whoever owns the process.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init_json("info");
}

/// Initialize a human-readable subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_for_tests() {
    subscriber::init_test("debug");
}

/// Subscriber construction (filters, formats).
pub mod subscriber;
