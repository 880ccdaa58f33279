//! Integration test harness.

mod gate_test;
mod helpers;
