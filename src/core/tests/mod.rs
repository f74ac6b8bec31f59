//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Duplicate-source detection tests
//! - Key name and combo parsing tests
//! - Validation tests
//! - Type tests (KeyCombo, KeyMapping, serde shape)

#[cfg(test)]
mod keys_tests;
#[cfg(test)]
mod validator_tests;
