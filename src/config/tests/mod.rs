//! Persistence tests
//!
//! - Store load/save behaviour (missing, malformed, partial files)
//! - Atomic transaction behaviour

mod transaction_tests;
