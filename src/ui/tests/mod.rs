//! UI tests
//!
//! Exercise the Controller against the offline engine; no widgets are built.
