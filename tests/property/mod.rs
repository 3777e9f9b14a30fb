//! Property-based tests for the stability patterns.
//!
//! Run with: cargo test --test property_tests
