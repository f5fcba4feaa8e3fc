//! Property-based tests

pub mod freshness_proptest;
pub mod queue_proptest;
