//! Test utilities for the bookstore workload generator.
//!
//! This crate provides utilities to facilitate testing the workload engine without a real
//! bookstore. See the modules for all available utilities.

pub mod stubs;
pub mod tracing;
