//! Unit tests for snapshot rules, creation and reads.

mod builder_tests;
mod domain_tests;
