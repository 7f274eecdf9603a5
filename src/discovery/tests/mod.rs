//! Unit tests for discovery.

mod service_tests;
