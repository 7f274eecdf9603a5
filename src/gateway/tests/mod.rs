//! Unit tests for the gateway model and the in-memory doubles.
