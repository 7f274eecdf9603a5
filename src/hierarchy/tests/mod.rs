//! Unit tests for package-id arithmetic, replication and provisioning.

mod ids_tests;
