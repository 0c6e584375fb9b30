//! End-to-end tests that drive the crossrunner binary.

mod parallel_execution;
