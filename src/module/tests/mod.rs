//! Module System Tests
//!
//! Lifecycle and orchestration tests with mock implementations.
