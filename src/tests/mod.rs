//! Consolidated test modules.
//!
//! End-to-end tests running the full reconciliation and expiration
//! pipelines against in-memory SQLite with in-process fakes.
