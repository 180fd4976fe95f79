//! Shared database repository test infrastructure
//!
//! Tests are written as shared functions taking a context over the repo
//! traits, then bound to the SQLite backend through a small macro. The
//! same functions can be re-bound if another backend is added.

mod users;
