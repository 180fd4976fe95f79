//! creditwatch: cost reconciliation and credit-limit enforcement for
//! subsidized cloud workspaces.
//!
//! The library exposes the engine seams (repositories, cost source,
//! notification sender, compute client) so deployments can embed the
//! pipeline or swap collaborators; the binary wires them together from
//! a TOML config and runs the background workers.

pub mod compute;
pub mod config;
pub mod costsource;
pub mod credits;
pub mod db;
pub mod expiration;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod observability;
pub mod services;

#[cfg(test)]
mod tests;
