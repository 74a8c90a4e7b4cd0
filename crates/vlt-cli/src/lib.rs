//! # vlt-cli: Planner Driver
//!
//! Command-line front end over the VLT crates: `plan` fans the planner out
//! over a dataset's realisations, `verify` checks an artifact against the
//! solution invariants, `evaluate` prints objective and metrics.

pub mod cli;
pub mod commands;
