//! allocbt: static-weight portfolio backtester for equity/bond blends with
//! bitcoin and gold allocations.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
