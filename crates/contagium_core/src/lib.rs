//! Simulation engine for the Contagium epidemiological simulator.
//!
//! A run advances in discrete generations. Every generation each host goes
//! through an intrahost pass (replication and mutation of its pathogen
//! population), a transmission pass across the host network, and a
//! compartmental status update. All pathogen sequences live in a shared,
//! deduplicated genotype tree so the emergent genealogy can be recovered
//! offline from the log streams.

pub mod config;
pub mod epidemic;
pub mod error;
pub mod genotype;
pub mod host;
pub mod logger;
pub mod models;
pub mod network;
pub mod process;
pub mod rng;
pub mod stop;
pub mod tree;

pub use epidemic::{Epidemic, EpidemicSetup, RunOutcome};
pub use error::{Result, SimError};
