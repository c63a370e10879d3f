//! Contagium: a forward-time, agent-based epidemiological simulator.
//!
//! Disease spread over a weighted host network is co-simulated with
//! pathogen sequence evolution inside each infected host; the emergent
//! genealogy is recorded in a shared genotype tree and streamed to CSV or
//! SQLite logs. The engine lives in `contagium_core`, file handling in
//! `contagium_io`; this crate is the multi-instance driver and CLI.

pub mod driver;

pub use driver::{run, RunOptions, SinkKind};
