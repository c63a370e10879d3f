//! Model families bound to hosts.
//!
//! Three flat tagged-variant families, no inheritance: the intrahost model
//! (population-size rule, mutation parameters, per-status durations), the
//! fitness model (sequence to scalar), and the transmission model
//! (probability plus migrant count). Hosts reference models through `Arc`s
//! into the instance-local model tables.

pub mod fitness;
pub mod intrahost;
pub mod transmission;

pub use fitness::{FitnessModel, FitnessTable, Motif};
pub use intrahost::{IntrahostModel, ReplicationRule, TransitionMatrix};
pub use transmission::{TransmissionModel, TransmissionSize};
