//! Pure data structures for the Contagium simulator.
//!
//! This crate contains serializable data types with no business logic,
//! shared between the simulation engine and the log sinks.

pub mod data;

pub use data::records::*;
pub use data::sequence::*;
pub use data::status::*;
