use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the genotype stream: a distinct sequence and its pool id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeRow {
    /// Genotype pool identifier.
    pub uid: Uuid,
    /// Hex rendering of the sequence content.
    pub sequence: String,
}

/// One row of the node stream: a genealogy node and the genotype it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    /// Node identifier, unique across the run.
    pub uid: Uuid,
    /// Genotype carried by this node.
    pub genotype_uid: Uuid,
}

/// One row of the per-host genotype frequency stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRow {
    /// Simulation instance index.
    pub instance: u32,
    /// Generation the counts were taken in.
    pub generation: u64,
    /// Host id.
    pub host: u32,
    /// Genotype counted (by pool identity, not node).
    pub genotype_uid: Uuid,
    /// Number of pathogens of that genotype in the host.
    pub freq: u64,
}

/// One row of the mutation stream: a parent/child node pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRow {
    /// Simulation instance index.
    pub instance: u32,
    /// Generation the mutation occurred in.
    pub generation: u64,
    /// Host the mutation occurred in.
    pub host: u32,
    /// Node the mutant replicated from.
    pub parent_uid: Uuid,
    /// Newly allocated mutant node.
    pub child_uid: Uuid,
}

/// One row of the status stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Simulation instance index.
    pub instance: u32,
    /// Generation the status was recorded in.
    pub generation: u64,
    /// Host id.
    pub host: u32,
    /// Compartmental status code (see `Status::code`).
    pub status: u8,
}

/// One row of the transmission stream: one migrant pathogen crossing an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionRow {
    /// Simulation instance index.
    pub instance: u32,
    /// Generation the transmission occurred in.
    pub generation: u64,
    /// Source host id.
    pub src: u32,
    /// Destination host id.
    pub dst: u32,
    /// Node reference that migrated.
    pub node_uid: Uuid,
}
