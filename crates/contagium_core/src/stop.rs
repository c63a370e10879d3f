//! Stop conditions, evaluated over the whole population after Transmit.
//!
//! Evaluation dedups by genotype identity inside each host (identical
//! sequences are checked once) and short-circuits across hosts in
//! parallel. The first failing condition's reason text is reported and the
//! run halts at the end of the current generation.

use crate::config::{SimulationConfig, StopConditionConfig, StopConditionKind};
use crate::error::{Result, SimError};
use crate::genotype::Genotype;
use crate::host::Host;
use crate::tree::GenotypeTree;
use contagium_data::Sequence;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// A predicate that can halt the run.
#[derive(Debug, Clone, PartialEq)]
pub enum StopCondition {
    /// Halt with "allele lost" when no pathogen carries `state` at
    /// `position`.
    AlleleExists { position: usize, state: u8 },
    /// Halt with "allele fixed" / "allele lost" when presence of
    /// `(position, state)` is uniform across every pathogen.
    AlleleFixedOrLost { position: usize, state: u8 },
    /// Halt with "genotype lost" when no pathogen carries `sequence`.
    GenotypeExists { sequence: Sequence },
}

impl StopCondition {
    /// Translate a validated config entry (characters) into states.
    pub fn from_config(entry: &StopConditionConfig, config: &SimulationConfig) -> Result<Self> {
        let seq = entry
            .sequence
            .as_deref()
            .ok_or_else(|| SimError::config("stop condition missing sequence"))?;
        match entry.condition {
            StopConditionKind::AlleleLoss | StopConditionKind::AlleleFixloss => {
                let position = entry
                    .position
                    .ok_or_else(|| SimError::config("stop condition missing position"))?;
                let c = seq
                    .chars()
                    .next()
                    .ok_or_else(|| SimError::config("stop condition sequence is empty"))?;
                let state = config.state_of_char(c)?;
                Ok(match entry.condition {
                    StopConditionKind::AlleleLoss => StopCondition::AlleleExists { position, state },
                    _ => StopCondition::AlleleFixedOrLost { position, state },
                })
            }
            StopConditionKind::GenotypeLoss => {
                let states = seq
                    .chars()
                    .map(|c| config.state_of_char(c))
                    .collect::<Result<Vec<u8>>>()?;
                Ok(StopCondition::GenotypeExists {
                    sequence: Sequence::new(states),
                })
            }
        }
    }

    /// `Some(reason)` when the run must stop.
    #[must_use]
    pub fn evaluate(&self, hosts: &[Arc<Host>], tree: &GenotypeTree) -> Option<String> {
        match self {
            StopCondition::AlleleExists { position, state } => {
                let exists = hosts.par_iter().any(|host| {
                    distinct_genotypes(host, tree)
                        .iter()
                        .any(|g| has_allele(g, *position, *state))
                });
                (!exists).then(|| "allele lost".to_string())
            }
            StopCondition::GenotypeExists { sequence } => {
                // A sequence the pool never interned cannot be held anywhere.
                let Some(target) = tree.genotype_set().get(sequence).map(|g| g.uid()) else {
                    return Some("genotype lost".to_string());
                };
                let exists = hosts.par_iter().any(|host| {
                    distinct_genotypes(host, tree)
                        .iter()
                        .any(|g| g.uid() == target)
                });
                (!exists).then(|| "genotype lost".to_string())
            }
            StopCondition::AlleleFixedOrLost { position, state } => {
                let (any, all) = hosts
                    .par_iter()
                    .map(|host| {
                        let genotypes = distinct_genotypes(host, tree);
                        if genotypes.is_empty() {
                            return (false, true);
                        }
                        // Presence per distinct genotype decides both bounds.
                        let any = genotypes.iter().any(|g| has_allele(g, *position, *state));
                        let all = genotypes.iter().all(|g| has_allele(g, *position, *state));
                        (any, all)
                    })
                    .reduce(|| (false, true), |(a1, l1), (a2, l2)| (a1 || a2, l1 && l2));
                if !any {
                    Some("allele lost".to_string())
                } else if all {
                    Some("allele fixed".to_string())
                } else {
                    None
                }
            }
        }
    }
}

impl std::fmt::Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCondition::AlleleExists { position, state } => {
                write!(f, "allele_loss(pos={position}, state={state})")
            }
            StopCondition::AlleleFixedOrLost { position, state } => {
                write!(f, "allele_fixloss(pos={position}, state={state})")
            }
            StopCondition::GenotypeExists { sequence } => {
                write!(f, "genotype_loss({sequence})")
            }
        }
    }
}

fn has_allele(genotype: &Genotype, position: usize, state: u8) -> bool {
    genotype.sequence().states().get(position) == Some(&state)
}

/// Distinct genotypes currently present in a host.
fn distinct_genotypes(host: &Host, tree: &GenotypeTree) -> Vec<Arc<Genotype>> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut genotypes = Vec::new();
    for node in host.pathogens() {
        let genotype = Arc::clone(tree.node(node).genotype());
        if seen.insert(genotype.uid()) {
            genotypes.push(genotype);
        }
    }
    genotypes
}
