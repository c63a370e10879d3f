//! Fitness models: pure functions from sequence to scalar.
//!
//! Multiplicative models carry per-site values in log space, additive
//! models in linear space; either way the per-site values are summed. The
//! motif variant adds bonus values for matched subsequences. Purity over
//! the sequence is what makes genotype-level memoization sound.

use crate::config::FitnessModelKind;
use crate::error::{Result, SimError};
use contagium_data::Sequence;

/// A contiguous subsequence with an associated fitness bonus.
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    /// Site the motif is anchored at.
    pub start: usize,
    /// Required states from the anchor onward.
    pub states: Vec<u8>,
    /// Value added when every state matches.
    pub value: f64,
}

impl Motif {
    fn matches(&self, sequence: &Sequence) -> bool {
        if self.start + self.states.len() > sequence.len() {
            return false;
        }
        self.states
            .iter()
            .enumerate()
            .all(|(offset, &state)| sequence.state_at(self.start + offset) == state)
    }
}

/// Parsed per-site fitness landscape, before binding to a model id.
///
/// `site_values[site][state]` must be fully resolved (defaults applied) by
/// the parser; unlisted positions fall back to a zero row there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitnessTable {
    pub site_values: Vec<Vec<f64>>,
    pub motifs: Vec<Motif>,
}

/// One fitness model bound to a subset of hosts.
pub struct FitnessModel {
    id: u32,
    name: String,
    kind: FitnessModelKind,
    site_values: Vec<Vec<f64>>,
    motifs: Vec<Motif>,
}

impl FitnessModel {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        kind: FitnessModelKind,
        table: FitnessTable,
        num_sites: usize,
        alphabet_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        if table.site_values.len() > num_sites {
            return Err(SimError::domain(format!(
                "fitness model {name:?} lists {} positions for {num_sites} sites",
                table.site_values.len()
            )));
        }
        for (site, row) in table.site_values.iter().enumerate() {
            if row.len() != alphabet_size {
                return Err(SimError::domain(format!(
                    "fitness model {name:?} row for site {site} has {} values, expected {alphabet_size}",
                    row.len()
                )));
            }
            if row.iter().any(|v| v.is_nan()) {
                return Err(SimError::Runtime(format!(
                    "fitness model {name:?} has a NaN value at site {site}"
                )));
            }
        }
        if kind != FitnessModelKind::AdditiveMotif && !table.motifs.is_empty() {
            return Err(SimError::domain(format!(
                "fitness model {name:?} lists motifs but is not additive_motif"
            )));
        }
        for motif in &table.motifs {
            if motif.start + motif.states.len() > num_sites {
                return Err(SimError::domain(format!(
                    "fitness model {name:?} motif at {} overruns the sequence",
                    motif.start
                )));
            }
        }
        let mut site_values = table.site_values;
        site_values.resize(num_sites, vec![0.0; alphabet_size]);
        Ok(Self {
            id,
            name,
            kind,
            site_values,
            motifs: table.motifs,
        })
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> FitnessModelKind {
        self.kind
    }

    /// Scalar fitness of `sequence`: log-space for multiplicative models,
    /// linear for the additive family.
    #[must_use]
    pub fn evaluate(&self, sequence: &Sequence) -> f64 {
        let mut total = 0.0;
        for (site, &state) in sequence.states().iter().enumerate() {
            total += self.site_values[site]
                .get(usize::from(state))
                .copied()
                .unwrap_or(0.0);
        }
        if self.kind == FitnessModelKind::AdditiveMotif {
            for motif in &self.motifs {
                if motif.matches(sequence) {
                    total += motif.value;
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral(num_sites: usize) -> FitnessModel {
        FitnessModel::new(
            0,
            "neutral",
            FitnessModelKind::Multiplicative,
            FitnessTable::default(),
            num_sites,
            2,
        )
        .expect("neutral model builds")
    }

    #[test]
    fn test_all_zero_landscape_is_neutral() {
        let model = neutral(5);
        assert_eq!(model.evaluate(&Sequence::new(vec![0, 1, 0, 1, 1])), 0.0);
        assert_eq!(model.evaluate(&Sequence::new(vec![0; 5])), 0.0);
    }

    #[test]
    fn test_site_values_sum() {
        let table = FitnessTable {
            site_values: vec![vec![0.0, 1.0], vec![0.5, 0.0]],
            motifs: vec![],
        };
        let model =
            FitnessModel::new(1, "additive", FitnessModelKind::Additive, table, 3, 2).unwrap();
        // site 0 state 1 -> 1.0, site 1 state 0 -> 0.5, site 2 unlisted -> 0.0
        assert!((model.evaluate(&Sequence::new(vec![1, 0, 1])) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_motif_bonus_applies_only_on_match() {
        let table = FitnessTable {
            site_values: vec![],
            motifs: vec![Motif {
                start: 1,
                states: vec![1, 1],
                value: 2.0,
            }],
        };
        let model = FitnessModel::new(
            2,
            "motif",
            FitnessModelKind::AdditiveMotif,
            table,
            4,
            2,
        )
        .unwrap();
        assert_eq!(model.evaluate(&Sequence::new(vec![0, 1, 1, 0])), 2.0);
        assert_eq!(model.evaluate(&Sequence::new(vec![0, 1, 0, 0])), 0.0);
    }

    #[test]
    fn test_nan_landscape_rejected() {
        let table = FitnessTable {
            site_values: vec![vec![f64::NAN, 0.0]],
            motifs: vec![],
        };
        let err = FitnessModel::new(3, "bad", FitnessModelKind::Additive, table, 2, 2).unwrap_err();
        assert!(matches!(err, SimError::Runtime(_)));
    }
}
