//! Validated run configuration.
//!
//! These are the structures the engine consumes. Loading them from a TOML
//! file lives in the IO crate; everything here is already shaped, and
//! `SimulationConfig::validate` is the single gate every run passes before
//! any instance starts.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Compartmental variant of the epidemic controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpidemicModel {
    Si,
    Sis,
    Sir,
    Sirs,
    Sei,
    Seir,
    Seirs,
    /// SIR-like, but a host transmits only in the generation its infection
    /// timer reaches zero.
    Endtrans,
    /// SI-like, with symmetric pathogen exchange between infected neighbor
    /// pairs.
    Exchange,
}

/// Population-size rule of an intrahost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationModelKind {
    /// Fixed population size every generation.
    Constant,
    /// Beverton-Holt with a hard threshold at `max_pop_size`.
    Bht,
    /// Absolute fitness: per-pathogen Poisson offspring draws.
    Fitness,
}

/// Shape of a fitness model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessModelKind {
    /// Per-site values in log space, summed.
    Multiplicative,
    /// Per-site values in linear space, summed.
    Additive,
    /// Additive plus bonus values for matched sequence motifs.
    AdditiveMotif,
}

/// Migrant-count distribution of a transmission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    Poisson,
    Constant,
}

/// What to do when a drawn migrant count exceeds the source population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrantPolicy {
    /// Cap the count at the source population size.
    Clamp,
    /// Skip the transmission entirely.
    Skip,
}

/// Stop-condition kinds, named after the event that halts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopConditionKind {
    /// Halt when no pathogen carries the given state at the given site.
    AlleleLoss,
    /// Halt when the given (site, state) is either fixed or lost.
    AlleleFixloss,
    /// Halt when no pathogen carries the given full sequence.
    GenotypeLoss,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SimulationSection {
    pub num_generations: u64,
    pub num_instances: u32,
    pub num_sites: usize,
    pub host_popsize: u32,
    pub epidemic_model: EpidemicModel,
    #[serde(default)]
    pub coinfection: bool,
    /// Sequence alphabet, one single-character string per state, in state
    /// order. Index in this list is the integer state.
    pub expected_characters: Vec<String>,
    pub pathogen_path: String,
    pub host_network_path: String,
    /// Exchange variant only: move semantics instead of copy semantics.
    #[serde(default)]
    pub exchange_removes_migrants: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingSection {
    #[serde(default = "default_log_freq")]
    pub log_freq: u64,
    #[serde(default)]
    pub log_transmission: bool,
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

fn default_log_freq() -> u64 {
    1
}

fn default_log_path() -> String {
    "logs".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_freq: default_log_freq(),
            log_transmission: false,
            log_path: default_log_path(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IntrahostModelConfig {
    pub model_name: String,
    pub host_ids: Vec<u32>,
    #[serde(default)]
    pub mutation_rate: f64,
    /// Square row-stochastic matrix over the alphabet; diagonal 0 by
    /// convention (no self-transition).
    #[serde(default)]
    pub transition_matrix: Vec<Vec<f64>>,
    #[serde(default)]
    pub recombination_rate: f64,
    pub replication_model: ReplicationModelKind,
    #[serde(default)]
    pub constant_pop_size: usize,
    #[serde(default)]
    pub max_pop_size: usize,
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,
    #[serde(default)]
    pub exposed_duration: u64,
    #[serde(default)]
    pub infected_duration: u64,
    #[serde(default)]
    pub infective_duration: u64,
    #[serde(default)]
    pub removed_duration: u64,
    #[serde(default)]
    pub recovered_duration: u64,
    #[serde(default)]
    pub dead_duration: u64,
    #[serde(default)]
    pub vaccinated_duration: u64,
    /// Draw durations from Poisson(mean) instead of using them verbatim.
    #[serde(default)]
    pub probabilistic_duration: bool,
}

fn default_growth_rate() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FitnessModelConfig {
    pub model_name: String,
    pub host_ids: Vec<u32>,
    pub fitness_model: FitnessModelKind,
    pub fitness_model_path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransmissionModelConfig {
    pub model_name: String,
    pub host_ids: Vec<u32>,
    pub mode: TransmissionMode,
    pub transmission_prob: f64,
    pub transmission_size: f64,
    /// Defaults to `clamp`; `endtrans` runs default to `skip` instead.
    #[serde(default)]
    pub size_policy: Option<MigrantPolicy>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StopConditionConfig {
    pub condition: StopConditionKind,
    #[serde(default)]
    pub position: Option<usize>,
    /// A single alphabet character for the allele conditions, the full
    /// sequence string for `genotype_loss`.
    #[serde(default)]
    pub sequence: Option<String>,
}

/// Complete, recognized configuration of a run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SimulationConfig {
    pub simulation: SimulationSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub intrahost_model: Vec<IntrahostModelConfig>,
    #[serde(default)]
    pub fitness_model: Vec<FitnessModelConfig>,
    #[serde(default)]
    pub transmission_model: Vec<TransmissionModelConfig>,
    #[serde(default)]
    pub stop_condition: Vec<StopConditionConfig>,
}

impl SimulationConfig {
    /// Alphabet size K.
    #[must_use]
    pub fn alphabet_size(&self) -> usize {
        self.simulation.expected_characters.len()
    }

    /// Translate an alphabet character to its integer state.
    pub fn state_of_char(&self, c: char) -> Result<u8> {
        self.simulation
            .expected_characters
            .iter()
            .position(|s| s.chars().next() == Some(c))
            .map(|i| i as u8)
            .ok_or_else(|| SimError::domain(format!("unknown state character '{c}'")))
    }

    /// Full validation gate. Every rule here fires before the generation
    /// loop of any instance starts.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.num_generations < 1 {
            return Err(SimError::config("num_generations must be >= 1"));
        }
        if sim.num_instances < 1 {
            return Err(SimError::config("num_instances must be >= 1"));
        }
        if sim.num_sites < 1 {
            return Err(SimError::config("num_sites must be >= 1"));
        }
        if sim.host_popsize < 1 {
            return Err(SimError::config("host_popsize must be >= 1"));
        }
        if sim.expected_characters.is_empty() {
            return Err(SimError::config("expected_characters must not be empty"));
        }
        let mut seen_chars = HashSet::new();
        for s in &sim.expected_characters {
            if s.chars().count() != 1 {
                return Err(SimError::config(format!(
                    "expected_characters entries must be single characters, got {s:?}"
                )));
            }
            if !seen_chars.insert(s.as_str()) {
                return Err(SimError::config(format!(
                    "duplicate expected character {s:?}"
                )));
            }
        }
        if sim.expected_characters.len() > u8::MAX as usize + 1 {
            return Err(SimError::config("alphabet larger than 256 states"));
        }
        if self.logging.log_freq < 1 {
            return Err(SimError::config("log_freq must be >= 1"));
        }

        self.check_partition("intrahost_model", self.intrahost_model.iter().map(|m| &m.host_ids))?;
        self.check_partition("fitness_model", self.fitness_model.iter().map(|m| &m.host_ids))?;
        self.check_partition(
            "transmission_model",
            self.transmission_model.iter().map(|m| &m.host_ids),
        )?;

        for m in &self.intrahost_model {
            self.validate_intrahost(m)?;
        }
        for m in &self.transmission_model {
            if !(0.0..=1.0).contains(&m.transmission_prob) {
                return Err(SimError::config(format!(
                    "transmission_prob of {:?} must be in [0, 1]",
                    m.model_name
                )));
            }
            if m.transmission_size < 0.0 {
                return Err(SimError::config(format!(
                    "transmission_size of {:?} must be >= 0",
                    m.model_name
                )));
            }
        }
        for (i, sc) in self.stop_condition.iter().enumerate() {
            self.validate_stop_condition(i, sc)?;
        }
        Ok(())
    }

    fn validate_intrahost(&self, m: &IntrahostModelConfig) -> Result<()> {
        if !(0.0..=1.0).contains(&m.mutation_rate) {
            return Err(SimError::config(format!(
                "mutation_rate of {:?} must be in [0, 1]",
                m.model_name
            )));
        }
        if m.recombination_rate < 0.0 {
            return Err(SimError::config(format!(
                "recombination_rate of {:?} must be >= 0",
                m.model_name
            )));
        }
        if m.mutation_rate > 0.0 {
            let k = self.alphabet_size();
            if m.transition_matrix.len() != k {
                return Err(SimError::config(format!(
                    "transition_matrix of {:?} must be {k}x{k} to match expected_characters",
                    m.model_name
                )));
            }
            for (s, row) in m.transition_matrix.iter().enumerate() {
                if row.len() != k {
                    return Err(SimError::config(format!(
                        "transition_matrix of {:?} is not square (row {s})",
                        m.model_name
                    )));
                }
                if row.iter().any(|&v| v < 0.0) {
                    return Err(SimError::config(format!(
                        "transition_matrix of {:?} has a negative entry in row {s}",
                        m.model_name
                    )));
                }
                let sum: f64 = row.iter().sum();
                if (sum - 1.0).abs() > 1e-3 {
                    return Err(SimError::Runtime(format!(
                        "transition_matrix row {s} of {:?} sums to {sum}, not 1 within 1e-3",
                        m.model_name
                    )));
                }
            }
        }
        match m.replication_model {
            ReplicationModelKind::Constant => {
                if m.constant_pop_size < 1 {
                    return Err(SimError::config(format!(
                        "constant_pop_size of {:?} must be >= 1",
                        m.model_name
                    )));
                }
            }
            ReplicationModelKind::Bht => {
                if m.max_pop_size < 1 {
                    return Err(SimError::config(format!(
                        "max_pop_size of {:?} must be >= 1",
                        m.model_name
                    )));
                }
                if m.growth_rate <= 0.0 {
                    return Err(SimError::config(format!(
                        "growth_rate of {:?} must be > 0",
                        m.model_name
                    )));
                }
            }
            ReplicationModelKind::Fitness => {
                if m.max_pop_size < 1 {
                    return Err(SimError::config(format!(
                        "max_pop_size of {:?} must be >= 1",
                        m.model_name
                    )));
                }
            }
        }
        // Fixed durations longer than the run never fire; reject them early.
        if !m.probabilistic_duration {
            for (label, d) in [
                ("exposed_duration", m.exposed_duration),
                ("infected_duration", m.infected_duration),
                ("infective_duration", m.infective_duration),
                ("removed_duration", m.removed_duration),
                ("recovered_duration", m.recovered_duration),
                ("dead_duration", m.dead_duration),
                ("vaccinated_duration", m.vaccinated_duration),
            ] {
                if d > self.simulation.num_generations {
                    return Err(SimError::config(format!(
                        "{label} of {:?} ({d}) exceeds num_generations ({})",
                        m.model_name, self.simulation.num_generations
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_stop_condition(&self, index: usize, sc: &StopConditionConfig) -> Result<()> {
        let seq = sc
            .sequence
            .as_deref()
            .ok_or_else(|| SimError::config(format!("stop_condition {index} missing sequence")))?;
        match sc.condition {
            StopConditionKind::AlleleLoss | StopConditionKind::AlleleFixloss => {
                let pos = sc.position.ok_or_else(|| {
                    SimError::config(format!("stop_condition {index} missing position"))
                })?;
                if pos >= self.simulation.num_sites {
                    return Err(SimError::config(format!(
                        "stop_condition {index} position {pos} is out of range"
                    )));
                }
                if seq.chars().count() != 1 {
                    return Err(SimError::config(format!(
                        "stop_condition {index} sequence must be a single character"
                    )));
                }
                self.state_of_char(seq.chars().next().unwrap())
                    .map_err(|_| {
                        SimError::config(format!(
                            "stop_condition {index} character {seq:?} is not in expected_characters"
                        ))
                    })?;
            }
            StopConditionKind::GenotypeLoss => {
                if seq.chars().count() != self.simulation.num_sites {
                    return Err(SimError::config(format!(
                        "stop_condition {index} sequence length {} does not match num_sites {}",
                        seq.chars().count(),
                        self.simulation.num_sites
                    )));
                }
                for c in seq.chars() {
                    self.state_of_char(c).map_err(|_| {
                        SimError::config(format!(
                            "stop_condition {index} character {c:?} is not in expected_characters"
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }

    fn check_partition<'a, I>(&self, family: &str, host_id_lists: I) -> Result<()>
    where
        I: Iterator<Item = &'a Vec<u32>>,
    {
        let popsize = self.simulation.host_popsize;
        let mut seen: HashSet<u32> = HashSet::new();
        let mut any = false;
        for ids in host_id_lists {
            any = true;
            for &id in ids {
                if id >= popsize {
                    return Err(SimError::config(format!(
                        "{family}: host id {id} is outside the population (host_popsize {popsize})"
                    )));
                }
                if !seen.insert(id) {
                    return Err(SimError::config(format!(
                        "{family}: host id {id} is assigned to more than one model"
                    )));
                }
            }
        }
        if !any {
            return Err(SimError::config(format!(
                "at least one {family} section is required"
            )));
        }
        if seen.len() != popsize as usize {
            return Err(SimError::config(format!(
                "{family}: host ids cover {} of {popsize} hosts; the sections must partition the population",
                seen.len()
            )));
        }
        Ok(())
    }
}
