//! Intrahost models: replication rule, mutation parameters, durations.

use crate::config::{IntrahostModelConfig, ReplicationModelKind};
use crate::error::{Result, SimError};
use contagium_data::{Status, TIMER_UNSET};
use rand::Rng;
use rand_distr::{Distribution, Poisson, WeightedIndex};

/// Population-size rule applied before mutation each generation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationRule {
    /// Fixed population size.
    Constant { pop_size: usize },
    /// Beverton-Holt with threshold: `ceil(r*N*K / (K + (r-1)*N))`, capped
    /// at K.
    BevertonHolt { max_pop_size: usize, growth_rate: f64 },
    /// Absolute fitness: per-pathogen Poisson offspring, total capped at
    /// `max_pop_size`.
    Fitness { max_pop_size: usize },
}

impl ReplicationRule {
    /// Whether offspring counts come from per-pathogen Poisson draws
    /// (absolute) rather than a multinomial over relative weights.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        matches!(self, ReplicationRule::Fitness { .. })
    }

    /// Target population size for the relative modes. The absolute mode has
    /// no explicit target; callers cap its total at `max_pop_size`.
    #[must_use]
    pub fn next_pop_size(&self, current: usize) -> usize {
        match *self {
            ReplicationRule::Constant { pop_size } => pop_size,
            ReplicationRule::BevertonHolt {
                max_pop_size,
                growth_rate,
            } => {
                let n = current as f64;
                let k = max_pop_size as f64;
                let r = growth_rate;
                let next = (r * n * k / (k + (r - 1.0) * n)).ceil() as usize;
                next.min(max_pop_size)
            }
            ReplicationRule::Fitness { max_pop_size } => max_pop_size,
        }
    }
}

/// Row-stochastic substitution matrix over the alphabet, with cached
/// per-row samplers. The diagonal is conventionally zero (no
/// self-transition); zero entries are impossible transitions.
#[derive(Debug)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
    samplers: Vec<Option<WeightedIndex<f64>>>,
}

impl TransitionMatrix {
    /// Build from validated rows. Rows are assumed non-negative and summing
    /// to 1 within 1e-3 (the config gate enforces this); rows that still
    /// fail to produce a sampler surface as runtime errors on first use.
    #[must_use]
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        let samplers = rows
            .iter()
            .map(|row| WeightedIndex::new(row.iter().copied()).ok())
            .collect();
        Self { rows, samplers }
    }

    /// A matrix with no rows, for models that never mutate.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            samplers: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(&self, state: u8) -> Option<&[f64]> {
        self.rows.get(usize::from(state)).map(Vec::as_slice)
    }

    /// Draw the replacement state for a site currently in `from`.
    pub fn sample<R: Rng + ?Sized>(&self, from: u8, rng: &mut R) -> Result<u8> {
        let sampler = self
            .samplers
            .get(usize::from(from))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                SimError::runtime(format!("no usable transition row for state {from}"))
            })?;
        Ok(sampler.sample(rng) as u8)
    }
}

/// Per-status infection timers, in generations. Zero means
/// "perpetual/unused".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusDurations {
    pub exposed: u64,
    pub infected: u64,
    pub infective: u64,
    pub removed: u64,
    pub recovered: u64,
    pub dead: u64,
    pub vaccinated: u64,
}

impl StatusDurations {
    #[must_use]
    pub fn of(&self, status: Status) -> u64 {
        match status {
            Status::Susceptible => 0,
            Status::Exposed => self.exposed,
            Status::Infected => self.infected,
            Status::Infective => self.infective,
            Status::Removed => self.removed,
            Status::Recovered => self.recovered,
            Status::Dead => self.dead,
            Status::Vaccinated => self.vaccinated,
        }
    }
}

/// One intrahost model bound to a subset of hosts.
#[derive(Debug)]
pub struct IntrahostModel {
    id: u32,
    name: String,
    rule: ReplicationRule,
    mutation_rate: f64,
    transition: TransitionMatrix,
    recombination_rate: f64,
    durations: StatusDurations,
    probabilistic_duration: bool,
}

impl IntrahostModel {
    pub fn from_config(id: u32, config: &IntrahostModelConfig) -> Result<Self> {
        let rule = match config.replication_model {
            ReplicationModelKind::Constant => ReplicationRule::Constant {
                pop_size: config.constant_pop_size,
            },
            ReplicationModelKind::Bht => ReplicationRule::BevertonHolt {
                max_pop_size: config.max_pop_size,
                growth_rate: config.growth_rate,
            },
            ReplicationModelKind::Fitness => ReplicationRule::Fitness {
                max_pop_size: config.max_pop_size,
            },
        };
        let transition = if config.mutation_rate > 0.0 {
            TransitionMatrix::new(config.transition_matrix.clone())
        } else {
            TransitionMatrix::empty()
        };
        Ok(Self {
            id,
            name: config.model_name.clone(),
            rule,
            mutation_rate: config.mutation_rate,
            transition,
            recombination_rate: config.recombination_rate,
            durations: StatusDurations {
                exposed: config.exposed_duration,
                infected: config.infected_duration,
                infective: config.infective_duration,
                removed: config.removed_duration,
                recovered: config.recovered_duration,
                dead: config.dead_duration,
                vaccinated: config.vaccinated_duration,
            },
            probabilistic_duration: config.probabilistic_duration,
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
    pub fn rule(&self) -> &ReplicationRule {
        &self.rule
    }

    #[must_use]
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    #[must_use]
    pub fn transition(&self) -> &TransitionMatrix {
        &self.transition
    }

    #[must_use]
    pub fn recombination_rate(&self) -> f64 {
        self.recombination_rate
    }

    /// Timer value for a host entering `status`: the configured duration,
    /// or a Poisson(mean) draw when the model is probabilistic. A zero
    /// duration means the status is perpetual and the timer stays unset.
    pub fn duration_of<R: Rng + ?Sized>(&self, status: Status, rng: &mut R) -> i64 {
        let mean = self.durations.of(status);
        if mean == 0 {
            return TIMER_UNSET;
        }
        if self.probabilistic_duration {
            let poisson =
                Poisson::new(mean as f64).expect("positive duration mean always admits a Poisson");
            poisson.sample(rng) as i64
        } else {
            mean as i64
        }
    }
}
