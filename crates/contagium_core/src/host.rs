//! Host: a container of pathogen references bound to three models.
//!
//! Each host is a small actor. All mutation goes through its own methods,
//! which take the host's locks, so two transmission workers appending to
//! the same destination serialize here and a snapshot taken mid-phase is
//! always coherent.

use crate::error::{Result, SimError};
use crate::models::{FitnessModel, IntrahostModel, TransmissionModel};
use crate::tree::NodeId;
use contagium_data::{Status, TIMER_UNSET};
use rand::Rng;
use std::sync::{Arc, Mutex, OnceLock};

/// Compartmental state of a host: status plus countdown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostState {
    pub status: Status,
    /// Positive values count down one per Process; `TIMER_UNSET` (-1) means
    /// unused/perpetual.
    pub timer: i64,
}

pub struct Host {
    id: u32,
    type_id: u32,
    pathogens: Mutex<Vec<NodeId>>,
    state: Mutex<HostState>,
    intrahost: OnceLock<Arc<IntrahostModel>>,
    fitness: OnceLock<Arc<FitnessModel>>,
    transmission: OnceLock<Arc<TransmissionModel>>,
}

impl Host {
    #[must_use]
    pub fn new(id: u32, type_id: u32) -> Self {
        Self {
            id,
            type_id,
            pathogens: Mutex::new(Vec::new()),
            state: Mutex::new(HostState {
                status: Status::Susceptible,
                timer: TIMER_UNSET,
            }),
            intrahost: OnceLock::new(),
            fitness: OnceLock::new(),
            transmission: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Coherent snapshot of the current pathogen references. The returned
    /// vector is the caller's to mutate.
    #[must_use]
    pub fn pathogens(&self) -> Vec<NodeId> {
        self.pathogens.lock().expect("pathogen bag poisoned").clone()
    }

    #[must_use]
    pub fn pop_size(&self) -> usize {
        self.pathogens.lock().expect("pathogen bag poisoned").len()
    }

    /// Uniform sample of `min(n, pop_size)` references without replacement,
    /// in no particular order.
    pub fn pick<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<NodeId> {
        let bag = self.pathogens.lock().expect("pathogen bag poisoned");
        let take = n.min(bag.len());
        if take == 0 {
            return Vec::new();
        }
        rand::seq::index::sample(rng, bag.len(), take)
            .into_iter()
            .map(|i| bag[i])
            .collect()
    }

    pub fn add(&self, nodes: &[NodeId]) {
        if nodes.is_empty() {
            return;
        }
        self.pathogens
            .lock()
            .expect("pathogen bag poisoned")
            .extend_from_slice(nodes);
    }

    /// Replace the whole population with the next generation.
    pub fn set_pathogens(&self, nodes: Vec<NodeId>) {
        *self.pathogens.lock().expect("pathogen bag poisoned") = nodes;
    }

    /// Drop every reference. The nodes stay in the tree.
    pub fn remove_all(&self) {
        self.pathogens.lock().expect("pathogen bag poisoned").clear();
    }

    /// Remove specific references (one occurrence each), for exchange moves.
    pub fn remove(&self, nodes: &[NodeId]) {
        let mut bag = self.pathogens.lock().expect("pathogen bag poisoned");
        for node in nodes {
            if let Some(pos) = bag.iter().position(|p| p == node) {
                bag.swap_remove(pos);
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> HostState {
        *self.state.lock().expect("host state poisoned")
    }

    pub fn set_state(&self, status: Status, timer: i64) {
        *self.state.lock().expect("host state poisoned") = HostState { status, timer };
    }

    /// Count a positive timer down by one.
    pub fn tick_timer(&self) {
        let mut state = self.state.lock().expect("host state poisoned");
        if state.timer > 0 {
            state.timer -= 1;
        }
    }

    pub fn bind_intrahost(&self, model: Arc<IntrahostModel>) -> Result<()> {
        self.intrahost
            .set(model)
            .map_err(|_| SimError::config(format!("host {} already has an intrahost model", self.id)))
    }

    pub fn bind_fitness(&self, model: Arc<FitnessModel>) -> Result<()> {
        self.fitness
            .set(model)
            .map_err(|_| SimError::config(format!("host {} already has a fitness model", self.id)))
    }

    pub fn bind_transmission(&self, model: Arc<TransmissionModel>) -> Result<()> {
        self.transmission
            .set(model)
            .map_err(|_| SimError::config(format!("host {} already has a transmission model", self.id)))
    }

    pub fn intrahost_model(&self) -> Result<&Arc<IntrahostModel>> {
        self.intrahost
            .get()
            .ok_or_else(|| SimError::runtime(format!("host {} has no intrahost model", self.id)))
    }

    pub fn fitness_model(&self) -> Result<&Arc<FitnessModel>> {
        self.fitness
            .get()
            .ok_or_else(|| SimError::runtime(format!("host {} has no fitness model", self.id)))
    }

    pub fn transmission_model(&self) -> Result<&Arc<TransmissionModel>> {
        self.transmission
            .get()
            .ok_or_else(|| SimError::runtime(format!("host {} has no transmission model", self.id)))
    }
}
