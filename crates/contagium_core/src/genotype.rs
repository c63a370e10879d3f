//! Deduplicated genotype pool.
//!
//! A `Genotype` is the canonical identity of a sequence content. The pool
//! guarantees that two genealogy nodes carrying identical sequences share
//! one `Genotype` instance, so per-genotype work (fitness, site indexing)
//! is done once no matter how many pathogens carry the sequence.

use crate::models::fitness::FitnessModel;
use contagium_data::Sequence;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Canonical identity of one sequence content.
pub struct Genotype {
    uid: Uuid,
    sequence: Sequence,
    /// state -> site positions holding that state, built once at creation.
    positions: Vec<Vec<u32>>,
    /// fitness-model id -> memoized value. Fitness functions are pure over
    /// the sequence, so a stored value never goes stale.
    fitness_cache: Mutex<HashMap<u32, f64>>,
}

impl Genotype {
    fn new(sequence: Sequence, alphabet_size: usize) -> Self {
        let states = usize::from(sequence.max_state()) + 1;
        let mut positions = vec![Vec::new(); states.max(alphabet_size)];
        for (pos, &state) in sequence.states().iter().enumerate() {
            positions[usize::from(state)].push(pos as u32);
        }
        Self {
            uid: Uuid::new_v4(),
            sequence,
            positions,
            fitness_cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn uid(&self) -> Uuid {
        self.uid
    }

    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Site positions currently holding `state`.
    #[must_use]
    pub fn positions_of(&self, state: u8) -> &[u32] {
        self.positions
            .get(usize::from(state))
            .map_or(&[], Vec::as_slice)
    }

    /// States that occur in the sequence at least once, ascending.
    #[must_use]
    pub fn occupied_states(&self) -> impl Iterator<Item = u8> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_empty())
            .map(|(s, _)| s as u8)
    }

    /// Fitness under `model`, memoized by model id.
    #[must_use]
    pub fn fitness(&self, model: &FitnessModel) -> f64 {
        let mut cache = self.fitness_cache.lock().expect("fitness cache poisoned");
        *cache
            .entry(model.id())
            .or_insert_with(|| model.evaluate(&self.sequence))
    }
}

/// Content-addressed pool of genotypes.
pub struct GenotypeSet {
    alphabet_size: usize,
    by_content: RwLock<HashMap<Sequence, Arc<Genotype>>>,
}

impl GenotypeSet {
    #[must_use]
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            alphabet_size,
            by_content: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the pool's genotype for `sequence`, creating it on first
    /// occurrence. The boolean is true when this call created the entry.
    ///
    /// Idempotent in content: two calls with equal state vectors return the
    /// same `Arc`. Most calls hit the existing-entry fast path under the
    /// read lock.
    pub fn intern(&self, sequence: Sequence) -> (Arc<Genotype>, bool) {
        {
            let map = self.by_content.read().expect("genotype pool poisoned");
            if let Some(existing) = map.get(&sequence) {
                return (Arc::clone(existing), false);
            }
        }
        let mut map = self.by_content.write().expect("genotype pool poisoned");
        // Another writer may have interned it between the two locks.
        if let Some(existing) = map.get(&sequence) {
            return (Arc::clone(existing), false);
        }
        let genotype = Arc::new(Genotype::new(sequence.clone(), self.alphabet_size));
        map.insert(sequence, Arc::clone(&genotype));
        (genotype, true)
    }

    /// Look up without interning.
    #[must_use]
    pub fn get(&self, sequence: &Sequence) -> Option<Arc<Genotype>> {
        self.by_content
            .read()
            .expect("genotype pool poisoned")
            .get(sequence)
            .map(Arc::clone)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_content.read().expect("genotype pool poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
