//! Epidemic controller: one instance's generation loop.
//!
//! The controller owns the hosts, the network, the genotype tree and the
//! model tables of a single instance, and drives
//! Process -> Transmit -> Update per generation with stop conditions
//! checked after Transmit. Variants differ only in the infectable-status
//! set and the transition rules applied inside Update.

use crate::config::{EpidemicModel, MigrantPolicy, SimulationConfig};
use crate::error::{Result, SimError};
use crate::host::Host;
use crate::logger::Logger;
use crate::models::{FitnessModel, FitnessTable, IntrahostModel, TransmissionModel};
use crate::network::HostNetwork;
use crate::process::intrahost::process_host;
use crate::process::transmission::{exchange_pair, transmit_edge, TransmitOptions};
use crate::process::update::update_host;
use crate::process::{PhaseContext, StatusSet};
use crate::stop::StopCondition;
use crate::tree::GenotypeTree;
use contagium_data::{Sequence, Status};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One seed pathogen bound for one host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSeed {
    pub host: u32,
    pub sequence: Sequence,
}

/// Everything an instance needs, already parsed and validated upstream.
pub struct EpidemicSetup {
    pub instance: u32,
    pub config: Arc<SimulationConfig>,
    pub run_seed: u64,
    pub seeds: Vec<HostSeed>,
    pub edges: Vec<(u32, u32, f64)>,
    /// Parsed fitness landscape per fitness-model name.
    pub fitness_tables: HashMap<String, FitnessTable>,
    pub logger: Logger,
}

/// Summary of a finished (or stopped) instance.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub instance: u32,
    pub generations_run: u64,
    pub stop_reason: Option<String>,
    pub node_count: usize,
    pub genotype_count: usize,
    pub status_counts: Vec<(Status, usize)>,
}

pub struct Epidemic {
    instance: u32,
    config: Arc<SimulationConfig>,
    run_seed: u64,
    variant: EpidemicModel,
    hosts: Vec<Arc<Host>>,
    network: HostNetwork,
    tree: GenotypeTree,
    seeds: Vec<HostSeed>,
    stop_conditions: Vec<StopCondition>,
    stop_reason: Option<String>,
    transmit_options: TransmitOptions,
    logger: Logger,
}

impl Epidemic {
    pub fn new(setup: EpidemicSetup) -> Result<Self> {
        let EpidemicSetup {
            instance,
            config,
            run_seed,
            seeds,
            edges,
            fitness_tables,
            logger,
        } = setup;
        config.validate()?;
        let sim = &config.simulation;
        let variant = sim.epidemic_model;
        let alphabet_size = config.alphabet_size();

        let hosts: Vec<Arc<Host>> = (0..sim.host_popsize)
            .map(|id| Arc::new(Host::new(id, 0)))
            .collect();

        // The endtrans variant skips oversize draws instead of clamping.
        let default_policy = if variant == EpidemicModel::Endtrans {
            MigrantPolicy::Skip
        } else {
            MigrantPolicy::Clamp
        };

        for (index, model_config) in config.intrahost_model.iter().enumerate() {
            let model = Arc::new(IntrahostModel::from_config(index as u32, model_config)?);
            for &id in &model_config.host_ids {
                hosts[id as usize].bind_intrahost(Arc::clone(&model))?;
            }
        }
        for (index, model_config) in config.fitness_model.iter().enumerate() {
            let table = fitness_tables
                .get(&model_config.model_name)
                .cloned()
                .ok_or_else(|| {
                    SimError::config(format!(
                        "no fitness table loaded for model {:?}",
                        model_config.model_name
                    ))
                })?;
            let model = Arc::new(FitnessModel::new(
                index as u32,
                model_config.model_name.clone(),
                model_config.fitness_model,
                table,
                sim.num_sites,
                alphabet_size,
            )?);
            for &id in &model_config.host_ids {
                hosts[id as usize].bind_fitness(Arc::clone(&model))?;
            }
        }
        for (index, model_config) in config.transmission_model.iter().enumerate() {
            let model = Arc::new(TransmissionModel::from_config(
                index as u32,
                model_config,
                default_policy,
            ));
            for &id in &model_config.host_ids {
                hosts[id as usize].bind_transmission(Arc::clone(&model))?;
            }
        }

        let network = HostNetwork::from_edges(sim.host_popsize, edges)?;

        let mut infectable = StatusSet::empty().with(Status::Susceptible);
        if sim.coinfection {
            infectable = infectable
                .with(Status::Exposed)
                .with(Status::Infected)
                .with(Status::Infective);
        }
        let transmit_options = TransmitOptions {
            infectable,
            end_of_infection_only: variant == EpidemicModel::Endtrans,
            log_transmission: config.logging.log_transmission,
            exchange_removes_migrants: sim.exchange_removes_migrants,
        };

        let stop_conditions = config
            .stop_condition
            .iter()
            .map(|entry| StopCondition::from_config(entry, &config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            instance,
            config,
            run_seed,
            variant,
            hosts,
            network,
            tree: GenotypeTree::new(alphabet_size),
            seeds,
            stop_conditions,
            stop_reason: None,
            transmit_options,
            logger,
        })
    }

    /// Seed the tree and the hosts. Every seed becomes a root node.
    pub fn initialize(&mut self) -> Result<()> {
        let sim = &self.config.simulation;
        if self.seeds.is_empty() {
            warn!(instance = self.instance, "no seed pathogens; the run will stay quiet");
        }
        let alphabet = self.config.alphabet_size() as u16;
        for seed in &self.seeds {
            if seed.sequence.len() != sim.num_sites {
                return Err(SimError::domain(format!(
                    "seed for host {} has {} sites, expected {}",
                    seed.host,
                    seed.sequence.len(),
                    sim.num_sites
                )));
            }
            if u16::from(seed.sequence.max_state()) >= alphabet {
                return Err(SimError::domain(format!(
                    "seed for host {} uses a state outside the {alphabet}-letter alphabet",
                    seed.host
                )));
            }
            let host = self.hosts.get(seed.host as usize).ok_or_else(|| {
                SimError::domain(format!("seed host {} is outside the population", seed.host))
            })?;
            let creation = self.tree.new_node(seed.sequence.clone(), &[]);
            if let Some(row) = creation.genotype_row {
                self.logger.genotype(row)?;
            }
            self.logger.node(creation.node_row)?;
            host.add(&[creation.id]);
        }
        info!(
            instance = self.instance,
            seeds = self.seeds.len(),
            hosts = self.hosts.len(),
            edges = self.network.edge_count(),
            model = ?self.variant,
            "instance initialized"
        );
        Ok(())
    }

    fn phase_context(&self, generation: u64) -> PhaseContext<'_> {
        PhaseContext {
            instance: self.instance,
            generation,
            run_seed: self.run_seed,
            tree: &self.tree,
            logger: &self.logger,
        }
    }

    /// Intrahost pass: every host replicates and mutates independently.
    pub fn process(&self, generation: u64) -> Result<()> {
        let ctx = self.phase_context(generation);
        self.hosts
            .par_iter()
            .try_for_each(|host| process_host(&ctx, host))
    }

    /// Transmission pass: one worker per edge (per pair for exchange).
    pub fn transmit(&self, generation: u64) -> Result<()> {
        let ctx = self.phase_context(generation);
        let opts = &self.transmit_options;
        if self.variant == EpidemicModel::Exchange {
            let pairs = self.network.undirected_pairs();
            pairs.par_iter().enumerate().try_for_each(|(index, &(a, b, weight))| {
                exchange_pair(
                    &ctx,
                    index,
                    &self.hosts[a as usize],
                    &self.hosts[b as usize],
                    weight,
                    opts,
                )
            })
        } else {
            self.network
                .edges()
                .par_iter()
                .enumerate()
                .try_for_each(|(index, edge)| {
                    transmit_edge(
                        &ctx,
                        index,
                        &self.hosts[edge.src as usize],
                        &self.hosts[edge.dst as usize],
                        edge.weight,
                        opts,
                    )
                })
        }
    }

    /// Evaluate stop conditions. Returns true when the run should
    /// continue; on false the reason is kept for the outcome.
    pub fn check_stop(&mut self, generation: u64) -> bool {
        for condition in &self.stop_conditions {
            if let Some(reason) = condition.evaluate(&self.hosts, &self.tree) {
                info!(
                    instance = self.instance,
                    generation,
                    condition = %condition,
                    reason,
                    "stop condition hit"
                );
                self.stop_reason = Some(reason);
                return false;
            }
        }
        true
    }

    /// Status/timer pass plus gated status and frequency emission.
    pub fn update(&self, generation: u64, stopped: bool) -> Result<()> {
        let should_log = generation == 0
            || generation % self.config.logging.log_freq == 0
            || stopped;
        let ctx = self.phase_context(generation);
        self.hosts
            .par_iter()
            .try_for_each(|host| update_host(&ctx, host, self.variant, should_log))?;
        self.logger.flush_generation(generation)?;
        Ok(())
    }

    /// Final bookkeeping; safe to call after an early stop.
    pub fn finalize(&self, generations_run: u64) -> Result<RunOutcome> {
        let status_counts = self.status_counts();
        let outcome = RunOutcome {
            instance: self.instance,
            generations_run,
            stop_reason: self.stop_reason.clone(),
            node_count: self.tree.node_count(),
            genotype_count: self.tree.genotype_count(),
            status_counts,
        };
        info!(
            instance = outcome.instance,
            generations = outcome.generations_run,
            nodes = outcome.node_count,
            genotypes = outcome.genotype_count,
            stop_reason = outcome.stop_reason.as_deref().unwrap_or("-"),
            "instance finished"
        );
        Ok(outcome)
    }

    /// The full generation loop.
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.initialize()?;
        self.update(0, false)?;
        let mut generations_run = 0;
        for generation in 1..=self.config.simulation.num_generations {
            self.process(generation)?;
            self.transmit(generation)?;
            let stopped = !self.check_stop(generation);
            self.update(generation, stopped)?;
            generations_run = generation;
            debug!(
                instance = self.instance,
                generation,
                nodes = self.tree.node_count(),
                "generation complete"
            );
            if stopped {
                break;
            }
        }
        self.finalize(generations_run)
    }

    fn status_counts(&self) -> Vec<(Status, usize)> {
        let mut counts: Vec<(Status, usize)> = Vec::new();
        for code in 1..=8 {
            let status = Status::from_code(code).expect("codes 1..=8 are valid");
            let count = self
                .hosts
                .iter()
                .filter(|h| h.state().status == status)
                .count();
            if count > 0 {
                counts.push((status, count));
            }
        }
        counts
    }

    #[must_use]
    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    #[must_use]
    pub fn host(&self, id: u32) -> &Arc<Host> {
        &self.hosts[id as usize]
    }

    #[must_use]
    pub fn tree(&self) -> &GenotypeTree {
        &self.tree
    }

    #[must_use]
    pub fn network(&self) -> &HostNetwork {
        &self.network
    }

    #[must_use]
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }
}
