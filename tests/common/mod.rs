//! Shared builders for the integration tests.

#![allow(dead_code)]

use contagium_core::config::{
    EpidemicModel, FitnessModelConfig, FitnessModelKind, IntrahostModelConfig, LoggingSection,
    ReplicationModelKind, SimulationConfig, SimulationSection, TransmissionMode,
    TransmissionModelConfig,
};
use contagium_core::epidemic::{EpidemicSetup, HostSeed};
use contagium_core::logger::Logger;
use contagium_core::models::FitnessTable;
use contagium_data::Sequence;
use std::collections::HashMap;
use std::sync::Arc;

/// A workable single-model configuration: SI, constant replication, no
/// mutation, certain transmission of one migrant. Tests override what they
/// exercise.
pub fn base_config(host_popsize: u32, num_generations: u64, num_sites: usize) -> SimulationConfig {
    let all_hosts: Vec<u32> = (0..host_popsize).collect();
    SimulationConfig {
        simulation: SimulationSection {
            num_generations,
            num_instances: 1,
            num_sites,
            host_popsize,
            epidemic_model: EpidemicModel::Si,
            coinfection: false,
            expected_characters: vec!["0".into(), "1".into()],
            pathogen_path: "unused".into(),
            host_network_path: "unused".into(),
            exchange_removes_migrants: false,
        },
        logging: LoggingSection {
            log_freq: 1,
            log_transmission: true,
            log_path: "unused".into(),
        },
        intrahost_model: vec![IntrahostModelConfig {
            model_name: "base".into(),
            host_ids: all_hosts.clone(),
            mutation_rate: 0.0,
            transition_matrix: vec![],
            recombination_rate: 0.0,
            replication_model: ReplicationModelKind::Constant,
            constant_pop_size: 100,
            max_pop_size: 0,
            growth_rate: 1.0,
            exposed_duration: 0,
            infected_duration: 0,
            infective_duration: 0,
            removed_duration: 0,
            recovered_duration: 0,
            dead_duration: 0,
            vaccinated_duration: 0,
            probabilistic_duration: false,
        }],
        fitness_model: vec![FitnessModelConfig {
            model_name: "neutral".into(),
            host_ids: all_hosts.clone(),
            fitness_model: FitnessModelKind::Multiplicative,
            fitness_model_path: "unused".into(),
        }],
        transmission_model: vec![TransmissionModelConfig {
            model_name: "contact".into(),
            host_ids: all_hosts,
            mode: TransmissionMode::Constant,
            transmission_prob: 1.0,
            transmission_size: 1.0,
            size_policy: None,
        }],
        stop_condition: vec![],
    }
}

/// Neutral (all-zero) fitness tables for every fitness model in `config`.
pub fn neutral_tables(config: &SimulationConfig) -> HashMap<String, FitnessTable> {
    config
        .fitness_model
        .iter()
        .map(|m| (m.model_name.clone(), FitnessTable::default()))
        .collect()
}

pub fn seed(host: u32, states: Vec<u8>) -> HostSeed {
    HostSeed {
        host,
        sequence: Sequence::new(states),
    }
}

pub fn setup(
    config: SimulationConfig,
    seeds: Vec<HostSeed>,
    edges: Vec<(u32, u32, f64)>,
    logger: Logger,
) -> EpidemicSetup {
    let config = Arc::new(config);
    let fitness_tables = neutral_tables(&config);
    EpidemicSetup {
        instance: 0,
        config,
        run_seed: 42,
        seeds,
        edges,
        fitness_tables,
        logger,
    }
}

/// Hamming distance between a sequence and a reference state vector.
pub fn hamming(sequence: &Sequence, reference: &[u8]) -> usize {
    sequence
        .states()
        .iter()
        .zip(reference)
        .filter(|(a, b)| a != b)
        .count()
}
