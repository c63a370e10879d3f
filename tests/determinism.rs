mod common;

use common::{base_config, seed, setup};
use contagium_core::config::EpidemicModel;
use contagium_core::epidemic::{Epidemic, EpidemicSetup};
use contagium_core::logger::Logger;

fn ring_setup(run_seed: u64) -> EpidemicSetup {
    let mut config = base_config(6, 15, 40);
    config.simulation.epidemic_model = EpidemicModel::Sir;
    config.intrahost_model[0].mutation_rate = 0.02;
    config.intrahost_model[0].transition_matrix = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
    config.intrahost_model[0].constant_pop_size = 60;
    config.intrahost_model[0].infected_duration = 4;
    config.transmission_model[0].transmission_prob = 0.6;
    config.transmission_model[0].transmission_size = 2.0;

    let edges = (0..6u32).map(|i| (i, (i + 1) % 6, 0.6)).collect();
    let mut s = setup(
        config,
        vec![seed(0, vec![0; 40]), seed(0, vec![1; 40])],
        edges,
        Logger::disabled(),
    );
    s.run_seed = run_seed;
    s
}

/// Per-host fingerprint: status, timer, and the sorted multiset of
/// sequences held.
fn fingerprint(epidemic: &Epidemic) -> Vec<(u8, i64, Vec<String>)> {
    epidemic
        .hosts()
        .iter()
        .map(|host| {
            let state = host.state();
            let mut sequences: Vec<String> = host
                .pathogens()
                .iter()
                .map(|&node| epidemic.tree().node(node).genotype().sequence().to_hex())
                .collect();
            sequences.sort();
            (state.status.code(), state.timer, sequences)
        })
        .collect()
}

#[test]
fn test_same_seed_same_trajectory() {
    let mut first = Epidemic::new(ring_setup(1234)).unwrap();
    let outcome_a = first.run().unwrap();
    let mut second = Epidemic::new(ring_setup(1234)).unwrap();
    let outcome_b = second.run().unwrap();

    assert_eq!(outcome_a.generations_run, outcome_b.generations_run);
    assert_eq!(outcome_a.node_count, outcome_b.node_count);
    assert_eq!(outcome_a.genotype_count, outcome_b.genotype_count);
    assert_eq!(
        fingerprint(&first),
        fingerprint(&second),
        "identical seeds must replay the identical epidemic"
    );
}

#[test]
fn test_different_seeds_diverge() {
    let mut first = Epidemic::new(ring_setup(1)).unwrap();
    first.run().unwrap();
    let mut second = Epidemic::new(ring_setup(2)).unwrap();
    second.run().unwrap();

    // With per-site mutation across 15 generations two streams agreeing
    // everywhere would mean the seed is being ignored.
    assert_ne!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn test_referential_integrity_after_run() {
    let mut epidemic = Epidemic::new(ring_setup(99)).unwrap();
    epidemic.run().unwrap();

    // Every pathogen reference in every host resolves inside the tree.
    let tree = epidemic.tree();
    for host in epidemic.hosts() {
        for node in host.pathogens() {
            let uid = tree.node(node).uid();
            assert!(tree.contains_uid(uid));
        }
    }
}
