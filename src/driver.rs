//! Multi-instance run driver.
//!
//! Loads and validates the configuration, parses the input files once,
//! then runs every instance sequentially against a shared log sink (rows
//! carry the instance index). A runtime failure aborts only its instance;
//! the run manifest records the outcome either way and the driver exits
//! non-zero if anything failed.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::ValueEnum;
use contagium_core::epidemic::{Epidemic, EpidemicSetup, RunOutcome};
use contagium_core::models::FitnessTable;
use contagium_io::manifest::{InstanceRecord, RunManifest};
use contagium_io::{config as config_io, csv_log, fitness_file, network_file, seed, sqlite_log};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Which log sink backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Csv,
    Sqlite,
}

impl SinkKind {
    fn label(self) -> &'static str {
        match self {
            SinkKind::Csv => "csv",
            SinkKind::Sqlite => "sqlite",
        }
    }
}

/// Driver options, usually straight from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub threads: Option<usize>,
    pub logger: SinkKind,
    pub seed: Option<u64>,
    pub export_dot: bool,
}

/// Run every configured instance. Returns the per-instance outcomes of the
/// ones that completed.
pub fn run(options: RunOptions) -> anyhow::Result<Vec<RunOutcome>> {
    let config = Arc::new(
        config_io::load_config(&options.config_path)
            .with_context(|| format!("loading {}", options.config_path.display()))?,
    );
    let sim = &config.simulation;

    let translation = seed::translation_from_characters(&sim.expected_characters);
    let seeds = seed::parse_seed_file(Path::new(&sim.pathogen_path), &translation)?;
    let edges = network_file::parse_network_file(Path::new(&sim.host_network_path))?;
    let mut fitness_tables: HashMap<String, FitnessTable> = HashMap::new();
    for model in &config.fitness_model {
        let table = fitness_file::parse_fitness_file(
            Path::new(&model.fitness_model_path),
            sim.num_sites,
            config.alphabet_size(),
            &translation,
        )?;
        fitness_tables.insert(model.model_name.clone(), table);
    }

    if let Some(threads) = options.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            warn!("thread pool already initialized: {e}");
        }
    }

    let run_seed = options.seed.unwrap_or_else(rand::random);
    let log_dir = PathBuf::from(&config.logging.log_path);
    fs::create_dir_all(&log_dir)?;
    let sink = match options.logger {
        SinkKind::Csv => csv_log::spawn_csv_sink(&log_dir)?,
        SinkKind::Sqlite => sqlite_log::spawn_sqlite_sink(&log_dir)?,
    };
    let logger = sink.logger();

    let mut manifest = RunManifest {
        started_at: Utc::now().to_rfc3339(),
        finished_at: None,
        seed: run_seed,
        threads: options.threads.unwrap_or_else(rayon::current_num_threads),
        logger: options.logger.label().to_string(),
        config_fingerprint: config_io::fingerprint(&config),
        translation: translation
            .iter()
            .map(|(c, s)| (c.to_string(), *s))
            .collect(),
        instances: Vec::new(),
    };
    info!(
        seed = run_seed,
        instances = sim.num_instances,
        generations = sim.num_generations,
        sink = options.logger.label(),
        "run starting"
    );

    let mut outcomes = Vec::new();
    let mut failures = 0usize;
    for instance in 0..sim.num_instances {
        let setup = EpidemicSetup {
            instance,
            config: Arc::clone(&config),
            run_seed,
            seeds: seeds.clone(),
            edges: edges.clone(),
            fitness_tables: fitness_tables.clone(),
            logger: logger.clone(),
        };
        match run_instance(setup, options.export_dot, &log_dir) {
            Ok(outcome) => {
                manifest.instances.push(InstanceRecord {
                    instance,
                    generations_run: outcome.generations_run,
                    stop_reason: outcome.stop_reason.clone(),
                    nodes: outcome.node_count,
                    genotypes: outcome.genotype_count,
                    error: None,
                });
                outcomes.push(outcome);
            }
            Err(err) => {
                error!(instance, "instance aborted: {err}");
                manifest.instances.push(InstanceRecord {
                    instance,
                    generations_run: 0,
                    stop_reason: None,
                    nodes: 0,
                    genotypes: 0,
                    error: Some(err.to_string()),
                });
                failures += 1;
            }
        }
    }

    sink.close().context("closing the log sink")?;
    manifest.finished_at = Some(Utc::now().to_rfc3339());
    manifest.save(&log_dir.join("run.json"))?;

    if failures > 0 {
        bail!("{failures} of {} instances failed", sim.num_instances);
    }
    Ok(outcomes)
}

fn run_instance(
    setup: EpidemicSetup,
    export_dot: bool,
    log_dir: &Path,
) -> anyhow::Result<RunOutcome> {
    let instance = setup.instance;
    let mut epidemic = Epidemic::new(setup)?;
    let outcome = epidemic.run()?;
    if export_dot {
        let path = log_dir.join(format!("genotypes_{instance}.dot"));
        fs::write(&path, epidemic.tree().to_dot())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(outcome)
}
