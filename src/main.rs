use anyhow::Result;
use clap::Parser;
use contagium_lib::{run, RunOptions, SinkKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker threads for the simulation phases (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Log sink backend
    #[arg(long, value_enum, default_value = "csv")]
    logger: SinkKind,

    /// Run seed; omit for a random one (recorded in run.json either way)
    #[arg(long)]
    seed: Option<u64>,

    /// Write a Graphviz rendering of each instance's genealogy
    #[arg(long)]
    export_dot: bool,

    /// Run configuration file
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let outcomes = run(RunOptions {
        config_path: args.config,
        threads: args.threads,
        logger: args.logger,
        seed: args.seed,
        export_dot: args.export_dot,
    })?;

    for outcome in &outcomes {
        if let Some(reason) = &outcome.stop_reason {
            println!(
                "instance {} stopped after {} generations: {}",
                outcome.instance, outcome.generations_run, reason
            );
        } else {
            println!(
                "instance {} completed {} generations ({} genotypes, {} nodes)",
                outcome.instance,
                outcome.generations_run,
                outcome.genotype_count,
                outcome.node_count
            );
        }
    }
    Ok(())
}
