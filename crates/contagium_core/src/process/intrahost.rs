//! Intrahost phase: replication and mutation inside one host.
//!
//! Replication either redraws the population from relative fitness weights
//! (exp-normalized log fitnesses, multinomial offspring counts) or gives
//! every pathogen an independent Poisson(fitness) brood. Mutation then
//! walks each offspring's sites per state class, and only a changed
//! sequence allocates a new genealogy node.

use super::{PhaseContext, PHASE_PROCESS};
use crate::error::{Result, SimError};
use crate::host::Host;
use crate::models::{FitnessModel, IntrahostModel, ReplicationRule};
use crate::rng::worker_rng;
use crate::tree::{GenotypeNode, NodeId};
use contagium_data::{MutationRow, Sequence};
use rand::Rng;
use rand_distr::{Binomial, Distribution, Poisson, WeightedIndex};
use std::sync::Arc;

/// Run one host through the Process step of generation `ctx.generation`.
///
/// Timers tick here for every host. Hosts whose status does not replicate
/// are done after that; terminal statuses additionally shed their
/// pathogens.
pub fn process_host(ctx: &PhaseContext<'_>, host: &Host) -> Result<()> {
    host.tick_timer();
    let state = host.state();
    if !state.status.replicates() {
        if state.status.sheds_pathogens() {
            host.remove_all();
        }
        return Ok(());
    }

    let pathogens = host.pathogens();
    if pathogens.is_empty() {
        return Ok(());
    }
    let model = host.intrahost_model()?;
    let fitness = host.fitness_model()?;
    let mut rng = worker_rng(
        ctx.run_seed,
        &[
            u64::from(ctx.instance),
            ctx.generation,
            u64::from(host.id()),
            PHASE_PROCESS,
        ],
    );

    let nodes: Vec<Arc<GenotypeNode>> = pathogens.iter().map(|&id| ctx.tree.node(id)).collect();
    let parent_draws = replicate(host, model, fitness, &nodes, &mut rng)?;

    let mut next_generation = Vec::with_capacity(parent_draws.len());
    for parent_index in parent_draws {
        let child = mutate_offspring(
            ctx,
            host,
            model,
            pathogens[parent_index],
            &nodes[parent_index],
            &mut rng,
        )?;
        next_generation.push(child);
    }
    host.set_pathogens(next_generation);
    Ok(())
}

/// Draw the pre-mutation population as indices into the current pathogen
/// list, one entry per offspring.
fn replicate<R: Rng + ?Sized>(
    host: &Host,
    model: &IntrahostModel,
    fitness: &FitnessModel,
    nodes: &[Arc<GenotypeNode>],
    rng: &mut R,
) -> Result<Vec<usize>> {
    let mut values = Vec::with_capacity(nodes.len());
    for node in nodes {
        let value = node.genotype().fitness(fitness);
        if value.is_nan() {
            return Err(SimError::runtime(format!(
                "NaN fitness for genotype {} in host {}",
                node.genotype().uid(),
                host.id()
            )));
        }
        values.push(value);
    }

    if model.rule().is_absolute() {
        // Fitness is a Poisson offspring rate per pathogen.
        let mut draws = Vec::new();
        for (index, &rate) in values.iter().enumerate() {
            let count = if rate <= 0.0 {
                0
            } else {
                let poisson = Poisson::new(rate).map_err(|_| {
                    SimError::runtime(format!("fitness {rate} is not a usable Poisson rate"))
                })?;
                poisson.sample(rng) as usize
            };
            draws.extend(std::iter::repeat(index).take(count));
        }
        if let ReplicationRule::Fitness { max_pop_size } = *model.rule() {
            if draws.len() > max_pop_size {
                draws = rand::seq::index::sample(rng, draws.len(), max_pop_size)
                    .into_iter()
                    .map(|i| draws[i])
                    .collect();
            }
        }
        Ok(draws)
    } else {
        // Relative: exp-normalize the log fitnesses, then a multinomial of
        // size next-pop-size over the normalized weights.
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = values.iter().map(|&v| (v - max).exp()).collect();
        let next_size = model.rule().next_pop_size(nodes.len());
        let index = WeightedIndex::new(&weights)
            .map_err(|e| SimError::runtime(format!("degenerate fitness weights: {e}")))?;
        Ok((0..next_size).map(|_| index.sample(rng)).collect())
    }
}

/// Mutate one offspring of `parent`. Returns the node the offspring ends up
/// referencing: the parent itself when the sequence is unchanged, a fresh
/// child node otherwise.
fn mutate_offspring<R: Rng + ?Sized>(
    ctx: &PhaseContext<'_>,
    host: &Host,
    model: &IntrahostModel,
    parent_id: NodeId,
    parent: &Arc<GenotypeNode>,
    rng: &mut R,
) -> Result<NodeId> {
    let rate = model.mutation_rate();
    if rate <= 0.0 {
        return Ok(parent_id);
    }
    let genotype = parent.genotype();
    let mut states: Option<Vec<u8>> = None;

    for state in genotype.occupied_states() {
        let positions = genotype.positions_of(state);
        let site_count = positions.len();
        let expected = site_count as f64 * rate;
        let hits = if expected < 1.0 {
            let poisson = Poisson::new(expected)
                .map_err(|_| SimError::runtime(format!("bad mutation expectation {expected}")))?;
            poisson.sample(rng) as usize
        } else {
            let binomial = Binomial::new(site_count as u64, rate)
                .map_err(|_| SimError::runtime(format!("bad mutation rate {rate}")))?;
            binomial.sample(rng) as usize
        };
        // A Poisson draw can exceed the number of sites in this class; there
        // are only site_count distinct positions to hit.
        let hits = hits.min(site_count);
        if hits == 0 {
            continue;
        }
        let buffer =
            states.get_or_insert_with(|| genotype.sequence().states().to_vec());
        for chosen in rand::seq::index::sample(rng, site_count, hits) {
            let site = positions[chosen] as usize;
            buffer[site] = model.transition().sample(state, rng)?;
        }
    }

    let Some(new_states) = states else {
        return Ok(parent_id);
    };
    let sequence = Sequence::new(new_states);
    if sequence == *genotype.sequence() {
        // The matrix allowed a self-transition; the genealogy records
        // distinct genotypes, not every replication.
        return Ok(parent_id);
    }

    let creation = ctx.tree.new_node(sequence, &[parent_id]);
    if let Some(row) = creation.genotype_row {
        ctx.logger.genotype(row)?;
    }
    let child_uid = creation.node_row.uid;
    ctx.logger.node(creation.node_row)?;
    ctx.logger.mutation(MutationRow {
        instance: ctx.instance,
        generation: ctx.generation,
        host: host.id(),
        parent_uid: parent.uid(),
        child_uid,
    })?;
    Ok(creation.id)
}
