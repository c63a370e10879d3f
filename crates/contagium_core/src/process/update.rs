//! Update phase: compartmental status and timer transitions.
//!
//! Each variant differs only in which transitions fire; the emission of
//! status and per-genotype frequency rows is common and gated by the log
//! frequency (t = 0, multiples of log_freq, and the stopping generation).

use super::{PhaseContext, PHASE_UPDATE};
use crate::config::EpidemicModel;
use crate::error::Result;
use crate::host::Host;
use crate::rng::worker_rng;
use contagium_data::{FrequencyRow, Status, StatusRow, TIMER_UNSET};
use std::collections::HashMap;
use uuid::Uuid;

/// Run one host through the Update step; `should_log` reflects the log
/// gating for this generation.
pub fn update_host(
    ctx: &PhaseContext<'_>,
    host: &Host,
    variant: EpidemicModel,
    should_log: bool,
) -> Result<()> {
    let state = host.state();
    let pop = host.pop_size();
    let model = host.intrahost_model()?;
    let mut rng = worker_rng(
        ctx.run_seed,
        &[
            u64::from(ctx.instance),
            ctx.generation,
            u64::from(host.id()),
            PHASE_UPDATE,
        ],
    );

    use EpidemicModel::*;
    use Status::*;
    let next = match state.status {
        Susceptible if state.timer == 0 || pop > 0 => {
            let entering = match variant {
                Sei | Seir | Seirs => Exposed,
                _ => Infected,
            };
            Some((entering, model.duration_of(entering, &mut rng)))
        }
        Exposed if state.timer == 0 => {
            // SEI collapses the two transmitting stages into one.
            let entering = if variant == Sei { Infected } else { Infective };
            Some((entering, model.duration_of(entering, &mut rng)))
        }
        Infected if state.timer == 0 || pop == 0 => match variant {
            Sis => Some((Susceptible, TIMER_UNSET)),
            Sir | Sirs | Endtrans => Some((Removed, model.duration_of(Removed, &mut rng))),
            // SI, SEI and exchange keep infected hosts infected.
            _ => None,
        },
        Infective if state.timer == 0 || pop == 0 => match variant {
            Seir | Seirs => Some((Removed, model.duration_of(Removed, &mut rng))),
            _ => None,
        },
        Removed if state.timer == 0 => match variant {
            Sirs | Seirs => Some((Susceptible, TIMER_UNSET)),
            _ => None,
        },
        _ => None,
    };

    let current_status = if let Some((status, timer)) = next {
        host.set_state(status, timer);
        if status.sheds_pathogens() || (state.status == Infected && status == Susceptible) {
            // SIS reinfection starts from a clean slate.
            host.remove_all();
        }
        status
    } else {
        state.status
    };

    if should_log {
        emit_records(ctx, host, current_status)?;
    }
    Ok(())
}

fn emit_records(ctx: &PhaseContext<'_>, host: &Host, status: Status) -> Result<()> {
    ctx.logger.status(StatusRow {
        instance: ctx.instance,
        generation: ctx.generation,
        host: host.id(),
        status: status.code(),
    })?;

    // Frequencies count by genotype identity, not node.
    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    for node in host.pathogens() {
        *counts
            .entry(ctx.tree.node(node).genotype().uid())
            .or_insert(0) += 1;
    }
    for (genotype_uid, freq) in counts {
        ctx.logger.frequency(FrequencyRow {
            instance: ctx.instance,
            generation: ctx.generation,
            host: host.id(),
            genotype_uid,
            freq,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntrahostModelConfig, ReplicationModelKind};
    use crate::logger::Logger;
    use crate::models::IntrahostModel;
    use crate::tree::GenotypeTree;
    use contagium_data::Sequence;
    use std::sync::Arc;

    fn model_with_durations(infected: u64, removed: u64) -> Arc<IntrahostModel> {
        let config = IntrahostModelConfig {
            model_name: "m".into(),
            host_ids: vec![0],
            mutation_rate: 0.0,
            transition_matrix: vec![],
            recombination_rate: 0.0,
            replication_model: ReplicationModelKind::Constant,
            constant_pop_size: 10,
            max_pop_size: 0,
            growth_rate: 1.0,
            exposed_duration: 2,
            infected_duration: infected,
            infective_duration: 3,
            removed_duration: removed,
            recovered_duration: 0,
            dead_duration: 0,
            vaccinated_duration: 0,
            probabilistic_duration: false,
        };
        Arc::new(IntrahostModel::from_config(0, &config).unwrap())
    }

    fn host_with_pathogens(tree: &GenotypeTree, n: usize) -> Host {
        let host = Host::new(0, 0);
        host.bind_intrahost(model_with_durations(5, 0)).unwrap();
        if n > 0 {
            let root = tree.new_node(Sequence::new(vec![0, 1]), &[]);
            host.add(&vec![root.id; n]);
        }
        host
    }

    fn ctx<'a>(tree: &'a GenotypeTree, logger: &'a Logger) -> PhaseContext<'a> {
        PhaseContext {
            instance: 0,
            generation: 1,
            run_seed: 17,
            tree,
            logger,
        }
    }

    #[test]
    fn test_susceptible_with_pathogens_becomes_infected() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 2);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Si, false).unwrap();
        let state = host.state();
        assert_eq!(state.status, Status::Infected);
        assert_eq!(state.timer, 5, "timer set to the infected duration");
    }

    #[test]
    fn test_susceptible_enters_exposed_in_seir() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 2);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Seir, false).unwrap();
        let state = host.state();
        assert_eq!(state.status, Status::Exposed);
        assert_eq!(state.timer, 2);
    }

    #[test]
    fn test_sir_infection_ends_in_removed() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 2);
        host.set_state(Status::Infected, 0);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Sir, false).unwrap();
        let state = host.state();
        assert_eq!(state.status, Status::Removed);
        assert_eq!(state.timer, TIMER_UNSET, "removed with no duration is perpetual");
        assert_eq!(host.pop_size(), 0, "removal sheds every pathogen");
    }

    #[test]
    fn test_sis_reinfection_clears_pathogens() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 3);
        host.set_state(Status::Infected, 0);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Sis, false).unwrap();
        let state = host.state();
        assert_eq!(state.status, Status::Susceptible);
        assert_eq!(state.timer, TIMER_UNSET);
        assert_eq!(host.pop_size(), 0);
    }

    #[test]
    fn test_infected_with_no_pathogens_is_removed_in_sir() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 0);
        host.set_state(Status::Infected, 4);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Sir, false).unwrap();
        assert_eq!(host.state().status, Status::Removed);
    }

    #[test]
    fn test_si_infection_is_absorbing() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 2);
        host.set_state(Status::Infected, 0);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Si, false).unwrap();
        assert_eq!(host.state().status, Status::Infected);
    }

    #[test]
    fn test_sirs_removed_cycles_back_to_susceptible() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 0);
        host.set_state(Status::Removed, 0);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Sirs, false).unwrap();
        assert_eq!(host.state().status, Status::Susceptible);

        let perpetual = host_with_pathogens(&tree, 0);
        perpetual.set_state(Status::Removed, TIMER_UNSET);
        update_host(&ctx(&tree, &logger), &perpetual, EpidemicModel::Sir, false).unwrap();
        assert_eq!(perpetual.state().status, Status::Removed, "SIR removal is final");
    }

    #[test]
    fn test_exposed_advances_when_timer_expires() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let host = host_with_pathogens(&tree, 1);
        host.set_state(Status::Exposed, 0);
        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Seir, false).unwrap();
        assert_eq!(host.state().status, Status::Infective);

        let sei = host_with_pathogens(&tree, 1);
        sei.set_state(Status::Exposed, 0);
        update_host(&ctx(&tree, &logger), &sei, EpidemicModel::Sei, false).unwrap();
        assert_eq!(sei.state().status, Status::Infected, "SEI skips the infective stage");
    }

    #[test]
    fn test_frequency_rows_count_by_genotype() {
        let tree = GenotypeTree::new(2);
        let (logger, capture) = Logger::capture();
        let host = host_with_pathogens(&tree, 3);
        // A second node with the same sequence: distinct node, same genotype.
        let twin = tree.new_node(Sequence::new(vec![0, 1]), &[]);
        let other = tree.new_node(Sequence::new(vec![1, 0]), &[]);
        host.add(&[twin.id, other.id]);

        update_host(&ctx(&tree, &logger), &host, EpidemicModel::Si, true).unwrap();
        logger.stop().unwrap();
        let rows = capture.finish();

        assert_eq!(rows.statuses.len(), 1);
        assert_eq!(rows.frequencies.len(), 2, "two genotype identities present");
        let total: u64 = rows.frequencies.iter().map(|r| r.freq).sum();
        assert_eq!(total, 5, "frequencies sum to the pop size");
    }
}
