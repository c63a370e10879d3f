//! Transmission phase: per-edge Bernoulli trials and migrant sampling.

use super::{PhaseContext, StatusSet, PHASE_TRANSMIT};
use crate::config::MigrantPolicy;
use crate::error::Result;
use crate::host::Host;
use crate::rng::worker_rng;
use crate::tree::NodeId;
use contagium_data::{Status, TransmissionRow};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Per-instance switches resolved at init.
#[derive(Debug, Clone, Copy)]
pub struct TransmitOptions {
    /// Recipient statuses a transmission can land on.
    pub infectable: StatusSet,
    /// Gate sources on timer == 0 (the endtrans variant).
    pub end_of_infection_only: bool,
    /// Emit transmission log rows.
    pub log_transmission: bool,
    /// Exchange variant: move semantics instead of copy semantics.
    pub exchange_removes_migrants: bool,
}

fn transmits(status: Status) -> bool {
    matches!(status, Status::Infected | Status::Infective)
}

/// Run one directed edge through the Transmit step.
///
/// Resolution order: effective probability (edge weight, else the source
/// model's), migrant count (clamped or skipped against the source size),
/// then the Bernoulli trial and the without-replacement sample.
pub fn transmit_edge(
    ctx: &PhaseContext<'_>,
    edge_index: usize,
    src: &Host,
    dst: &Host,
    weight: f64,
    opts: &TransmitOptions,
) -> Result<()> {
    let src_state = src.state();
    if !transmits(src_state.status) {
        return Ok(());
    }
    if opts.end_of_infection_only && src_state.timer != 0 {
        return Ok(());
    }
    if !opts.infectable.contains(dst.state().status) {
        return Ok(());
    }

    let model = src.transmission_model()?;
    let mut rng = worker_rng(
        ctx.run_seed,
        &[
            u64::from(ctx.instance),
            ctx.generation,
            edge_index as u64,
            PHASE_TRANSMIT,
        ],
    );

    let probability = effective_probability(weight, model.probability());
    let Some(count) = resolve_count(model.draw_size(&mut rng), src.pop_size(), model.policy())
    else {
        return Ok(());
    };
    if count == 0 || !rng.gen_bool(probability) {
        return Ok(());
    }

    let migrants = src.pick(count, &mut rng);
    deliver(ctx, src.id(), dst, &migrants, opts)?;
    Ok(())
}

/// Run one unordered host pair through the symmetric exchange step.
///
/// Both endpoints must be infected. The pair trial succeeds with the square
/// of the edge probability; each side then samples its migrants against its
/// own transmission model, both directions are delivered, and with move
/// semantics the migrants leave their sources afterwards.
pub fn exchange_pair(
    ctx: &PhaseContext<'_>,
    pair_index: usize,
    a: &Host,
    b: &Host,
    weight: f64,
    opts: &TransmitOptions,
) -> Result<()> {
    if a.state().status != Status::Infected || b.state().status != Status::Infected {
        return Ok(());
    }
    let model_a = a.transmission_model()?;
    let model_b = b.transmission_model()?;
    let mut rng = worker_rng(
        ctx.run_seed,
        &[
            u64::from(ctx.instance),
            ctx.generation,
            pair_index as u64,
            PHASE_TRANSMIT,
        ],
    );

    let probability = effective_probability(weight, model_a.probability());
    if !rng.gen_bool((probability * probability).min(1.0)) {
        return Ok(());
    }

    let migrants_a = sample_side(a, model_a.draw_size(&mut rng), model_a.policy(), &mut rng);
    let migrants_b = sample_side(b, model_b.draw_size(&mut rng), model_b.policy(), &mut rng);

    deliver(ctx, a.id(), b, &migrants_a, opts)?;
    deliver(ctx, b.id(), a, &migrants_b, opts)?;
    if opts.exchange_removes_migrants {
        a.remove(&migrants_a);
        b.remove(&migrants_b);
    }
    Ok(())
}

fn effective_probability(weight: f64, fallback: f64) -> f64 {
    let p = if weight > 0.0 { weight } else { fallback };
    p.clamp(0.0, 1.0)
}

/// Apply the migrant policy. `None` means the whole transmission is
/// skipped.
fn resolve_count(drawn: usize, source_size: usize, policy: MigrantPolicy) -> Option<usize> {
    if drawn > source_size {
        match policy {
            MigrantPolicy::Clamp => Some(source_size),
            MigrantPolicy::Skip => None,
        }
    } else {
        Some(drawn)
    }
}

fn sample_side(
    host: &Host,
    drawn: usize,
    policy: MigrantPolicy,
    rng: &mut ChaCha8Rng,
) -> Vec<NodeId> {
    match resolve_count(drawn, host.pop_size(), policy) {
        Some(count) if count > 0 => host.pick(count, rng),
        _ => Vec::new(),
    }
}

fn deliver(
    ctx: &PhaseContext<'_>,
    src_id: u32,
    dst: &Host,
    migrants: &[NodeId],
    opts: &TransmitOptions,
) -> Result<()> {
    if migrants.is_empty() {
        return Ok(());
    }
    dst.add(migrants);
    if opts.log_transmission {
        for &node in migrants {
            ctx.logger.transmission(TransmissionRow {
                instance: ctx.instance,
                generation: ctx.generation,
                src: src_id,
                dst: dst.id(),
                node_uid: ctx.tree.node(node).uid(),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TransmissionMode, TransmissionModelConfig};
    use crate::logger::Logger;
    use crate::models::TransmissionModel;
    use crate::tree::GenotypeTree;
    use contagium_data::Sequence;
    use std::sync::Arc;

    fn transmission_model(prob: f64, size: f64, policy: MigrantPolicy) -> Arc<TransmissionModel> {
        let config = TransmissionModelConfig {
            model_name: "contact".into(),
            host_ids: vec![0, 1],
            mode: TransmissionMode::Constant,
            transmission_prob: prob,
            transmission_size: size,
            size_policy: Some(policy),
        };
        Arc::new(TransmissionModel::from_config(0, &config, policy))
    }

    fn infected_source(tree: &GenotypeTree, copies: usize) -> Host {
        let host = Host::new(0, 0);
        let root = tree.new_node(Sequence::new(vec![0; 4]), &[]);
        host.add(&vec![root.id; copies]);
        host.set_state(Status::Infected, 5);
        host
    }

    fn options() -> TransmitOptions {
        TransmitOptions {
            infectable: StatusSet::empty().with(Status::Susceptible),
            end_of_infection_only: false,
            log_transmission: true,
            exchange_removes_migrants: false,
        }
    }

    fn ctx<'a>(tree: &'a GenotypeTree, logger: &'a Logger) -> PhaseContext<'a> {
        PhaseContext {
            instance: 0,
            generation: 1,
            run_seed: 9,
            tree,
            logger,
        }
    }

    #[test]
    fn test_certain_transmission_moves_whole_source() {
        let tree = GenotypeTree::new(2);
        let (logger, capture) = Logger::capture();
        let src = infected_source(&tree, 3);
        src.bind_transmission(transmission_model(1.0, 10.0, MigrantPolicy::Clamp))
            .unwrap();
        let dst = Host::new(1, 0);

        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 1.0, &options()).unwrap();
        logger.stop().unwrap();

        assert_eq!(
            dst.pop_size(),
            3,
            "oversize constant count clamps to the source size"
        );
        assert_eq!(src.pop_size(), 3, "transmission copies, never drains");
        assert_eq!(capture.finish().transmissions.len(), 3);
    }

    #[test]
    fn test_skip_policy_suppresses_oversize_draws() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let src = infected_source(&tree, 3);
        src.bind_transmission(transmission_model(1.0, 10.0, MigrantPolicy::Skip))
            .unwrap();
        let dst = Host::new(1, 0);

        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 1.0, &options()).unwrap();
        assert_eq!(dst.pop_size(), 0);
    }

    #[test]
    fn test_zero_probability_emits_nothing() {
        let tree = GenotypeTree::new(2);
        let (logger, capture) = Logger::capture();
        let src = infected_source(&tree, 5);
        src.bind_transmission(transmission_model(0.0, 1.0, MigrantPolicy::Clamp))
            .unwrap();
        let dst = Host::new(1, 0);

        // Weight 0 falls through to the model's probability of 0.
        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 0.0, &options()).unwrap();
        logger.stop().unwrap();

        assert_eq!(dst.pop_size(), 0);
        assert!(capture.finish().transmissions.is_empty());
    }

    #[test]
    fn test_non_infectable_recipient_is_skipped() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let src = infected_source(&tree, 5);
        src.bind_transmission(transmission_model(1.0, 1.0, MigrantPolicy::Clamp))
            .unwrap();
        let dst = Host::new(1, 0);
        dst.set_state(Status::Removed, -1);

        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 1.0, &options()).unwrap();
        assert_eq!(dst.pop_size(), 0);
    }

    #[test]
    fn test_endtrans_gates_on_timer_zero() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let src = infected_source(&tree, 2);
        src.bind_transmission(transmission_model(1.0, 1.0, MigrantPolicy::Clamp))
            .unwrap();
        let dst = Host::new(1, 0);
        let mut opts = options();
        opts.end_of_infection_only = true;

        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 1.0, &opts).unwrap();
        assert_eq!(dst.pop_size(), 0, "timer 5: no transmission yet");

        src.set_state(Status::Infected, 0);
        transmit_edge(&ctx(&tree, &logger), 0, &src, &dst, 1.0, &opts).unwrap();
        assert_eq!(dst.pop_size(), 1, "timer 0: transmission fires");
    }

    #[test]
    fn test_exchange_swaps_between_infected_pair() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let a = infected_source(&tree, 4);
        a.bind_transmission(transmission_model(1.0, 2.0, MigrantPolicy::Clamp))
            .unwrap();
        let b = Host::new(1, 0);
        let other = tree.new_node(Sequence::new(vec![1; 4]), &[]);
        b.add(&vec![other.id; 4]);
        b.set_state(Status::Infected, 5);
        b.bind_transmission(transmission_model(1.0, 2.0, MigrantPolicy::Clamp))
            .unwrap();

        let opts = options();
        exchange_pair(&ctx(&tree, &logger), 0, &a, &b, 1.0, &opts).unwrap();
        assert_eq!(a.pop_size(), 6, "copy semantics keeps the source intact");
        assert_eq!(b.pop_size(), 6);
    }

    #[test]
    fn test_exchange_move_semantics_drains_sources() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let a = infected_source(&tree, 4);
        a.bind_transmission(transmission_model(1.0, 2.0, MigrantPolicy::Clamp))
            .unwrap();
        let b = Host::new(1, 0);
        let other = tree.new_node(Sequence::new(vec![1; 4]), &[]);
        b.add(&vec![other.id; 4]);
        b.set_state(Status::Infected, 5);
        b.bind_transmission(transmission_model(1.0, 2.0, MigrantPolicy::Clamp))
            .unwrap();

        let mut opts = options();
        opts.exchange_removes_migrants = true;
        exchange_pair(&ctx(&tree, &logger), 0, &a, &b, 1.0, &opts).unwrap();
        assert_eq!(a.pop_size(), 4, "gave 2, received 2");
        assert_eq!(b.pop_size(), 4);
    }

    #[test]
    fn test_exchange_requires_both_infected() {
        let tree = GenotypeTree::new(2);
        let logger = Logger::disabled();
        let a = infected_source(&tree, 4);
        a.bind_transmission(transmission_model(1.0, 2.0, MigrantPolicy::Clamp))
            .unwrap();
        let b = Host::new(1, 0);

        exchange_pair(&ctx(&tree, &logger), 0, &a, &b, 1.0, &options()).unwrap();
        assert_eq!(a.pop_size(), 4);
        assert_eq!(b.pop_size(), 0);
    }
}
