use contagium_core::tree::{GenotypeTree, NodeId};
use contagium_data::Sequence;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_interning_is_idempotent(states in prop::collection::vec(0u8..4, 1..64)) {
        let tree = GenotypeTree::new(4);
        let (a, first) = tree.genotype_set().intern(Sequence::new(states.clone()));
        let (b, second) = tree.genotype_set().intern(Sequence::new(states));
        prop_assert!(first);
        prop_assert!(!second);
        prop_assert_eq!(a.uid(), b.uid());
        prop_assert_eq!(tree.genotype_count(), 1);
    }

    #[test]
    fn prop_sequence_hex_round_trips(states in prop::collection::vec(0u8..=255, 0..128)) {
        let sequence = Sequence::new(states);
        let back = Sequence::from_hex(&sequence.to_hex()).unwrap();
        prop_assert_eq!(sequence, back);
    }

    #[test]
    fn prop_parent_child_links_stay_symmetric(
        parent_choices in prop::collection::vec(prop::option::of(0usize..8), 1..32)
    ) {
        let tree = GenotypeTree::new(4);
        let mut ids: Vec<NodeId> = vec![tree.new_node(Sequence::new(vec![0, 0]), &[]).id];

        for (step, choice) in parent_choices.iter().enumerate() {
            let states = vec![(step % 4) as u8, ((step / 4) % 4) as u8, 1];
            let parents: Vec<NodeId> = match choice {
                Some(index) => vec![ids[index % ids.len()]],
                None => vec![],
            };
            ids.push(tree.new_node(Sequence::new(states), &parents).id);
        }

        for &id in &ids {
            let node = tree.node(id);
            for &parent in node.parents() {
                prop_assert!(
                    tree.node(parent).children().contains(&id),
                    "child {:?} missing from parent {:?}", id, parent
                );
            }
            for child in node.children() {
                prop_assert!(
                    tree.node(child).parents().contains(&id),
                    "parent {:?} missing from child {:?}", id, child
                );
            }
        }
    }

    #[test]
    fn prop_positions_index_matches_sequence(states in prop::collection::vec(0u8..3, 1..50)) {
        let tree = GenotypeTree::new(3);
        let (genotype, _) = tree.genotype_set().intern(Sequence::new(states.clone()));
        for state in 0u8..3 {
            let from_index: Vec<usize> = genotype
                .positions_of(state)
                .iter()
                .map(|&p| p as usize)
                .collect();
            let from_scan: Vec<usize> = states
                .iter()
                .enumerate()
                .filter(|(_, &s)| s == state)
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(from_index, from_scan);
        }
    }
}

#[test]
fn test_concurrent_interning_yields_one_genotype() {
    use std::sync::Arc;
    use std::thread;

    let tree = Arc::new(GenotypeTree::new(2));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for _ in 0..200 {
                    tree.genotype_set().intern(Sequence::new(vec![0, 1, 0, 1]));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(
        tree.genotype_count(),
        1,
        "racing interns of equal content collapse to one genotype"
    );
}

#[test]
fn test_concurrent_node_allocation_keeps_links_consistent() {
    use std::sync::Arc;
    use std::thread;

    let tree = Arc::new(GenotypeTree::new(2));
    let root = tree.new_node(Sequence::new(vec![0; 8]), &[]).id;

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for step in 0..50u8 {
                    let mut states = vec![0u8; 8];
                    states[usize::from(step % 8)] = 1;
                    states[(worker % 8) as usize] = 1;
                    tree.new_node(Sequence::new(states), &[root]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.node_count(), 201);
    let children = tree.node(root).children();
    assert_eq!(children.len(), 200, "every allocation linked back to the root");
}
