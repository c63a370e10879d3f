//! Shared genotype genealogy.
//!
//! The tree owns every genealogy node of one epidemic instance in an arena
//! (`Vec` indexed by `NodeId`), plus the genotype pool the nodes point into.
//! Node UIDs stay externally stable for logging; internal edges are arena
//! indices. Nodes are never removed while the tree exists.
//!
//! Write discipline: a node is pushed, registered in the UID map, and linked
//! into its parents' child lists under one write lock, so concurrent readers
//! observe a fully linked node or no node at all.

use crate::genotype::{Genotype, GenotypeSet};
use contagium_data::{GenotypeRow, NodeRow, Sequence};
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Arena index of a node. Stable for the lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One occurrence of a genotype in the genealogy.
pub struct GenotypeNode {
    uid: Uuid,
    genotype: Arc<Genotype>,
    /// Parent order is the order given at creation; empty for roots.
    parents: Vec<NodeId>,
    /// Child order is insertion order.
    children: Mutex<Vec<NodeId>>,
}

impl GenotypeNode {
    #[must_use]
    pub fn uid(&self) -> Uuid {
        self.uid
    }

    #[must_use]
    pub fn genotype(&self) -> &Arc<Genotype> {
        &self.genotype
    }

    #[must_use]
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        self.children.lock().expect("child list poisoned").clone()
    }
}

/// Result of allocating a node: the arena id plus the log rows the creation
/// produced (the genotype row only when the sequence was first seen here).
pub struct NodeCreation {
    pub id: NodeId,
    pub node_row: NodeRow,
    pub genotype_row: Option<GenotypeRow>,
}

struct TreeInner {
    nodes: Vec<Arc<GenotypeNode>>,
    by_uid: HashMap<Uuid, NodeId>,
}

/// Ancestry DAG plus genotype pool for one epidemic instance.
pub struct GenotypeTree {
    set: GenotypeSet,
    inner: RwLock<TreeInner>,
}

impl GenotypeTree {
    #[must_use]
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            set: GenotypeSet::new(alphabet_size),
            inner: RwLock::new(TreeInner {
                nodes: Vec::new(),
                by_uid: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn genotype_set(&self) -> &GenotypeSet {
        &self.set
    }

    /// Intern `sequence` and allocate a genealogy node carrying it.
    ///
    /// With no parents the node is a root. With parents, each parent's child
    /// list gets the new node appended before the node becomes visible.
    pub fn new_node(&self, sequence: Sequence, parents: &[NodeId]) -> NodeCreation {
        let (genotype, genotype_is_new) = self.set.intern(sequence);
        let node = Arc::new(GenotypeNode {
            uid: Uuid::new_v4(),
            genotype: Arc::clone(&genotype),
            parents: parents.to_vec(),
            children: Mutex::new(Vec::new()),
        });

        let mut inner = self.inner.write().expect("genotype tree poisoned");
        let id = NodeId(inner.nodes.len() as u32);
        for &parent in parents {
            inner.nodes[parent.index()]
                .children
                .lock()
                .expect("child list poisoned")
                .push(id);
        }
        inner.by_uid.insert(node.uid, id);
        inner.nodes.push(Arc::clone(&node));
        drop(inner);

        NodeCreation {
            id,
            node_row: NodeRow {
                uid: node.uid,
                genotype_uid: genotype.uid(),
            },
            genotype_row: genotype_is_new.then(|| GenotypeRow {
                uid: genotype.uid(),
                sequence: genotype.sequence().to_hex(),
            }),
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Arc<GenotypeNode> {
        Arc::clone(&self.inner.read().expect("genotype tree poisoned").nodes[id.index()])
    }

    #[must_use]
    pub fn node_by_uid(&self, uid: Uuid) -> Option<NodeId> {
        self.inner
            .read()
            .expect("genotype tree poisoned")
            .by_uid
            .get(&uid)
            .copied()
    }

    #[must_use]
    pub fn contains_uid(&self, uid: Uuid) -> bool {
        self.node_by_uid(uid).is_some()
    }

    /// Number of nodes allocated so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.read().expect("genotype tree poisoned").nodes.len()
    }

    /// Number of distinct genotypes interned so far.
    #[must_use]
    pub fn genotype_count(&self) -> usize {
        self.set.len()
    }

    /// Snapshot of all nodes in allocation order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Arc<GenotypeNode>> {
        self.inner
            .read()
            .expect("genotype tree poisoned")
            .nodes
            .clone()
    }

    /// Export the genealogy to Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let inner = self.inner.read().expect("genotype tree poisoned");
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut indices = Vec::with_capacity(inner.nodes.len());
        for node in &inner.nodes {
            let label = format!(
                "{}\\n{}",
                &node.uid.to_string()[..8],
                truncated_hex(node.genotype.sequence())
            );
            indices.push(graph.add_node(label));
        }
        for (child_pos, node) in inner.nodes.iter().enumerate() {
            for parent in &node.parents {
                graph.add_edge(indices[parent.index()], indices[child_pos], ());
            }
        }
        drop(inner);

        let mut dot = String::from("digraph Genealogy {\n");
        dot.push_str("  node [shape=box, fontname=\"Arial\"];\n");
        for idx in graph.node_indices() {
            dot.push_str(&format!("  n{} [label=\"{}\"];\n", idx.index(), graph[idx]));
        }
        for edge in graph.edge_indices() {
            if let Some((from, to)) = graph.edge_endpoints(edge) {
                dot.push_str(&format!("  n{} -> n{};\n", from.index(), to.index()));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

fn truncated_hex(sequence: &Sequence) -> String {
    let hex = sequence.to_hex();
    if hex.len() > 16 {
        format!("{}..", &hex[..16])
    } else {
        hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_then_child() {
        let tree = GenotypeTree::new(2);
        let root = tree.new_node(Sequence::new(vec![0, 0, 0]), &[]);
        assert!(root.genotype_row.is_some(), "first sequence interns fresh");

        let child = tree.new_node(Sequence::new(vec![0, 1, 0]), &[root.id]);
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.genotype_count(), 2);

        let root_node = tree.node(root.id);
        assert_eq!(root_node.children(), vec![child.id]);
        let child_node = tree.node(child.id);
        assert_eq!(child_node.parents(), &[root.id]);
    }

    #[test]
    fn test_same_sequence_new_node_shares_genotype() {
        let tree = GenotypeTree::new(2);
        let a = tree.new_node(Sequence::new(vec![1, 1]), &[]);
        let b = tree.new_node(Sequence::new(vec![1, 1]), &[a.id]);
        assert!(b.genotype_row.is_none(), "second intern reuses the genotype");
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.genotype_count(), 1);
        assert_eq!(
            tree.node(a.id).genotype().uid(),
            tree.node(b.id).genotype().uid()
        );
    }

    #[test]
    fn test_uid_map_round_trip() {
        let tree = GenotypeTree::new(2);
        let made = tree.new_node(Sequence::new(vec![0]), &[]);
        let uid = tree.node(made.id).uid();
        assert_eq!(tree.node_by_uid(uid), Some(made.id));
        assert!(!tree.contains_uid(Uuid::new_v4()));
    }

    #[test]
    fn test_parent_child_symmetry() {
        let tree = GenotypeTree::new(2);
        let a = tree.new_node(Sequence::new(vec![0, 0]), &[]);
        let b = tree.new_node(Sequence::new(vec![0, 1]), &[]);
        let merged = tree.new_node(Sequence::new(vec![1, 1]), &[a.id, b.id]);
        for parent in [a.id, b.id] {
            assert!(
                tree.node(parent).children().contains(&merged.id),
                "every parent lists the child"
            );
        }
        assert_eq!(tree.node(merged.id).parents(), &[a.id, b.id]);
    }

    #[test]
    fn test_to_dot_lists_all_nodes() {
        let tree = GenotypeTree::new(2);
        let a = tree.new_node(Sequence::new(vec![0]), &[]);
        let _b = tree.new_node(Sequence::new(vec![1]), &[a.id]);
        let dot = tree.to_dot();
        assert!(dot.starts_with("digraph Genealogy {"));
        assert!(dot.contains("n0 -> n1;"));
    }
}
