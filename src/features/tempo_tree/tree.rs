//! Arena-backed tempo detection tree
//!
//! # Algorithm
//!
//! Inserting a candidate at a node tries, in order:
//!
//! 1. Equivalence: the candidate's count is added to the node
//! 2. Each relation kind (duple, tuple, dotted-duple, double-tuple): a new
//!    child is created in the empty slot, or insertion recurses into the
//!    existing child
//! 3. Recursion into every remaining child
//!
//! At tree level a candidate that fits nowhere below the root but of which
//! the root is a rational multiple becomes the new root. A candidate that
//! fails everything belongs to a different tempo family and roots its own
//! tree in [`best_tree_for_nodes`].

use super::node::{NodeId, RelationKind, TempoDetectionNode};
use std::fmt;

/// Tempo family rooted at its shortest period
///
/// Nodes live in an arena; `NodeId`s index into it and stay valid for the
/// lifetime of the tree. Insertion is the only structural mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoDetectionTree {
    nodes: Vec<TempoDetectionNode>,
    root: NodeId,
}

impl TempoDetectionTree {
    /// Create a tree holding a copy of `root`
    pub fn new(root: &TempoDetectionNode) -> Self {
        Self {
            nodes: vec![root.detached()],
            root: NodeId(0),
        }
    }

    /// Root index
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Root node
    pub fn root(&self) -> &TempoDetectionNode {
        &self.nodes[self.root.0]
    }

    /// Node by index
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &TempoDetectionNode {
        &self.nodes[id.0]
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[TempoDetectionNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, a tree has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sum of all counts in the tree
    pub fn total_count(&self) -> u64 {
        self.nodes.iter().map(|n| n.count as u64).sum()
    }

    /// Count of `id` plus the counts of all its descendants
    pub fn descendant_counts(&self, id: NodeId) -> u64 {
        let node = &self.nodes[id.0];
        node.count as u64
            + node
                .children
                .iter()
                .flatten()
                .map(|&child| self.descendant_counts(child))
                .sum::<u64>()
    }

    /// Depth of `id` below the root
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Insert `candidate` at node `at` or below it
    ///
    /// On success the descendant count of `at` grows by exactly
    /// `candidate.count()`.
    ///
    /// # Returns
    ///
    /// `false` if no rational relation places the candidate under `at`
    pub fn insert_node(&mut self, at: NodeId, candidate: &TempoDetectionNode) -> bool {
        if candidate.is_equivalent_to(&self.nodes[at.0]) {
            let node = &mut self.nodes[at.0];
            node.count = node.count.saturating_add(candidate.count);
            return true;
        }

        let mut tried = [false; 4];
        for kind in RelationKind::INSERT_ORDER {
            if !candidate.is_kind_of(kind, &self.nodes[at.0]) {
                continue;
            }
            match self.nodes[at.0].child(kind) {
                None => {
                    self.attach(at, kind, candidate);
                    return true;
                }
                Some(child) => {
                    tried[kind.slot()] = true;
                    if self.insert_node(child, candidate) {
                        return true;
                    }
                }
            }
        }

        for kind in RelationKind::ALL {
            if tried[kind.slot()] {
                continue;
            }
            if let Some(child) = self.nodes[at.0].child(kind) {
                if self.insert_node(child, candidate) {
                    return true;
                }
            }
        }

        false
    }

    /// Insert `candidate` anywhere in the tree, re-rooting if it sits below the root
    ///
    /// # Returns
    ///
    /// `false` if the candidate belongs to a different tempo family
    pub fn insert(&mut self, candidate: &TempoDetectionNode) -> bool {
        if self.insert_node(self.root, candidate) {
            return true;
        }

        for kind in RelationKind::INSERT_ORDER {
            if self.root().is_kind_of(kind, candidate) {
                let old_root = self.root;
                let new_root = NodeId(self.nodes.len());

                let mut node = candidate.detached();
                node.children[kind.slot()] = Some(old_root);
                self.nodes.push(node);
                self.nodes[old_root.0].parent = Some(new_root);
                self.root = new_root;

                log::debug!(
                    "Re-rooted tempo tree at {:.3}s ({} of new root)",
                    candidate.interval,
                    kind.name()
                );
                return true;
            }
        }

        false
    }

    fn attach(&mut self, parent: NodeId, kind: RelationKind, candidate: &TempoDetectionNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = candidate.detached();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children[kind.slot()] = Some(id);
        id
    }

    /// Indented rendering, one node per line
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_node(self.root, "root", 0, &mut out);
        out
    }

    fn describe_node(&self, id: NodeId, label: &str, indent: usize, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push_str(&format!(
            "{:indent$}{}: {:.3}s x{} (total {})\n",
            "",
            label,
            node.interval,
            node.count,
            self.descendant_counts(id),
            indent = indent * 2
        ));
        for (kind, child) in node.children() {
            self.describe_node(child, kind.name(), indent + 1, out);
        }
    }
}

impl fmt::Display for TempoDetectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Build tempo families from candidate nodes and return the best supported one
///
/// Candidates are visited by count (highest first), ties by shorter interval.
/// Each pass inserts every pending candidate into the first tree that accepts
/// it; when a pass places nothing, the strongest pending candidate roots a new
/// tree and the passes continue.
///
/// # Returns
///
/// The tree with the largest [`TempoDetectionTree::total_count`] (ties go to
/// the shorter root), or `None` for no candidates.
pub fn best_tree_for_nodes(nodes: &[TempoDetectionNode]) -> Option<TempoDetectionTree> {
    strongest_tree(build_trees(nodes))
}

/// Tree with the largest total count, ties going to the shorter root
pub fn strongest_tree(trees: Vec<TempoDetectionTree>) -> Option<TempoDetectionTree> {
    trees.into_iter().reduce(|best, tree| {
        let better = tree.total_count() > best.total_count()
            || (tree.total_count() == best.total_count()
                && tree.root().interval < best.root().interval);
        if better {
            tree
        } else {
            best
        }
    })
}

/// All tempo families built from `nodes`, in creation order
pub fn build_trees(nodes: &[TempoDetectionNode]) -> Vec<TempoDetectionTree> {
    let mut pending: Vec<&TempoDetectionNode> = nodes.iter().collect();
    pending.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.interval.total_cmp(&b.interval))
    });

    let mut trees: Vec<TempoDetectionTree> = Vec::new();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|candidate| !trees.iter_mut().any(|tree| tree.insert(candidate)));

        if pending.len() == before {
            let root = pending.remove(0);
            trees.push(TempoDetectionTree::new(root));
        }
    }

    for tree in &trees {
        log::debug!("Tempo tree (total {}):\n{}", tree.total_count(), tree.describe());
    }

    trees
}
