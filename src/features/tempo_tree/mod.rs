//! Tempo detection trees
//!
//! Interval hypotheses related by small rational ratios (2, 1.5, 3, 6) are
//! organised into trees. Each tree is one tempo family; the family with the
//! most corroborating evidence wins and its root interval is the beat period.

pub mod node;
pub mod tree;

pub use node::{NodeId, RelationKind, TempoDetectionNode};
pub use tree::{best_tree_for_nodes, build_trees, strongest_tree, TempoDetectionTree};
