//! Derived aggregation views: hierarchical trees and flow graphs.
//!
//! These are plain node/edge sets. Nothing here knows how to draw a chart;
//! any renderer can consume the serialized form.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which value a view sums.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Number of records.
    Count,
    /// Sum of record sizes in bytes.
    Bytes,
}

/// One node of a root → bucket → extension tree.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    /// Empty for the root.
    pub parent_id: String,
    pub value: u64,
}

/// A two-level rollup. Every parent's value is the sum of its children.
#[derive(Serialize, Clone, Debug)]
pub struct Tree {
    pub title: String,
    pub metric: Metric,
    pub generated_at: DateTime<Utc>,
    /// Root first, then buckets, then extension leaves.
    pub nodes: Vec<TreeNode>,
}

/// Sum that clamps at `u64::MAX` instead of overflowing.
pub fn saturating_sum<I: IntoIterator<Item = u64>>(values: I) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

impl Tree {
    #[cfg(test)]
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.parent_id.is_empty())
    }

    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TreeNode> + 'a {
        self.nodes.iter().filter(move |n| n.parent_id == id)
    }

    /// Check that every non-leaf node equals the sum of its direct children.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().all(|node| {
            let mut children = self.children_of(&node.id).peekable();
            if children.peek().is_none() {
                return true;
            }
            saturating_sum(children.map(|c| c.value)) == node.value
        })
    }
}

/// Edge from the single source node (index 0) to a category node.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    pub value: u64,
}

/// A total split into categories: one source node and one node per extension.
#[derive(Serialize, Clone, Debug)]
pub struct FlowGraph {
    pub title: String,
    pub metric: Metric,
    pub generated_at: DateTime<Utc>,
    /// Node labels; index 0 is the source.
    pub labels: Vec<String>,
    pub edges: Vec<FlowEdge>,
    /// Value of the source node.
    pub total: u64,
}

impl FlowGraph {
    /// Value flowing into the node labelled `label`, if present.
    #[cfg(test)]
    pub fn value_of(&self, label: &str) -> Option<u64> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.edges.iter().find(|e| e.target == idx).map(|e| e.value)
    }

    /// Source total equals the sum of all outgoing edges.
    pub fn is_consistent(&self) -> bool {
        self.edges.iter().all(|e| e.source == 0)
            && saturating_sum(self.edges.iter().map(|e| e.value)) == self.total
    }
}

/// The four artifacts derived from one record set.
#[derive(Serialize, Clone, Debug)]
pub struct AggregationReport {
    pub count_tree: Tree,
    pub byte_tree: Tree,
    pub count_flow: FlowGraph,
    pub byte_flow: FlowGraph,
}
