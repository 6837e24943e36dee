//! src/services/aggregator.rs
//!
//! Builds the bucket/extension rollups from a record set. Records are first
//! reduced to one cell per (bucket, extension) carrying both metrics; every
//! artifact is then a second reduction of those cells with a different group
//! key, so trees and flows for counts and bytes share one summing path.

use crate::{
    format::{format_number, human_bytes},
    models::{
        aggregate::{
            AggregationReport, FlowEdge, FlowGraph, Metric, Tree, TreeNode, saturating_sum,
        },
        object::ObjectRecord,
    },
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Label of the merged category when extensions are collapsed to a top-N.
pub const OTHER_EXTENSION: &str = "<other>";

const ROOT_ID: &str = "root";

/// Both metrics for one group. Sums saturate at `u64::MAX`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub count: u64,
    pub bytes: u64,
}

impl Totals {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Count => self.count,
            Metric::Bytes => self.bytes,
        }
    }

    fn add(&mut self, other: Totals) {
        self.count = self.count.saturating_add(other.count);
        self.bytes = self.bytes.saturating_add(other.bytes);
    }
}

/// Sum `metric` over items, grouping by key. Output is ordered by key.
fn rollup<K, I>(items: I, metric: Metric) -> BTreeMap<K, u64>
where
    K: Ord,
    I: IntoIterator<Item = (K, Totals)>,
{
    let mut out = BTreeMap::new();
    for (key, totals) in items {
        let sum = out.entry(key).or_insert(0u64);
        *sum = sum.saturating_add(totals.get(metric));
    }
    out
}

/// Entries sorted by value descending; equal values keep key order.
fn ranked<K: Clone>(sums: &BTreeMap<K, u64>) -> Vec<(K, u64)> {
    let mut ranked: Vec<_> = sums.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Records reduced to (bucket, extension) cells.
#[derive(Clone, Debug, Default)]
pub struct ExtensionGroups {
    cells: BTreeMap<(String, String), Totals>,
}

impl ExtensionGroups {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ObjectRecord>,
    {
        let mut cells: BTreeMap<(String, String), Totals> = BTreeMap::new();
        for record in records {
            cells
                .entry((record.bucket_name.clone(), record.extension()))
                .or_default()
                .add(Totals {
                    count: 1,
                    bytes: record.size,
                });
        }
        Self { cells }
    }

    /// Number of distinct (bucket, extension) cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn totals(&self) -> Totals {
        let mut all = Totals::default();
        for totals in self.cells.values() {
            all.add(*totals);
        }
        all
    }

    /// Global totals per extension for `metric`, ordered by extension.
    pub fn by_extension(&self, metric: Metric) -> BTreeMap<String, u64> {
        rollup(
            self.cells.iter().map(|((_, ext), t)| (ext.clone(), *t)),
            metric,
        )
    }

    /// Keep the `n` extensions with the highest global count and merge the
    /// rest into `<other>`. Ties are resolved by extension order.
    pub fn collapse_to_top(&self, n: usize) -> Self {
        let keep: HashSet<String> = ranked(&self.by_extension(Metric::Count))
            .into_iter()
            .take(n)
            .map(|(ext, _)| ext)
            .collect();

        let mut cells: BTreeMap<(String, String), Totals> = BTreeMap::new();
        for ((bucket, ext), totals) in &self.cells {
            let ext = if keep.contains(ext) {
                ext.clone()
            } else {
                OTHER_EXTENSION.to_string()
            };
            cells.entry((bucket.clone(), ext)).or_default().add(*totals);
        }
        Self { cells }
    }

    /// Root → bucket → extension rollup for `metric`.
    pub fn tree(&self, metric: Metric) -> Tree {
        let leaves = rollup(self.cells.iter().map(|(k, t)| (k.clone(), *t)), metric);
        let buckets = rollup(
            self.cells.iter().map(|((bucket, _), t)| (bucket.clone(), *t)),
            metric,
        );
        let total = saturating_sum(buckets.values().copied());

        let (root_label, title) = match metric {
            Metric::Count => (
                "All files",
                format!("File types by bucket (total files = {})", format_number(total)),
            ),
            Metric::Bytes => (
                "All bytes",
                format!(
                    "File types by bucket, bytes as wedge size (total = {} bytes, {})",
                    format_number(total),
                    human_bytes(total)
                ),
            ),
        };

        let mut nodes = Vec::with_capacity(1 + buckets.len() + leaves.len());
        nodes.push(TreeNode {
            id: ROOT_ID.to_string(),
            label: root_label.to_string(),
            parent_id: String::new(),
            value: total,
        });
        nodes.extend(buckets.into_iter().map(|(bucket, value)| TreeNode {
            id: bucket_id(&bucket),
            label: bucket,
            parent_id: ROOT_ID.to_string(),
            value,
        }));
        nodes.extend(leaves.into_iter().map(|((bucket, ext), value)| TreeNode {
            id: format!("{bucket}|{ext}"),
            label: ext,
            parent_id: bucket_id(&bucket),
            value,
        }));

        Tree {
            title,
            metric,
            generated_at: Utc::now(),
            nodes,
        }
    }

    /// Single source → one node per extension, for `metric`.
    pub fn flow(&self, metric: Metric) -> FlowGraph {
        let ranked = ranked(&self.by_extension(metric));
        let total = saturating_sum(ranked.iter().map(|(_, v)| *v));

        let (source_label, title) = match metric {
            Metric::Count => (
                "Total files",
                "File type breakdown (Total -> file extension)".to_string(),
            ),
            Metric::Bytes => (
                "Total bytes",
                format!(
                    "File type breakdown by total bytes (Total -> extension), total bytes = {}",
                    format_number(total)
                ),
            ),
        };

        let mut labels = Vec::with_capacity(ranked.len() + 1);
        labels.push(source_label.to_string());
        let mut edges = Vec::with_capacity(ranked.len());
        for (i, (ext, value)) in ranked.into_iter().enumerate() {
            labels.push(ext);
            edges.push(FlowEdge {
                source: 0,
                target: i + 1,
                value,
            });
        }

        FlowGraph {
            title,
            metric,
            generated_at: Utc::now(),
            labels,
            edges,
            total,
        }
    }

    pub fn report(&self) -> AggregationReport {
        AggregationReport {
            count_tree: self.tree(Metric::Count),
            byte_tree: self.tree(Metric::Bytes),
            count_flow: self.flow(Metric::Count),
            byte_flow: self.flow(Metric::Bytes),
        }
    }
}

fn bucket_id(bucket: &str) -> String {
    format!("bucket:{bucket}")
}

/// Derives the four aggregation artifacts from a record set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aggregator {
    /// Keep only this many extensions by global count; merge the rest.
    pub top_n_extensions: Option<usize>,
}

impl Aggregator {
    pub fn new(top_n_extensions: Option<usize>) -> Self {
        Self { top_n_extensions }
    }

    /// Group records, applying the top-N cutoff if configured.
    pub fn group(&self, records: &[ObjectRecord]) -> ExtensionGroups {
        let groups = ExtensionGroups::from_records(records);
        info!(
            files = records.len(),
            cells = groups.len(),
            "grouped records by (bucket, extension)"
        );
        match self.top_n_extensions {
            Some(n) => groups.collapse_to_top(n),
            None => groups,
        }
    }

    pub fn aggregate(&self, records: &[ObjectRecord]) -> AggregationReport {
        let groups = self.group(records);
        if groups.is_empty() {
            info!("no records to aggregate");
        }
        let totals = groups.totals();
        info!(
            files = totals.count,
            bytes = totals.bytes,
            size = %human_bytes(totals.bytes),
            "aggregated inventory"
        );
        let report = groups.report();
        debug_assert!(report.count_tree.is_consistent() && report.byte_tree.is_consistent());
        debug_assert!(report.count_flow.is_consistent() && report.byte_flow.is_consistent());
        report
    }
}
