//! Interval indexing for fast point-containment queries.
//!
//! Each scaffold keeps a nested containment list: features are sorted by
//! `begin` ascending and `end` descending, and every feature contained in an
//! earlier one is moved into that feature's sublist. Within any one list no
//! feature contains another, so both `begin` and `end` increase along it. A
//! query binary-searches the first feature ending at or after the point and
//! walks forward while features start at or before it. Every feature walked
//! is a hit, and only the sublists of hits are searched further, so one long
//! feature never forces a scan of the features it spans.

use crate::feature::GeneFeature;
use crate::parallel::{process_scaffolds, PARALLEL_THRESHOLD};
use log::debug;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::sync::Arc;

/// One list of the containment hierarchy, as a range of `ScaffoldIndex::nodes`.
#[derive(Debug, Clone, Copy, Default)]
struct NestedList {
    start: usize,
    len: usize,
}

/// Immutable containment index over the features of one scaffold.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldIndex {
    /// Sorted by selection order: begin, identifier, load order.
    features: Vec<Arc<GeneFeature>>,
    /// Feature slots laid out list by list; list 0 is the top level.
    nodes: Vec<usize>,
    /// Sublist of each entry in `nodes`, if it contains other features.
    sublists: Vec<Option<usize>>,
    lists: Vec<NestedList>,
}

impl ScaffoldIndex {
    /// Build an index from one scaffold's features. O(n log n).
    pub fn new(features: Vec<GeneFeature>) -> Self {
        let mut features: Vec<Arc<GeneFeature>> = features.into_iter().map(Arc::new).collect();
        features.sort_by(|a, b| a.selection_cmp(b));

        let mut order: Vec<usize> = (0..features.len()).collect();
        order.sort_by_key(|&slot| (features[slot].begin, Reverse(features[slot].end), slot));

        // children[0] is the top level; children[i + 1] belongs to order[i]
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); order.len() + 1];
        let mut open: Vec<usize> = Vec::new();
        for (i, &slot) in order.iter().enumerate() {
            let end = features[slot].end;
            while let Some(&top) = open.last() {
                if features[order[top]].end >= end {
                    break;
                }
                open.pop();
            }
            let parent = open.last().map_or(0, |&top| top + 1);
            children[parent].push(i);
            open.push(i);
        }

        // Lay the lists out breadth first so each one is contiguous
        let mut index = Self {
            nodes: Vec::with_capacity(order.len()),
            sublists: Vec::with_capacity(order.len()),
            lists: Vec::new(),
            features: Vec::new(),
        };
        let mut pending: Vec<(usize, Option<usize>)> = vec![(0, None)];
        let mut next = 0;
        while next < pending.len() {
            let (group, owner) = pending[next];
            next += 1;
            let list_id = index.lists.len();
            index.lists.push(NestedList {
                start: index.nodes.len(),
                len: children[group].len(),
            });
            if let Some(node) = owner {
                index.sublists[node] = Some(list_id);
            }
            for &i in &children[group] {
                let node = index.nodes.len();
                index.nodes.push(order[i]);
                index.sublists.push(None);
                if !children[i + 1].is_empty() {
                    pending.push((i + 1, Some(node)));
                }
            }
        }
        index.features = features;
        index
    }

    /// Slots of all features containing `position`, in selection order.
    pub fn containing_slots(&self, position: u64) -> Vec<usize> {
        let mut found = Vec::new();
        if self.features.is_empty() {
            return found;
        }
        let mut stack = vec![0usize];
        while let Some(list_id) = stack.pop() {
            let list = self.lists[list_id];
            let nodes = &self.nodes[list.start..list.start + list.len];
            // Ends increase along a list, so hits form a run from here
            let first = nodes.partition_point(|&slot| self.features[slot].end < position);
            for (offset, &slot) in nodes[first..].iter().enumerate() {
                if self.features[slot].begin > position {
                    break;
                }
                found.push(slot);
                if let Some(sub) = self.sublists[list.start + first + offset] {
                    stack.push(sub);
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// Features in selection order; slot numbers index into this slice.
    pub fn features(&self) -> &[Arc<GeneFeature>] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Per-scaffold containment indexes for a whole feature table.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    scaffolds: FxHashMap<String, ScaffoldIndex>,
}

impl FeatureIndex {
    /// Build one index per scaffold, in parallel for large tables when
    /// `parallel` allows it.
    pub fn from_groups(groups: FxHashMap<String, Vec<GeneFeature>>, parallel: bool) -> Self {
        let total: usize = groups.values().map(|v| v.len()).sum();
        let parallel = parallel && total >= PARALLEL_THRESHOLD && groups.len() > 1;
        debug!(
            "Indexing {} features on {} scaffolds ({})",
            total,
            groups.len(),
            if parallel { "parallel" } else { "sequential" }
        );

        let built = process_scaffolds(groups, parallel, |_, features| {
            ScaffoldIndex::new(features)
        });
        Self {
            scaffolds: built.into_iter().collect(),
        }
    }

    pub fn scaffold(&self, name: &str) -> Option<&ScaffoldIndex> {
        self.scaffolds.get(name)
    }

    pub fn into_scaffolds(self) -> FxHashMap<String, ScaffoldIndex> {
        self.scaffolds
    }

    /// Total number of indexed features.
    pub fn len(&self) -> usize {
        self.scaffolds.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scaffolds.values().all(|s| s.is_empty())
    }
}
