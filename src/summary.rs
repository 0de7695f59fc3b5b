//! Read-only summaries over annotated rows.

use crate::feature::GeneFeature;
use crate::merge::AnnotatedRecord;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Category used for observations whose feature has no description,
/// including observations with no feature at all.
pub const INTERGENIC: &str = "intergenic";

/// Hit counts for one feature.
#[derive(Debug, Clone)]
pub struct FeatureHits {
    pub feature: Arc<GeneFeature>,
    /// Distinct barcodes assigned to the feature.
    pub barcodes: usize,
    /// Distinct barcodes in the central region.
    pub central_barcodes: usize,
    /// Sum of `total_count` over assigned observations.
    pub reads: u64,
}

/// Totals across the whole annotated table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub observations: usize,
    pub hits: usize,
    pub intergenic: usize,
    pub features: usize,
    pub hit_features: usize,
    pub zero_hit_features: usize,
    pub central: usize,
    pub non_central: usize,
    /// Hits in zero-length features, which have no relative position.
    pub degenerate_hits: usize,
}

/// Aggregate statistics of an annotated table.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub totals: Totals,
    /// Observation rows per feature description.
    pub by_description: BTreeMap<String, usize>,
    /// Every feature, zero-hit ones included, ordered by scaffold, begin
    /// and identifier.
    pub features: Vec<FeatureHits>,
}

#[derive(Default)]
struct Accumulator<'a> {
    feature: Option<Arc<GeneFeature>>,
    barcodes: FxHashSet<&'a str>,
    central: FxHashSet<&'a str>,
    reads: u64,
}

impl Summary {
    /// Summarize annotated rows. Pure; the same input gives the same summary.
    pub fn from_records(records: &[AnnotatedRecord]) -> Self {
        let mut totals = Totals::default();
        let mut by_description: BTreeMap<String, usize> = BTreeMap::new();
        // Hit and zero-hit rows share the index's Arc, so its address
        // identifies the feature even when rows or tags repeat
        let mut per_feature: FxHashMap<*const GeneFeature, Accumulator> = FxHashMap::default();

        for record in records {
            if record.observation().is_some() {
                totals.observations += 1;
                let category = record
                    .feature()
                    .and_then(|f| f.description.as_deref())
                    .unwrap_or(INTERGENIC);
                *by_description.entry(category.to_string()).or_insert(0) += 1;
            }

            match record {
                AnnotatedRecord::Hit {
                    observation,
                    feature,
                    geometry,
                } => {
                    totals.hits += 1;
                    if geometry.is_central {
                        totals.central += 1;
                    } else {
                        totals.non_central += 1;
                    }
                    if geometry.is_degenerate() {
                        totals.degenerate_hits += 1;
                    }

                    let acc = per_feature.entry(Arc::as_ptr(feature)).or_default();
                    acc.feature.get_or_insert_with(|| Arc::clone(feature));
                    acc.barcodes.insert(observation.barcode.as_str());
                    if geometry.is_central {
                        acc.central.insert(observation.barcode.as_str());
                    }
                    acc.reads += observation.total_count;
                }
                AnnotatedRecord::Intergenic { .. } => totals.intergenic += 1,
                AnnotatedRecord::Unhit { feature } => {
                    per_feature
                        .entry(Arc::as_ptr(feature))
                        .or_default()
                        .feature
                        .get_or_insert_with(|| Arc::clone(feature));
                }
            }
        }

        let mut features: Vec<FeatureHits> = per_feature
            .into_values()
            .filter_map(|acc| {
                let feature = acc.feature?;
                Some(FeatureHits {
                    feature,
                    barcodes: acc.barcodes.len(),
                    central_barcodes: acc.central.len(),
                    reads: acc.reads,
                })
            })
            .collect();
        features.sort_by(|a, b| {
            a.feature
                .scaffold
                .cmp(&b.feature.scaffold)
                .then_with(|| a.feature.selection_cmp(&b.feature))
        });

        totals.features = features.len();
        totals.hit_features = features.iter().filter(|f| f.barcodes > 0).count();
        totals.zero_hit_features = totals.features - totals.hit_features;

        Self {
            totals,
            by_description,
            features,
        }
    }

    /// The `n` features with the most distinct barcodes, ties broken by
    /// identifier ascending.
    pub fn top_features(&self, n: usize) -> Vec<&FeatureHits> {
        let mut ranked: Vec<&FeatureHits> = self.features.iter().collect();
        ranked.sort_by(|a, b| {
            b.barcodes
                .cmp(&a.barcodes)
                .then_with(|| a.feature.id().cmp(b.feature.id()))
                .then_with(|| a.feature.scaffold.cmp(&b.feature.scaffold))
                .then(a.feature.row.cmp(&b.feature.row))
        });
        ranked.truncate(n);
        ranked
    }

    /// Features no observation was assigned to.
    pub fn zero_hit_features(&self) -> impl Iterator<Item = &FeatureHits> {
        self.features.iter().filter(|f| f.barcodes == 0)
    }

    /// Hit count for a feature identifier, if present.
    pub fn hits_for(&self, id: &str) -> Option<usize> {
        self.features
            .iter()
            .find(|f| f.feature.id() == id)
            .map(|f| f.barcodes)
    }
}
