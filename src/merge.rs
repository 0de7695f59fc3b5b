//! Merging matched, intergenic and zero-hit rows into one annotated table.

use crate::classify::{Geometry, PositionClassifier};
use crate::feature::{GeneFeature, Observation};
use crate::index::ScaffoldIndex;
use crate::matcher::ScaffoldMatches;
use std::cmp::Ordering;
use std::sync::Arc;

/// One row of the annotated table.
#[derive(Debug, Clone)]
pub enum AnnotatedRecord {
    /// An observation inside a feature.
    Hit {
        observation: Observation,
        feature: Arc<GeneFeature>,
        geometry: Geometry,
    },
    /// An observation outside every feature on its scaffold.
    Intergenic { observation: Observation },
    /// A feature no observation was assigned to.
    Unhit { feature: Arc<GeneFeature> },
}

impl AnnotatedRecord {
    pub fn observation(&self) -> Option<&Observation> {
        match self {
            AnnotatedRecord::Hit { observation, .. }
            | AnnotatedRecord::Intergenic { observation } => Some(observation),
            AnnotatedRecord::Unhit { .. } => None,
        }
    }

    pub fn feature(&self) -> Option<&Arc<GeneFeature>> {
        match self {
            AnnotatedRecord::Hit { feature, .. } | AnnotatedRecord::Unhit { feature } => {
                Some(feature)
            }
            AnnotatedRecord::Intergenic { .. } => None,
        }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            AnnotatedRecord::Hit { geometry, .. } => Some(geometry),
            _ => None,
        }
    }

    pub fn scaffold(&self) -> &str {
        match self {
            AnnotatedRecord::Hit { observation, .. }
            | AnnotatedRecord::Intergenic { observation } => &observation.scaffold,
            AnnotatedRecord::Unhit { feature } => &feature.scaffold,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, AnnotatedRecord::Hit { .. })
    }

    #[inline]
    pub fn is_intergenic(&self) -> bool {
        matches!(self, AnnotatedRecord::Intergenic { .. })
    }

    #[inline]
    pub fn is_unhit(&self) -> bool {
        matches!(self, AnnotatedRecord::Unhit { .. })
    }

    /// Order within a scaffold: by coordinate, observations before zero-hit
    /// features at the same coordinate, then barcode or identifier, then
    /// load order.
    fn order_key(&self) -> (u64, u8, &str, usize) {
        match self {
            AnnotatedRecord::Hit { observation, .. }
            | AnnotatedRecord::Intergenic { observation } => (
                observation.position,
                0,
                observation.barcode.as_str(),
                observation.row,
            ),
            AnnotatedRecord::Unhit { feature } => (feature.begin, 1, feature.id(), feature.row),
        }
    }

    /// Stable row order within one scaffold.
    pub fn scaffold_order(&self, other: &AnnotatedRecord) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// Builds annotated rows for one scaffold from matcher output.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationMerger {
    classifier: PositionClassifier,
}

impl AnnotationMerger {
    pub fn new(classifier: PositionClassifier) -> Self {
        Self { classifier }
    }

    /// Combine hits, intergenic observations and zero-hit features.
    ///
    /// A feature is emitted as zero-hit only if no assignment in `matches`
    /// selected it, so `matches` must hold every observation of the scaffold.
    pub fn merge_scaffold(
        &self,
        index: Option<&ScaffoldIndex>,
        matches: ScaffoldMatches,
    ) -> Vec<AnnotatedRecord> {
        let feature_count = index.map_or(0, |idx| idx.len());
        let mut hit = vec![false; feature_count];
        let mut records = Vec::with_capacity(matches.assignments.len() + feature_count);

        for assignment in matches.assignments {
            match assignment.matched {
                Some(found) => {
                    hit[found.slot] = true;
                    let geometry = self
                        .classifier
                        .classify(&found.feature, assignment.observation.position);
                    records.push(AnnotatedRecord::Hit {
                        observation: assignment.observation,
                        feature: found.feature,
                        geometry,
                    });
                }
                None => records.push(AnnotatedRecord::Intergenic {
                    observation: assignment.observation,
                }),
            }
        }

        if let Some(index) = index {
            for (feature, _) in index
                .features()
                .iter()
                .zip(&hit)
                .filter(|(_, was_hit)| !**was_hit)
            {
                records.push(AnnotatedRecord::Unhit {
                    feature: Arc::clone(feature),
                });
            }
        }

        records.sort_by(|a, b| a.scaffold_order(b));
        records
    }
}
