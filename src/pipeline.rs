//! End-to-end annotation: index, match, classify and merge per scaffold.
//!
//! Every scaffold's index is built before any query runs. Scaffolds are then
//! processed independently; each worker writes into a private buffer and
//! buffers are concatenated in lexicographic scaffold order.

use crate::classify::PositionClassifier;
use crate::config::AnnotateConfig;
use crate::feature::{GeneFeature, Observation};
use crate::index::{FeatureIndex, ScaffoldIndex};
use crate::matcher::OverlapMatcher;
use crate::merge::{AnnotatedRecord, AnnotationMerger};
use crate::parallel::{group_by_scaffold, process_scaffolds, ParallelStats};
use crate::table::{FeatureTable, Result};
use log::{debug, warn};
use rustc_hash::FxHashMap;

/// Counters gathered while annotating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    pub scaffolds: usize,
    pub features: usize,
    pub observations: usize,
    /// Observations with more than one containing feature.
    pub ambiguous: usize,
    /// Observations on scaffolds absent from the feature table.
    pub unindexed_scaffold_observations: usize,
}

/// Annotated rows for a whole batch, grouped by scaffold.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub records: Vec<AnnotatedRecord>,
    pub stats: AnnotationStats,
}

#[derive(Default)]
struct ScaffoldWork {
    index: Option<ScaffoldIndex>,
    observations: Vec<Observation>,
}

struct ScaffoldOutput {
    records: Vec<AnnotatedRecord>,
    ambiguous: usize,
    unindexed: usize,
}

fn annotate_scaffold(scaffold: &str, work: ScaffoldWork, merger: &AnnotationMerger) -> ScaffoldOutput {
    let index = work.index.filter(|idx| !idx.is_empty());

    let observation_count = work.observations.len();
    let unindexed = if index.is_none() { observation_count } else { 0 };
    if unindexed > 0 {
        warn!(
            "Scaffold {} has no features; {} observations are intergenic",
            scaffold, unindexed
        );
    }

    let matches = OverlapMatcher::new(index.as_ref()).match_observations(work.observations);
    let ambiguous = matches.ambiguous;
    let records = merger.merge_scaffold(index.as_ref(), matches);

    debug!(
        "{}: {} hits, {} intergenic, {} zero-hit features, {} ambiguous",
        scaffold,
        records.iter().filter(|r| r.is_hit()).count(),
        records.iter().filter(|r| r.is_intergenic()).count(),
        records.iter().filter(|r| r.is_unhit()).count(),
        ambiguous
    );

    ScaffoldOutput {
        records,
        ambiguous,
        unindexed,
    }
}

/// Annotate observations with the features that contain them.
///
/// Features are validated first; any invalid feature aborts the batch.
pub fn annotate(
    features: Vec<GeneFeature>,
    observations: Vec<Observation>,
    config: &AnnotateConfig,
) -> Result<Annotation> {
    let table = FeatureTable::from_features(features)?;
    let feature_count = table.len();
    let observation_count = observations.len();

    let index = FeatureIndex::from_groups(table.into_groups(), config.parallel);

    let mut work: FxHashMap<String, ScaffoldWork> = FxHashMap::default();
    for (scaffold, scaffold_index) in index.into_scaffolds() {
        work.entry(scaffold).or_default().index = Some(scaffold_index);
    }
    for (scaffold, group) in group_by_scaffold(observations, |o| o.scaffold.as_str()) {
        work.entry(scaffold).or_default().observations = group;
    }

    let stats = ParallelStats::from_sizes(
        work.iter()
            .map(|(name, w)| {
                let features = w.index.as_ref().map_or(0, |idx| idx.len());
                (name.as_str(), features + w.observations.len())
            }),
    );
    let parallel = config.parallel && stats.is_parallel();
    debug!(
        "Annotating {} observations against {} features on {} scaffolds ({})",
        observation_count,
        feature_count,
        stats.num_scaffolds,
        if parallel { "parallel" } else { "sequential" }
    );

    let merger = AnnotationMerger::new(PositionClassifier::new(config.central));
    let outputs = process_scaffolds(work, parallel, |scaffold, w| {
        annotate_scaffold(scaffold, w, &merger)
    });

    let mut annotation = Annotation {
        records: Vec::with_capacity(observation_count + feature_count),
        stats: AnnotationStats {
            scaffolds: outputs.len(),
            features: feature_count,
            observations: observation_count,
            ..Default::default()
        },
    };
    for (_, output) in outputs {
        annotation.stats.ambiguous += output.ambiguous;
        annotation.stats.unindexed_scaffold_observations += output.unindexed;
        annotation.records.extend(output.records);
    }

    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Strand;

    fn gene(scaffold: &str, begin: u64, end: u64, tag: &str) -> GeneFeature {
        GeneFeature::new(scaffold, begin, end, Strand::Plus).with_tag(tag)
    }

    fn obs(barcode: &str, scaffold: &str, position: u64) -> Observation {
        Observation::new(barcode, scaffold, position)
    }

    #[test]
    fn test_scaffold_grouping() {
        let annotation = annotate(
            vec![gene("chr2", 10, 20, "B"), gene("chr1", 100, 200, "A")],
            vec![obs("x", "chr1", 150), obs("p", "plasmid", 5)],
            &AnnotateConfig::new(),
        )
        .unwrap();

        let scaffolds: Vec<&str> = annotation.records.iter().map(|r| r.scaffold()).collect();
        assert_eq!(scaffolds, vec!["chr1", "chr2", "plasmid"]);
        assert!(annotation.records[0].is_hit());
        assert!(annotation.records[1].is_unhit());
        assert!(annotation.records[2].is_intergenic());
        assert_eq!(annotation.stats.scaffolds, 3);
        assert_eq!(annotation.stats.unindexed_scaffold_observations, 1);
    }

    #[test]
    fn test_invalid_feature_aborts() {
        let mut features: Vec<GeneFeature> = (0..4u64)
            .map(|i| gene("chr1", i * 100, i * 100 + 50, &format!("G{}", i)))
            .collect();
        features.push(gene("chr1", 300, 200, "BAD"));

        let err = annotate(features, Vec::new(), &AnnotateConfig::new()).unwrap_err();
        assert!(err.to_string().contains("row 5"));
    }

    #[test]
    fn test_rows_follow_load_order() {
        // Builders leave row at zero; the pipeline numbers features itself
        let annotation = annotate(
            vec![
                gene("chr1", 100, 200, "A"),
                gene("chr1", 100, 200, "A"),
                gene("chr2", 10, 20, "C"),
            ],
            Vec::new(),
            &AnnotateConfig::new(),
        )
        .unwrap();

        let rows: Vec<usize> = annotation
            .records
            .iter()
            .filter_map(|r| r.feature().map(|f| f.row))
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let features: Vec<GeneFeature> = (0..3000u64)
            .map(|i| {
                let scaffold = format!("s{}", i % 5);
                gene(&scaffold, i * 10, i * 10 + 25, &format!("G{:05}", i)).with_row(i as usize)
            })
            .collect();
        let observations: Vec<Observation> = (0..9000u64)
            .map(|i| {
                let scaffold = format!("s{}", i % 6);
                obs(&format!("bc{:05}", i), &scaffold, i * 3).with_row(i as usize)
            })
            .collect();

        let sequential = annotate(
            features.clone(),
            observations.clone(),
            &AnnotateConfig::new().with_parallel(false),
        )
        .unwrap();
        let parallel = annotate(features, observations, &AnnotateConfig::new()).unwrap();

        assert_eq!(sequential.records.len(), parallel.records.len());
        assert_eq!(sequential.stats, parallel.stats);
        for (a, b) in sequential.records.iter().zip(&parallel.records) {
            assert_eq!(a.scaffold(), b.scaffold());
            assert_eq!(
                a.observation().map(|o| &o.barcode),
                b.observation().map(|o| &o.barcode)
            );
            assert_eq!(a.feature().map(|f| f.row), b.feature().map(|f| f.row));
        }
    }
}
