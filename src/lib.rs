// Clippy allows for the whole crate
#![allow(clippy::type_complexity)]

//! tnpool: transposon insertion pool annotation
//!
//! Assigns each barcoded insertion in a mutant pool to the gene feature that
//! contains it, classifies where inside the gene it landed, and summarizes
//! hits per gene and per functional description.
//!
//! # Features
//!
//! - **Interval index**: per-scaffold nested containment list
//! - **Deterministic**: the same inputs always give byte-identical output
//! - **Parallel processing**: scaffolds are annotated independently with Rayon
//!
//! # Example
//!
//! ```rust,no_run
//! use tnpool::{annotate, read_features, read_pool, AnnotateConfig, Summary};
//!
//! let features = read_features("genes.tab").unwrap();
//! let pool = read_pool("pool.tab", false).unwrap();
//!
//! let annotation = annotate(features, pool.observations, &AnnotateConfig::new()).unwrap();
//! let summary = Summary::from_records(&annotation.records);
//! println!("{} insertions fall in genes", summary.totals.hits);
//! ```

pub mod classify;
pub mod commands;
pub mod config;
pub mod feature;
pub mod index;
pub mod matcher;
pub mod merge;
pub mod output;
pub mod parallel;
pub mod pipeline;
pub mod summary;
pub mod table;

// Re-export commonly used types
pub use classify::{Geometry, PositionClassifier};
pub use config::{AnnotateConfig, CentralRegion};
pub use feature::{GeneFeature, Observation, Strand};
pub use index::{FeatureIndex, ScaffoldIndex};
pub use merge::AnnotatedRecord;
pub use pipeline::{annotate, Annotation, AnnotationStats};
pub use summary::Summary;
pub use table::{read_features, read_pool, Result, TableError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{AnnotateCommand, GenerateCommand, SummaryCommand};
    pub use crate::config::{AnnotateConfig, CentralRegion};
    pub use crate::feature::{GeneFeature, Observation, Strand};
    pub use crate::index::{FeatureIndex, ScaffoldIndex};
    pub use crate::matcher::OverlapMatcher;
    pub use crate::merge::AnnotatedRecord;
    pub use crate::pipeline::annotate;
    pub use crate::summary::Summary;
    pub use crate::table::{read_features, read_pool, FeatureReader, PoolReader};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::config::AnnotateConfig;
        use crate::pipeline::annotate;
        use crate::table::{parse_features, parse_pool};

        let genes = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                     chr1\t100\t200\t+\tkinase\t\tG1\n\
                     chr1\t400\t500\t-\tporin\t\tG2\n";
        let pool = "barcode\tnTot\tn\tscaffold\tstrand\tpos\n\
                    AAA\t3\t1\tchr1\t+\t150\n\
                    CCC\t2\t1\tchr1\t-\t300\n";

        let features = parse_features(genes).unwrap();
        let pool = parse_pool(pool, false).unwrap();
        let annotation = annotate(features, pool.observations, &AnnotateConfig::new()).unwrap();

        assert_eq!(annotation.records.len(), 3);
        assert!(annotation.records[0].is_hit());
        assert!(annotation.records[1].is_intergenic());
        assert!(annotation.records[2].is_unhit());
    }

    #[test]
    fn test_index_workflow() {
        use crate::feature::{GeneFeature, Strand};
        use crate::index::FeatureIndex;
        use crate::parallel::group_by_scaffold;

        let features = vec![
            GeneFeature::new("chr1", 100, 300, Strand::Plus).with_tag("A"),
            GeneFeature::new("chr1", 250, 400, Strand::Minus).with_tag("B"),
        ];
        let index = FeatureIndex::from_groups(group_by_scaffold(features, |f| f.scaffold.as_str()), true);
        let chr1 = index.scaffold("chr1").unwrap();

        assert_eq!(chr1.containing_slots(275).len(), 2);
        assert_eq!(chr1.containing_slots(350).len(), 1);
        assert!(index.scaffold("chr2").is_none());
    }
}
