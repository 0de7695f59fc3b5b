//! Annotate a pool table with the gene features that contain each insertion.

use crate::config::AnnotateConfig;
use crate::output::{
    write_annotated, write_description_counts, write_feature_counts, write_overview,
    write_top_features, TableWriter,
};
use crate::pipeline::{annotate, Annotation};
use crate::summary::Summary;
use crate::table::{read_features, read_pool, Result};
use log::info;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// File names written into the summary directory.
pub const OVERVIEW_FILE: &str = "overview.tab";
pub const FEATURE_COUNTS_FILE: &str = "feature_counts.tab";
pub const DESCRIPTION_COUNTS_FILE: &str = "description_counts.tab";
pub const TOP_FEATURES_FILE: &str = "top_features.tab";

/// Result of a full annotate run.
#[derive(Debug, Clone)]
pub struct AnnotateReport {
    /// Data rows written to the annotated table.
    pub rows_written: usize,
    /// Pool rows skipped for a null position.
    pub dropped: usize,
    pub annotation: Annotation,
    pub summary: Summary,
}

impl std::fmt::Display for AnnotateReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let totals = &self.summary.totals;
        write!(
            f,
            "Rows: {}, In genes: {}, Intergenic: {}, Central: {}, Zero-hit features: {}, Dropped: {}",
            self.rows_written,
            totals.hits,
            totals.intergenic,
            totals.central,
            totals.zero_hit_features,
            self.dropped
        )
    }
}

/// Annotate command configuration.
#[derive(Debug, Clone, Default)]
pub struct AnnotateCommand {
    pub config: AnnotateConfig,
}

impl AnnotateCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AnnotateConfig) -> Self {
        self.config = config;
        self
    }

    /// Load both tables and annotate them, returning the pool header alongside.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        genes: P,
        pool: Q,
    ) -> Result<(Vec<String>, Annotation, usize)> {
        let features = read_features(genes)?;
        let pool = read_pool(pool, self.config.drop_unmapped)?;
        info!(
            "Loaded {} features and {} observations",
            features.len(),
            pool.observations.len()
        );
        let annotation = annotate(features, pool.observations, &self.config)?;
        Ok((pool.header, annotation, pool.dropped))
    }

    /// Write the annotated table to `output` and, when `summary_dir` is set,
    /// the summary tables into that directory.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        genes: P,
        pool: Q,
        output: W,
        summary_dir: Option<&Path>,
    ) -> Result<AnnotateReport> {
        let (header, annotation, dropped) = self.load(genes, pool)?;

        let mut writer = TableWriter::new(output);
        let rows_written = write_annotated(&mut writer, &header, &annotation.records)?;

        let summary = Summary::from_records(&annotation.records);
        if let Some(dir) = summary_dir {
            self.write_summaries(dir, &summary, &annotation)?;
        }

        Ok(AnnotateReport {
            rows_written,
            dropped,
            annotation,
            summary,
        })
    }

    /// Write the four summary tables into `dir`, creating it if needed.
    pub fn write_summaries(&self, dir: &Path, summary: &Summary, annotation: &Annotation) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut out = TableWriter::new(File::create(dir.join(OVERVIEW_FILE))?);
        write_overview(&mut out, summary, &annotation.stats)?;

        let mut out = TableWriter::new(File::create(dir.join(FEATURE_COUNTS_FILE))?);
        write_feature_counts(&mut out, &summary.features)?;

        let mut out = TableWriter::new(File::create(dir.join(DESCRIPTION_COUNTS_FILE))?);
        write_description_counts(&mut out, summary)?;

        let mut out = TableWriter::new(File::create(dir.join(TOP_FEATURES_FILE))?);
        write_top_features(&mut out, &summary.top_features(self.config.top_n))?;

        info!("Wrote summary tables to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    const GENES: &str = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                         chr\t100\t200\t+\tkinase\tOLD_1\tNEW_1\n\
                         chr\t300\t400\t-\tporin\t\tNEW_2\n";

    const POOL: &str = "barcode\trcbarcode\tnTot\tn\tscaffold\tstrand\tpos\n\
                        AAA\tTTT\t10\t1\tchr\t+\t150\n\
                        CCC\tGGG\t4\t1\tchr\t-\t250\n\
                        GGG\tCCC\t3\t1\tchr\t\tNA\n";

    fn write_inputs(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let genes = dir.path().join("genes.tab");
        let pool = dir.path().join("pool.tab");
        File::create(&genes).unwrap().write_all(GENES.as_bytes()).unwrap();
        File::create(&pool).unwrap().write_all(POOL.as_bytes()).unwrap();
        (genes, pool)
    }

    #[test]
    fn test_unmapped_is_error_by_default() {
        let dir = TempDir::new().unwrap();
        let (genes, pool) = write_inputs(&dir);

        let result = AnnotateCommand::new().run(&genes, &pool, Vec::new(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_with_summaries() {
        let dir = TempDir::new().unwrap();
        let (genes, pool) = write_inputs(&dir);
        let summary_dir = dir.path().join("summary");

        let cmd = AnnotateCommand::new()
            .with_config(AnnotateConfig::new().with_drop_unmapped(true));
        let mut output = Vec::new();
        let report = cmd
            .run(&genes, &pool, &mut output, Some(&summary_dir))
            .unwrap();

        assert_eq!(report.rows_written, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.summary.totals.zero_hit_features, 1);

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().next().unwrap().starts_with("barcode\trcbarcode"));

        for name in [
            OVERVIEW_FILE,
            FEATURE_COUNTS_FILE,
            DESCRIPTION_COUNTS_FILE,
            TOP_FEATURES_FILE,
        ] {
            assert!(summary_dir.join(name).exists(), "missing {}", name);
        }
        let counts = fs::read_to_string(summary_dir.join(FEATURE_COUNTS_FILE)).unwrap();
        // header plus both features, the porin gene with zero hits
        assert_eq!(counts.lines().count(), 3);
        assert!(counts.contains("NEW_2\t0\t0\t0"));
    }
}
