//! Print summary tables for an annotated pool without writing the pool itself.

use crate::commands::annotate::AnnotateCommand;
use crate::config::AnnotateConfig;
use crate::output::{write_description_counts, write_overview, write_top_features, TableWriter};
use crate::summary::Summary;
use crate::table::Result;
use std::io::Write;
use std::path::Path;

/// Summary command configuration.
#[derive(Debug, Clone, Default)]
pub struct SummaryCommand {
    pub config: AnnotateConfig,
}

impl SummaryCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AnnotateConfig) -> Self {
        self.config = config;
        self
    }

    /// Annotate in memory and write overview, description counts and the
    /// top features to `output`, separated by blank lines.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        genes: P,
        pool: Q,
        output: W,
    ) -> Result<Summary> {
        let annotate = AnnotateCommand::new().with_config(self.config.clone());
        let (_, annotation, _) = annotate.load(genes, pool)?;
        let summary = Summary::from_records(&annotation.records);

        let mut out = TableWriter::new(output);
        write_overview(&mut out, &summary, &annotation.stats)?;
        out.write_newline()?;
        write_description_counts(&mut out, &summary)?;
        out.write_newline()?;
        write_top_features(&mut out, &summary.top_features(self.config.top_n))?;
        out.flush()?;

        Ok(summary)
    }
}
