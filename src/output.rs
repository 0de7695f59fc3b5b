//! Tab-separated output for annotated pools and their summaries.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::feature::{GeneFeature, Observation};
use crate::merge::AnnotatedRecord;
use crate::pipeline::AnnotationStats;
use crate::summary::{FeatureHits, Summary};
use crate::table::{Result, TableError};
use std::io::{BufWriter, Write};

/// Buffer size for TableWriter (8MB default).
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Feature and geometry columns appended to every pool row.
pub const ANNOTATION_COLUMNS: [&str; 9] = [
    "begin",
    "end",
    "gene_strand",
    "desc",
    "old_locus_tag",
    "new_locus_tag",
    "gene_length",
    "pos_relative",
    "central",
];

/// Columns of the per-feature count table.
pub const FEATURE_COUNT_COLUMNS: [&str; 10] = [
    "scaffold",
    "begin",
    "end",
    "strand",
    "desc",
    "old_locus_tag",
    "new_locus_tag",
    "n_barcodes",
    "n_central",
    "n_reads",
];

/// Buffered tab-separated writer.
pub struct TableWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> TableWriter<W> {
    /// Create a new TableWriter with default 8MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new TableWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.writer.write_all(s.as_bytes()).map_err(TableError::Io)
    }

    /// Write a value, or nothing for null.
    #[inline]
    pub fn write_opt_str(&mut self, s: Option<&str>) -> Result<()> {
        match s {
            Some(s) => self.write_str(s),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn write_tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t").map_err(TableError::Io)
    }

    #[inline]
    pub fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n").map_err(TableError::Io)
    }

    /// Write an integer using itoa.
    #[inline]
    pub fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer
            .write_all(self.itoa_buf.format(n).as_bytes())
            .map_err(TableError::Io)
    }

    /// Write a float using ryu.
    #[inline]
    pub fn write_float(&mut self, f: f64) -> Result<()> {
        self.writer
            .write_all(self.ryu_buf.format(f).as_bytes())
            .map_err(TableError::Io)
    }

    #[inline]
    pub fn write_bool(&mut self, b: bool) -> Result<()> {
        self.write_str(if b { "True" } else { "False" })
    }

    /// Write a full row of text cells.
    pub fn write_row<S: AsRef<str>>(&mut self, cells: &[S]) -> Result<()> {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                self.write_tab()?;
            }
            self.write_str(cell.as_ref())?;
        }
        self.write_newline()
    }

    /// Write `n` empty cells, each preceded by a tab.
    #[inline]
    fn write_empty_cells(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.write_tab()?;
        }
        Ok(())
    }

    /// Write the six descriptive feature columns, tab-separated.
    fn write_feature_columns(&mut self, feature: &GeneFeature) -> Result<()> {
        self.write_int(feature.begin)?;
        self.write_tab()?;
        self.write_int(feature.end)?;
        self.write_tab()?;
        self.write_str(feature.strand.as_str())?;
        self.write_tab()?;
        self.write_opt_str(feature.description.as_deref())?;
        self.write_tab()?;
        self.write_opt_str(feature.old_locus_tag.as_deref())?;
        self.write_tab()?;
        self.write_opt_str(feature.new_locus_tag.as_deref())
    }

    /// Write the pool-table cells of an observation under `pool_header`.
    ///
    /// Observations read from a pool table are written back verbatim;
    /// observations built in code have their known columns filled in.
    fn write_observation_cells(
        &mut self,
        observation: &Observation,
        pool_header: &[String],
    ) -> Result<()> {
        for (i, name) in pool_header.iter().enumerate() {
            if i > 0 {
                self.write_tab()?;
            }
            if !observation.columns.is_empty() {
                self.write_str(observation.columns.get(i).map_or("", |s| s.as_str()))?;
                continue;
            }
            match name.as_str() {
                "barcode" => self.write_str(&observation.barcode)?,
                "scaffold" => self.write_str(&observation.scaffold)?,
                "pos" => self.write_int(observation.position)?,
                "strand" => self.write_str(observation.strand.as_str())?,
                "nTot" => self.write_int(observation.total_count)?,
                "n" => self.write_int(observation.distinct_position_count)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(TableError::Io)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| TableError::Io(e.into_error()))
    }
}

/// Write the annotated pool: one row per observation, with feature columns
/// empty for intergenic rows. Zero-hit feature rows are not written.
///
/// Returns the number of data rows written.
pub fn write_annotated<W: Write>(
    out: &mut TableWriter<W>,
    pool_header: &[String],
    records: &[AnnotatedRecord],
) -> Result<usize> {
    let header: Vec<&str> = pool_header
        .iter()
        .map(|s| s.as_str())
        .chain(ANNOTATION_COLUMNS)
        .collect();
    out.write_row(&header)?;

    let mut written = 0;
    for record in records {
        let Some(observation) = record.observation() else {
            continue;
        };
        out.write_observation_cells(observation, pool_header)?;

        match record {
            AnnotatedRecord::Hit {
                feature, geometry, ..
            } => {
                out.write_tab()?;
                out.write_feature_columns(feature)?;
                out.write_tab()?;
                out.write_int(geometry.gene_length)?;
                out.write_tab()?;
                if let Some(relative) = geometry.relative_position {
                    out.write_float(relative)?;
                }
                out.write_tab()?;
                out.write_bool(geometry.is_central)?;
            }
            _ => out.write_empty_cells(ANNOTATION_COLUMNS.len())?,
        }
        out.write_newline()?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

/// Write one row per feature, zero-hit features included.
pub fn write_feature_counts<W: Write>(
    out: &mut TableWriter<W>,
    features: &[FeatureHits],
) -> Result<()> {
    out.write_row(&FEATURE_COUNT_COLUMNS)?;
    for hits in features {
        write_feature_hits(out, hits)?;
    }
    out.flush()
}

/// Write the ranked top-N features.
pub fn write_top_features<W: Write>(
    out: &mut TableWriter<W>,
    ranked: &[&FeatureHits],
) -> Result<()> {
    let mut header = vec!["rank"];
    header.extend(FEATURE_COUNT_COLUMNS);
    out.write_row(&header)?;
    for (rank, hits) in ranked.iter().enumerate() {
        out.write_int(rank + 1)?;
        out.write_tab()?;
        write_feature_hits(out, hits)?;
    }
    out.flush()
}

fn write_feature_hits<W: Write>(out: &mut TableWriter<W>, hits: &FeatureHits) -> Result<()> {
    out.write_str(&hits.feature.scaffold)?;
    out.write_tab()?;
    out.write_feature_columns(&hits.feature)?;
    out.write_tab()?;
    out.write_int(hits.barcodes)?;
    out.write_tab()?;
    out.write_int(hits.central_barcodes)?;
    out.write_tab()?;
    out.write_int(hits.reads)?;
    out.write_newline()
}

/// Write observation counts per feature description.
pub fn write_description_counts<W: Write>(out: &mut TableWriter<W>, summary: &Summary) -> Result<()> {
    out.write_row(&["desc", "n_barcodes"])?;
    for (desc, count) in &summary.by_description {
        out.write_str(desc)?;
        out.write_tab()?;
        out.write_int(*count)?;
        out.write_newline()?;
    }
    out.flush()
}

/// Write run totals as key/value lines.
pub fn write_overview<W: Write>(
    out: &mut TableWriter<W>,
    summary: &Summary,
    stats: &AnnotationStats,
) -> Result<()> {
    let totals = &summary.totals;
    let rows: [(&str, usize); 12] = [
        ("scaffolds", stats.scaffolds),
        ("features", totals.features),
        ("features_hit", totals.hit_features),
        ("features_zero_hit", totals.zero_hit_features),
        ("observations", totals.observations),
        ("observations_in_genes", totals.hits),
        ("observations_intergenic", totals.intergenic),
        ("observations_unindexed_scaffold", stats.unindexed_scaffold_observations),
        ("observations_ambiguous", stats.ambiguous),
        ("central", totals.central),
        ("non_central", totals.non_central),
        ("degenerate_hits", totals.degenerate_hits),
    ];
    for (key, value) in rows {
        out.write_str(key)?;
        out.write_tab()?;
        out.write_int(value)?;
        out.write_newline()?;
    }
    out.flush()
}
