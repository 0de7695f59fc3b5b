//! Tab-separated readers for the gene-feature table and the barcode pool table.
//!
//! Both tables carry a header row and columns are located by name, so extra
//! columns and arbitrary column order are accepted. Any malformed row aborts
//! the read with an error naming the 1-based data row and the column.

use crate::feature::{GeneFeature, Observation, Strand};
use log::{info, warn};
use memchr::memchr_iter;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading input tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at row {row}, column '{field}': {message}")]
    Parse {
        row: usize,
        field: String,
        message: String,
    },

    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    #[error("Invalid feature at row {row}: {message}")]
    InvalidFeature { row: usize, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid table format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, TableError>;

/// Columns of the gene-feature table.
pub const FEATURE_COLUMNS: [&str; 7] = [
    "scaffold",
    "begin",
    "end",
    "strand",
    "desc",
    "old_locus_tag",
    "new_locus_tag",
];

/// Columns the pool table must carry.
pub const POOL_REQUIRED_COLUMNS: [&str; 6] = ["barcode", "nTot", "n", "scaffold", "strand", "pos"];

/// Split a line on tabs.
#[inline]
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(16);
    let mut start = 0;
    for tab in memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Empty and `NA` cells are null.
#[inline]
fn is_null(value: &str) -> bool {
    value.is_empty() || value == "NA" || value == "nan" || value == "NaN"
}

#[inline]
fn optional_text(value: &str) -> Option<String> {
    if is_null(value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Integer coordinate, also accepting an integral float such as `1234.0`.
fn parse_coordinate(value: &str) -> Option<u64> {
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.strip_suffix(".0")?.parse().ok())
}

/// Parsed header row with name lookup.
#[derive(Debug, Clone)]
pub struct Header {
    names: Vec<String>,
    lookup: FxHashMap<String, usize>,
}

impl Header {
    pub fn parse(line: &str) -> Self {
        let names: Vec<String> = split_fields(line)
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        let mut lookup = FxHashMap::default();
        for (idx, name) in names.iter().enumerate() {
            lookup.entry(name.clone()).or_insert(idx);
        }
        Self { names, lookup }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    fn require(&self, table: &'static str, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| TableError::MissingColumn {
            table,
            column: name.to_string(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Line source shared by both table readers.
struct TableLines<R: Read> {
    reader: BufReader<R>,
    buffer: String,
    row: usize,
}

impl<R: Read> TableLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: String::with_capacity(1024),
            row: 0,
        }
    }

    /// Next non-blank line without its terminator, with its 1-based row number.
    fn next_line(&mut self) -> Result<Option<(usize, &str)>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            let len = self.buffer.trim_end_matches(['\n', '\r']).len();
            if self.buffer[..len].trim().is_empty() {
                continue;
            }
            self.row += 1;
            return Ok(Some((self.row, &self.buffer[..len])));
        }
    }

    fn read_header(&mut self, table: &'static str) -> Result<Header> {
        let header = match self.next_line()? {
            Some((_, line)) => Header::parse(line),
            None => {
                return Err(TableError::InvalidFormat(format!(
                    "{} table is empty (expected a header row)",
                    table
                )))
            }
        };
        // Rows are numbered from the first data line.
        self.row = 0;
        Ok(header)
    }
}

fn cell<'a>(fields: &[&'a str], idx: usize, row: usize, name: &str) -> Result<&'a str> {
    fields
        .get(idx)
        .copied()
        .map(str::trim)
        .ok_or_else(|| TableError::Parse {
            row,
            field: name.to_string(),
            message: format!("row has {} fields, column is missing", fields.len()),
        })
}

fn integer(fields: &[&str], idx: usize, row: usize, name: &str) -> Result<u64> {
    let value = cell(fields, idx, row, name)?;
    parse_coordinate(value).ok_or_else(|| TableError::Parse {
        row,
        field: name.to_string(),
        message: format!("expected a non-negative integer, got '{}'", value),
    })
}

/// Reject features the index cannot represent.
pub fn validate_feature(feature: &GeneFeature, row: usize) -> Result<()> {
    if feature.scaffold.is_empty() {
        return Err(TableError::InvalidFeature {
            row,
            message: "scaffold is empty".to_string(),
        });
    }
    if feature.begin > feature.end {
        return Err(TableError::InvalidFeature {
            row,
            message: format!("begin ({}) > end ({})", feature.begin, feature.end),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct FeatureColumns {
    scaffold: usize,
    begin: usize,
    end: usize,
    strand: usize,
    desc: usize,
    old_locus_tag: usize,
    new_locus_tag: usize,
}

/// A streaming reader over the gene-feature table.
pub struct FeatureReader<R: Read> {
    lines: TableLines<R>,
    columns: FeatureColumns,
}

impl FeatureReader<File> {
    /// Open a feature table from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read> FeatureReader<R> {
    /// Create a reader and consume the header row.
    pub fn new(reader: R) -> Result<Self> {
        let mut lines = TableLines::new(reader);
        let header = lines.read_header("feature")?;
        let [scaffold, begin, end, strand, desc, old_locus_tag, new_locus_tag] =
            FEATURE_COLUMNS;
        let columns = FeatureColumns {
            scaffold: header.require("feature", scaffold)?,
            begin: header.require("feature", begin)?,
            end: header.require("feature", end)?,
            strand: header.require("feature", strand)?,
            desc: header.require("feature", desc)?,
            old_locus_tag: header.require("feature", old_locus_tag)?,
            new_locus_tag: header.require("feature", new_locus_tag)?,
        };
        Ok(Self { lines, columns })
    }

    /// Read the next feature.
    pub fn read_feature(&mut self) -> Result<Option<GeneFeature>> {
        let columns = self.columns;
        let Some((row, line)) = self.lines.next_line()? else {
            return Ok(None);
        };
        let fields = split_fields(line);

        let scaffold = cell(&fields, columns.scaffold, row, "scaffold")?;
        let begin = integer(&fields, columns.begin, row, "begin")?;
        let end = integer(&fields, columns.end, row, "end")?;
        let strand_text = cell(&fields, columns.strand, row, "strand")?;
        let strand = Strand::parse_strict(strand_text).ok_or_else(|| TableError::Parse {
            row,
            field: "strand".to_string(),
            message: format!("expected '+' or '-', got '{}'", strand_text),
        })?;

        let feature = GeneFeature {
            scaffold: scaffold.to_string(),
            begin,
            end,
            strand,
            description: optional_text(cell(&fields, columns.desc, row, "desc")?),
            old_locus_tag: optional_text(cell(
                &fields,
                columns.old_locus_tag,
                row,
                "old_locus_tag",
            )?),
            new_locus_tag: optional_text(cell(
                &fields,
                columns.new_locus_tag,
                row,
                "new_locus_tag",
            )?),
            row: row - 1,
        };
        validate_feature(&feature, row)?;
        Ok(Some(feature))
    }

    /// Get an iterator over all features.
    pub fn features(self) -> FeatureIter<R> {
        FeatureIter { reader: self }
    }
}

/// Iterator over feature-table rows.
pub struct FeatureIter<R: Read> {
    reader: FeatureReader<R>,
}

impl<R: Read> Iterator for FeatureIter<R> {
    type Item = Result<GeneFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_feature().transpose()
    }
}

#[derive(Debug, Clone, Copy)]
struct PoolColumns {
    barcode: usize,
    total_count: usize,
    distinct_position_count: usize,
    scaffold: usize,
    strand: usize,
    position: usize,
}

/// A streaming reader over the barcode pool table.
pub struct PoolReader<R: Read> {
    lines: TableLines<R>,
    header: Header,
    columns: PoolColumns,
    drop_unmapped: bool,
    dropped: usize,
    kept: usize,
}

impl PoolReader<File> {
    /// Open a pool table from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read> PoolReader<R> {
    /// Create a reader and consume the header row.
    pub fn new(reader: R) -> Result<Self> {
        let mut lines = TableLines::new(reader);
        let header = lines.read_header("pool")?;
        let [barcode, n_tot, n, scaffold, strand, pos] = POOL_REQUIRED_COLUMNS;
        let columns = PoolColumns {
            barcode: header.require("pool", barcode)?,
            total_count: header.require("pool", n_tot)?,
            distinct_position_count: header.require("pool", n)?,
            scaffold: header.require("pool", scaffold)?,
            strand: header.require("pool", strand)?,
            position: header.require("pool", pos)?,
        };
        Ok(Self {
            lines,
            header,
            columns,
            drop_unmapped: false,
            dropped: 0,
            kept: 0,
        })
    }

    /// Skip rows with a null position instead of failing on them.
    pub fn with_drop_unmapped(mut self, drop_unmapped: bool) -> Self {
        self.drop_unmapped = drop_unmapped;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of rows skipped for a null position so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Read the next observation.
    pub fn read_observation(&mut self) -> Result<Option<Observation>> {
        let columns = self.columns;
        let width = self.header.len();
        loop {
            let Some((row, line)) = self.lines.next_line()? else {
                return Ok(None);
            };
            let fields = split_fields(line);

            let pos_text = cell(&fields, columns.position, row, "pos")?;
            if is_null(pos_text) {
                if self.drop_unmapped {
                    self.dropped += 1;
                    continue;
                }
                return Err(TableError::Parse {
                    row,
                    field: "pos".to_string(),
                    message: "position is null (unmapped barcode)".to_string(),
                });
            }
            let position = integer(&fields, columns.position, row, "pos")?;

            let barcode = cell(&fields, columns.barcode, row, "barcode")?;
            if barcode.is_empty() {
                return Err(TableError::Parse {
                    row,
                    field: "barcode".to_string(),
                    message: "barcode is empty".to_string(),
                });
            }

            let scaffold = cell(&fields, columns.scaffold, row, "scaffold")?;
            let strand = cell(&fields, columns.strand, row, "strand")?
                .chars()
                .next()
                .map(Strand::from_char)
                .unwrap_or(Strand::Unknown);

            let mut passthrough: Vec<String> = fields.iter().map(|s| s.to_string()).collect();
            passthrough.resize(width, String::new());

            let observation = Observation {
                barcode: barcode.to_string(),
                scaffold: scaffold.to_string(),
                position,
                strand,
                total_count: integer(&fields, columns.total_count, row, "nTot")?,
                distinct_position_count: integer(
                    &fields,
                    columns.distinct_position_count,
                    row,
                    "n",
                )?,
                columns: passthrough,
                row: self.kept,
            };
            self.kept += 1;
            return Ok(Some(observation));
        }
    }
}

/// A fully loaded pool table.
#[derive(Debug, Clone)]
pub struct PoolTable {
    pub header: Vec<String>,
    pub observations: Vec<Observation>,
    /// Rows skipped for a null position.
    pub dropped: usize,
}

impl PoolTable {
    fn from_reader<R: Read>(mut reader: PoolReader<R>) -> Result<Self> {
        let mut observations = Vec::new();
        while let Some(obs) = reader.read_observation()? {
            observations.push(obs);
        }
        if reader.dropped() > 0 {
            warn!(
                "Dropped {} pool rows with no mapped position",
                reader.dropped()
            );
        }
        Ok(Self {
            header: reader.header().names().to_vec(),
            observations,
            dropped: reader.dropped(),
        })
    }
}

/// Gene features grouped by scaffold, each group in load order.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    scaffolds: FxHashMap<String, Vec<GeneFeature>>,
    len: usize,
}

impl FeatureTable {
    /// Group validated features by scaffold.
    ///
    /// `row` is reassigned to each feature's position in `features`, so
    /// load order stays a unique identity however the features were built.
    pub fn from_features(features: Vec<GeneFeature>) -> Result<Self> {
        let mut scaffolds: FxHashMap<String, Vec<GeneFeature>> = FxHashMap::default();
        let len = features.len();
        for (row, mut feature) in features.into_iter().enumerate() {
            feature.row = row;
            validate_feature(&feature, row + 1)?;
            scaffolds
                .entry(feature.scaffold.clone())
                .or_default()
                .push(feature);
        }
        Ok(Self { scaffolds, len })
    }

    /// Features on one scaffold, in load order.
    pub fn scaffold(&self, name: &str) -> Option<&[GeneFeature]> {
        self.scaffolds.get(name).map(|v| v.as_slice())
    }

    /// Scaffold names in lexicographic order.
    pub fn scaffold_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scaffolds.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn into_groups(self) -> FxHashMap<String, Vec<GeneFeature>> {
        self.scaffolds
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Read all features from a feature table file.
pub fn read_features<P: AsRef<Path>>(path: P) -> Result<Vec<GeneFeature>> {
    let features: Vec<GeneFeature> = FeatureReader::from_path(path)?
        .features()
        .collect::<Result<_>>()?;
    info!("Loaded {} gene features", features.len());
    Ok(features)
}

/// Read all observations from a pool table file.
pub fn read_pool<P: AsRef<Path>>(path: P, drop_unmapped: bool) -> Result<PoolTable> {
    let reader = PoolReader::from_path(path)?.with_drop_unmapped(drop_unmapped);
    let table = PoolTable::from_reader(reader)?;
    info!("Loaded {} pool observations", table.observations.len());
    Ok(table)
}

/// Parse a feature table from a string (useful for testing).
pub fn parse_features(content: &str) -> Result<Vec<GeneFeature>> {
    FeatureReader::new(content.as_bytes())?.features().collect()
}

/// Parse a pool table from a string (useful for testing).
pub fn parse_pool(content: &str, drop_unmapped: bool) -> Result<PoolTable> {
    let reader = PoolReader::new(content.as_bytes())?.with_drop_unmapped(drop_unmapped);
    PoolTable::from_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENES: &str = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                         chr\t100\t200\t+\tkinase\tOLD_1\tNEW_1\n\
                         chr\t300\t400\t-\t\t\tNEW_2\n\
                         pl\t5\t50\t+\tNA\tOLD_3\t\n";

    const POOL: &str = "barcode\trcbarcode\tnTot\tn\tscaffold\tstrand\tpos\n\
                        AAAA\tTTTT\t12\t10\tchr\t+\t150\n\
                        CCCC\tGGGG\t3\t3\tpl\t-\t7\n";

    #[test]
    fn test_parse_features() {
        let features = parse_features(GENES).unwrap();

        assert_eq!(features.len(), 3);
        assert_eq!(features[0].scaffold, "chr");
        assert_eq!(features[0].begin, 100);
        assert_eq!(features[0].end, 200);
        assert_eq!(features[0].strand, Strand::Plus);
        assert_eq!(features[0].description.as_deref(), Some("kinase"));
        assert_eq!(features[0].id(), "NEW_1");
        assert_eq!(features[1].description, None);
        assert_eq!(features[1].old_locus_tag, None);
        assert_eq!(features[2].description, None);
        assert_eq!(features[2].id(), "OLD_3");
        assert_eq!(features[2].row, 2);
    }

    #[test]
    fn test_columns_by_name() {
        let content = "new_locus_tag\tend\tbegin\tscaffold\tstrand\told_locus_tag\tdesc\textra\n\
                       G1\t20\t10\tchr\t-\t\thypothetical\tx\n";
        let features = parse_features(content).unwrap();

        assert_eq!(features[0].begin, 10);
        assert_eq!(features[0].end, 20);
        assert_eq!(features[0].id(), "G1");
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let content = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                       chr\t100\t200\t+\t\t\tA\n\
                       chr\tabc\t200\t+\t\t\tB\n";
        match parse_features(content) {
            Err(TableError::Parse { row, field, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(field, "begin");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_after_end_rejected() {
        let content = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                       chr\t300\t200\t+\t\t\tA\n";
        let err = parse_features(content).unwrap_err();
        assert!(matches!(err, TableError::InvalidFeature { row: 1, .. }));
    }

    #[test]
    fn test_empty_scaffold_rejected() {
        let content = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                       \t100\t200\t+\t\t\tA\n";
        let err = parse_features(content).unwrap_err();
        assert!(matches!(err, TableError::InvalidFeature { row: 1, .. }));
    }

    #[test]
    fn test_bad_feature_strand() {
        let content = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\tnew_locus_tag\n\
                       chr\t100\t200\t.\t\t\tA\n";
        let err = parse_features(content).unwrap_err();
        assert!(matches!(err, TableError::Parse { ref field, .. } if field == "strand"));
    }

    #[test]
    fn test_missing_column() {
        let content = "scaffold\tbegin\tend\tstrand\tdesc\told_locus_tag\nchr\t1\t2\t+\t\t\n";
        let err = parse_features(content).err().unwrap();
        assert!(matches!(
            err,
            TableError::MissingColumn { table: "feature", ref column } if column == "new_locus_tag"
        ));
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            parse_features(""),
            Err(TableError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_pool() {
        let pool = parse_pool(POOL, false).unwrap();

        assert_eq!(pool.header.len(), 7);
        assert_eq!(pool.observations.len(), 2);
        let obs = &pool.observations[0];
        assert_eq!(obs.barcode, "AAAA");
        assert_eq!(obs.scaffold, "chr");
        assert_eq!(obs.position, 150);
        assert_eq!(obs.strand, Strand::Plus);
        assert_eq!(obs.total_count, 12);
        assert_eq!(obs.distinct_position_count, 10);
        assert_eq!(obs.columns[1], "TTTT");
        assert_eq!(pool.observations[1].row, 1);
    }

    #[test]
    fn test_pool_null_position() {
        let content = "barcode\trcbarcode\tnTot\tn\tscaffold\tstrand\tpos\n\
                       AAAA\tTTTT\t12\t10\tchr\t+\t150\n\
                       CCCC\tGGGG\t3\t3\t\t\t\n\
                       GGGG\tCCCC\t4\t4\tchr\t-\t90.0\n";

        let err = parse_pool(content, false).unwrap_err();
        assert!(matches!(err, TableError::Parse { row: 2, ref field, .. } if field == "pos"));

        let pool = parse_pool(content, true).unwrap();
        assert_eq!(pool.observations.len(), 2);
        assert_eq!(pool.dropped, 1);
        assert_eq!(pool.observations[1].position, 90);
        assert_eq!(pool.observations[1].row, 1);
    }

    #[test]
    fn test_pool_crlf_and_blank_lines() {
        let content = "barcode\trcbarcode\tnTot\tn\tscaffold\tstrand\tpos\r\n\
                       \r\n\
                       AAAA\tTTTT\t12\t10\tchr\t+\t150\r\n";
        let pool = parse_pool(content, false).unwrap();

        assert_eq!(pool.header[6], "pos");
        assert_eq!(pool.observations.len(), 1);
        assert_eq!(pool.observations[0].position, 150);
    }

    #[test]
    fn test_feature_table_groups() {
        let table = FeatureTable::from_features(parse_features(GENES).unwrap()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.scaffold_names(), vec!["chr", "pl"]);
        assert_eq!(table.scaffold("chr").unwrap().len(), 2);
        assert!(table.scaffold("missing").is_none());
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a\t\tb"), vec!["a", "", "b"]);
        assert_eq!(split_fields("single"), vec!["single"]);
    }
}
