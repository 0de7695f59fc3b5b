//! Core record types: gene features and barcode observations.

use std::cmp::Ordering;
use std::fmt;

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Plus,
            '-' => Strand::Minus,
            _ => Strand::Unknown,
        }
    }

    /// Parse a strand column, accepting only `+` or `-`.
    pub fn parse_strict(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unknown => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An annotated gene interval on one scaffold.
///
/// Coordinates are closed: the feature covers every position `p` with
/// `begin <= p <= end`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneFeature {
    pub scaffold: String,
    pub begin: u64,
    pub end: u64,
    pub strand: Strand,
    pub description: Option<String>,
    pub old_locus_tag: Option<String>,
    pub new_locus_tag: Option<String>,
    /// 0-based load order within the feature table. Reassigned by
    /// `FeatureTable::from_features`, so builders may leave it at zero.
    pub row: usize,
}

impl GeneFeature {
    /// Create a feature with no description or tags.
    pub fn new(scaffold: impl Into<String>, begin: u64, end: u64, strand: Strand) -> Self {
        Self {
            scaffold: scaffold.into(),
            begin,
            end,
            strand,
            description: None,
            old_locus_tag: None,
            new_locus_tag: None,
            row: 0,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.new_locus_tag = Some(tag.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Identifier used for tie-breaking and reporting.
    ///
    /// The new locus tag wins over the old one; a feature with neither
    /// sorts as the empty string.
    #[inline]
    pub fn id(&self) -> &str {
        self.new_locus_tag
            .as_deref()
            .or(self.old_locus_tag.as_deref())
            .unwrap_or("")
    }

    /// `end - begin`, zero for single-point features.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closed-interval containment test.
    #[inline]
    pub fn contains(&self, position: u64) -> bool {
        self.begin <= position && position <= self.end
    }

    /// Deterministic selection order among features sharing a position:
    /// smaller begin, then smaller identifier, then earlier load order.
    #[inline]
    pub fn selection_cmp(&self, other: &GeneFeature) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then_with(|| self.id().cmp(other.id()))
            .then(self.row.cmp(&other.row))
    }
}

impl fmt::Display for GeneFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.scaffold, self.begin, self.end, self.strand
        )?;
        if !self.id().is_empty() {
            write!(f, "\t{}", self.id())?;
        }
        Ok(())
    }
}

/// A barcode mapped to a single insertion position.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub barcode: String,
    pub scaffold: String,
    pub position: u64,
    pub strand: Strand,
    pub total_count: u64,
    pub distinct_position_count: u64,
    /// Original pool-table columns, written back unchanged.
    pub columns: Vec<String>,
    /// 0-based load order within the pool table.
    pub row: usize,
}

impl Observation {
    pub fn new(barcode: impl Into<String>, scaffold: impl Into<String>, position: u64) -> Self {
        Self {
            barcode: barcode.into(),
            scaffold: scaffold.into(),
            position,
            strand: Strand::Unknown,
            total_count: 0,
            distinct_position_count: 0,
            columns: Vec::new(),
            row: 0,
        }
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    pub fn with_counts(mut self, total_count: u64, distinct_position_count: u64) -> Self {
        self.total_count = total_count;
        self.distinct_position_count = distinct_position_count;
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }
}
