//! Annotation run configuration.
//!
//! The central-region bounds are a fixed quality contract: insertions in the
//! outer 10% at either end of a gene are treated as unlikely to disrupt it.
//! They only change when a caller overrides them explicitly.

use crate::table::{Result, TableError};

/// Lower bound of the central region (inclusive).
pub const DEFAULT_CENTRAL_LOWER: f64 = 0.1;

/// Upper bound of the central region (inclusive).
pub const DEFAULT_CENTRAL_UPPER: f64 = 0.9;

/// Default number of features listed in the top-N ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// Closed range of relative positions counted as central.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralRegion {
    pub lower: f64,
    pub upper: f64,
}

impl Default for CentralRegion {
    fn default() -> Self {
        Self {
            lower: DEFAULT_CENTRAL_LOWER,
            upper: DEFAULT_CENTRAL_UPPER,
        }
    }
}

impl CentralRegion {
    /// Create a validated central region.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) {
            return Err(TableError::InvalidConfig(format!(
                "central region bounds must lie in [0, 1], got [{}, {}]",
                lower, upper
            )));
        }
        if lower > upper {
            return Err(TableError::InvalidConfig(format!(
                "central region lower bound {} exceeds upper bound {}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn contains(&self, relative_position: f64) -> bool {
        self.lower <= relative_position && relative_position <= self.upper
    }
}

/// Settings for one annotation run.
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    pub central: CentralRegion,
    /// Features listed in the top-N ranking.
    pub top_n: usize,
    /// Skip pool rows with no mapped position instead of failing.
    pub drop_unmapped: bool,
    /// Split work by scaffold across the Rayon pool for large inputs.
    pub parallel: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotateConfig {
    pub fn new() -> Self {
        Self {
            central: CentralRegion::default(),
            top_n: DEFAULT_TOP_N,
            drop_unmapped: false,
            parallel: true,
        }
    }

    pub fn with_central(mut self, central: CentralRegion) -> Self {
        self.central = central;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_drop_unmapped(mut self, drop_unmapped: bool) -> Self {
        self.drop_unmapped = drop_unmapped;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
