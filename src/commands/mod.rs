//! Command implementations for tnpool.

pub mod annotate;
pub mod generate;
pub mod summary;

pub use annotate::{AnnotateCommand, AnnotateReport};
pub use generate::{GenerateCommand, GenerateConfig, GenerateStats};
pub use summary::SummaryCommand;
