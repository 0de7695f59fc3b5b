//! Generate a synthetic gene table and pool table.
//!
//! Genes are laid out along each scaffold with random lengths and gaps,
//! occasionally overlapping their neighbour. Insertions land uniformly along
//! the scaffolds, weighted by scaffold length, and a small share fall on an
//! extra plasmid scaffold that has no genes. Output is fully determined by
//! the seed.

use crate::feature::Strand;
use crate::output::TableWriter;
use crate::table::{Result, TableError, FEATURE_COLUMNS};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const GENES_FILE: &str = "genes.tab";
pub const POOL_FILE: &str = "pool.tab";

/// Scaffold with no genes that receives a share of the insertions.
const PLASMID: &str = "pSYN1";
const PLASMID_LENGTH: u64 = 50_000;

const GENE_LEN_MIN: u64 = 150;
const GENE_LEN_MAX: u64 = 3_000;
const GAP_MAX: u64 = 400;

const DESCRIPTIONS: [&str; 8] = [
    "hypothetical protein",
    "ABC transporter permease",
    "DNA-binding response regulator",
    "outer membrane porin",
    "histidine kinase",
    "tRNA-Leu",
    "ribosomal protein L7",
    "",
];

/// Configuration for the generate command.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub output_dir: PathBuf,
    pub scaffolds: usize,
    pub genes_per_scaffold: usize,
    pub barcodes: usize,
    pub seed: u64,
    /// Share of insertions placed on the gene-free plasmid.
    pub plasmid_fraction: f64,
    pub force: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./tnpool_data"),
            scaffolds: 3,
            genes_per_scaffold: 500,
            barcodes: 100_000,
            seed: 42,
            plasmid_fraction: 0.02,
            force: false,
        }
    }
}

/// Statistics from a generate run.
#[derive(Debug, Default, Clone)]
pub struct GenerateStats {
    pub genes: usize,
    pub barcodes: usize,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for GenerateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} genes, {} barcodes ({:.1}s)",
            self.genes, self.barcodes, self.elapsed_secs
        )
    }
}

/// A generated gene, before it is written out.
struct SyntheticGene {
    begin: u64,
    end: u64,
    strand: Strand,
}

/// Generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateCommand {
    pub config: GenerateConfig,
}

impl GenerateCommand {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Write `genes.tab` and `pool.tab` into the output directory.
    pub fn run(&self) -> Result<GenerateStats> {
        let start = Instant::now();
        let dir = &self.config.output_dir;
        let genes_path = dir.join(GENES_FILE);
        let pool_path = dir.join(POOL_FILE);

        if !self.config.force && (genes_path.exists() || pool_path.exists()) {
            return Err(TableError::InvalidConfig(format!(
                "{} already holds generated tables, use --force to overwrite",
                dir.display()
            )));
        }
        if !(0.0..=1.0).contains(&self.config.plasmid_fraction) {
            return Err(TableError::InvalidConfig(format!(
                "plasmid fraction must lie in [0, 1], got {}",
                self.config.plasmid_fraction
            )));
        }
        fs::create_dir_all(dir)?;

        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let layout = self.layout_genes(&mut rng);
        let genes = self.write_genes(&genes_path, &layout, &mut rng)?;
        info!("Saved: {}", genes_path.display());

        let barcodes = self.write_pool(&pool_path, &layout, &mut rng)?;
        info!("Saved: {}", pool_path.display());

        Ok(GenerateStats {
            genes,
            barcodes,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Gene coordinates per scaffold plus each scaffold's length.
    fn layout_genes(&self, rng: &mut SmallRng) -> Vec<(String, u64, Vec<SyntheticGene>)> {
        (0..self.config.scaffolds)
            .map(|i| {
                let name = format!("scaffold_{}", i + 1);
                let mut genes = Vec::with_capacity(self.config.genes_per_scaffold);
                let mut cursor = 1u64;
                for _ in 0..self.config.genes_per_scaffold {
                    let len = rng.gen_range(GENE_LEN_MIN..=GENE_LEN_MAX);
                    // One gene in ten overlaps the end of the previous one
                    let begin = if rng.gen_bool(0.1) {
                        cursor.saturating_sub(rng.gen_range(1..=GENE_LEN_MIN)).max(1)
                    } else {
                        cursor + rng.gen_range(0..=GAP_MAX)
                    };
                    let end = begin + len;
                    let strand = if rng.gen_bool(0.5) {
                        Strand::Plus
                    } else {
                        Strand::Minus
                    };
                    genes.push(SyntheticGene { begin, end, strand });
                    cursor = cursor.max(end + 1);
                }
                let length = cursor + rng.gen_range(0..=GAP_MAX);
                (name, length, genes)
            })
            .collect()
    }

    fn write_genes(
        &self,
        path: &Path,
        layout: &[(String, u64, Vec<SyntheticGene>)],
        rng: &mut SmallRng,
    ) -> Result<usize> {
        let mut out = TableWriter::new(File::create(path)?);
        out.write_row(&FEATURE_COLUMNS)?;

        let mut count = 0usize;
        for (scaffold, _, genes) in layout {
            for gene in genes {
                count += 1;
                let desc = DESCRIPTIONS[rng.gen_range(0..DESCRIPTIONS.len())];
                out.write_str(scaffold)?;
                out.write_tab()?;
                out.write_int(gene.begin)?;
                out.write_tab()?;
                out.write_int(gene.end)?;
                out.write_tab()?;
                out.write_str(gene.strand.as_str())?;
                out.write_tab()?;
                out.write_str(desc)?;
                out.write_tab()?;
                // Older annotations miss some legacy tags
                if rng.gen_bool(0.8) {
                    out.write_str(&format!("SYN_RS{:05}", count))?;
                }
                out.write_tab()?;
                out.write_str(&format!("SYN_{:05}", count))?;
                out.write_newline()?;
            }
        }
        out.flush()?;
        Ok(count)
    }

    fn write_pool(
        &self,
        path: &Path,
        layout: &[(String, u64, Vec<SyntheticGene>)],
        rng: &mut SmallRng,
    ) -> Result<usize> {
        let mut cumulative = Vec::with_capacity(layout.len());
        let mut total = 0u64;
        for (_, length, _) in layout {
            total += length;
            cumulative.push(total);
        }

        let mut out = TableWriter::new(File::create(path)?);
        out.write_row(&["barcode", "rcbarcode", "nTot", "n", "scaffold", "strand", "pos"])?;

        for _ in 0..self.config.barcodes {
            let barcode = random_barcode(rng);
            let (scaffold, length) = if total == 0 || rng.gen_bool(self.config.plasmid_fraction) {
                (PLASMID, PLASMID_LENGTH)
            } else {
                let target = rng.gen_range(0..total);
                let idx = cumulative.partition_point(|&c| c <= target);
                (layout[idx].0.as_str(), layout[idx].1)
            };
            let position = rng.gen_range(1..=length);
            let total_count: u64 = rng.gen_range(1..=200);
            let distinct = rng.gen_range(1..=total_count.min(5));

            out.write_str(&barcode)?;
            out.write_tab()?;
            out.write_str(&reverse_complement(&barcode))?;
            out.write_tab()?;
            out.write_int(total_count)?;
            out.write_tab()?;
            out.write_int(distinct)?;
            out.write_tab()?;
            out.write_str(scaffold)?;
            out.write_tab()?;
            out.write_str(if rng.gen_bool(0.5) { "+" } else { "-" })?;
            out.write_tab()?;
            out.write_int(position)?;
            out.write_newline()?;
        }
        out.flush()?;
        Ok(self.config.barcodes)
    }
}

fn random_barcode(rng: &mut SmallRng) -> String {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    (0..20).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            other => other,
        })
        .collect()
}
