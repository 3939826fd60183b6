//! Benchmark grid configuration
//!
//! Loaded from a JSON file describing the datasets, the pattern lengths and
//! counts to sweep, and which index implementations to time.

use crate::index::query::QueryKind;
use crate::index::variant::Width;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// An index/query combination under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Implementation {
    ErIndexCount,
    ErIndexLocate,
    RIndexCount,
    RIndexLocate,
}

impl Implementation {
    pub const ALL: [Implementation; 4] = [
        Implementation::ErIndexCount,
        Implementation::RIndexCount,
        Implementation::ErIndexLocate,
        Implementation::RIndexLocate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Implementation::ErIndexCount => "er-index-count",
            Implementation::ErIndexLocate => "er-index-locate",
            Implementation::RIndexCount => "r-index-count",
            Implementation::RIndexLocate => "r-index-locate",
        }
    }

    /// Data structure name written to the report
    pub fn structure(self) -> &'static str {
        match self {
            Implementation::ErIndexCount | Implementation::ErIndexLocate => "eBWT r-index",
            Implementation::RIndexCount | Implementation::RIndexLocate => "r-index",
        }
    }

    pub fn query(self) -> QueryKind {
        match self {
            Implementation::ErIndexCount | Implementation::RIndexCount => QueryKind::Count,
            Implementation::ErIndexLocate | Implementation::RIndexLocate => QueryKind::Locate,
        }
    }

    pub fn is_r_index(self) -> bool {
        matches!(
            self,
            Implementation::RIndexCount | Implementation::RIndexLocate
        )
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One input collection to benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub path: PathBuf,

    /// Width of the er-index build (32 or 64). When absent the dataset's
    /// mode record must exist.
    #[serde(default)]
    pub width: Option<u32>,

    /// Prebuilt r-index file; defaults to `<path>.ri`
    #[serde(default)]
    pub r_index: Option<PathBuf>,
}

impl DatasetSpec {
    pub fn width(&self) -> Result<Option<Width>> {
        match self.width {
            None => Ok(None),
            Some(tag) => match Width::from_tag(tag) {
                Some(width) => Ok(Some(width)),
                None => bail!(
                    "dataset {}: width must be 32 or 64, got {}",
                    self.path.display(),
                    tag
                ),
            },
        }
    }

    pub fn r_index_path(&self) -> PathBuf {
        self.r_index
            .clone()
            .unwrap_or_else(|| crate::index::artifacts::artifact_path(&self.path, "ri"))
    }

    /// File name used for the per-dataset log and usage report
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string())
    }
}

/// External programs the sweep drives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Pattern generator: `<genpattern> <file> <length> <count> <out> 1 0`
    pub genpattern: PathBuf,

    /// Directory holding `er-index` / `er-index64`
    pub er_index_dir: PathBuf,

    #[serde(default)]
    pub r_index_count: Option<PathBuf>,

    #[serde(default)]
    pub r_index_locate: Option<PathBuf>,
}

/// Full sweep description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub datasets: Vec<DatasetSpec>,

    pub pattern_lengths: Vec<u64>,

    pub pattern_counts: Vec<u64>,

    #[serde(default = "default_implementations")]
    pub implementations: Vec<Implementation>,

    pub tools: ToolPaths,

    /// Root for `logs/<date>/` and `csvs/<date>.csv`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-run deadline; falls back to the app config
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Resource-usage wrapper; falls back to the app config
    #[serde(default)]
    pub time_program: Option<PathBuf>,

    /// Predecessor bitvector block size passed to er-index
    #[serde(default = "default_block")]
    pub block: u32,

    /// Query with first-rotation sampling enabled
    #[serde(default = "default_first_rotation")]
    pub first_rotation: bool,
}

fn default_implementations() -> Vec<Implementation> {
    Implementation::ALL.to_vec()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_block() -> u32 {
    2
}

fn default_first_rotation() -> bool {
    true
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read bench config {}", path.display()))?;
        let config: BenchConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bench config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            bail!("bench config lists no datasets");
        }
        if self.pattern_lengths.is_empty() || self.pattern_counts.is_empty() {
            bail!("bench config needs at least one pattern length and one pattern count");
        }
        if self.implementations.is_empty() {
            bail!("bench config enables no implementations");
        }
        for dataset in &self.datasets {
            dataset.width()?;
        }
        for implementation in &self.implementations {
            match implementation {
                Implementation::RIndexCount if self.tools.r_index_count.is_none() => {
                    bail!("r-index-count enabled but tools.r_index_count is not set")
                }
                Implementation::RIndexLocate if self.tools.r_index_locate.is_none() => {
                    bail!("r-index-locate enabled but tools.r_index_locate is not set")
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Number of (dataset, length, count) cells
    pub fn cell_count(&self) -> usize {
        self.datasets.len() * self.pattern_lengths.len() * self.pattern_counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "datasets": [{"path": "/data/salmonella.fasta", "width": 32}],
        "pattern_lengths": [100, 1000],
        "pattern_counts": [100000],
        "tools": {"genpattern": "/opt/genpattern", "er_index_dir": "/opt/build"}
    }"#;

    #[test]
    fn test_defaults() {
        let mut config: BenchConfig = serde_json::from_str(MINIMAL).unwrap();
        config.implementations = vec![Implementation::ErIndexCount];

        config.validate().unwrap();
        assert_eq!(config.block, 2);
        assert!(config.first_rotation);
        assert_eq!(config.output_dir, PathBuf::from("logs"));
        assert_eq!(config.cell_count(), 2);
        assert_eq!(config.datasets[0].width().unwrap(), Some(Width::W32));
    }

    #[test]
    fn test_default_implementations_need_r_index_tools() {
        let config: BenchConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.implementations.len(), 4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_implementation_names() {
        let json = r#"["er-index-count", "r-index-locate"]"#;
        let parsed: Vec<Implementation> = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            [Implementation::ErIndexCount, Implementation::RIndexLocate]
        );
        for imp in Implementation::ALL {
            assert_eq!(
                serde_json::to_string(&imp).unwrap(),
                format!("\"{}\"", imp.name())
            );
        }
    }

    #[test]
    fn test_bad_width_rejected() {
        let mut config: BenchConfig = serde_json::from_str(MINIMAL).unwrap();
        config.implementations = vec![Implementation::ErIndexLocate];
        config.datasets[0].width = Some(48);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_r_index_path_default() {
        let spec = DatasetSpec {
            path: PathBuf::from("/data/x.fa"),
            width: None,
            r_index: None,
        };
        assert_eq!(spec.r_index_path(), PathBuf::from("/data/x.fa.ri"));
        assert_eq!(spec.base_name(), "x.fa");
    }
}
