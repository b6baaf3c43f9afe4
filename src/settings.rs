/// benchmark settings
/// loaded from an optional JSON file, then overridden by command-line flags
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FitnessError, Result};
use crate::fitness::DEFAULT_PSNR_PEAK;

/// what gets scored against the target on every iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CandidateMode {
    /// the decoded target itself (distance is always 0)
    Same,
    /// a transparent black canvas of the target's size
    Blank,
    /// a polygon genome loaded from JSON and rasterized each time
    Genome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchSettings {
    pub target: Option<PathBuf>,
    pub iterations: u32,
    pub candidate: CandidateMode,
    pub genome: Option<PathBuf>,
    /// rayon pool size; None lets rayon decide
    pub threads: Option<usize>,
    /// iterations in flight at once; 1 is a plain sequential loop
    pub jobs: usize,
    /// reduce each squared sum over rayon chunks
    pub parallel_sum: bool,
    pub polygon_antialiasing: bool,
    /// peak value for PSNR calculation (255.0 for 8-bit)
    pub psnr_peak: f64,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            target: None,
            iterations: 1000,
            candidate: CandidateMode::Same,
            genome: None,
            threads: None,
            jobs: 1,
            parallel_sum: false,
            polygon_antialiasing: true,
            psnr_peak: DEFAULT_PSNR_PEAK,
        }
    }
}

impl BenchSettings {
    /// load settings from a JSON file; any failure is an error
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| FitnessError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&json).map_err(|source| FitnessError::Json { path: path.to_path_buf(), source })
    }

    /// load settings from a JSON file, or return defaults if it is missing or broken
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("failed to parse {}: {}. using defaults.", path.display(), e);
                    Self::default()
                }
            },
            // file doesn't exist or can't be read - use defaults
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| FitnessError::Json { path: path.to_path_buf(), source })?;
        std::fs::write(path, json).map_err(|source| FitnessError::Io { path: path.to_path_buf(), source })
    }

    /// reject combinations the driver cannot run
    pub fn validate(&self) -> Result<()> {
        if self.target.is_none() {
            return Err(FitnessError::Config("no target image given".into()));
        }
        if self.iterations == 0 {
            return Err(FitnessError::Config("iterations must be at least 1".into()));
        }
        if self.jobs == 0 {
            return Err(FitnessError::Config("jobs must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(FitnessError::Config("threads must be at least 1".into()));
        }
        if self.candidate == CandidateMode::Genome && self.genome.is_none() {
            return Err(FitnessError::Config("genome candidate needs a genome file".into()));
        }
        if !(self.psnr_peak > 0.0) {
            return Err(FitnessError::Config(format!("psnr_peak must be positive, got {}", self.psnr_peak)));
        }
        Ok(())
    }
}
