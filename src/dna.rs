use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::{FitnessError, Result};

/// a filled polygon with straight (un-premultiplied) color. also caches a T-S path
#[derive(Debug, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<(f32, f32)>,
    pub rgba: [f32; 4], // 0..1

    #[serde(skip)]
    pub cached_path: OnceLock<Option<Arc<tiny_skia::Path>>>,
}

// this way stale paths won't be copied if the polygon is cloned.
impl Clone for Polygon {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            rgba: self.rgba,
            cached_path: OnceLock::new(),
        }
    }
}

impl Polygon {
    pub fn new(points: Vec<(f32, f32)>, rgba: [f32; 4]) -> Self {
        Self { points, rgba, cached_path: OnceLock::new() }
    }

    /// axis-aligned bounds (min_x, min_y, max_x, max_y); None when there are no points
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        if self.points.is_empty() {
            return None;
        }
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for &(x, y) in &self.points {
            if x < min_x { min_x = x; }
            if y < min_y { min_y = y; }
            if x > max_x { max_x = x; }
            if y > max_y { max_y = y; }
        }
        Some((min_x, min_y, max_x, max_y))
    }
}

fn default_background() -> [f32; 4] {
    // white, as the classic evolver starts from
    [1.0, 1.0, 1.0, 1.0]
}

/// a fixed candidate image: polygons painted in order over a background.
/// nothing here mutates; a genome is only ever rasterized and scored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genome {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_background")]
    pub background: [f32; 4],
    #[serde(default)]
    pub polys: Vec<Polygon>,
}

impl Genome {
    pub fn new_blank(width: u32, height: u32) -> Self {
        profiling::scope!("Genome::new_blank");
        Self { width, height, background: default_background(), polys: Vec::new() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        profiling::scope!("Genome::load");
        let json = std::fs::read_to_string(path)
            .map_err(|source| FitnessError::Io { path: path.to_path_buf(), source })?;
        let genome: Genome = serde_json::from_str(&json)
            .map_err(|source| FitnessError::Json { path: path.to_path_buf(), source })?;
        log::debug!(
            "loaded genome {}: {}x{}, {} polygons",
            path.display(),
            genome.width,
            genome.height,
            genome.polys.len()
        );
        Ok(genome)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| FitnessError::Json { path: path.to_path_buf(), source })?;
        std::fs::write(path, json).map_err(|source| FitnessError::Io { path: path.to_path_buf(), source })
    }
}
