//! The timing driver: decode the target once, build one evaluator, then score
//! the chosen candidate a fixed number of times and discard the results.
use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use std::hint::black_box;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::dna::Genome;
use crate::error::{FitnessError, Result};
use crate::fitness::{LmsFitness, MetricsSnapshot};
use crate::pixels::{Blank, Raster};
use crate::settings::{BenchSettings, CandidateMode};

/// decode an image file fully; the evaluator never sees a partial image
pub fn load_target(path: &Path) -> Result<DynamicImage> {
    profiling::scope!("load_target");
    let img = image::open(path).map_err(|source| FitnessError::Decode { path: path.to_path_buf(), source })?;
    log::debug!("decoded {} ({}x{}, {:?})", path.display(), img.width(), img.height(), img.color());
    Ok(img)
}

/// the image scored on every iteration
pub enum Candidate<'a> {
    Image(&'a DynamicImage),
    Blank(Blank),
    Genome(Genome),
}

impl<'a> Candidate<'a> {
    pub fn from_settings(settings: &BenchSettings, target: &'a DynamicImage) -> Result<Self> {
        Ok(match settings.candidate {
            CandidateMode::Same => Candidate::Image(target),
            CandidateMode::Blank => Candidate::Blank(Blank::new(target.width(), target.height())),
            CandidateMode::Genome => {
                let path = settings
                    .genome
                    .as_deref()
                    .ok_or_else(|| FitnessError::Config("genome candidate needs a genome file".into()))?;
                let genome = Genome::load(path)?;
                if (genome.width, genome.height) != (target.width(), target.height()) {
                    log::warn!(
                        "genome is {}x{} but target is {}x{}; only the overlapping pixels are compared",
                        genome.width,
                        genome.height,
                        target.width(),
                        target.height()
                    );
                }
                Candidate::Genome(genome)
            }
        })
    }
}

impl Raster for Candidate<'_> {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            Candidate::Image(img) => Raster::dimensions(*img),
            Candidate::Blank(b) => b.dimensions(),
            Candidate::Genome(g) => g.dimensions(),
        }
    }

    fn rasterize(&self, out: &mut [u8]) {
        match self {
            Candidate::Image(img) => img.rasterize(out),
            Candidate::Blank(b) => b.rasterize(out),
            Candidate::Genome(g) => g.rasterize(out),
        }
    }
}

/// summary of one benchmark run
#[derive(Clone, Debug, Serialize)]
pub struct BenchReport {
    pub target: String,
    pub width: u32,
    pub height: u32,
    pub candidate: CandidateMode,
    pub iterations: u32,
    pub jobs: usize,
    pub parallel_sum: bool,
    pub threads: usize,
    pub total_secs: f64,
    pub mean_micros: f64,
    pub evals_per_sec: f64,
    /// metrics of a single evaluation, taken after the timed loop
    pub metrics: MetricsSnapshot,
}

/// wall time of a timed loop and the size of the pool it ran on
#[derive(Clone, Copy, Debug)]
pub struct LoopTiming {
    pub elapsed: Duration,
    /// rayon threads available to the loop; the global pool when jobs <= 1
    pub threads: usize,
}

/// evaluate `candidate` `iterations` times, `jobs` at a time, and return the wall time.
/// results are only passed through black_box.
pub fn run_loop<R: Raster + Sync>(fitness: &LmsFitness, candidate: &R, iterations: u32, jobs: usize) -> Result<LoopTiming> {
    profiling::scope!("run_loop");
    if jobs <= 1 {
        let start = Instant::now();
        for _ in 0..iterations {
            black_box(fitness.evaluate(black_box(candidate)));
        }
        return Ok(LoopTiming { elapsed: start.elapsed(), threads: rayon::current_num_threads() });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("bench-{i}"))
        .build()?;
    let start = Instant::now();
    pool.install(|| {
        (0..iterations).into_par_iter().for_each(|_| {
            black_box(fitness.evaluate(black_box(candidate)));
        })
    });
    Ok(LoopTiming { elapsed: start.elapsed(), threads: pool.current_num_threads() })
}

pub fn run(settings: &BenchSettings) -> Result<BenchReport> {
    profiling::scope!("bench::run");
    settings.validate()?;
    crate::render::set_polygon_antialiasing(settings.polygon_antialiasing);

    let target_path = settings
        .target
        .as_deref()
        .ok_or_else(|| FitnessError::Config("no target image given".into()))?;
    let target = load_target(target_path)?;
    let fitness = LmsFitness::new(&target)
        .with_parallel(settings.parallel_sum)
        .with_psnr_peak(settings.psnr_peak);
    let candidate = Candidate::from_settings(settings, &target)?;

    log::info!(
        "scoring {:?} candidate against {} ({}x{}) {} times, {} job(s)",
        settings.candidate,
        target_path.display(),
        target.width(),
        target.height(),
        settings.iterations,
        settings.jobs
    );

    let timing = run_loop(&fitness, &candidate, settings.iterations, settings.jobs)?;
    let metrics = fitness.evaluate_metrics(&candidate);

    let total_secs = timing.elapsed.as_secs_f64();
    let n = settings.iterations as f64;
    let report = BenchReport {
        target: target_path.display().to_string(),
        width: target.width(),
        height: target.height(),
        candidate: settings.candidate,
        iterations: settings.iterations,
        jobs: settings.jobs,
        parallel_sum: settings.parallel_sum,
        threads: timing.threads,
        total_secs,
        mean_micros: total_secs * 1e6 / n,
        evals_per_sec: if total_secs > 0.0 { n / total_secs } else { f64::INFINITY },
        metrics,
    };

    log::info!(
        "{} evaluations in {:.3}s ({:.1} us/eval, {:.0} evals/s), distance {:.2}, psnr {:.2} dB",
        report.iterations,
        report.total_secs,
        report.mean_micros,
        report.evals_per_sec,
        report.metrics.distance,
        report.metrics.psnr
    );
    Ok(report)
}
