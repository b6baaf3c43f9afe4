use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use lms_fitness::bench;
use lms_fitness::settings::{BenchSettings, CandidateMode};

/// Time repeated LMS fitness evaluations against a target image.
#[derive(Parser, Debug)]
#[command(name = "fitness-bench", version, about)]
struct Args {
    /// target image (any format the image crate decodes)
    target: Option<PathBuf>,

    /// JSON settings file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short = 'n', long)]
    iterations: Option<u32>,

    #[arg(long, value_enum)]
    candidate: Option<CandidateMode>,

    /// polygon genome JSON, used with --candidate genome
    #[arg(long)]
    genome: Option<PathBuf>,

    /// size of the global rayon pool
    #[arg(long)]
    threads: Option<usize>,

    /// evaluations in flight at once
    #[arg(long)]
    jobs: Option<usize>,

    /// reduce each squared sum over rayon chunks
    #[arg(long, overrides_with = "no_parallel_sum")]
    parallel_sum: bool,

    /// force a single-pass sum even if the settings file enables --parallel-sum
    #[arg(long, overrides_with = "parallel_sum")]
    no_parallel_sum: bool,

    /// print the report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_settings(self) -> anyhow::Result<(BenchSettings, bool)> {
        let mut settings = match &self.config {
            Some(path) => BenchSettings::load(path).with_context(|| format!("loading settings {}", path.display()))?,
            None => BenchSettings::default(),
        };
        if let Some(target) = self.target {
            settings.target = Some(target);
        }
        if let Some(n) = self.iterations {
            settings.iterations = n;
        }
        if let Some(mode) = self.candidate {
            settings.candidate = mode;
        }
        if let Some(genome) = self.genome {
            settings.genome = Some(genome);
        }
        if let Some(threads) = self.threads {
            settings.threads = Some(threads);
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        if self.parallel_sum {
            settings.parallel_sum = true;
        } else if self.no_parallel_sum {
            settings.parallel_sum = false;
        }
        Ok((settings, self.json))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (settings, json) = Args::parse().into_settings()?;

    // configure Rayon's global thread pool once at startup so worker threads get nice names like "rayon-0".
    let mut pool = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("rayon-{i}"));
    if let Some(threads) = settings.threads {
        pool = pool.num_threads(threads);
    }
    if let Err(e) = pool.build_global() {
        log::warn!("rayon global pool already initialized: {e}");
    }

    let report = bench::run(&settings).context("fitness benchmark failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
