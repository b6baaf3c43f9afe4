use std::path::PathBuf;
use thiserror::Error;

/// errors surfaced by the fitness library.
/// the evaluator itself never fails; these come from loading inputs around it.
#[derive(Error, Debug)]
pub enum FitnessError {
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("rgba buffer has {actual} bytes, expected {expected}")]
    BufferShape { expected: usize, actual: usize },
    #[error("{0} pixels do not fit in a single row")]
    RowTooWide(usize),
    #[error("invalid settings: {0}")]
    Config(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, FitnessError>;
