// Fitness module organization
// lms holds the evaluator, metrics turns its raw sum into comparable numbers

pub mod lms;
pub mod metrics;

// Re-export commonly used types and functions
pub use lms::{sum_squared_rgb, sum_squared_rgb_parallel, LmsFitness};
pub use metrics::{psnr_from_mse, MetricsSnapshot, DEFAULT_PSNR_PEAK};
