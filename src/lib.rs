//! Least-mean-square image fitness: score candidate images against a fixed
//! target and measure how fast that scoring runs.

pub mod bench;
pub mod dna;
pub mod error;
pub mod fitness;
pub mod pixels;
pub mod render;
pub mod settings;

pub use error::{FitnessError, Result};
pub use fitness::LmsFitness;
pub use pixels::{Blank, PixelBuffer, Raster};
