/// Least-mean-square fitness: root of the summed squared RGB differences
/// between a fixed target and a rasterized candidate.
/// Alpha is carried in the buffers but never contributes to the distance.
use rayon::prelude::*;

use super::metrics::{MetricsSnapshot, DEFAULT_PSNR_PEAK};
use crate::pixels::{PixelBuffer, Raster, BYTES_PER_PIXEL};

/// minimum pixels per rayon task for the parallel reduction
const MIN_CHUNK_PIXELS: usize = 64 * 1024;

#[inline(always)]
fn squared_rgb(t: &[u8], c: &[u8]) -> u64 {
    let r = t[0] as i32 - c[0] as i32;
    let g = t[1] as i32 - c[1] as i32;
    let b = t[2] as i32 - c[2] as i32;
    // max 3 * 255^2, fits i32 comfortably
    (r * r + g * g + b * b) as u64
}

/// sum of squared RGB differences over the overlapping pixels of two RGBA buffers.
/// the longer buffer's trailing pixels are ignored, as is any partial pixel.
#[inline]
pub fn sum_squared_rgb(target_rgba: &[u8], candidate_rgba: &[u8]) -> u64 {
    target_rgba
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(candidate_rgba.chunks_exact(BYTES_PER_PIXEL))
        .map(|(t, c)| squared_rgb(t, c))
        .sum()
}

/// same sum as `sum_squared_rgb`, reduced over rayon chunks.
/// integer accumulation makes the result identical to the sequential path.
pub fn sum_squared_rgb_parallel(target_rgba: &[u8], candidate_rgba: &[u8]) -> u64 {
    profiling::scope!("sum_squared_rgb_parallel");
    let overlap = overlap_pixels(target_rgba.len(), candidate_rgba.len()) * BYTES_PER_PIXEL;
    if overlap == 0 {
        return 0;
    }

    // split evenly across cores, but never below MIN_CHUNK_PIXELS per task
    let num_cores = rayon::current_num_threads().max(1);
    let ideal_pixels = overlap / BYTES_PER_PIXEL / num_cores;
    let chunk_bytes = ideal_pixels.max(MIN_CHUNK_PIXELS) * BYTES_PER_PIXEL;

    target_rgba[..overlap]
        .par_chunks(chunk_bytes)
        .zip(candidate_rgba[..overlap].par_chunks(chunk_bytes))
        .map(|(t, c)| sum_squared_rgb(t, c))
        .sum()
}

#[inline]
fn overlap_pixels(target_bytes: usize, candidate_bytes: usize) -> usize {
    target_bytes.min(candidate_bytes) / BYTES_PER_PIXEL
}

/// fitness evaluator holding an immutable target buffer.
/// `Send + Sync`: one instance can be shared by every worker of a run.
#[derive(Clone, Debug)]
pub struct LmsFitness {
    target: PixelBuffer,
    parallel: bool,
    psnr_peak: f64,
}

impl LmsFitness {
    /// capture the target's pixels once; they never change afterwards
    pub fn new<R: Raster + ?Sized>(target: &R) -> Self {
        profiling::scope!("LmsFitness::new");
        Self::from_buffer(PixelBuffer::from_raster(target))
    }

    pub fn from_buffer(target: PixelBuffer) -> Self {
        log::debug!(
            "fitness target captured: {}x{} ({} px)",
            target.width(),
            target.height(),
            target.len()
        );
        Self { target, parallel: false, psnr_peak: DEFAULT_PSNR_PEAK }
    }

    /// reduce the squared sum with rayon instead of a single pass
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_psnr_peak(mut self, peak: f64) -> Self {
        self.psnr_peak = peak;
        self
    }

    #[inline]
    pub fn target(&self) -> &PixelBuffer {
        &self.target
    }

    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// rasterize `candidate` into a fresh buffer and return its distance to the target.
    /// 0.0 only when every overlapping pixel matches on R, G and B.
    #[inline]
    pub fn evaluate<R: Raster + ?Sized>(&self, candidate: &R) -> f64 {
        profiling::scope!("LmsFitness::evaluate");
        (self.sum_squared(candidate) as f64).sqrt()
    }

    /// the raw accumulated sum behind `evaluate`
    pub fn sum_squared<R: Raster + ?Sized>(&self, candidate: &R) -> u64 {
        let generated = PixelBuffer::from_raster(candidate);
        self.sum_squared_rgba(generated.as_rgba())
    }

    /// score an already rasterized straight-RGBA buffer
    #[inline]
    pub fn evaluate_rgba(&self, candidate_rgba: &[u8]) -> f64 {
        (self.sum_squared_rgba(candidate_rgba) as f64).sqrt()
    }

    fn sum_squared_rgba(&self, candidate_rgba: &[u8]) -> u64 {
        if self.parallel {
            sum_squared_rgb_parallel(self.target.as_rgba(), candidate_rgba)
        } else {
            sum_squared_rgb(self.target.as_rgba(), candidate_rgba)
        }
    }

    /// distance plus MSE/PSNR over the compared region
    pub fn evaluate_metrics<R: Raster + ?Sized>(&self, candidate: &R) -> MetricsSnapshot {
        profiling::scope!("LmsFitness::evaluate_metrics");
        let generated = PixelBuffer::from_raster(candidate);
        let sum = self.sum_squared_rgba(generated.as_rgba());
        let compared = self.target.len().min(generated.len());
        MetricsSnapshot::from_sum_squared(sum, compared, self.psnr_peak)
    }

    /// score many candidates concurrently; results keep input order
    pub fn evaluate_batch<R: Raster + Sync>(&self, candidates: &[R]) -> Vec<f64> {
        profiling::scope!("LmsFitness::evaluate_batch");
        candidates.par_iter().map(|c| self.evaluate(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::Blank;

    fn px(pixels: &[[u8; 4]]) -> PixelBuffer {
        PixelBuffer::from_pixels(pixels).unwrap()
    }

    #[test]
    fn test_self_distance_is_zero() {
        let img = px(&[[10, 20, 30, 255]]);
        assert_eq!(LmsFitness::new(&img).evaluate(&img), 0.0);
    }

    #[test]
    fn test_black_vs_white() {
        let f = LmsFitness::new(&px(&[[0, 0, 0, 255]]));
        let d = f.evaluate(&px(&[[255, 255, 255, 255]]));
        assert!((d - 255.0 * 3f64.sqrt()).abs() < 1e-9);
        assert!((d - 441.67).abs() < 0.01);
    }

    #[test]
    fn test_two_pixel_scenario() {
        let f = LmsFitness::new(&px(&[[0, 0, 0, 255], [10, 10, 10, 255]]));
        let d = f.evaluate(&px(&[[0, 0, 0, 255], [0, 0, 0, 255]]));
        assert!((d - 300f64.sqrt()).abs() < 1e-9);
        assert!((d - 17.32).abs() < 0.01);
    }

    #[test]
    fn test_symmetric() {
        let a = px(&[[1, 200, 3, 255], [90, 0, 255, 10]]);
        let b = px(&[[250, 2, 30, 0], [0, 128, 64, 255]]);
        let ab = LmsFitness::new(&a).evaluate(&b);
        let ba = LmsFitness::new(&b).evaluate(&a);
        assert_eq!(ab, ba);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_alpha_ignored() {
        let f = LmsFitness::new(&px(&[[5, 6, 7, 255]]));
        assert_eq!(f.evaluate(&px(&[[5, 6, 7, 0]])), 0.0);
    }

    #[test]
    fn test_truncates_to_shorter_candidate() {
        let target = px(&[[10, 0, 0, 255], [0, 20, 0, 255], [0, 0, 250, 255]]);
        let candidate = px(&[[0, 0, 0, 255], [0, 0, 0, 255]]);
        let full = LmsFitness::new(&target).evaluate(&candidate);
        let prefix = LmsFitness::new(&px(&[[10, 0, 0, 255], [0, 20, 0, 255]])).evaluate(&candidate);
        assert_eq!(full, prefix);
        assert!((full - 500f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_truncates_to_shorter_target() {
        let f = LmsFitness::new(&px(&[[3, 4, 0, 255]]));
        let d = f.evaluate(&px(&[[0, 0, 0, 255], [255, 255, 255, 255]]));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_monotonic_in_channel_difference() {
        let f = LmsFitness::new(&px(&[[100, 100, 100, 255], [50, 50, 50, 255]]));
        for channel in 0..3 {
            // push the channel away from the target in both directions
            for (start, end) in [(101u8, 255u8), (0, 99)] {
                let mut last = f.evaluate(&px(&[[100, 100, 100, 255], [50, 50, 50, 255]]));
                let values: Vec<u8> = if start > 100 {
                    (start..=end).collect()
                } else {
                    (start..=end).rev().collect()
                };
                for v in values {
                    let mut cand = [100, 100, 100, 255];
                    cand[channel] = v;
                    let d = f.evaluate(&px(&[cand, [50, 50, 50, 255]]));
                    assert!(d > last, "channel {channel}, value {v}: {d} <= {last}");
                    last = d;
                }
            }
        }
    }

    #[test]
    fn test_non_negative_for_varied_inputs() {
        let mut target = PixelBuffer::filled(16, 16, [0, 0, 0, 255]);
        let mut candidate = PixelBuffer::filled(16, 16, [0, 0, 0, 255]);
        for i in 0..target.len() {
            let v = (i * 37 % 256) as u8;
            target.set_pixel(i, [v, 255 - v, v / 3, (i % 256) as u8]);
            candidate.set_pixel(i, [v.wrapping_mul(7), v / 2, 255 - v, 0]);
        }
        let f = LmsFitness::new(&target);
        for n in [0usize, 1, 17, 128, 256] {
            let rgba = &candidate.as_rgba()[..n * 4];
            let d = f.evaluate_rgba(rgba);
            assert!(d >= 0.0 && d.is_finite(), "prefix {n}: {d}");
        }
        assert!(f.evaluate(&candidate) >= 0.0);
        assert!(f.evaluate(&Blank::new(16, 16)) >= 0.0);
    }

    #[test]
    fn test_blank_candidate_matches_target_energy() {
        let target = PixelBuffer::filled(4, 4, [1, 2, 2, 255]);
        let d = LmsFitness::new(&target).evaluate(&Blank::new(4, 4));
        // 16 pixels * (1 + 4 + 4)
        assert!((d - 144f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_candidate() {
        let f = LmsFitness::new(&PixelBuffer::filled(3, 3, [9, 9, 9, 255]));
        assert_eq!(f.evaluate(&Blank::new(0, 0)), 0.0);
    }

    #[test]
    fn test_evaluate_rgba_ignores_partial_pixel() {
        let f = LmsFitness::new(&px(&[[0, 0, 0, 255], [0, 0, 0, 255]]));
        assert_eq!(f.evaluate_rgba(&[3, 4, 0, 255, 99, 99]), 5.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        // large enough to split into several chunks
        let w = 600u32;
        let h = 500u32;
        let mut target = PixelBuffer::filled(w, h, [0, 0, 0, 255]);
        let mut candidate = PixelBuffer::filled(w, h, [0, 0, 0, 255]);
        for i in 0..target.len() {
            let v = (i % 251) as u8;
            target.set_pixel(i, [v, v.wrapping_mul(3), 255 - v, 255]);
            candidate.set_pixel(i, [v.wrapping_add(17), v, v / 2, 255]);
        }
        let seq = sum_squared_rgb(target.as_rgba(), candidate.as_rgba());
        let par = sum_squared_rgb_parallel(target.as_rgba(), candidate.as_rgba());
        assert_eq!(seq, par);

        let f = LmsFitness::new(&target);
        let fp = f.clone().with_parallel(true);
        assert_eq!(f.evaluate(&candidate), fp.evaluate(&candidate));
    }

    #[test]
    fn test_no_overflow_on_large_image() {
        // 1024 x 1024 worst case already needs more than 32 bits
        let a = vec![0u8; 1024 * 1024 * 4];
        let mut b = vec![255u8; 1024 * 1024 * 4];
        for alpha in b.iter_mut().skip(3).step_by(4) {
            *alpha = 0;
        }
        let sum = sum_squared_rgb_parallel(&a, &b);
        assert_eq!(sum, 1024u64 * 1024 * 3 * 255 * 255);
        assert!(sum > u32::MAX as u64);
    }

    #[test]
    fn test_batch_preserves_order() {
        let f = LmsFitness::new(&px(&[[0, 0, 0, 255]]));
        let cands = vec![px(&[[3, 4, 0, 255]]), px(&[[0, 0, 0, 255]]), px(&[[6, 8, 0, 255]])];
        assert_eq!(f.evaluate_batch(&cands), vec![5.0, 0.0, 10.0]);
    }

    #[test]
    fn test_metrics_snapshot() {
        let f = LmsFitness::new(&px(&[[0, 0, 0, 255], [10, 10, 10, 255], [1, 1, 1, 255]]));
        let m = f.evaluate_metrics(&px(&[[0, 0, 0, 255], [0, 0, 0, 255]]));
        assert_eq!(m.compared_pixels, 2);
        assert!((m.distance - 300f64.sqrt()).abs() < 1e-9);
        assert!((m.mse - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_across_threads() {
        let target = PixelBuffer::filled(8, 8, [40, 80, 120, 255]);
        let f = std::sync::Arc::new(LmsFitness::new(&target));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let f = f.clone();
                let cand = target.clone();
                std::thread::spawn(move || f.evaluate(&cand))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 0.0);
        }
    }
}
