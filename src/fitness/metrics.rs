//─────────────────────────────────────────────────────────────────────────────
// resolution-invariant metrics (MSE, PSNR) derived from the LMS sum
//─────────────────────────────────────────────────────────────────────────────

/// channels that contribute to the distance (alpha is ignored)
pub const FITNESS_CHANNELS: u32 = 3;
pub const FITNESS_CHANNELS_F64: f64 = FITNESS_CHANNELS as f64;

/// default PSNR peak for 8-bit channels
pub const DEFAULT_PSNR_PEAK: f64 = 255.0;

/// PSNR (peak signal-to-noise ratio) in decibels.
/// - `mse`: mean squared error per channel
/// - `peak`: 255.0 for 8-bit images, 1.0 for normalized [0,1] range
/// mse is floored at 1e-12 so identical images give a large finite value.
#[inline]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    let mse = mse.max(1e-12);
    10.0 * ((peak * peak) / mse).log10()
}

/// snapshot of one evaluation: the raw distance plus metrics that stay
/// comparable across image sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// sqrt of the summed squared RGB differences
    pub distance: f64,
    /// squared error per compared channel
    pub mse: f64,
    pub psnr: f64,
    /// number of pixels actually compared (overlap of target and candidate)
    pub compared_pixels: usize,
}

impl MetricsSnapshot {
    #[inline]
    pub fn from_sum_squared(sum_sq: u64, compared_pixels: usize, psnr_peak: f64) -> Self {
        let sum = sum_sq as f64;
        let denom = compared_pixels as f64 * FITNESS_CHANNELS_F64;
        let mse = if denom > 0.0 { sum / denom } else { 0.0 };
        Self {
            distance: sum.sqrt(),
            mse,
            psnr: psnr_from_mse(mse, psnr_peak),
            compared_pixels,
        }
    }
}
