//! Row-major RGBA8 pixel buffers and the `Raster` trait used to fill them.
//!
//! Everything the evaluator compares goes through `Raster::rasterize`, so a
//! decoded image, a tiny-skia pixmap and a polygon genome are interchangeable
//! as targets or candidates.
use image::{DynamicImage, GenericImageView, RgbaImage};
use tiny_skia as sk;

use crate::error::{FitnessError, Result};

/// bytes per pixel (straight RGBA8)
pub const BYTES_PER_PIXEL: usize = 4;

#[inline]
pub fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// width of a one-row image holding `len` pixels
#[inline]
fn row_width(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FitnessError::RowTooWide(len))
}

/// anything that can write itself as straight (un-premultiplied) RGBA8, row-major.
pub trait Raster {
    fn dimensions(&self) -> (u32, u32);

    /// fill `out` with `width * height * 4` bytes of straight RGBA8.
    /// callers always pass a buffer of exactly that length.
    fn rasterize(&self, out: &mut [u8]);

    #[inline]
    fn pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        pixel_count(w, h)
    }
}

impl<T: Raster + ?Sized> Raster for &T {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn rasterize(&self, out: &mut [u8]) {
        (**self).rasterize(out)
    }
}

/// owned RGBA8 pixel buffer. length is fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    /// sample every pixel of `src` into a fresh buffer
    pub fn from_raster<R: Raster + ?Sized>(src: &R) -> Self {
        profiling::scope!("PixelBuffer::from_raster");
        let (width, height) = src.dimensions();
        let mut rgba = vec![0u8; pixel_count(width, height) * BYTES_PER_PIXEL];
        src.rasterize(&mut rgba);
        Self { width, height, rgba }
    }

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = pixel_count(width, height) * BYTES_PER_PIXEL;
        if rgba.len() != expected {
            return Err(FitnessError::BufferShape { expected, actual: rgba.len() });
        }
        Ok(Self { width, height, rgba })
    }

    /// a single row of pixels (width = pixels.len(), height = 1)
    pub fn from_pixels(pixels: &[[u8; 4]]) -> Result<Self> {
        Ok(Self {
            width: row_width(pixels.len())?,
            height: 1,
            rgba: pixels.iter().flatten().copied().collect(),
        })
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = pixel_count(width, height);
        let mut buf = Vec::with_capacity(n * BYTES_PER_PIXEL);
        for _ in 0..n {
            buf.extend_from_slice(&rgba);
        }
        Self { width, height, rgba: buf }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// number of pixels (not bytes)
    #[inline]
    pub fn len(&self) -> usize {
        self.rgba.len() / BYTES_PER_PIXEL
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rgba.is_empty()
    }

    #[inline]
    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// pixel `i` in row-major order
    #[inline]
    pub fn pixel(&self, i: usize) -> [u8; 4] {
        let o = i * BYTES_PER_PIXEL;
        [self.rgba[o], self.rgba[o + 1], self.rgba[o + 2], self.rgba[o + 3]]
    }

    pub fn set_pixel(&mut self, i: usize, rgba: [u8; 4]) {
        let o = i * BYTES_PER_PIXEL;
        self.rgba[o..o + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.rgba
    }
}

impl Raster for PixelBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rasterize(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.rgba);
    }
}

impl Raster for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rasterize(&self, out: &mut [u8]) {
        profiling::scope!("RgbaImage::rasterize");
        out.copy_from_slice(self.as_raw());
    }
}

impl Raster for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn rasterize(&self, out: &mut [u8]) {
        profiling::scope!("DynamicImage::rasterize");
        if let DynamicImage::ImageRgba8(buf) = self {
            out.copy_from_slice(buf.as_raw());
            return;
        }
        // pixels() walks row-major and converts each sample to Rgba<u8>
        for ((_, _, px), dst) in self.pixels().zip(out.chunks_exact_mut(BYTES_PER_PIXEL)) {
            dst.copy_from_slice(&px.0);
        }
    }
}

/// tiny-skia stores premultiplied colors; demultiply on the way out
impl Raster for sk::Pixmap {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rasterize(&self, out: &mut [u8]) {
        profiling::scope!("Pixmap::rasterize");
        for (px, dst) in self.pixels().iter().zip(out.chunks_exact_mut(BYTES_PER_PIXEL)) {
            let c = px.demultiply();
            dst[0] = c.red();
            dst[1] = c.green();
            dst[2] = c.blue();
            dst[3] = c.alpha();
        }
    }
}

/// fully transparent black canvas of a given size.
/// scoring against this is what a freshly allocated ARGB image yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blank {
    pub width: u32,
    pub height: u32,
}

impl Blank {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Raster for Blank {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rasterize(&self, out: &mut [u8]) {
        out.fill(0);
    }
}
