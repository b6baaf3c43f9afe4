use tiny_skia as sk;
use crate::dna::{Genome, Polygon};
use crate::pixels::{Raster, BYTES_PER_PIXEL};
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

// Global anti-aliasing setting (set once from BenchSettings)
static POLYGON_ANTIALIASING: AtomicBool = AtomicBool::new(true);

/// Update the polygon anti-aliasing setting
pub fn set_polygon_antialiasing(enabled: bool) {
    POLYGON_ANTIALIASING.store(enabled, Ordering::Relaxed);
}

pub fn polygon_antialiasing() -> bool {
    POLYGON_ANTIALIASING.load(Ordering::Relaxed)
}

pub struct CpuRenderer;

impl CpuRenderer {
    /// Full-frame render into a tiny-skia pixmap (premultiplied storage).
    /// None for a zero-sized genome, which tiny-skia cannot allocate.
    pub fn render_pixmap(genome: &Genome) -> Option<sk::Pixmap> {
        profiling::scope!("render_pixmap");
        let mut pix = sk::Pixmap::new(genome.width, genome.height)?;
        let [r, g, b, a] = genome.background.map(|c| c.clamp(0.0, 1.0));
        pix.fill(sk::Color::from_rgba(r, g, b, a).unwrap_or(sk::Color::WHITE));

        for poly in &genome.polys {
            draw_polygon(&mut pix, poly, sk::Transform::identity());
        }
        Some(pix)
    }

    /// Full-frame render to straight RGBA, the layout the evaluator compares.
    pub fn render_rgba(genome: &Genome) -> Vec<u8> {
        profiling::scope!("render_rgba");
        let mut out = vec![0u8; genome.pixel_count() * BYTES_PER_PIXEL];
        genome.rasterize(&mut out);
        out
    }
}

/// a genome rasterizes by painting its polygons, so it can be scored directly
impl Raster for Genome {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rasterize(&self, out: &mut [u8]) {
        profiling::scope!("Genome::rasterize");
        if let Some(pix) = CpuRenderer::render_pixmap(self) {
            pix.rasterize(out);
        }
    }
}

fn draw_polygon(pix: &mut sk::Pixmap, poly: &Polygon, transform: sk::Transform) {
    profiling::scope!("draw_polygon");
    let Some((min_x, min_y, max_x, max_y)) = poly.bounds() else {
        return;
    };

    // Quick reject: bbox fully outside the pixmap
    let (w, h) = (pix.width(), pix.height());
    if max_x < 0.0 || max_y < 0.0 || min_x >= w as f32 || min_y >= h as f32 {
        return; // fully off-screen: skip tiny-skia work
    }

    // degenerate outlines (fewer than 3 points, zero area) yield no path
    let path = poly.cached_path.get_or_init(|| {
        let mut pb = sk::PathBuilder::new();
        pb.move_to(poly.points[0].0, poly.points[0].1);
        for &(x, y) in &poly.points[1..] {
            pb.line_to(x, y);
        }
        pb.close();
        pb.finish().map(Arc::new)
    });
    let Some(path) = path else {
        return;
    };

    let [r, g, b, a] = poly.rgba.map(|c| c.clamp(0.0, 1.0));
    let Some(color) = sk::Color::from_rgba(r, g, b, a) else {
        return;
    };
    let mut paint = sk::Paint::default();
    paint.anti_alias = polygon_antialiasing();
    paint.shader = sk::Shader::SolidColor(color);

    pix.fill_path(path, &paint, sk::FillRule::Winding, transform, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::LmsFitness;
    use crate::pixels::PixelBuffer;

    #[test]
    fn test_blank_genome_is_background() {
        let g = Genome::new_blank(3, 2);
        let rgba = CpuRenderer::render_rgba(&g);
        assert_eq!(rgba.len(), 3 * 2 * 4);
        assert!(rgba.iter().all(|&b| b == 255));
    }

    #[test]
    fn test_full_cover_polygon() {
        let mut g = Genome::new_blank(4, 4);
        g.polys.push(Polygon::new(
            vec![(-1.0, -1.0), (5.0, -1.0), (5.0, 5.0), (-1.0, 5.0)],
            [0.0, 0.0, 1.0, 1.0],
        ));
        let buf = PixelBuffer::from_raster(&g);
        for i in 0..buf.len() {
            assert_eq!(buf.pixel(i), [0, 0, 255, 255]);
        }
    }

    #[test]
    fn test_offscreen_and_degenerate_polygons_skipped() {
        let mut g = Genome::new_blank(4, 4);
        g.polys.push(Polygon::new(vec![(10.0, 10.0), (12.0, 10.0), (11.0, 12.0)], [0.0, 0.0, 0.0, 1.0]));
        g.polys.push(Polygon::new(vec![(1.0, 1.0)], [0.0, 0.0, 0.0, 1.0]));
        g.polys.push(Polygon::new(vec![], [0.0, 0.0, 0.0, 1.0]));
        let f = LmsFitness::new(&Genome::new_blank(4, 4));
        assert_eq!(f.evaluate(&g), 0.0);
    }

    #[test]
    fn test_genome_scored_against_target() {
        // black target, white canvas: every pixel is off by 255 on each channel
        let target = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);
        let d = LmsFitness::new(&target).evaluate(&Genome::new_blank(2, 2));
        assert!((d - (4.0 * 3.0 * 255.0f64 * 255.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sized_genome() {
        assert!(CpuRenderer::render_pixmap(&Genome::new_blank(0, 3)).is_none());
        assert!(CpuRenderer::render_rgba(&Genome::new_blank(0, 3)).is_empty());
    }
}
