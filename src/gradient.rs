//! Procedural gradient rasterizer.
//!
//! Each gradient kind maps a pixel coordinate to a byte-valued position
//! along the gradient ("byte lerp"). A 256-entry cache of interpolated
//! colors and alphas keyed by that byte makes the per-pixel work a table
//! lookup plus one of four write strategies selected by the
//! `(alpha_only, alpha_blending)` flags.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blend::{BlendMode, BlendOp};
use crate::color::{Bgra, mul_un8};
use crate::geom::{PointF, RectI};
use crate::surface::Surface;

/// Shape of the gradient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientKind {
    #[default]
    LinearClamped,
    LinearReflected,
    Diamond,
    Radial,
    Conical,
}

impl GradientKind {
    pub fn all() -> &'static [GradientKind] {
        &[
            GradientKind::LinearClamped,
            GradientKind::LinearReflected,
            GradientKind::Diamond,
            GradientKind::Radial,
            GradientKind::Conical,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GradientKind::LinearClamped => "Linear",
            GradientKind::LinearReflected => "Linear (Reflected)",
            GradientKind::Diamond => "Diamond",
            GradientKind::Radial => "Radial",
            GradientKind::Conical => "Conical",
        }
    }
}

/// Renders one gradient configuration into a surface.
///
/// Call [`before_render`](GradientRenderer::before_render) once per pass to
/// (re)build the lerp cache and per-kind coefficients, then
/// [`render`](GradientRenderer::render) over the regions of interest.
/// Renderers are per-operation values; nothing persists across operations.
pub struct GradientRenderer {
    kind: GradientKind,
    start: PointF,
    end: PointF,
    start_color: Bgra,
    end_color: Bgra,
    alpha_only: bool,
    alpha_blending: bool,
    blend_op: BlendOp,

    // Lazily rebuilt state, valid after before_render.
    cache_valid: bool,
    lerp_colors: [Bgra; 256],
    lerp_alphas: [u8; 256],
    dtdx: f32,
    dtdy: f32,
    start_xi: i32,
    start_yi: i32,
    inv_distance: f32,
    angle_offset: f32,
}

impl GradientRenderer {
    pub fn new(kind: GradientKind, alpha_only: bool) -> Self {
        Self {
            kind,
            start: PointF::new(0.0, 0.0),
            end: PointF::new(0.0, 0.0),
            start_color: Bgra::ZERO,
            end_color: Bgra::ZERO,
            alpha_only,
            alpha_blending: true,
            blend_op: BlendOp::new(BlendMode::Normal),
            cache_valid: false,
            lerp_colors: [Bgra::ZERO; 256],
            lerp_alphas: [0; 256],
            dtdx: 0.0,
            dtdy: 0.0,
            start_xi: 0,
            start_yi: 0,
            inv_distance: 0.0,
            angle_offset: 0.0,
        }
    }

    pub fn start_color(&self) -> Bgra {
        self.start_color
    }

    pub fn set_start_color(&mut self, color: Bgra) {
        if self.start_color != color {
            self.start_color = color;
            self.cache_valid = false;
        }
    }

    pub fn end_color(&self) -> Bgra {
        self.end_color
    }

    pub fn set_end_color(&mut self, color: Bgra) {
        if self.end_color != color {
            self.end_color = color;
            self.cache_valid = false;
        }
    }

    pub fn set_start_point(&mut self, point: PointF) {
        self.start = point;
    }

    pub fn set_end_point(&mut self, point: PointF) {
        self.end = point;
    }

    pub fn set_alpha_blending(&mut self, alpha_blending: bool) {
        self.alpha_blending = alpha_blending;
    }

    /// Operator used when compositing interpolated colors onto existing
    /// pixels (branch 3 below). Normal by default.
    pub fn set_blend_op(&mut self, blend_op: BlendOp) {
        self.blend_op = blend_op;
    }

    fn alpha_endpoints(&self) -> (u8, u8) {
        if self.alpha_only {
            (self.start_color.a, 255 - self.end_color.a)
        } else {
            (self.start_color.a, self.end_color.a)
        }
    }

    /// Recomputes the per-kind coefficients and, when the colors changed
    /// since the last pass, the 256-entry lerp cache. Idempotent; call once
    /// before each render pass.
    pub fn before_render(&mut self) {
        let vec_x = self.end.x - self.start.x;
        let vec_y = self.end.y - self.start.y;
        let mag = self.start.distance(self.end);

        self.dtdx = if vec_x == 0.0 { 0.0 } else { vec_x / (mag * mag) };
        self.dtdy = if vec_y == 0.0 { 0.0 } else { vec_y / (mag * mag) };
        self.start_xi = self.start.x as i32;
        self.start_yi = self.start.y as i32;
        self.inv_distance = if mag == 0.0 { 0.0 } else { 1.0 / mag };
        self.angle_offset = -(vec_y.atan2(vec_x) / std::f32::consts::PI);

        if !self.cache_valid {
            let (start_alpha, end_alpha) = self.alpha_endpoints();
            for i in 0..256 {
                self.lerp_colors[i] =
                    Bgra::blend_weighted(self.start_color, self.end_color, i as u8);
                self.lerp_alphas[i] = (start_alpha as i32
                    + (end_alpha as i32 - start_alpha as i32) * i as i32 / 255)
                    as u8;
            }
            self.cache_valid = true;
        }
    }

    /// Normalized position of `(x, y)` along the gradient as a byte.
    pub fn compute_byte_lerp(&self, x: i32, y: i32) -> u8 {
        match self.kind {
            GradientKind::LinearClamped => {
                let t = self.project(x, y);
                (t.clamp(0.0, 1.0) * 255.0) as u8
            }
            GradientKind::LinearReflected => {
                let t = self.project(x, y);
                (t.abs().clamp(0.0, 1.0) * 255.0) as u8
            }
            GradientKind::Diamond => {
                let dx = x as f32 - self.start.x;
                let dy = y as f32 - self.start.y;
                let along = dx * self.dtdx + dy * self.dtdy;
                let across = dx * self.dtdy - dy * self.dtdx;
                ((along.abs() + across.abs()).clamp(0.0, 1.0) * 255.0) as u8
            }
            GradientKind::Radial => {
                let dx = (x - self.start_xi) as f32;
                let dy = (y - self.start_yi) as f32;
                let result = (dx * dx + dy * dy).sqrt() * self.inv_distance;
                if result > 1.0 {
                    255
                } else {
                    (result * 255.0) as u8
                }
            }
            GradientKind::Conical => {
                let dx = x as f32 - self.start.x;
                let dy = y as f32 - self.start.y;
                let t = dy.atan2(dx) / std::f32::consts::PI + self.angle_offset;
                // atan2 wraps, so the offset can push t out of [-1, 1];
                // fold back before taking the distance from angle zero.
                let folded = if t > 1.0 {
                    t - 2.0
                } else if t < -1.0 {
                    t + 2.0
                } else {
                    t
                };
                (folded.abs().clamp(0.0, 1.0) * 255.0) as u8
            }
        }
    }

    #[inline]
    fn project(&self, x: i32, y: i32) -> f32 {
        let dx = x - self.start_xi;
        let dy = y - self.start_yi;
        dx as f32 * self.dtdx + dy as f32 * self.dtdy
    }

    /// Renders the gradient into every region of interest.
    ///
    /// `before_render` must have been called since the last configuration
    /// change. ROIs must lie inside the surface; rows within each ROI are
    /// processed in parallel.
    pub fn render(&self, surface: &mut Surface, rois: &[RectI]) {
        assert!(self.cache_valid, "before_render must run before render");
        debug!(
            kind = self.kind.name(),
            rois = rois.len(),
            alpha_only = self.alpha_only,
            alpha_blending = self.alpha_blending,
            "gradient render"
        );

        let (start_alpha, end_alpha) = self.alpha_endpoints();
        // Coincident start and end degenerate to a solid fill with the end
        // color, which is exactly the lerp table at byte 255.
        let solid = self.start == self.end;
        let width = surface.width() as usize;
        let bounds = surface.bounds();

        for roi in rois {
            if roi.is_empty() {
                continue;
            }
            assert!(
                bounds.contains(roi.left(), roi.top())
                    && bounds.contains(roi.right(), roi.bottom()),
                "roi {roi:?} outside surface bounds {bounds:?}"
            );

            surface
                .pixels_mut()
                .par_chunks_mut(width)
                .enumerate()
                .skip(roi.top() as usize)
                .take(roi.height as usize)
                .for_each(|(y, row)| {
                    self.process_row(start_alpha, end_alpha, solid, y as i32, roi, row);
                });
        }
    }

    /// One row of the render pass. Exactly one of the four write strategies
    /// runs for the whole row; the branch selection is part of the render
    /// contract, not an optimization.
    fn process_row(
        &self,
        start_alpha: u8,
        end_alpha: u8,
        solid: bool,
        y: i32,
        rect: &RectI,
        row: &mut [Bgra],
    ) {
        let left = rect.left() as usize;
        let right = rect.right() as usize;

        let lerp_byte = |x: usize| -> usize {
            if solid {
                255
            } else {
                self.compute_byte_lerp(x as i32, y) as usize
            }
        };

        if self.alpha_only && self.alpha_blending {
            // 1. Scale the existing pixel (all four channels, keeping the
            //    premultiplied invariant) by the interpolated alpha.
            for (x, pixel) in row.iter_mut().enumerate().take(right + 1).skip(left) {
                let lerp_alpha = self.lerp_alphas[lerp_byte(x)] as u32;
                *pixel = Bgra::from_bgra(
                    mul_un8(pixel.b as u32, lerp_alpha) as u8,
                    mul_un8(pixel.g as u32, lerp_alpha) as u8,
                    mul_un8(pixel.r as u32, lerp_alpha) as u8,
                    mul_un8(pixel.a as u32, lerp_alpha) as u8,
                );
            }
        } else if self.alpha_only && !self.alpha_blending {
            // 2. Replace only the alpha channel, keeping the color: round
            //    trip through straight alpha so the color bytes survive.
            for (x, pixel) in row.iter_mut().enumerate().take(right + 1).skip(left) {
                let lerp_alpha = self.lerp_alphas[lerp_byte(x)];
                let straight = pixel.to_straight().new_alpha(lerp_alpha);
                *pixel = straight.to_premultiplied();
            }
        } else if self.alpha_blending && (start_alpha != 255 || end_alpha != 255) {
            // 3. Interpolated alphas are not all opaque: composite the
            //    interpolated color onto the existing pixel.
            for (x, pixel) in row.iter_mut().enumerate().take(right + 1).skip(left) {
                let color = self.lerp_colors[lerp_byte(x)];
                *pixel = self.blend_op.apply(*pixel, color);
            }
        } else {
            // 4. No blending needed: overwrite outright.
            for (x, pixel) in row.iter_mut().enumerate().take(right + 1).skip(left) {
                *pixel = self.lerp_colors[lerp_byte(x)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(kind: GradientKind, start: (f32, f32), end: (f32, f32)) -> GradientRenderer {
        let mut r = GradientRenderer::new(kind, false);
        r.set_start_point(PointF::new(start.0, start.1));
        r.set_end_point(PointF::new(end.0, end.1));
        r.set_start_color(Bgra::BLACK);
        r.set_end_color(Bgra::WHITE);
        r.before_render();
        r
    }

    #[test]
    fn linear_clamped_is_monotonic_along_axis() {
        let r = renderer(GradientKind::LinearClamped, (0.0, 0.0), (10.0, 0.0));
        let mut last = 0u8;
        for x in -3..15 {
            let lerp = r.compute_byte_lerp(x, 0);
            assert!(lerp >= last, "x={x}: {lerp} < {last}");
            last = lerp;
        }
        assert_eq!(r.compute_byte_lerp(-3, 0), 0);
        assert_eq!(r.compute_byte_lerp(0, 0), 0);
        assert_eq!(r.compute_byte_lerp(10, 0), 255);
        assert_eq!(r.compute_byte_lerp(14, 0), 255);
    }

    #[test]
    fn linear_reflected_mirrors_across_start() {
        let r = renderer(GradientKind::LinearReflected, (5.0, 0.0), (10.0, 0.0));
        for d in 0..=5 {
            assert_eq!(
                r.compute_byte_lerp(5 + d, 0),
                r.compute_byte_lerp(5 - d, 0),
                "d={d}"
            );
        }
    }

    #[test]
    fn radial_zero_at_center_full_at_radius() {
        let r = renderer(GradientKind::Radial, (0.0, 0.0), (5.0, 0.0));
        assert_eq!(r.compute_byte_lerp(0, 0), 0);
        assert_eq!(r.compute_byte_lerp(3, 4), 255); // distance exactly 5
        assert_eq!(r.compute_byte_lerp(10, 0), 255);
    }

    #[test]
    fn degenerate_zero_length_gradient_is_safe() {
        for &kind in GradientKind::all() {
            let r = renderer(kind, (4.0, 4.0), (4.0, 4.0));
            // No NaN, no panic; every lookup must stay a valid byte.
            let _ = r.compute_byte_lerp(4, 4);
            let _ = r.compute_byte_lerp(100, -7);
        }
    }

    #[test]
    fn diamond_combines_axis_distances() {
        let r = renderer(GradientKind::Diamond, (5.0, 5.0), (10.0, 5.0));
        // L1-style: same lerp one step along either axis.
        assert_eq!(r.compute_byte_lerp(6, 5), r.compute_byte_lerp(5, 6));
        assert_eq!(r.compute_byte_lerp(10, 5), 255);
        assert_eq!(r.compute_byte_lerp(8, 8), 255); // |3| + |3| > radius
    }

    #[test]
    fn conical_aligns_zero_with_gradient_direction() {
        let r = renderer(GradientKind::Conical, (0.0, 0.0), (1.0, 0.0));
        assert_eq!(r.compute_byte_lerp(5, 0), 0);
        assert_eq!(r.compute_byte_lerp(-5, 0), 255);
        assert_eq!(r.compute_byte_lerp(0, 5), 127);
        assert_eq!(r.compute_byte_lerp(0, -5), 127);
    }

    #[test]
    fn conical_wraps_offset_back_into_range() {
        let r = renderer(GradientKind::Conical, (0.0, 0.0), (-1.0, 0.0));
        assert_eq!(r.compute_byte_lerp(5, 0), 255);
        assert_eq!(r.compute_byte_lerp(-5, 0), 0);
    }

    #[test]
    fn render_overwrites_with_opaque_colors() {
        // Branch 4: opaque endpoints, no blending decision needed.
        let mut surface = Surface::new(4, 1);
        let r = renderer(GradientKind::LinearClamped, (0.0, 0.0), (3.0, 0.0));
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);

        assert_eq!(surface.get(0, 0), Bgra::BLACK);
        assert_eq!(surface.get(3, 0), Bgra::WHITE);
        let mid = surface.get(1, 0);
        assert!(mid.b > 0 && mid.b < 255);
        assert_eq!(mid.a, 255);
    }

    #[test]
    fn render_composites_when_end_alpha_not_opaque() {
        // Branch 3: solid degenerate gradient with a semi-transparent end
        // color composites that color over the surface.
        let mut surface = Surface::new(2, 1);
        let color = Bgra::from_bgra(10, 20, 30, 128);
        let mut r = GradientRenderer::new(GradientKind::LinearClamped, false);
        r.set_start_color(color);
        r.set_end_color(color);
        r.before_render();
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);

        assert_eq!(surface.get(0, 0), color);
        assert_eq!(surface.get(1, 0), color);
    }

    #[test]
    fn render_alpha_only_blending_scales_channels() {
        // Branch 1: every channel is scaled by the interpolated alpha.
        let mut surface = Surface::from_pixels(1, 1, vec![Bgra::from_bgra(100, 100, 100, 200)]);
        let mut r = GradientRenderer::new(GradientKind::LinearClamped, true);
        r.set_end_color(Bgra::from_bgra(0, 0, 0, 127)); // end alpha = 255 - 127 = 128
        r.before_render();
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);

        assert_eq!(surface.get(0, 0), Bgra::from_bgra(50, 50, 50, 100));
    }

    #[test]
    fn render_alpha_only_replace_keeps_color() {
        // Branch 2: only the alpha channel changes; color survives the
        // straight-alpha round trip.
        let mut surface = Surface::from_pixels(1, 1, vec![Bgra::from_bgra(100, 100, 100, 200)]);
        let mut r = GradientRenderer::new(GradientKind::LinearClamped, true);
        r.set_end_color(Bgra::from_bgra(0, 0, 0, 127));
        r.set_alpha_blending(false);
        r.before_render();
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);

        assert_eq!(surface.get(0, 0), Bgra::from_bgra(63, 63, 63, 128));
    }

    #[test]
    fn color_change_invalidates_cache() {
        let mut surface = Surface::new(1, 1);
        let mut r = GradientRenderer::new(GradientKind::LinearClamped, false);
        r.set_start_color(Bgra::BLACK);
        r.set_end_color(Bgra::BLACK);
        r.before_render();
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);
        assert_eq!(surface.get(0, 0), Bgra::BLACK);

        r.set_start_color(Bgra::WHITE);
        r.set_end_color(Bgra::WHITE);
        r.before_render();
        let bounds = surface.bounds();
        r.render(&mut surface, &[bounds]);
        assert_eq!(surface.get(0, 0), Bgra::WHITE);
    }

    #[test]
    fn before_render_is_idempotent() {
        let mut r = renderer(GradientKind::Radial, (0.0, 0.0), (5.0, 0.0));
        let lerp = r.compute_byte_lerp(2, 0);
        r.before_render();
        r.before_render();
        assert_eq!(r.compute_byte_lerp(2, 0), lerp);
    }

    #[test]
    fn render_respects_roi_columns_and_rows() {
        let mut surface = Surface::new(4, 4);
        let r = renderer(GradientKind::LinearClamped, (0.0, 0.0), (0.0, 0.0));
        r.render(&mut surface, &[RectI::new(1, 1, 2, 2)]);

        for y in 0..4u32 {
            for x in 0..4u32 {
                let inside = (1..3).contains(&x) && (1..3).contains(&y);
                let expected = if inside { Bgra::WHITE } else { Bgra::ZERO };
                assert_eq!(surface.get(x, y), expected, "({x}, {y})");
            }
        }
    }
}
