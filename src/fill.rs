//! Tolerance-based region growing: contiguous scanline flood fill and the
//! whole-image ("global") variant.
//!
//! Both produce a [`BitMask`] stencil plus the bounding rectangle of the
//! grown region, computed together in one pass. The contiguous fill is
//! inherently sequential (the stencil and work queue carry read-after-write
//! dependencies between rows); the global fill has no connectivity and runs
//! row-parallel, folding per-row extents into the bounding box afterwards.

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::debug;

use crate::color::Bgra;
use crate::geom::{PointI, RectI};
use crate::stencil::{BitMask, set_row_bit};
use crate::surface::Surface;

/// A grown region: the stencil marking member pixels and their bounding
/// rectangle, or `None` when nothing matched.
#[derive(Clone, Debug)]
pub struct FillResult {
    pub stencil: BitMask,
    pub bounds: Option<RectI>,
}

#[inline]
fn allowed(selection: Option<&BitMask>, x: usize, y: usize) -> bool {
    selection.is_none_or(|s| s.get(x as u32, y as u32))
}

fn check_selection(surface: &Surface, selection: Option<&BitMask>) {
    if let Some(s) = selection {
        assert!(
            s.width() == surface.width() && s.height() == surface.height(),
            "selection mask {}x{} does not match surface {}x{}",
            s.width(),
            s.height(),
            surface.width(),
            surface.height()
        );
    }
}

/// Grows the region of pixels connected to `seed` whose color is within
/// `tolerance` of the seed pixel's color.
///
/// Scanline seed fill: each dequeued point expands to its maximal horizontal
/// span, then the rows above and below are scanned for fillable sub-runs
/// within that span and each sub-run's start is enqueued. `selection`, when
/// present, restricts the fill to cells whose mask bit is set; the fill
/// never crosses the selection boundary.
///
/// The seed must be in bounds — that is the caller's precondition.
pub fn fill_contiguous(
    surface: &Surface,
    seed: PointI,
    tolerance: i32,
    selection: Option<&BitMask>,
) -> FillResult {
    let width = surface.width() as usize;
    let height = surface.height() as usize;
    assert!(
        seed.x >= 0 && (seed.x as usize) < width && seed.y >= 0 && (seed.y as usize) < height,
        "seed ({}, {}) outside {}x{} surface",
        seed.x,
        seed.y,
        width,
        height
    );
    check_selection(surface, selection);
    debug!(seed.x, seed.y, tolerance, "contiguous flood fill");

    let reference = surface.get(seed.x as u32, seed.y as u32);
    let mut stencil = BitMask::new(surface.width(), surface.height());

    let mut left = i32::MAX;
    let mut top = i32::MAX;
    let mut right = i32::MIN;
    let mut bottom = i32::MIN;

    let mut queue: VecDeque<(usize, usize)> = VecDeque::with_capacity(16);
    queue.push_back((seed.x as usize, seed.y as usize));

    while let Some((px, py)) = queue.pop_front() {
        let row = surface.row(py as u32);

        // Expand left from the dequeued point.
        let mut span_left = px;
        while span_left > 0 {
            let cx = span_left - 1;
            if stencil.get(cx as u32, py as u32)
                || !allowed(selection, cx, py)
                || !Bgra::within_tolerance(reference, row[cx], tolerance)
            {
                break;
            }
            stencil.set(cx as u32, py as u32, true);
            span_left = cx;
        }

        // Expand right, marking the dequeued point itself. Stops
        // immediately when the point was already visited.
        let mut span_end = px;
        while span_end < width
            && !stencil.get(span_end as u32, py as u32)
            && allowed(selection, span_end, py)
            && Bgra::within_tolerance(reference, row[span_end], tolerance)
        {
            stencil.set(span_end as u32, py as u32, true);
            span_end += 1;
        }

        if span_end == px && span_left == px {
            continue;
        }
        let span_right = span_end - 1;

        if py > 0 {
            check_row(
                surface, &stencil, selection, reference, tolerance, span_left, span_right,
                py - 1, &mut queue,
            );
        }
        if py < height - 1 {
            check_row(
                surface, &stencil, selection, reference, tolerance, span_left, span_right,
                py + 1, &mut queue,
            );
        }

        left = left.min(span_left as i32);
        right = right.max(span_right as i32);
        top = top.min(py as i32);
        bottom = bottom.max(py as i32);
    }

    let bounds = if right >= left {
        Some(RectI::from_ltrb(left, top, right, bottom))
    } else {
        None
    };
    FillResult { stencil, bounds }
}

/// Scans `row_y` within the parent span for maximal runs of unvisited,
/// in-tolerance cells and enqueues the start of each run.
#[allow(clippy::too_many_arguments)]
fn check_row(
    surface: &Surface,
    stencil: &BitMask,
    selection: Option<&BitMask>,
    reference: Bgra,
    tolerance: i32,
    span_left: usize,
    span_right: usize,
    row_y: usize,
    queue: &mut VecDeque<(usize, usize)>,
) {
    let row = surface.row(row_y as u32);
    let mut run_start = span_left;
    let mut cursor = span_left;
    for sx in span_left..=span_right {
        let fillable = !stencil.get(sx as u32, row_y as u32)
            && allowed(selection, sx, row_y)
            && Bgra::within_tolerance(reference, row[sx], tolerance);
        if fillable {
            cursor += 1;
        } else {
            if cursor > run_start {
                queue.push_back((run_start, row_y));
            }
            cursor += 1;
            run_start = cursor;
        }
    }
    if cursor > run_start {
        queue.push_back((run_start, row_y));
    }
}

/// Marks every pixel of the surface whose color is within `tolerance` of
/// `reference`, regardless of connectivity.
///
/// Rows are independent, so they run in parallel: each row writes its own
/// word-aligned stencil slice and reduces its own found-flag and left/right
/// extent. The per-row partials are folded into the bounding box after the
/// parallel pass.
pub fn fill_global(
    surface: &Surface,
    reference: Bgra,
    tolerance: i32,
    selection: Option<&BitMask>,
) -> FillResult {
    check_selection(surface, selection);
    debug!(
        width = surface.width(),
        height = surface.height(),
        tolerance,
        "global flood fill"
    );

    let width = surface.width() as usize;
    let mut stencil = BitMask::new(surface.width(), surface.height());
    if width == 0 || surface.height() == 0 {
        return FillResult {
            stencil,
            bounds: None,
        };
    }

    let merged = surface
        .pixels()
        .par_chunks(width)
        .zip(stencil.par_rows_mut())
        .enumerate()
        .map(|(y, (row, row_words))| {
            let mut row_left = 0usize;
            let mut row_right = 0usize;
            let mut found = false;
            for (x, &pixel) in row.iter().enumerate() {
                if !allowed(selection, x, y) {
                    continue;
                }
                if !Bgra::within_tolerance(reference, pixel, tolerance) {
                    continue;
                }
                set_row_bit(row_words, x);
                if !found {
                    row_left = x;
                }
                row_right = x;
                found = true;
            }
            found.then_some((row_left as i32, row_right as i32, y as i32, y as i32))
        })
        .filter_map(|partial| partial)
        .reduce_with(|a, b| (a.0.min(b.0), a.1.max(b.1), a.2.min(b.2), a.3.max(b.3)));

    let bounds = merged.map(|(l, r, t, b)| RectI::from_ltrb(l, t, r, b));
    FillResult { stencil, bounds }
}
