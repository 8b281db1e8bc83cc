//! Alpha-compositing blend operators over premultiplied BGRA pixels.
//!
//! The generalized "B over A" compositing formula with a replaceable
//! per-channel blending function F is
//!
//! ```text
//! G(A, a, B, b, F) = (a - ab)A + (b - ab)B + ab * F(A, B)
//! ```
//!
//! where lowercase letters are alphas scaled to [0, 1]. With F(A, B) = B this
//! reduces to plain "over". Every mode below is F expressed on raw bytes;
//! one shared routine evaluates G in rounded 8-bit fixed point and divides
//! by the combined alpha exactly once per channel.

use serde::{Deserialize, Serialize};

use crate::color::{Bgra, mul_un8};
use crate::error::RasterError;

/// The closed set of per-channel blending functions.
///
/// Credit for the mathematical descriptions of many of these modes goes to
/// Pegtop Software's "Blend Modes" article,
/// <http://www.pegtop.net/delphi/articles/blendmodes/>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Darken,
    Lighten,
    Difference,
    Negation,
    ColorDodge,
    ColorBurn,
    Overlay,
    Reflect,
    Glow,
    Additive,
    Xor,
}

impl BlendMode {
    /// All modes, in presentation order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Difference,
            BlendMode::Negation,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::Overlay,
            BlendMode::Reflect,
            BlendMode::Glow,
            BlendMode::Additive,
            BlendMode::Xor,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Difference => "Difference",
            BlendMode::Negation => "Negation",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::Overlay => "Overlay",
            BlendMode::Reflect => "Reflect",
            BlendMode::Glow => "Glow",
            BlendMode::Additive => "Additive",
            BlendMode::Xor => "Xor",
        }
    }

    /// The per-channel function F(bottom, top). Divisions truncate; the
    /// division-like modes pin their pole values (e.g. dodge at top == 255)
    /// before dividing.
    #[inline]
    fn channel(self, b: u8, t: u8) -> u8 {
        let bi = b as u32;
        let ti = t as u32;
        match self {
            BlendMode::Normal => t,
            BlendMode::Multiply => mul_un8(bi, ti) as u8,
            BlendMode::Screen => (ti + bi - mul_un8(ti, bi)) as u8,
            BlendMode::Darken => b.min(t),
            BlendMode::Lighten => b.max(t),
            BlendMode::Difference => (bi as i32 - ti as i32).unsigned_abs() as u8,
            BlendMode::Negation => (255 - (255 - bi as i32 - ti as i32).abs()) as u8,
            BlendMode::ColorDodge => {
                if t == 255 {
                    255
                } else {
                    (bi * 255 / (255 - ti)).min(255) as u8
                }
            }
            BlendMode::ColorBurn => {
                if t == 0 {
                    0
                } else {
                    (255 - ((255 - bi) * 255 / ti) as i32).max(0) as u8
                }
            }
            BlendMode::Overlay => {
                if b < 128 {
                    mul_un8(2 * bi, ti) as u8
                } else {
                    (255 - mul_un8(2 * (255 - bi), 255 - ti)) as u8
                }
            }
            BlendMode::Reflect => {
                if t == 255 {
                    255
                } else {
                    (bi * bi / (255 - ti)).min(255) as u8
                }
            }
            BlendMode::Glow => {
                if b == 255 {
                    255
                } else {
                    (ti * ti / (255 - bi)).min(255) as u8
                }
            }
            BlendMode::Additive => (bi + ti).min(255) as u8,
            BlendMode::Xor => b ^ t,
        }
    }
}

/// A stateless blend operator: a mode plus a captured opacity in [0, 255].
///
/// `apply` composites `top` over `bottom`; the opacity scales the top
/// alpha before the mode's formula runs, so `with_opacity(mode, 255)` and
/// `new(mode)` are the same operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendOp {
    mode: BlendMode,
    opacity: u8,
}

impl BlendOp {
    pub const fn new(mode: BlendMode) -> Self {
        Self { mode, opacity: 255 }
    }

    pub const fn with_opacity(mode: BlendMode, opacity: u8) -> Self {
        Self { mode, opacity }
    }

    pub const fn mode(&self) -> BlendMode {
        self.mode
    }

    pub const fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Composites `top` over `bottom` and returns the result.
    pub fn apply(&self, bottom: Bgra, top: Bgra) -> Bgra {
        let top_a = if self.opacity == 255 {
            top.a as u32
        } else {
            mul_un8(top.a as u32, self.opacity as u32)
        };

        // Fast path: fully transparent top contributes nothing.
        if top_a == 0 {
            return bottom;
        }
        // Fast path: opaque Normal replaces the bottom pixel outright.
        if self.mode == BlendMode::Normal && top_a == 255 {
            return top;
        }

        composite(self.mode, bottom, top, top_a)
    }

    /// Row-bulk variant: composites `src[i]` over `dst[i]` in place.
    pub fn apply_rows(&self, dst: &mut [Bgra], src: &[Bgra]) -> Result<(), RasterError> {
        if dst.len() != src.len() {
            return Err(RasterError::SpanLengthMismatch {
                dst: dst.len(),
                src: src.len(),
            });
        }
        for (d, s) in dst.iter_mut().zip(src) {
            *d = self.apply(*d, *s);
        }
        Ok(())
    }

    /// Row-bulk variant writing `lhs[i] OVER-composited-with rhs[i]` into `dst`.
    pub fn apply_rows_into(
        &self,
        dst: &mut [Bgra],
        lhs: &[Bgra],
        rhs: &[Bgra],
    ) -> Result<(), RasterError> {
        if dst.len() != lhs.len() {
            return Err(RasterError::SpanLengthMismatch {
                dst: dst.len(),
                src: lhs.len(),
            });
        }
        if dst.len() != rhs.len() {
            return Err(RasterError::SpanLengthMismatch {
                dst: dst.len(),
                src: rhs.len(),
            });
        }
        for ((d, l), r) in dst.iter_mut().zip(lhs).zip(rhs) {
            *d = self.apply(*l, *r);
        }
        Ok(())
    }
}

/// The shared compositing routine. `top_a` is the effective top alpha after
/// any opacity scaling; every intermediate term is rounded fixed point.
///
/// The weights are `y` (bottom only), `z` (top only) and `x` (both overlap,
/// where F applies); `y + z + x == total_a`, so dividing the weighted channel
/// sum by `total_a` re-normalizes into premultiplied form. The division is
/// exact integer division, which reproduces the rounding of the classic
/// reciprocal-multiply table bit for bit over this numerator range.
fn composite(mode: BlendMode, bottom: Bgra, top: Bgra, top_a: u32) -> Bgra {
    let bottom_a = bottom.a as u32;

    let y = mul_un8(bottom_a, 255 - top_a);
    let total_a = y + top_a;
    if total_a == 0 {
        return Bgra::ZERO;
    }

    let x = mul_un8(bottom_a, top_a);
    let z = top_a - x;

    let f_b = mode.channel(bottom.b, top.b) as u32;
    let f_g = mode.channel(bottom.g, top.g) as u32;
    let f_r = mode.channel(bottom.r, top.r) as u32;

    let b = (bottom.b as u32 * y + top.b as u32 * z + f_b * x) / total_a;
    let g = (bottom.g as u32 * y + top.g as u32 * z + f_g * x) / total_a;
    let r = (bottom.r as u32 * y + top.r as u32 * z + f_r * x) / total_a;

    Bgra::from_bgra(b as u8, g as u8, r as u8, total_a as u8)
}
