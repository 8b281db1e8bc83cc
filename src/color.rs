//! Packed BGRA pixel value and the byte-level blend helpers built on it.
//!
//! Surfaces store pixels in **premultiplied alpha** form: every color channel
//! is pre-scaled by the alpha channel, so `b, g, r <= a` always holds. All
//! operations here are pure and return new values.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A packed B,G,R,A pixel. Byte order matches the little-endian `u32`
/// packing `b | g << 8 | r << 16 | a << 24`.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Bgra {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

/// Scales `a` by `b`, treating both as fractions of 255.
///
/// Exactly `round(a * b / 255)` without a divide; the double-shift trick
/// the whole compositing core rounds with. Both inputs must be <= 255.
#[inline]
pub fn mul_un8(a: u32, b: u32) -> u32 {
    debug_assert!(a <= 255 && b <= 255);
    let t = a * b + 0x80;
    ((t >> 8) + t) >> 8
}

impl Bgra {
    /// Transparent black; also the defined result of every zero-denominator
    /// edge case in the crate.
    pub const ZERO: Bgra = Bgra::from_bgra(0, 0, 0, 0);
    pub const BLACK: Bgra = Bgra::from_bgra(0, 0, 0, 255);
    pub const WHITE: Bgra = Bgra::from_bgra(255, 255, 255, 255);

    pub const fn from_bgra(b: u8, g: u8, r: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    pub const fn from_u32(bgra: u32) -> Self {
        Self {
            b: bgra as u8,
            g: (bgra >> 8) as u8,
            r: (bgra >> 16) as u8,
            a: (bgra >> 24) as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        self.b as u32 | (self.g as u32) << 8 | (self.r as u32) << 16 | (self.a as u32) << 24
    }

    /// Same color bytes with a new alpha component.
    pub const fn new_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Brings the color channels from straight alpha into premultiplied
    /// alpha form (`c' = c * a / 255`).
    pub const fn to_premultiplied(self) -> Self {
        let a = self.a as u32;
        Self {
            b: (self.b as u32 * a / 255) as u8,
            g: (self.g as u32 * a / 255) as u8,
            r: (self.r as u32 * a / 255) as u8,
            a: self.a,
        }
    }

    /// Brings the color channels from premultiplied alpha back into straight
    /// alpha form (`c' = c * 255 / a`).
    ///
    /// Lossy by design for `a == 0`: the color information is gone, so the
    /// result is the zero pixel rather than a division by zero.
    pub const fn to_straight(self) -> Self {
        if self.a == 0 {
            return Bgra::ZERO;
        }
        let a = self.a as u32;
        Self {
            b: (self.b as u32 * 255 / a) as u8,
            g: (self.g as u32 * 255 / a) as u8,
            r: (self.r as u32 * 255 / a) as u8,
            a: self.a,
        }
    }

    /// Linearly interpolates between two premultiplied colors.
    /// `frac` is in [0, 1]; each channel is clamped to byte range.
    pub fn lerp(from: Bgra, to: Bgra, frac: f32) -> Bgra {
        #[inline]
        fn channel(from: u8, to: u8, frac: f32) -> u8 {
            let v = from as f32 + (to as f32 - from as f32) * frac;
            v.clamp(0.0, 255.0) as u8
        }
        Bgra::from_bgra(
            channel(from.b, to.b, frac),
            channel(from.g, to.g, frac),
            channel(from.r, to.r, frac),
            channel(from.a, to.a, frac),
        )
    }

    /// Alpha-weighted mix of two colors at a byte-valued position: weight
    /// `255 - frac` on `ca` and `frac` on `cb`, each scaled by that color's
    /// alpha. A combined weight of zero yields the zero pixel.
    ///
    /// This is the primitive behind the gradient renderer's lerp cache.
    pub fn blend_weighted(ca: Bgra, cb: Bgra, frac: u8) -> Bgra {
        let ca_w = mul_un8(255 - frac as u32, ca.a as u32);
        let cb_w = mul_un8(frac as u32, cb.a as u32);
        let total = ca_w + cb_w;

        if total == 0 {
            return Bgra::ZERO;
        }

        let b = (ca.b as u32 * ca_w + cb.b as u32 * cb_w) / total;
        let g = (ca.g as u32 * ca_w + cb.g as u32 * cb_w) / total;
        let r = (ca.r as u32 * ca_w + cb.r as u32 * cb_w) / total;

        Bgra::from_bgra(b as u8, g as u8, r as u8, total as u8)
    }

    /// Equal-weight mean of a set of premultiplied colors.
    /// An empty slice yields the transparent pixel.
    pub fn blend_slice(colors: &[Bgra]) -> Bgra {
        let count = colors.len() as u64;
        if count == 0 {
            return Bgra::ZERO;
        }

        let mut b_sum = 0u64;
        let mut g_sum = 0u64;
        let mut r_sum = 0u64;
        let mut a_sum = 0u64;
        for c in colors {
            b_sum += c.b as u64;
            g_sum += c.g as u64;
            r_sum += c.r as u64;
            a_sum += c.a as u64;
        }

        Bgra::from_bgra(
            (b_sum / count) as u8,
            (g_sum / count) as u8,
            (r_sum / count) as u8,
            (a_sum / count) as u8,
        )
    }

    /// Alpha-weighted mean of `colors` under arbitrary non-negative weights.
    ///
    /// Panics when the slice lengths disagree. A zero weight sum or a zero
    /// summed alpha yields the zero pixel rather than dividing.
    pub fn blend_weighted_slice(colors: &[Bgra], weights: &[f64]) -> Bgra {
        assert_eq!(
            colors.len(),
            weights.len(),
            "color/weight slices must have equal length"
        );

        let mut w_sum = 0.0f64;
        let mut a_sum = 0.0f64;
        let mut b_sum = 0.0f64;
        let mut g_sum = 0.0f64;
        let mut r_sum = 0.0f64;
        for (c, &w) in colors.iter().zip(weights) {
            let aw = c.a as f64 * w;
            w_sum += w;
            a_sum += aw;
            b_sum += c.b as f64 * aw;
            g_sum += c.g as f64 * aw;
            r_sum += c.r as f64 * aw;
        }

        if w_sum == 0.0 || a_sum == 0.0 {
            return Bgra::ZERO;
        }

        #[inline]
        fn clamp_round(v: f64) -> u8 {
            v.round().clamp(0.0, 255.0) as u8
        }
        Bgra::from_bgra(
            clamp_round(b_sum / a_sum),
            clamp_round(g_sum / a_sum),
            clamp_round(r_sum / a_sum),
            clamp_round(a_sum / w_sum),
        )
    }

    /// Blends four premultiplied colors with 16-bit fixed-point weights.
    /// The weights must add up to 65536 ("1.0"); this is checked in debug
    /// builds only since the call sits on interpolation hot paths.
    pub fn blend_4w16ip(
        c1: Bgra,
        w1: u32,
        c2: Bgra,
        w2: u32,
        c3: Bgra,
        w3: u32,
        c4: Bgra,
        w4: u32,
    ) -> Bgra {
        debug_assert_eq!(w1 + w2 + w3 + w4, 65536, "weights must sum to 65536");

        const HALF: u32 = 32768;
        let b = (c1.b as u32 * w1 + c2.b as u32 * w2 + c3.b as u32 * w3 + c4.b as u32 * w4 + HALF)
            >> 16;
        let g = (c1.g as u32 * w1 + c2.g as u32 * w2 + c3.g as u32 * w3 + c4.g as u32 * w4 + HALF)
            >> 16;
        let r = (c1.r as u32 * w1 + c2.r as u32 * w2 + c3.r as u32 * w3 + c4.r as u32 * w4 + HALF)
            >> 16;
        let a = (c1.a as u32 * w1 + c2.a as u32 * w2 + c3.a as u32 * w3 + c4.a as u32 * w4 + HALF)
            >> 16;

        Bgra::from_bgra(b as u8, g as u8, r as u8, a as u8)
    }

    /// Perceptual tolerance test used by the flood-fill engines.
    ///
    /// The squared channel differences are weighted by the reference alpha so
    /// that color differences matter less as the reference grows transparent,
    /// while alpha differences always count at full strength.
    pub fn within_tolerance(reference: Bgra, other: Bgra, tolerance: i32) -> bool {
        let diff_r = reference.r as i32 - other.r as i32;
        let diff_g = reference.g as i32 - other.g as i32;
        let diff_b = reference.b as i32 - other.b as i32;
        let diff_a = reference.a as i32 - other.a as i32;

        let ref_a = reference.a as i32;
        let summand_r = (1 + diff_r * diff_r) * ref_a / 256;
        let summand_g = (1 + diff_g * diff_g) * ref_a / 256;
        let summand_b = (1 + diff_b * diff_b) * ref_a / 256;
        let summand_a = diff_a * diff_a;

        summand_r + summand_g + summand_b + summand_a <= tolerance * tolerance * 4
    }
}
