//! rastercore — CPU pixel-compositing and region-growing engine.
//!
//! The crate operates on premultiplied-alpha BGRA pixel buffers and
//! provides three things:
//!
//! * a blend-mode framework ([`BlendOp`], [`BlendMode`]) built on rounded
//!   8-bit fixed-point arithmetic,
//! * a procedural gradient rasterizer ([`GradientRenderer`]),
//! * tolerance-based flood fill ([`fill_contiguous`], [`fill_global`])
//!   over a dense bit-matrix stencil ([`BitMask`]).
//!
//! Collaborators supply pixel buffers ([`Surface`]), regions of interest
//! ([`RectI`]) and colors ([`Bgra`]); the engine hands back rendered pixels,
//! stencils and bounding boxes. There is no UI, codec, or document model
//! here.
//!
//! Precondition policy: out-of-range coordinates and mismatched weight
//! arrays are programmer errors and panic. Zero-denominator edge cases
//! (zero combined alpha, zero weight sum, zero-length gradients) are
//! well-defined and return the zero pixel or a zero scale factor instead.

pub mod blend;
pub mod color;
pub mod error;
pub mod fill;
pub mod geom;
pub mod gradient;
pub mod stencil;
pub mod surface;

pub use blend::{BlendMode, BlendOp};
pub use color::Bgra;
pub use error::RasterError;
pub use fill::{FillResult, fill_contiguous, fill_global};
pub use geom::{PointF, PointI, RectI, Scanline};
pub use gradient::{GradientKind, GradientRenderer};
pub use stencil::BitMask;
pub use surface::Surface;
