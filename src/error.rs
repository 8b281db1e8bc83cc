use thiserror::Error;

/// Errors produced by bulk operations whose operands can disagree.
///
/// Out-of-range coordinate access is a programmer error and panics instead;
/// see the crate-level docs for the precondition policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterError {
    #[error("span length mismatch: dst has {dst} pixels, src has {src}")]
    SpanLengthMismatch { dst: usize, src: usize },
}
