/// Identifier for a cell in a [`crate::graph::CellGraph`].
///
/// This is a dense index into the engine's cell arena, assigned when the
/// mesh is built and never reused.
pub type CellId = usize;

/// Zone tag partitioning cells into independent growth regions.
pub type MediumId = u32;

/// A discrete simulated time step.
///
/// Signed so that `g - 1` is well defined for generation `0` and banded
/// seeds may start above or below zero.
pub type Generation = i64;

/// Display color as straight (non-premultiplied) RGBA.
pub type Rgba = [u8; 4];
