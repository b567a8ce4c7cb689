//! Font rasterization collaborator
//!
//! The renderer never rasterizes glyphs itself; it asks an implementation of
//! [`FontRaster`] for one bitmap per distinct character and packs the results
//! into the atlas strip.

use crate::Result;

/// One rasterized glyph.
///
/// `pixels` is row-major 8-bit coverage, `width` bytes per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Horizontal distance from the cell origin to the bitmap's left edge
    pub bearing_x: i32,
    /// Vertical distance from the baseline to the bitmap's top edge
    pub bearing_y: i32,
    /// Row-major coverage values, `width * height` bytes
    pub pixels: Vec<u8>,
}

impl GlyphBitmap {
    /// An empty glyph (used for whitespace).
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            bearing_x: 0,
            bearing_y: 0,
            pixels: Vec::new(),
        }
    }
}

/// Rasterizes single characters at a requested cell size.
///
/// Implementations are expected to be deterministic: the same character and
/// cell size must always yield the same bitmap, since the content update
/// pipeline relies on rebuilds being reproducible.
pub trait FontRaster {
    /// Rasterize `c` for a cell of `cell_width` × `cell_height` pixels.
    fn rasterize(&mut self, c: char, cell_width: u32, cell_height: u32) -> Result<GlyphBitmap>;
}
