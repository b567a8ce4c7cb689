//! Unit tests for atlas composition

use crate::atlas::{atlas_indices, cell_indices, compose_atlas, distinct_characters};
use glyphterm_engine::{FontRaster, GlyphBitmap, Result, TerminalGrid};

/// Deterministic fake font: every glyph is a 2x2 block whose pixel value is
/// derived from the character code, with fixed bearings.
struct BlockFont;

impl FontRaster for BlockFont {
    fn rasterize(&mut self, c: char, _cell_width: u32, _cell_height: u32) -> Result<GlyphBitmap> {
        let value = (c as u32 % 255) as u8 + 1;
        Ok(GlyphBitmap {
            width: 2,
            height: 2,
            bearing_x: 1,
            bearing_y: 3,
            pixels: vec![value; 4],
        })
    }
}

#[test]
fn test_distinct_characters_deduplicates_and_sorts() {
    let grid = TerminalGrid::from_cells(5, 1, "cabba".chars().collect()).unwrap();
    assert_eq!(distinct_characters(&grid), vec!['a', 'b', 'c']);
}

#[test]
fn test_distinct_characters_stable_across_layout() {
    let left = TerminalGrid::from_cells(2, 1, vec!['x', 'y']).unwrap();
    let right = TerminalGrid::from_cells(2, 1, vec!['y', 'x']).unwrap();
    assert_eq!(distinct_characters(&left), distinct_characters(&right));
}

#[test]
fn test_cell_indices_within_bounds() {
    let grid = TerminalGrid::from_cells(4, 2, "abcdabcd".chars().collect()).unwrap();
    let distinct = distinct_characters(&grid);
    let map = atlas_indices(&distinct);
    let cells = cell_indices(&grid, &map).unwrap();

    assert_eq!(cells.len(), grid.len());
    for &index in &cells {
        assert!((index as usize) < distinct.len());
    }
}

#[test]
fn test_uniform_grid_has_single_atlas_cell() {
    let grid = TerminalGrid::from_cells(3, 3, vec!['A'; 9]).unwrap();
    let distinct = distinct_characters(&grid);
    assert_eq!(distinct.len(), 1);

    let map = atlas_indices(&distinct);
    let cells = cell_indices(&grid, &map).unwrap();
    assert!(cells.iter().all(|&i| i == 0));
}

#[test]
fn test_two_by_one_grid_indices_match_assignment() {
    let grid = TerminalGrid::from_cells(2, 1, vec!['A', 'B']).unwrap();
    let distinct = distinct_characters(&grid);
    assert_eq!(distinct.len(), 2);

    let map = atlas_indices(&distinct);
    let cells = cell_indices(&grid, &map).unwrap();
    assert_eq!(cells, vec![map[&'A'], map[&'B']]);
}

#[test]
fn test_compose_atlas_dimensions() {
    // One cell-width slot per character, two cells of height.
    let distinct = vec!['a', 'b', 'c'];
    let atlas = compose_atlas(&mut BlockFont, &distinct, 8, 8).unwrap();
    assert_eq!(atlas.width, 24);
    assert_eq!(atlas.height, 16);
    assert_eq!(atlas.pixels.len(), 24 * 16);
}

#[test]
fn test_compose_atlas_idempotent() {
    let grid = TerminalGrid::from_cells(3, 1, vec!['q', 'w', 'q']).unwrap();
    let distinct = distinct_characters(&grid);

    let first = compose_atlas(&mut BlockFont, &distinct, 8, 8).unwrap();
    let second = compose_atlas(&mut BlockFont, &distinct, 8, 8).unwrap();
    assert_eq!(first.pixels, second.pixels);

    let map = atlas_indices(&distinct);
    assert_eq!(
        cell_indices(&grid, &map).unwrap(),
        cell_indices(&grid, &map).unwrap()
    );
}

#[test]
fn test_compose_atlas_baseline_placement() {
    // bearing_y = 3 in an 8-tall cell puts the bitmap's top row at row 4.
    let atlas = compose_atlas(&mut BlockFont, &['a'], 8, 8).unwrap();
    let value = ('a' as u32 % 255) as u8 + 1;

    // bearing_x = 1 shifts the glyph one column right.
    assert_eq!(atlas.pixels[4 * 8 + 1], value);
    assert_eq!(atlas.pixels[5 * 8 + 2], value);
    // Row above the glyph stays empty.
    assert_eq!(atlas.pixels[3 * 8 + 1], 0);
    // Column before the glyph stays empty.
    assert_eq!(atlas.pixels[4 * 8], 0);
}

#[test]
fn test_compose_atlas_clips_oversized_glyphs() {
    struct HugeFont;
    impl FontRaster for HugeFont {
        fn rasterize(&mut self, _c: char, _w: u32, _h: u32) -> Result<GlyphBitmap> {
            Ok(GlyphBitmap {
                width: 16,
                height: 16,
                bearing_x: -2,
                bearing_y: 20,
                pixels: vec![7; 256],
            })
        }
    }

    // Must not panic; out-of-slot pixels are dropped.
    let atlas = compose_atlas(&mut HugeFont, &['x', 'y'], 4, 4).unwrap();
    assert_eq!(atlas.pixels.len(), 8 * 8);
}

#[test]
fn test_compose_atlas_preserves_descender_rows() {
    struct DescenderFont;
    impl FontRaster for DescenderFont {
        fn rasterize(&mut self, _c: char, _w: u32, _h: u32) -> Result<GlyphBitmap> {
            Ok(GlyphBitmap {
                width: 4,
                height: 6,
                bearing_x: 0,
                bearing_y: 3,
                pixels: vec![9; 24],
            })
        }
    }

    // bearing_y = 3 in an 8-tall cell puts the bitmap on rows 4..10; the
    // last two rows sit below the baseline cell and must land in the lower
    // half of the strip, not be clipped.
    let atlas = compose_atlas(&mut DescenderFont, &['g'], 8, 8).unwrap();
    let painted = atlas.pixels.iter().filter(|&&p| p != 0).count();
    assert_eq!(painted, 24);
    assert_eq!(atlas.pixels[8 * 8], 9);
    assert_eq!(atlas.pixels[9 * 8 + 3], 9);
    // Below the descender the strip stays empty.
    assert_eq!(atlas.pixels[10 * 8], 0);
}

#[test]
fn test_cell_indices_rejects_unknown_character() {
    let grid = TerminalGrid::from_cells(1, 1, vec!['z']).unwrap();
    let map = atlas_indices(&['a']);
    assert!(cell_indices(&grid, &map).is_err());
}
