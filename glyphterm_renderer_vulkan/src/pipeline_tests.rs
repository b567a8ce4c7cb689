//! Unit tests for cell vertex generation

use crate::pipeline::{build_cell_vertices, CellVertex};
use glyphterm_engine::TerminalGrid;

#[test]
fn test_vertex_count_is_six_per_cell() {
    let grid = TerminalGrid::new(4, 3);
    let indices = vec![0u32; 12];
    let vertices = build_cell_vertices(&grid, &indices, 1);
    assert_eq!(vertices.len(), 12 * 6);
}

#[test]
fn test_single_cell_covers_full_ndc_range() {
    let grid = TerminalGrid::new(1, 1);
    let vertices = build_cell_vertices(&grid, &[0], 1);

    let min_x = vertices.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
    let max_x = vertices.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
    let max_y = vertices.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);

    assert_eq!((min_x, max_x), (-1.0, 1.0));
    assert_eq!((min_y, max_y), (-1.0, 1.0));
}

#[test]
fn test_uv_slice_follows_atlas_index() {
    let grid = TerminalGrid::new(1, 1);
    // One cell showing atlas cell 2 of 4: U must span [0.5, 0.75].
    let vertices = build_cell_vertices(&grid, &[2], 4);

    let min_u = vertices.iter().map(|v| v.u).fold(f32::INFINITY, f32::min);
    let max_u = vertices.iter().map(|v| v.u).fold(f32::NEG_INFINITY, f32::max);
    assert_eq!((min_u, max_u), (0.5, 0.75));

    // V always spans the full strip height.
    assert!(vertices.iter().any(|v| v.v == 0.0));
    assert!(vertices.iter().any(|v| v.v == 1.0));
}

#[test]
fn test_cells_tile_the_screen_without_overlap() {
    let grid = TerminalGrid::new(2, 2);
    let vertices = build_cell_vertices(&grid, &[0, 0, 0, 0], 1);

    // Cell 0 (top-left quadrant in NDC terms) spans x,y in [-1, 0].
    let first: Vec<&CellVertex> = vertices[0..6].iter().collect();
    assert!(first.iter().all(|v| (-1.0..=0.0).contains(&v.x)));
    assert!(first.iter().all(|v| (-1.0..=0.0).contains(&v.y)));

    // Cell 3 spans x,y in [0, 1].
    let last: Vec<&CellVertex> = vertices[18..24].iter().collect();
    assert!(last.iter().all(|v| (0.0..=1.0).contains(&v.x)));
    assert!(last.iter().all(|v| (0.0..=1.0).contains(&v.y)));
}

#[test]
fn test_cell_vertex_layout_matches_shader_input() {
    assert_eq!(std::mem::size_of::<CellVertex>(), 16);
    let v = CellVertex { x: 1.0, y: 2.0, u: 3.0, v: 4.0 };
    let bytes: &[u8] = bytemuck::bytes_of(&v);
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
    assert_eq!(&bytes[8..12], &3.0f32.to_ne_bytes());
}
