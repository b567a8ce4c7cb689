//! Unit tests for TerminalGrid
//!
//! Verifies row-major addressing, iteration order and bounds behavior that
//! the content update pipeline depends on.

use crate::TerminalGrid;

#[test]
fn test_new_grid_is_filled_with_spaces() {
    let grid = TerminalGrid::new(4, 3);
    assert_eq!(grid.width(), 4);
    assert_eq!(grid.height(), 3);
    assert_eq!(grid.len(), 12);
    assert!(grid.iter().all(|&c| c == ' '));
}

#[test]
fn test_get_set_round_trip() {
    let mut grid = TerminalGrid::new(3, 2);
    grid.set(2, 1, 'Z');
    assert_eq!(grid.get(2, 1), 'Z');
    assert_eq!(grid.get(0, 0), ' ');
}

#[test]
fn test_iteration_is_row_major() {
    let mut grid = TerminalGrid::new(2, 2);
    grid.set(0, 0, 'a');
    grid.set(1, 0, 'b');
    grid.set(0, 1, 'c');
    grid.set(1, 1, 'd');
    let collected: String = grid.iter().collect();
    assert_eq!(collected, "abcd");
}

#[test]
fn test_from_cells_rejects_wrong_length() {
    assert!(TerminalGrid::from_cells(2, 2, vec!['a'; 3]).is_none());
    assert!(TerminalGrid::from_cells(2, 2, vec!['a'; 4]).is_some());
}

#[test]
fn test_write_str_clips_at_grid_width() {
    let mut grid = TerminalGrid::new(4, 1);
    grid.write_str(2, 0, "hello");
    let collected: String = grid.iter().collect();
    assert_eq!(collected, "  he");
}

#[test]
#[should_panic]
fn test_get_out_of_bounds_panics() {
    let grid = TerminalGrid::new(2, 2);
    grid.get(2, 0);
}
