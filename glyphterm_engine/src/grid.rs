//! Terminal character grid
//!
//! A fixed-size, addressable 2-D buffer of characters. The renderer only
//! reads it; callers mutate cells and then trigger a content update through
//! the renderer's `notify_update()`.

/// Fixed-width/height 2-D character buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalGrid {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl TerminalGrid {
    /// Create a grid filled with spaces.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; width * height],
        }
    }

    /// Create a grid from row-major cell contents.
    ///
    /// Returns `None` if `cells.len() != width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<char>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self { width, height, cells })
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells (width × height).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Character at (x, y). Panics if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> char {
        assert!(x < self.width && y < self.height);
        self.cells[y * self.width + x]
    }

    /// Set the character at (x, y). Panics if out of bounds.
    pub fn set(&mut self, x: usize, y: usize, c: char) {
        assert!(x < self.width && y < self.height);
        self.cells[y * self.width + x] = c;
    }

    /// Overwrite one row starting at (x, y) with the characters of `text`,
    /// clipped to the grid width.
    pub fn write_str(&mut self, x: usize, y: usize, text: &str) {
        for (i, c) in text.chars().enumerate() {
            let col = x + i;
            if col >= self.width {
                break;
            }
            self.set(col, y, c);
        }
    }

    /// Row-major iteration over all cells.
    pub fn iter(&self) -> std::slice::Iter<'_, char> {
        self.cells.iter()
    }

    /// Row-major cell contents as a slice.
    pub fn cells(&self) -> &[char] {
        &self.cells
    }
}

impl<'a> IntoIterator for &'a TerminalGrid {
    type Item = &'a char;
    type IntoIter = std::slice::Iter<'a, char>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
