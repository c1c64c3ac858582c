//! Sand grid: occupancy and colour per cell. y=0 is the top row.

use crate::color::Rgba;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfRange {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Single cell: either empty or sand of a given colour.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Sand(Rgba),
}

impl Cell {
    #[inline]
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Sand(_))
    }

    /// Stored colour; empty cells report the sentinel.
    #[inline]
    pub fn color(&self) -> Rgba {
        match self {
            Self::Empty => Rgba::CLEAR,
            Self::Sand(c) => *c,
        }
    }
}

/// Fixed-size playfield. Created once, cleared in place, never resized.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Row-major: `cells[y * width + x]`.
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Signed bounds test; negative coordinates are outside.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn within_cols(&self, x: i32) -> bool {
        x >= 0 && (x as usize) < self.width
    }

    #[inline]
    pub fn within_rows(&self, y: i32) -> bool {
        y >= 0 && (y as usize) < self.height
    }

    fn index(&self, x: usize, y: usize) -> Result<usize, GridError> {
        if x < self.width && y < self.height {
            Ok(y * self.width + x)
        } else {
            Err(GridError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Cell, GridError> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Mark the cell occupied with `color`.
    pub fn set(&mut self, x: usize, y: usize, color: Rgba) -> Result<(), GridError> {
        let i = self.index(x, y)?;
        self.cells[i] = Cell::Sand(color);
        Ok(())
    }

    /// Empty the cell (sentinel colour).
    pub fn clear(&mut self, x: usize, y: usize) -> Result<(), GridError> {
        let i = self.index(x, y)?;
        self.cells[i] = Cell::Empty;
        Ok(())
    }

    /// `set(to, get(from).color); clear(from)` as one write.
    pub fn move_particle(
        &mut self,
        from: (usize, usize),
        to: (usize, usize),
    ) -> Result<(), GridError> {
        let src = self.index(from.0, from.1)?;
        let dst = self.index(to.0, to.1)?;
        self.cells[dst] = self.cells[src];
        if src != dst {
            self.cells[src] = Cell::Empty;
        }
        Ok(())
    }

    /// Unchecked read for in-bounds loops; panics past the buffer.
    #[inline]
    pub(crate) fn cell(&self, x: usize, y: usize) -> Cell {
        self.cells[y * self.width + x]
    }

    #[inline]
    pub(crate) fn is_occupied_at(&self, x: usize, y: usize) -> bool {
        self.cell(x, y).is_occupied()
    }

    /// Swap-free move used by the automaton; caller guarantees bounds and an empty target.
    #[inline]
    pub(crate) fn shift(&mut self, x: usize, y: usize, tx: usize, ty: usize) {
        let src = y * self.width + x;
        let dst = ty * self.width + tx;
        debug_assert!(!self.cells[dst].is_occupied());
        self.cells[dst] = self.cells[src];
        self.cells[src] = Cell::Empty;
    }

    /// Change the colour of an occupied cell without touching occupancy.
    pub(crate) fn recolor(&mut self, x: usize, y: usize, color: Rgba) {
        let i = y * self.width + x;
        if let Cell::Sand(c) = &mut self.cells[i] {
            *c = color;
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_occupied()).count()
    }

    pub fn row_occupied(&self, y: usize) -> bool {
        y < self.height && (0..self.width).any(|x| self.is_occupied_at(x, y))
    }

    /// Read-only snapshot of occupied cells as `(x, y, colour)`, row by row.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, usize, Rgba)> + '_ {
        let w = self.width;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| match cell {
            Cell::Sand(c) => Some((i % w, i / w, *c)),
            Cell::Empty => None,
        })
    }

    /// Bulk restore. Every coordinate is validated before anything is written.
    pub fn load_cells<I>(&mut self, cells: I) -> Result<usize, GridError>
    where
        I: IntoIterator<Item = (usize, usize, Rgba)>,
    {
        let cells: Vec<_> = cells.into_iter().collect();
        for &(x, y, _) in &cells {
            self.index(x, y)?;
        }
        for &(x, y, color) in &cells {
            self.set(x, y, color)?;
        }
        Ok(cells.len())
    }

    /// Zero every cell in place.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::Empty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SandColor;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.get(3, 2), Ok(Cell::Empty));
        assert_eq!(grid.get(0, 0).map(|c| c.color()), Ok(Rgba::CLEAR));
    }

    #[test]
    fn test_get_out_of_range() {
        let grid = Grid::new(4, 3);
        assert_eq!(
            grid.get(4, 0),
            Err(GridError::OutOfRange { x: 4, y: 0, width: 4, height: 3 })
        );
        assert!(grid.get(0, 3).is_err());
    }

    #[test]
    fn test_set_and_clear() {
        let mut grid = Grid::new(4, 3);
        let red = SandColor::Red.rgba();
        grid.set(1, 2, red).unwrap();
        assert_eq!(grid.get(1, 2), Ok(Cell::Sand(red)));
        assert_eq!(grid.occupied_count(), 1);
        grid.clear(1, 2).unwrap();
        assert_eq!(grid.get(1, 2), Ok(Cell::Empty));
        assert!(grid.set(9, 9, red).is_err());
        assert!(grid.clear(0, 9).is_err());
    }

    #[test]
    fn test_move_particle() {
        let mut grid = Grid::new(3, 3);
        let blue = SandColor::Blue.rgba();
        grid.set(0, 0, blue).unwrap();
        grid.move_particle((0, 0), (2, 2)).unwrap();
        assert_eq!(grid.get(0, 0), Ok(Cell::Empty));
        assert_eq!(grid.get(2, 2), Ok(Cell::Sand(blue)));
        assert_eq!(grid.occupied_count(), 1);
        assert!(grid.move_particle((2, 2), (3, 0)).is_err());
        assert_eq!(grid.get(2, 2), Ok(Cell::Sand(blue)));
    }

    #[test]
    fn test_in_bounds() {
        let grid = Grid::new(5, 6);
        assert!(grid.in_bounds(0, 0));
        assert!(grid.in_bounds(4, 5));
        assert!(!grid.in_bounds(-1, 0));
        assert!(!grid.in_bounds(5, 0));
        assert!(!grid.in_bounds(0, 6));
        assert!(grid.within_cols(4) && !grid.within_cols(5));
        assert!(grid.within_rows(5) && !grid.within_rows(-1));
    }

    #[test]
    fn test_iter_occupied_and_row_occupied() {
        let mut grid = Grid::new(3, 3);
        let green = SandColor::Green.rgba();
        grid.set(2, 1, green).unwrap();
        grid.set(0, 2, green).unwrap();
        let cells: Vec<_> = grid.iter_occupied().collect();
        assert_eq!(cells, vec![(2, 1, green), (0, 2, green)]);
        assert!(grid.row_occupied(1));
        assert!(!grid.row_occupied(0));
        assert!(!grid.row_occupied(7));
    }

    #[test]
    fn test_load_cells_validates_first() {
        let mut grid = Grid::new(3, 3);
        let red = SandColor::Red.rgba();
        assert!(grid.load_cells(vec![(0, 0, red), (5, 0, red)]).is_err());
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.load_cells(vec![(0, 0, red), (1, 2, red)]), Ok(2));
        assert_eq!(grid.occupied_count(), 2);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut grid = Grid::new(3, 3);
        grid.set(1, 1, SandColor::Cyan.rgba()).unwrap();
        grid.reset();
        assert_eq!(grid, Grid::new(3, 3));
    }
}
