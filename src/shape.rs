//! Block shapes: coarse polyomino patterns blown up into n×n sub-squares of grid cells.

/// Default sub-square size: each pattern cell becomes N×N grid cells.
pub const DEFAULT_SUB_SQUARE_SIZE: usize = 7;

/// Coarse block patterns offered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Square,
    LShape,
    TShape,
    ZShape,
    IHorizontal,
    THorizontal,
    TReverse,
    LHorizontal,
}

impl BlockKind {
    pub const ALL: [Self; 8] = [
        Self::Square,
        Self::LShape,
        Self::TShape,
        Self::ZShape,
        Self::IHorizontal,
        Self::THorizontal,
        Self::TReverse,
        Self::LHorizontal,
    ];

    /// Pattern cells relative to origin (0,0); each (dx, dy), y grows downward.
    pub fn cells(&self) -> &'static [(i32, i32)] {
        match self {
            Self::Square => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::LShape => &[(0, 0), (0, 1), (0, 2), (1, 2)],
            Self::TShape => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::ZShape => &[(0, 0), (1, 0), (1, 1), (2, 1)],
            Self::IHorizontal => &[(0, 0), (1, 0), (2, 0)],
            Self::THorizontal => &[(0, 0), (1, 0), (2, 0), (1, -1)],
            Self::TReverse => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::LHorizontal => &[(0, 0), (1, 0), (2, 0), (2, -1)],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::LShape => "L",
            Self::TShape => "T",
            Self::ZShape => "Z",
            Self::IHorizontal => "I",
            Self::THorizontal => "T-up",
            Self::TReverse => "T-down",
            Self::LHorizontal => "L-flat",
        }
    }
}

/// Immutable footprint of a droppable block, as grid-cell offsets from a local origin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockShape {
    cells: Vec<(i32, i32)>,
}

impl BlockShape {
    pub fn new(cells: Vec<(i32, i32)>) -> Self {
        Self { cells }
    }

    /// Expand `kind`'s pattern so each cell becomes a `size`×`size` square.
    pub fn from_kind(kind: BlockKind, size: usize) -> Self {
        let s = size as i32;
        let pattern = kind.cells();
        let mut cells = Vec::with_capacity(pattern.len() * size * size);
        for &(px, py) in pattern {
            for x in 0..s {
                for y in 0..s {
                    cells.push((px * s + x, py * s + y));
                }
            }
        }
        Self { cells }
    }

    #[inline]
    pub fn cells(&self) -> &[(i32, i32)] {
        &self.cells
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`, inclusive.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let (&(x0, y0), rest) = self.cells.split_first()?;
        Some(rest.iter().fold((x0, y0, x0, y0), |(ax, ay, bx, by), &(x, y)| {
            (ax.min(x), ay.min(y), bx.max(x), by.max(y))
        }))
    }

    /// Centre of the bounding box; (0, 0) for an empty shape.
    pub fn center(&self) -> (f32, f32) {
        match self.bounds() {
            Some((x0, y0, x1, y1)) => ((x0 + x1) as f32 / 2.0, (y0 + y1) as f32 / 2.0),
            None => (0.0, 0.0),
        }
    }

    /// Smallest dy among the cells (the topmost row offset).
    pub fn min_dy(&self) -> i32 {
        self.bounds().map(|(_, y0, _, _)| y0).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_expands_to_pattern_times_size_squared() {
        for kind in BlockKind::ALL {
            let shape = BlockShape::from_kind(kind, 3);
            assert_eq!(shape.len(), kind.cells().len() * 9, "{kind:?}");
            let unique: HashSet<_> = shape.cells().iter().collect();
            assert_eq!(unique.len(), shape.len(), "{kind:?} has duplicate cells");
        }
    }

    #[test]
    fn test_square_bounds_and_center() {
        let shape = BlockShape::from_kind(BlockKind::Square, 7);
        assert_eq!(shape.bounds(), Some((0, 0, 13, 13)));
        assert_eq!(shape.center(), (6.5, 6.5));
    }

    #[test]
    fn test_negative_offsets_kept() {
        let shape = BlockShape::from_kind(BlockKind::THorizontal, 2);
        assert_eq!(shape.bounds(), Some((0, -2, 5, 1)));
        assert_eq!(shape.min_dy(), -2);
    }

    #[test]
    fn test_empty_shape() {
        let shape = BlockShape::default();
        assert!(shape.is_empty());
        assert_eq!(shape.bounds(), None);
        assert_eq!(shape.center(), (0.0, 0.0));
        assert_eq!(shape.min_dy(), 0);
    }
}
