//! Maps a block shape dropped at an anchor onto the lowest free grid rows.

use crate::color::Rgba;
use crate::grid::Grid;
use crate::shape::BlockShape;

/// Where a shape lands: its origin in grid space and the grid cells it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub origin_x: i32,
    pub origin_y: i32,
    /// In-bounds cells to write.
    pub cells: Vec<(usize, usize)>,
    /// Cells that already held sand. Only non-zero when the search ran out of room and the
    /// shape was pinned to row 0.
    pub overlaps: usize,
    /// True if the shape was pushed down to keep its top on row 0.
    pub pinned_to_top: bool,
}

/// Discrete drop search: anchors a shape by its centre, then probes upward from the
/// requested row until nothing collides.
///
/// Always succeeds. A grid that is full to the top still accepts blocks; they are pinned
/// flush against row 0 and may overwrite sand there.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementResolver;

impl PlacementResolver {
    /// Shape origin that puts the shape's bounding-box centre on `anchor`.
    /// Halves round to even.
    pub fn origin_for_anchor(shape: &BlockShape, anchor: (i32, i32)) -> (i32, i32) {
        let (cx, cy) = shape.center();
        (
            anchor.0 - cx.round_ties_even() as i32,
            anchor.1 - cy.round_ties_even() as i32,
        )
    }

    /// A shape collides if any cell inside the rows lands on sand or off the left/right
    /// edge. Cells above or below the grid are ignored.
    pub fn has_collision(grid: &Grid, shape: &BlockShape, origin_x: i32, origin_y: i32) -> bool {
        shape.cells().iter().any(|&(dx, dy)| {
            let (x, y) = (origin_x + dx, origin_y + dy);
            if !grid.within_rows(y) {
                return false;
            }
            !grid.within_cols(x) || grid.is_occupied_at(x as usize, y as usize)
        })
    }

    /// Lowest row at or above `start_y` with no collision. If the probe would lift the
    /// shape past row 0 it stops with the shape's top on row 0.
    pub fn find_drop_row(grid: &Grid, shape: &BlockShape, origin_x: i32, start_y: i32) -> i32 {
        let top_offset = shape.min_dy().min(0);
        let mut y = start_y;
        while Self::has_collision(grid, shape, origin_x, y) {
            y -= 1;
            if y + top_offset < 0 {
                return -top_offset;
            }
        }
        y
    }

    /// Resolve a drop of `shape` centred at `anchor`. `None` for an empty shape.
    pub fn resolve(grid: &Grid, shape: &BlockShape, anchor: (i32, i32)) -> Option<Placement> {
        let (_, min_dy, _, max_dy) = shape.bounds()?;
        let (origin_x, mut start_y) = Self::origin_for_anchor(shape, anchor);

        // Never start with the shape hanging below the floor.
        let floor = grid.height() as i32 - 1;
        if start_y + max_dy > floor {
            start_y = floor - max_dy;
        }

        let mut origin_y = Self::find_drop_row(grid, shape, origin_x, start_y);
        let pinned_to_top = origin_y + min_dy < 0;
        if pinned_to_top {
            origin_y -= origin_y + min_dy;
        }

        let mut overlaps = 0;
        let cells = shape
            .cells()
            .iter()
            .map(|&(dx, dy)| (origin_x + dx, origin_y + dy))
            .filter(|&(x, y)| grid.in_bounds(x, y))
            .map(|(x, y)| {
                let (x, y) = (x as usize, y as usize);
                if grid.is_occupied_at(x, y) {
                    overlaps += 1;
                }
                (x, y)
            })
            .collect();

        Some(Placement {
            origin_x,
            origin_y,
            cells,
            overlaps,
            pinned_to_top,
        })
    }

    /// Write a resolved placement. Returns the number of cells written; cells that do not
    /// fit `grid` are skipped.
    pub fn commit(grid: &mut Grid, placement: &Placement, color: Rgba) -> usize {
        placement
            .cells
            .iter()
            .filter(|&&(x, y)| grid.set(x, y, color).is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SandColor;
    use crate::shape::BlockKind;
    use proptest::prelude::*;

    fn vertical_pair() -> BlockShape {
        BlockShape::new(vec![(0, 0), (0, 1)])
    }

    #[test]
    fn test_origin_rounds_half_to_even() {
        let shape = BlockShape::from_kind(BlockKind::Square, 7);
        // centre 6.5 rounds to 6
        assert_eq!(PlacementResolver::origin_for_anchor(&shape, (20, 30)), (14, 24));
        let pair = vertical_pair();
        // centre (0, 0.5) rounds to (0, 0)
        assert_eq!(PlacementResolver::origin_for_anchor(&pair, (3, 3)), (3, 3));
    }

    #[test]
    fn test_lands_on_anchor_row_when_free() {
        let grid = Grid::new(5, 6);
        let p = PlacementResolver::resolve(&grid, &vertical_pair(), (2, 1)).unwrap();
        assert_eq!(p.cells, vec![(2, 1), (2, 2)]);
        assert_eq!(p.overlaps, 0);
        assert!(!p.pinned_to_top);
    }

    #[test]
    fn test_probes_upward_past_sand() {
        let mut grid = Grid::new(3, 6);
        for y in 3..6 {
            grid.set(1, y, Rgba::WHITE).unwrap();
        }
        let p = PlacementResolver::resolve(&grid, &vertical_pair(), (1, 4)).unwrap();
        assert_eq!(p.cells, vec![(1, 1), (1, 2)]);
        assert_eq!(p.overlaps, 0);
    }

    #[test]
    fn test_off_grid_columns_collide() {
        let grid = Grid::new(3, 4);
        let wide = BlockShape::new(vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert!(PlacementResolver::has_collision(&grid, &wide, 0, 2));
        // Off-grid rows do not.
        assert!(!PlacementResolver::has_collision(&grid, &vertical_pair(), 0, -1));
        assert!(!PlacementResolver::has_collision(&grid, &vertical_pair(), 0, 3));
    }

    #[test]
    fn test_full_column_pins_shape_to_row_zero() {
        let mut grid = Grid::new(3, 4);
        for y in 0..4 {
            grid.set(1, y, SandColor::Red.rgba()).unwrap();
        }
        let p = PlacementResolver::resolve(&grid, &vertical_pair(), (1, 3)).unwrap();
        assert_eq!(p.origin_y, 0);
        assert_eq!(p.cells, vec![(1, 0), (1, 1)]);
        assert_eq!(p.overlaps, 2);
        let written = PlacementResolver::commit(&mut grid, &p, SandColor::Blue.rgba());
        assert_eq!(written, 2);
        assert_eq!(grid.get(1, 0).unwrap().color(), SandColor::Blue.rgba());
    }

    #[test]
    fn test_commit_counts_only_cells_on_the_grid() {
        let big = Grid::new(6, 6);
        let p = PlacementResolver::resolve(&big, &vertical_pair(), (5, 4)).unwrap();
        assert_eq!(p.cells, vec![(5, 4), (5, 5)]);
        let mut small = Grid::new(3, 5);
        assert_eq!(PlacementResolver::commit(&mut small, &p, Rgba::WHITE), 0);
        assert_eq!(small.occupied_count(), 0);
        let p = PlacementResolver::resolve(&big, &vertical_pair(), (1, 4)).unwrap();
        assert_eq!(PlacementResolver::commit(&mut small, &p, Rgba::WHITE), 1);
    }

    #[test]
    fn test_shape_above_top_is_pushed_down() {
        let grid = Grid::new(4, 8);
        let p = PlacementResolver::resolve(&grid, &vertical_pair(), (1, -5)).unwrap();
        assert!(p.pinned_to_top);
        assert_eq!(p.cells, vec![(1, 0), (1, 1)]);
    }

    #[test]
    fn test_shape_below_floor_is_raised() {
        let grid = Grid::new(4, 8);
        let p = PlacementResolver::resolve(&grid, &vertical_pair(), (1, 20)).unwrap();
        assert_eq!(p.cells, vec![(1, 6), (1, 7)]);
    }

    #[test]
    fn test_empty_shape_resolves_to_nothing() {
        let grid = Grid::new(4, 8);
        assert!(PlacementResolver::resolve(&grid, &BlockShape::default(), (1, 1)).is_none());
    }

    proptest! {
        #[test]
        fn prop_placement_never_overlaps_when_room_exists(
            kind_idx in 0usize..BlockKind::ALL.len(),
            ax in 3i32..27,
            ay in 0i32..40,
            pile in proptest::collection::vec(0usize..30, 0..60),
        ) {
            let mut grid = Grid::new(30, 40);
            // Sand only in the bottom half leaves room above for any 2-scale block.
            for (i, x) in pile.into_iter().enumerate() {
                grid.set(x, 39 - (i % 20), Rgba::WHITE).unwrap();
            }
            let shape = BlockShape::from_kind(BlockKind::ALL[kind_idx], 2);
            let p = PlacementResolver::resolve(&grid, &shape, (ax, ay)).unwrap();
            prop_assert_eq!(p.overlaps, 0);
            let before = grid.occupied_count();
            PlacementResolver::commit(&mut grid, &p, SandColor::Green.rgba());
            prop_assert_eq!(grid.occupied_count(), before + p.cells.len());
        }
    }
}
