//! Colour bridges: a same-colour path from the left edge to the right edge, plus every
//! same-colour grain connected to it.

use crate::color::{DEFAULT_COLOR_TOLERANCE, Rgba};
use crate::grid::Grid;
use std::collections::{HashSet, VecDeque};

/// Default points awarded per cleared grain.
pub const DEFAULT_POINTS_PER_CELL: u32 = 10;

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const NEIGHBOURS_8: [(i32, i32); 8] = [
    (0, -1),
    (0, 1),
    (-1, 0),
    (1, 0),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// One scoring colour region found in a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRegion {
    /// Colour read at the left-edge start cell.
    pub color: Rgba,
    /// Shortest (hop count) path from the start cell to the right edge.
    pub path: Vec<(usize, usize)>,
    /// Path plus everything of matching colour reachable from it.
    pub cells: HashSet<(usize, usize)>,
    pub score: u32,
}

/// Result of one scoring pass over the grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScorePass {
    pub regions: Vec<BridgeRegion>,
    /// Union of every region's cells.
    pub removal: HashSet<(usize, usize)>,
    pub total: u32,
}

impl ScorePass {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Finds bridge regions. Pure: never mutates the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectivityScorer {
    pub points_per_cell: u32,
    /// 8-neighbour connectivity when true, 4-neighbour otherwise.
    pub allow_diagonal: bool,
    /// Per-channel colour tolerance.
    pub tolerance: f32,
}

impl Default for ConnectivityScorer {
    fn default() -> Self {
        Self {
            points_per_cell: DEFAULT_POINTS_PER_CELL,
            allow_diagonal: true,
            tolerance: DEFAULT_COLOR_TOLERANCE,
        }
    }
}

impl ConnectivityScorer {
    fn directions(&self) -> &'static [(i32, i32)] {
        if self.allow_diagonal {
            &NEIGHBOURS_8
        } else {
            &NEIGHBOURS_4
        }
    }

    /// Occupied, in-bounds and colour-matching.
    fn accepts(&self, grid: &Grid, x: i32, y: i32, color: &Rgba) -> bool {
        grid.in_bounds(x, y) && {
            let cell = grid.cell(x as usize, y as usize);
            cell.is_occupied() && cell.color().matches(color, self.tolerance)
        }
    }

    /// BFS from `start` to any cell in the rightmost column.
    pub fn find_path_to_right_edge(
        &self,
        grid: &Grid,
        start: (usize, usize),
        color: &Rgba,
    ) -> Option<Vec<(usize, usize)>> {
        let (w, h) = (grid.width(), grid.height());
        if start.0 >= w || start.1 >= h || !grid.cell(start.0, start.1).is_occupied() {
            return None;
        }
        let idx = |x: usize, y: usize| y * w + x;
        let mut parent: Vec<Option<usize>> = vec![None; w * h];
        let mut visited = vec![false; w * h];
        let mut queue = VecDeque::new();
        visited[idx(start.0, start.1)] = true;
        queue.push_back(start);

        while let Some((x, y)) = queue.pop_front() {
            if x == w - 1 {
                let mut path = vec![(x, y)];
                let mut cur = idx(x, y);
                while let Some(p) = parent[cur] {
                    path.push((p % w, p / w));
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            for &(dx, dy) in self.directions() {
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                if !self.accepts(grid, nx, ny, color) {
                    continue;
                }
                let n = idx(nx as usize, ny as usize);
                if !visited[n] {
                    visited[n] = true;
                    parent[n] = Some(idx(x, y));
                    queue.push_back((nx as usize, ny as usize));
                }
            }
        }
        None
    }

    /// Flood fill from every seed cell over matching, occupied neighbours.
    pub fn grow_region(
        &self,
        grid: &Grid,
        color: &Rgba,
        seeds: &[(usize, usize)],
    ) -> HashSet<(usize, usize)> {
        let mut region: HashSet<(usize, usize)> = seeds.iter().copied().collect();
        let mut queue: VecDeque<(usize, usize)> = region.iter().copied().collect();
        while let Some((x, y)) = queue.pop_front() {
            for &(dx, dy) in self.directions() {
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                if self.accepts(grid, nx, ny, color) && region.insert((nx as usize, ny as usize)) {
                    queue.push_back((nx as usize, ny as usize));
                }
            }
        }
        region
    }

    /// Every bridge region, scanning left-edge cells top to bottom. A colour scores at
    /// most once per pass; cells already claimed by an earlier region are not restarts.
    pub fn find_bridge_regions(&self, grid: &Grid) -> Vec<BridgeRegion> {
        let mut regions: Vec<BridgeRegion> = Vec::new();
        let mut processed: Vec<Rgba> = Vec::new();
        if grid.width() == 0 {
            return regions;
        }
        for y in 0..grid.height() {
            let cell = grid.cell(0, y);
            if !cell.is_occupied() {
                continue;
            }
            let color = cell.color();
            if processed.contains(&color) || regions.iter().any(|r| r.cells.contains(&(0, y))) {
                continue;
            }
            let Some(path) = self.find_path_to_right_edge(grid, (0, y), &color) else {
                continue;
            };
            processed.push(color);
            let cells = self.grow_region(grid, &color, &path);
            let score = u32::try_from(cells.len())
                .unwrap_or(u32::MAX)
                .saturating_mul(self.points_per_cell);
            regions.push(BridgeRegion {
                color,
                path,
                cells,
                score,
            });
        }
        regions
    }

    /// Regions, their union, and the pass total. Scores saturate at `u32::MAX`.
    pub fn evaluate(&self, grid: &Grid) -> ScorePass {
        let regions = self.find_bridge_regions(grid);
        let mut removal = HashSet::new();
        let mut total: u32 = 0;
        for region in &regions {
            total = total.saturating_add(region.score);
            removal.extend(region.cells.iter().copied());
        }
        ScorePass {
            regions,
            removal,
            total,
        }
    }
}
