//! Cost grid implementation for the planner pipeline.
//!
//! This module provides the dense byte grid the planner consumes, the pure cost function
//! that turns an obstacle into a decaying cost halo, and the rasterizer that stamps a set
//! of obstacles onto a grid. Costs only ever ratchet upward while stamping: overlapping
//! obstacles compound by taking the maximum, never by summing.

#![warn(missing_docs)]

use super::{GridPoint, InflationParams, Obstacle};
use crate::error::NavigationError;

/// Cost of a cell inside an obstacle's physical footprint.
pub const COST_OBSTACLE: u8 = 255;

/// Cost of a cell no obstacle reaches.
pub const COST_FREE: u8 = 0;

/// Peak cost of the inflation halo, one below a full obstacle.
const COST_HALO_PEAK: f64 = (COST_OBSTACLE - 1) as f64;

/// Largest grid, in cells, that will be allocated.
pub const MAX_GRID_CELLS: usize = 1 << 26;

/// Computes the cost an obstacle contributes to a single cell.
///
/// Cells within the physical radius are [`COST_OBSTACLE`]. Cells beyond the physical radius
/// plus the inflation radius are [`COST_FREE`]. In between the cost decays exponentially
/// with distance from the footprint edge: `round(254 * exp(-weight * (distance - radius)))`.
///
/// # Arguments
/// * `obstacle` - The obstacle contributing cost
/// * `cell` - The cell being evaluated
/// * `inflation` - Halo width and decay steepness
pub fn cell_cost(obstacle: &Obstacle, cell: GridPoint, inflation: &InflationParams) -> u8 {
    cost_at(obstacle, i64::from(cell.x), i64::from(cell.y), inflation)
}

fn cost_at(obstacle: &Obstacle, x: i64, y: i64, inflation: &InflationParams) -> u8 {
    let dx = i128::from(x - i64::from(obstacle.x));
    let dy = i128::from(y - i64::from(obstacle.y));
    let d2 = dx * dx + dy * dy;

    let radius = i128::from(obstacle.radius.max(0));
    if d2 <= radius * radius {
        return COST_OBSTACLE;
    }

    let outer = radius + i128::from(inflation.radius());
    if d2 > outer * outer {
        return COST_FREE;
    }

    let distance = (d2 as f64).sqrt();
    let factor = (-inflation.weight() * (distance - radius as f64)).exp();
    (COST_HALO_PEAK * factor).round().clamp(0.0, f64::from(COST_OBSTACLE)) as u8
}

/// Quadrant coordinates along one axis that can affect cells in `lo..=hi`.
///
/// The quadrant is `origin - reach ..= origin` and each coordinate `q` also stands for its
/// reflection `2 * origin - q`. Every `q` with either image inside the window is kept. The
/// coordinates whose images both miss the window fall into at most three runs that clamp
/// onto the same edge cells; only the member of each run nearest the origin is kept, since
/// it dominates the rest of its run. The result is sorted and bounded by the window size.
fn quadrant_axis(origin: i64, reach: i64, lo: i64, hi: i64) -> Vec<i64> {
    let (q_lo, q_hi) = (origin - reach, origin);
    let mirror = |q: i64| 2 * origin - q;
    let mut coords = Vec::new();

    for (from, to) in [(lo, hi), (mirror(hi), mirror(lo))] {
        let (from, to) = (from.max(q_lo), to.min(q_hi));
        if from <= to {
            coords.extend(from..=to);
        }
    }

    // (exclusive lower bound, exclusive upper bound) of each run that misses the window.
    let runs = [
        (mirror(lo), lo),
        (i64::MIN, lo.min(mirror(hi))),
        (hi, mirror(hi)),
    ];
    for (below, above) in runs {
        let nearest = (above - 1).min(q_hi);
        if nearest > below && nearest >= q_lo {
            coords.push(nearest);
        }
    }

    coords.sort_unstable();
    coords.dedup();
    coords
}

/// Visits every cell an obstacle gives a non-zero cost to that can matter to a
/// `width` by `height` grid.
///
/// Only the lower-left quadrant of the bounding box is evaluated; the other three are
/// derived by reflecting through the obstacle center. Reflected coordinates are passed
/// through unclipped, so `visit` decides how out-of-range cells are handled: clamping onto
/// the edge and dropping both see the same result as walking the whole footprint. When a
/// reflection lands on the same cell (on the center row or column) that cell is visited
/// more than once with the same cost.
pub(crate) fn for_each_stamped_cell<F>(
    obstacle: &Obstacle,
    inflation: &InflationParams,
    width: usize,
    height: usize,
    mut visit: F,
) where
    F: FnMut(i64, i64, u8),
{
    if width == 0 || height == 0 {
        return;
    }
    let ox = i64::from(obstacle.x);
    let oy = i64::from(obstacle.y);
    let reach = i64::from(obstacle.radius.max(0)) + i64::from(inflation.radius());

    let xs = quadrant_axis(ox, reach, 0, width as i64 - 1);
    let ys = quadrant_axis(oy, reach, 0, height as i64 - 1);

    for &x in &xs {
        let mirror_x = 2 * ox - x;
        for &y in &ys {
            let cost = cost_at(obstacle, x, y, inflation);
            if cost == COST_FREE {
                continue;
            }
            let mirror_y = 2 * oy - y;
            visit(x, y, cost);
            visit(mirror_x, y, cost);
            visit(x, mirror_y, cost);
            visit(mirror_x, mirror_y, cost);
        }
    }
}

/// A dense 2D cost grid stored row-major (`x + y * width`).
///
/// The grid owns one contiguous buffer; every accessor is bounds checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostGrid {
    /// Width of the grid in cells
    width: usize,
    /// Height of the grid in cells
    height: usize,
    /// Cost of every cell, row-major
    data: Vec<u8>,
}

impl CostGrid {
    /// Creates a free (all zero) grid with the specified dimensions.
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The grid or an error if the dimensions are invalid,
    ///   exceed [`MAX_GRID_CELLS`], or the buffer cannot be allocated
    pub fn new(width: usize, height: usize) -> Result<Self, NavigationError> {
        if width == 0 || height == 0 {
            return Err(NavigationError::InvalidDimensions(
                "Width and height must be non-zero",
            ));
        }
        let cells = width
            .checked_mul(height)
            .filter(|&cells| cells <= MAX_GRID_CELLS)
            .ok_or(NavigationError::InvalidDimensions(
                "Grid dimensions exceed the maximum cell count",
            ))?;

        let mut data = Vec::new();
        data.try_reserve_exact(cells)
            .map_err(|_| NavigationError::InvalidDimensions("Grid buffer allocation failed"))?;
        data.resize(cells, COST_FREE);

        Ok(CostGrid {
            width,
            height,
            data,
        })
    }

    /// Builds a grid from scratch: allocates a free grid and stamps every obstacle onto it.
    pub fn from_obstacles(
        width: usize,
        height: usize,
        obstacles: &[Obstacle],
        inflation: &InflationParams,
    ) -> Result<Self, NavigationError> {
        let mut grid = Self::new(width, height)?;
        grid.rasterize(obstacles, inflation);
        Ok(grid)
    }

    /// Width of the grid in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the grid in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for the unallocated grid held before the first rebuild.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw row-major cell buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Whether the point lies inside the grid.
    pub fn contains(&self, p: GridPoint) -> bool {
        self.index(i64::from(p.x), i64::from(p.y)).is_some()
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        if x < self.width && y < self.height {
            Some(x + y * self.width)
        } else {
            None
        }
    }

    /// Gets the cost at a grid point.
    pub fn get_cost(&self, p: GridPoint) -> Result<u8, NavigationError> {
        self.index(i64::from(p.x), i64::from(p.y))
            .map(|i| self.data[i])
            .ok_or(NavigationError::OutOfBounds("Grid coordinates out of bounds"))
    }

    /// Stamps obstacles onto the grid, keeping the maximum cost at every cell.
    ///
    /// Coordinates that fall off the grid are clamped onto the nearest edge cell, each axis
    /// independently. Because every write is a max-merge, stamping order never matters.
    pub fn rasterize(&mut self, obstacles: &[Obstacle], inflation: &InflationParams) {
        if self.is_empty() {
            return;
        }
        let (width, height) = (self.width, self.height);
        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        for obstacle in obstacles {
            for_each_stamped_cell(obstacle, inflation, width, height, |x, y, cost| {
                let cx = x.clamp(0, max_x) as usize;
                let cy = y.clamp(0, max_y) as usize;
                let cell = &mut self.data[cx + cy * width];
                *cell = (*cell).max(cost);
            });
        }
    }
}

impl std::fmt::Display for CostGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CostGrid ({}x{})", self.width, self.height)?;
        for row in self.data.chunks(self.width.max(1)) {
            for cost in row {
                write!(f, "{:3} ", cost)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
