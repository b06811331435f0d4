//! Map-related functionality for the planner pipeline.
//!
//! This module provides the dense cost grid, the obstacle and inflation types that feed it,
//! and the grid point type shared with the moving-obstacle delta tracker.

pub mod costmap;
pub mod obstacle;
pub mod point_types;

pub use costmap::{COST_FREE, COST_OBSTACLE, CostGrid, MAX_GRID_CELLS, cell_cost};
pub use obstacle::{DEFAULT_INFLATION_RADIUS, DEFAULT_INFLATION_WEIGHT, InflationParams, Obstacle};
pub use point_types::GridPoint;
