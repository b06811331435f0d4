#![warn(missing_docs)]
#![doc = "Cost-grid construction for the DROPS planner pipeline."]
#![doc = ""]
#![doc = "This crate turns obstacle lists into inflated byte cost grids and tracks the sparse"]
#![doc = "set of cells moving obstacles change between update cycles."]

pub mod delta;
pub mod error;
pub mod map;
pub mod planner;

pub use delta::{MovingObstaclePoints, UpdateMode};
pub use error::NavigationError;
pub use map::{CostGrid, GridPoint, InflationParams, Obstacle};
