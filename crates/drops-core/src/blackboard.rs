//! Grid state store shared between the update task and planner-side readers.
//!
//! The environment data and the moving-obstacle points each sit behind their own lock.
//! Writers publish fully computed values, so a reader holding [`GridStore::read_grid`]
//! always sees one complete cycle, never a half-built grid.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use drops_navigation::{CostGrid, MovingObstaclePoints};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::error::StateError;

/// A robot or goal pose in grid cells and degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridPose {
    pub x: i32,
    pub y: i32,
    pub theta: i32,
}

impl GridPose {
    pub const fn new(x: i32, y: i32, theta: i32) -> Self {
        Self { x, y, theta }
    }
}

/// The published environment: grid geometry, baseline cost grid, robot pose and goal.
///
/// `grid` is the baseline from the most recent full rebuild; moving obstacles are reported
/// separately through [`MovingObstaclePoints`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvData {
    pub height: usize,
    pub width: usize,
    pub start_x: i32,
    pub start_y: i32,
    pub start_theta: i32,
    pub end_x: i32,
    pub end_y: i32,
    pub end_theta: i32,
    pub grid: Arc<CostGrid>,
}

impl EnvData {
    pub fn start(&self) -> GridPose {
        GridPose::new(self.start_x, self.start_y, self.start_theta)
    }

    pub fn goal(&self) -> GridPose {
        GridPose::new(self.end_x, self.end_y, self.end_theta)
    }

    fn set_start(&mut self, pose: GridPose) {
        self.start_x = pose.x;
        self.start_y = pose.y;
        self.start_theta = pose.theta;
    }

    fn set_goal(&mut self, pose: GridPose) {
        self.end_x = pose.x;
        self.end_y = pose.y;
        self.end_theta = pose.theta;
    }
}

/// What a successful cycle changes in [`EnvData`].
#[derive(Debug)]
pub enum EnvUpdate {
    /// New geometry, baseline grid, goal and pose.
    Rebuild {
        grid: CostGrid,
        goal: GridPose,
        start: GridPose,
    },
    /// Pose only.
    Refresh { start: GridPose },
}

/// Scoped read access to the published environment. Released on drop.
pub type GridReadGuard<'a> = RwLockReadGuard<'a, EnvData>;

/// Owner of the published environment and the moving-obstacle delta.
#[derive(Debug, Default)]
pub struct GridStore {
    env: RwLock<EnvData>,
    points: Mutex<MovingObstaclePoints>,
    published: AtomicBool,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the published environment; the default (empty) value before the first cycle.
    ///
    /// Reads are recursive so a caller already holding [`GridStore::read_grid`] never queues
    /// behind a waiting publisher that is itself waiting on that caller's guard.
    pub fn snapshot(&self) -> EnvData {
        self.env.read_recursive().clone()
    }

    /// Copy of the published environment, or [`StateError::NotReady`] before the first cycle.
    pub fn try_snapshot(&self) -> Result<EnvData, StateError> {
        if !self.has_published() {
            return Err(StateError::NotReady);
        }
        Ok(self.snapshot())
    }

    /// Holds off publishers until the guard is dropped. May be nested on one thread.
    pub fn read_grid(&self) -> GridReadGuard<'_> {
        self.env.read_recursive()
    }

    /// Shared handle to the current baseline grid.
    pub fn baseline(&self) -> Arc<CostGrid> {
        Arc::clone(&self.env.read_recursive().grid)
    }

    pub fn updated_points(&self) -> MovingObstaclePoints {
        self.points.lock().clone()
    }

    pub fn has_published(&self) -> bool {
        self.published.load(Ordering::Acquire)
    }

    /// Publishes one cycle's results.
    ///
    /// Both locks are taken in turn, never together, and only for the swap itself.
    pub fn publish(&self, update: EnvUpdate, points: MovingObstaclePoints) {
        {
            let mut env = self.env.write();
            match update {
                EnvUpdate::Rebuild { grid, goal, start } => {
                    env.width = grid.width();
                    env.height = grid.height();
                    env.grid = Arc::new(grid);
                    env.set_goal(goal);
                    env.set_start(start);
                }
                EnvUpdate::Refresh { start } => env.set_start(start),
            }
        }
        *self.points.lock() = points;
        self.published.store(true, Ordering::Release);
    }
}
