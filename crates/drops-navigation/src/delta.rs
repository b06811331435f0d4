//! Sparse tracking of the cells moving obstacles change.
//!
//! A full grid rebuild is expensive, so moving obstacles are kept out of the baseline grid
//! and tracked here instead. Every cycle [`MovingObstaclePoints::advance`] produces the cells
//! moving obstacles touch this cycle, valued at the higher of the baseline and the obstacle
//! cost, plus, for exactly one cycle, the cells that just fell back to baseline (carrying the
//! baseline value so an incremental planner can restore them). Cells that never differed
//! from the baseline are dropped as soon as no obstacle touches them.

#![warn(missing_docs)]

use std::collections::HashMap;

use tracing::trace;

use crate::map::costmap::for_each_stamped_cell;
use crate::map::{CostGrid, GridPoint, InflationParams, Obstacle};

/// How a cycle treats the baseline grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateMode {
    /// Dimensions or static layout changed: the baseline was rebuilt from scratch.
    Rebuild,
    /// Only the robot pose and moving obstacles were refreshed.
    Refresh,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::Rebuild => write!(f, "rebuild"),
            UpdateMode::Refresh => write!(f, "refresh"),
        }
    }
}

/// Sparse map from cell to the cost last published for it on behalf of moving obstacles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovingObstaclePoints {
    points: HashMap<GridPoint, u8>,
}

impl MovingObstaclePoints {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked cells.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no cell is tracked.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The cost tracked for a cell, if any.
    pub fn get(&self, p: GridPoint) -> Option<u8> {
        self.points.get(&p).copied()
    }

    /// Whether a cell is tracked.
    pub fn contains(&self, p: GridPoint) -> bool {
        self.points.contains_key(&p)
    }

    /// Iterates over tracked cells in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPoint, u8)> + '_ {
        self.points.iter().map(|(p, c)| (*p, *c))
    }

    /// Tracked cells sorted row-major, the order planners expect changed cells in.
    pub fn changed_cells(&self) -> Vec<(GridPoint, u8)> {
        let mut cells: Vec<_> = self.iter().collect();
        cells.sort_unstable_by_key(|(p, _)| (p.y, p.x));
        cells
    }

    /// Raises the cost of a cell, inserting it if untracked.
    fn merge(&mut self, p: GridPoint, cost: u8) {
        self.points
            .entry(p)
            .and_modify(|c| *c = (*c).max(cost))
            .or_insert(cost);
    }

    /// Computes the next cycle's map.
    ///
    /// * On a [`UpdateMode::Rebuild`] the carried entries are dropped, since `baseline` is brand new.
    /// * On a [`UpdateMode::Refresh`] each carried entry that already equals the baseline is
    ///   removed; the rest are reset to the baseline value so that, unless a moving obstacle
    ///   touches them again, they are published once as a restore and dropped next cycle.
    ///
    /// The moving obstacles are then stamped cell by cell with max-merge. Only in-bounds cells
    /// are kept, and each is raised to at least its baseline cost so a planner applying the
    /// delta never lowers a static hazard. Those stamps are unioned over the carried entries,
    /// which act as a floor.
    ///
    /// `baseline` must be the grid from the most recent full rebuild.
    pub fn advance(
        &self,
        mode: UpdateMode,
        baseline: &CostGrid,
        moving: &[Obstacle],
        inflation: &InflationParams,
    ) -> Self {
        let mut next = match mode {
            UpdateMode::Rebuild => Self::new(),
            UpdateMode::Refresh => self.decay(baseline),
        };
        let carried = next.len();

        let stamped = Self::stamp(baseline, moving, inflation);
        for (p, cost) in stamped.points {
            next.merge(p, cost);
        }

        trace!(
            %mode,
            previous = self.len(),
            carried,
            tracked = next.len(),
            "advanced moving obstacle points"
        );
        next
    }

    fn decay(&self, baseline: &CostGrid) -> Self {
        let points = self
            .points
            .iter()
            .filter_map(|(&p, &cost)| {
                let base = baseline.get_cost(p).ok()?;
                (cost != base).then_some((p, base))
            })
            .collect();
        Self { points }
    }

    fn stamp(baseline: &CostGrid, moving: &[Obstacle], inflation: &InflationParams) -> Self {
        let mut stamped = Self::new();
        let (width, height) = (baseline.width(), baseline.height());
        for obstacle in moving {
            for_each_stamped_cell(obstacle, inflation, width, height, |x, y, cost| {
                let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                    return;
                };
                let p = GridPoint::new(x, y);
                if baseline.contains(p) {
                    stamped.merge(p, cost);
                }
            });
        }
        for (p, cost) in stamped.points.iter_mut() {
            *cost = (*cost).max(baseline.get_cost(*p).unwrap_or_default());
        }
        stamped
    }
}

impl FromIterator<(GridPoint, u8)> for MovingObstaclePoints {
    fn from_iter<I: IntoIterator<Item = (GridPoint, u8)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::COST_OBSTACLE;

    fn inflation(radius: i32, weight: f64) -> InflationParams {
        InflationParams::new(radius, weight).unwrap()
    }

    fn baseline_5x5() -> CostGrid {
        CostGrid::from_obstacles(5, 5, &[Obstacle::stationary(2, 2, 1)], &inflation(1, 1.0))
            .unwrap()
    }

    #[test]
    fn test_moving_obstacle_marks_cells() {
        let baseline = baseline_5x5();
        let mover = Obstacle::new(0, 0, 1, 0, 1);

        let points = MovingObstaclePoints::new().advance(
            UpdateMode::Refresh,
            &baseline,
            &[mover],
            &inflation(1, 1.0),
        );

        assert_eq!(points.get(GridPoint::new(0, 0)), Some(COST_OBSTACLE));
        assert_eq!(points.get(GridPoint::new(1, 0)), Some(COST_OBSTACLE));
        assert_eq!(points.get(GridPoint::new(0, 1)), Some(COST_OBSTACLE));
        // Decayed halo cells.
        assert_eq!(points.get(GridPoint::new(1, 1)), Some(168));
        assert_eq!(points.get(GridPoint::new(2, 0)), Some(93));
        assert_eq!(points.get(GridPoint::new(0, 2)), Some(93));
        assert_eq!(points.len(), 6);
        // Nothing outside the grid is ever tracked.
        assert!(points.iter().all(|(p, _)| baseline.contains(p)));
    }

    #[test]
    fn test_touched_cells_never_drop_below_baseline() {
        let baseline = baseline_5x5();
        let params = inflation(1, 1.0);
        // A point-sized mover on top of the static obstacle; its halo is weaker than the
        // static footprint everywhere it reaches.
        let mover = Obstacle::new(2, 2, 0, 90, 2);

        let points = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[mover], &params);
        assert_eq!(points.len(), 5);
        for (p, cost) in points.iter() {
            assert_eq!(cost, baseline.get_cost(p).unwrap());
        }

        // Nothing ever differed from baseline, so there is nothing to restore.
        let next = points.advance(UpdateMode::Refresh, &baseline, &[], &params);
        assert!(next.is_empty());
    }

    #[test]
    fn test_out_of_bounds_contributions_are_dropped() {
        let baseline = CostGrid::new(3, 3).unwrap();
        let mover = Obstacle::new(-2, 1, 1, 0, 1);
        let points = MovingObstaclePoints::new().advance(
            UpdateMode::Refresh,
            &baseline,
            &[mover],
            &inflation(1, 1.0),
        );
        // Distance 2 from (0, 1) is the halo edge, so only that cell is reached.
        assert_eq!(points.changed_cells(), vec![(GridPoint::new(0, 1), 93)]);
    }

    #[test]
    fn test_rebuild_discards_carried_points() {
        let baseline = CostGrid::new(5, 5).unwrap();
        let prev: MovingObstaclePoints = [(GridPoint::new(4, 4), 200)].into_iter().collect();

        let next = prev.advance(UpdateMode::Rebuild, &baseline, &[], &inflation(1, 1.0));
        assert!(next.is_empty());
    }

    #[test]
    fn test_refresh_restores_then_forgets() {
        let baseline = baseline_5x5();
        let params = inflation(1, 1.0);
        let mover = Obstacle::new(0, 0, 1, 0, 1);

        let first = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[mover], &params);
        assert!(!first.is_empty());

        // Obstacle gone: cells that differed from baseline are published once at their
        // baseline value, cells that already matched are dropped.
        let second = first.advance(UpdateMode::Refresh, &baseline, &[], &params);
        assert_eq!(
            second.changed_cells(),
            vec![
                (GridPoint::new(0, 0), 0),
                (GridPoint::new(1, 0), 0),
                (GridPoint::new(0, 1), 0),
            ]
        );

        // And then dropped.
        let third = second.advance(UpdateMode::Refresh, &baseline, &[], &params);
        assert!(third.is_empty());
    }

    #[test]
    fn test_stationary_mover_keeps_its_cells() {
        let baseline = CostGrid::new(10, 10).unwrap();
        let params = inflation(2, 0.8);
        let mover = Obstacle::new(5, 5, 1, 45, 1);

        let first = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[mover], &params);
        let second = first.advance(UpdateMode::Refresh, &baseline, &[mover], &params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_moving_obstacle_leaves_trail_for_one_cycle() {
        let baseline = CostGrid::new(12, 12).unwrap();
        let params = inflation(1, 1.0);

        let mut points = MovingObstaclePoints::new();
        for x in [2, 6, 10] {
            points = points.advance(
                UpdateMode::Refresh,
                &baseline,
                &[Obstacle::new(x, 5, 1, 0, 4)],
                &params,
            );
        }
        // Current footprint at x = 10, restore marks from x = 6, nothing left of x = 2.
        assert_eq!(points.get(GridPoint::new(10, 5)), Some(COST_OBSTACLE));
        assert_eq!(points.get(GridPoint::new(6, 5)), Some(0));
        assert!(!points.contains(GridPoint::new(2, 5)));

        for _ in 0..2 {
            points = points.advance(UpdateMode::Refresh, &baseline, &[], &params);
        }
        assert!(points.is_empty());
    }

    #[test]
    fn test_overlapping_movers_max_merge() {
        let baseline = CostGrid::new(10, 10).unwrap();
        let params = inflation(3, 0.5);
        let a = Obstacle::new(3, 4, 1, 0, 1);
        let b = Obstacle::new(6, 4, 1, 0, 1);

        let only_a = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[a], &params);
        let only_b = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[b], &params);
        let both = MovingObstaclePoints::new().advance(UpdateMode::Refresh, &baseline, &[a, b], &params);

        for (p, cost) in both.iter() {
            let expected = only_a.get(p).unwrap_or(0).max(only_b.get(p).unwrap_or(0));
            assert_eq!(cost, expected, "at {p}");
        }
        assert!(only_a.iter().all(|(p, _)| both.contains(p)));
        assert!(only_b.iter().all(|(p, _)| both.contains(p)));
    }

    #[test]
    fn test_changed_cells_are_row_major() {
        let points: MovingObstaclePoints = [
            (GridPoint::new(3, 1), 10),
            (GridPoint::new(0, 2), 20),
            (GridPoint::new(1, 1), 30),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            points.changed_cells(),
            vec![
                (GridPoint::new(1, 1), 30),
                (GridPoint::new(3, 1), 10),
                (GridPoint::new(0, 2), 20),
            ]
        );
    }

    #[test]
    fn test_huge_mover_is_bounded_by_grid() {
        let baseline = CostGrid::new(4, 4).unwrap();
        let points = MovingObstaclePoints::new().advance(
            UpdateMode::Refresh,
            &baseline,
            &[Obstacle::new(1, 1, 1_000_000_000, 0, 3)],
            &InflationParams::default(),
        );
        assert_eq!(points.len(), 16);
        assert!(points.iter().all(|(_, cost)| cost == COST_OBSTACLE));

        let far = MovingObstaclePoints::new().advance(
            UpdateMode::Refresh,
            &baseline,
            &[Obstacle::new(i32::MAX, i32::MAX, 3, 0, 3)],
            &InflationParams::default(),
        );
        assert!(far.is_empty());
    }
}
