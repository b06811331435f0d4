//! Boundary to the downstream motion planner.
//!
//! The search itself lives outside this crate. What lives here is how a published delta is
//! handed over: an incremental planner is told exactly which cells changed, a full-replan
//! planner is only told that costs changed somewhere.

#![warn(missing_docs)]

use crate::delta::MovingObstaclePoints;
use crate::map::GridPoint;

/// A planner that can repair its search tree from a list of changed cells.
pub trait IncrementalPlanner {
    /// Called with every changed cell and its new cost, sorted row-major.
    fn notify_changed(&mut self, cells: &[(GridPoint, u8)]);
}

/// A planner that restarts its search whenever costs change.
pub trait FullReplanPlanner {
    /// Called once per cycle in which any cost changed.
    fn costs_changed(&mut self);
}

/// The planner variant in use.
#[derive(Debug)]
pub enum PlannerKind<I, F> {
    /// Planner that consumes per-cell changes.
    Incremental(I),
    /// Planner that replans from scratch.
    FullReplan(F),
}

impl<I: IncrementalPlanner, F: FullReplanPlanner> PlannerKind<I, F> {
    /// Forwards a cycle's moving-obstacle delta to the planner.
    ///
    /// Returns `true` if the planner was notified. An empty delta notifies nobody.
    pub fn apply_delta(&mut self, points: &MovingObstaclePoints) -> bool {
        if points.is_empty() {
            return false;
        }
        match self {
            PlannerKind::Incremental(planner) => planner.notify_changed(&points.changed_cells()),
            PlannerKind::FullReplan(planner) => planner.costs_changed(),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Repairing {
        seen: Vec<(GridPoint, u8)>,
    }

    impl IncrementalPlanner for Repairing {
        fn notify_changed(&mut self, cells: &[(GridPoint, u8)]) {
            self.seen.extend_from_slice(cells);
        }
    }

    #[derive(Default)]
    struct Restarting {
        restarts: usize,
    }

    impl FullReplanPlanner for Restarting {
        fn costs_changed(&mut self) {
            self.restarts += 1;
        }
    }

    fn delta() -> MovingObstaclePoints {
        [(GridPoint::new(2, 1), 90), (GridPoint::new(0, 0), 255)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_incremental_planner_receives_cells() {
        let mut planner: PlannerKind<Repairing, Restarting> =
            PlannerKind::Incremental(Repairing::default());
        assert!(planner.apply_delta(&delta()));

        let PlannerKind::Incremental(inner) = planner else {
            panic!("variant changed");
        };
        assert_eq!(
            inner.seen,
            vec![(GridPoint::new(0, 0), 255), (GridPoint::new(2, 1), 90)]
        );
    }

    #[test]
    fn test_full_replan_planner_is_poked_once() {
        let mut planner: PlannerKind<Repairing, Restarting> =
            PlannerKind::FullReplan(Restarting::default());
        assert!(planner.apply_delta(&delta()));
        assert!(!planner.apply_delta(&MovingObstaclePoints::new()));

        let PlannerKind::FullReplan(inner) = planner else {
            panic!("variant changed");
        };
        assert_eq!(inner.restarts, 1);
    }
}
