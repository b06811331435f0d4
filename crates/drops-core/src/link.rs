//! The environment link: runs fetch, rebuild or refresh, and publish cycles, and serves the
//! published results to planner-side readers.
//!
//! At most one cycle runs at a time. A trigger that arrives while a cycle is in flight is
//! dropped, never queued. A failed cycle publishes nothing; the previously published grid,
//! pose and moving-obstacle points stay valid.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use drops_navigation::{
    CostGrid, InflationParams, MovingObstaclePoints, NavigationError, UpdateMode,
};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::blackboard::{EnvData, EnvUpdate, GridReadGuard, GridStore};
use crate::bus::{Topic, UpdateEvent};
use crate::constants::EnvConstants;
use crate::error::{ConfigParseError, FailureKind, StateError, UpdateError};
use crate::fetch::FetchClient;
use crate::payload::{CycleSnapshot, read_is_changed};

/// Where the running cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CyclePhase {
    Idle = 0,
    Fetching = 1,
    Parsing = 2,
    Rebuilding = 3,
    Refreshing = 4,
    Publishing = 5,
}

impl CyclePhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CyclePhase::Fetching,
            2 => CyclePhase::Parsing,
            3 => CyclePhase::Rebuilding,
            4 => CyclePhase::Refreshing,
            5 => CyclePhase::Publishing,
            _ => CyclePhase::Idle,
        }
    }
}

/// Construction-time knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOptions {
    pub fetch_timeout: Duration,
    pub inflation: InflationParams,
    pub event_capacity: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            inflation: InflationParams::default(),
            event_capacity: 64,
        }
    }
}

/// Summary of one published cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub mode: UpdateMode,
    pub width: usize,
    pub height: usize,
    /// Entries in the published moving-obstacle points.
    pub changed_cells: usize,
}

struct Shared<C> {
    client: C,
    store: GridStore,
    constants: RwLock<EnvConstants>,
    inflation: Mutex<InflationParams>,
    updated: AtomicBool,
    in_progress: AtomicBool,
    force_full_next: AtomicBool,
    phase: AtomicU8,
    fetch_timeout: Duration,
    events: Topic<UpdateEvent>,
}

/// Releases the single-flight slot when the cycle ends, however it ends.
struct InFlight<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Drop for InFlight<C> {
    fn drop(&mut self) {
        self.shared
            .phase
            .store(CyclePhase::Idle as u8, Ordering::Release);
        self.shared.in_progress.store(false, Ordering::Release);
    }
}

/// Handle to the environment link. Cheap to clone; all clones share one state.
pub struct EnvironmentLink<C> {
    shared: Arc<Shared<C>>,
    runtime: Handle,
}

impl<C> Clone for EnvironmentLink<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            runtime: self.runtime.clone(),
        }
    }
}

impl<C: FetchClient> EnvironmentLink<C> {
    /// Creates a link whose background cycles run on `runtime`.
    pub fn new(client: C, options: LinkOptions, runtime: Handle) -> Self {
        let shared = Shared {
            client,
            store: GridStore::new(),
            constants: RwLock::new(EnvConstants::default()),
            inflation: Mutex::new(options.inflation),
            updated: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            force_full_next: AtomicBool::new(true),
            phase: AtomicU8::new(CyclePhase::Idle as u8),
            fetch_timeout: options.fetch_timeout,
            events: Topic::new(options.event_capacity),
        };
        Self {
            shared: Arc::new(shared),
            runtime,
        }
    }

    /// Starts a cycle in the background.
    ///
    /// Returns `false` and does nothing if a cycle is already running.
    pub fn trigger_update(&self) -> bool {
        let Some(slot) = self.claim() else {
            debug!("update already in flight, trigger dropped");
            return false;
        };
        self.runtime.spawn(Shared::run(slot));
        true
    }

    /// Runs one cycle on the caller's task.
    ///
    /// Fails with [`UpdateError::InFlight`] without side effects if a cycle is already running.
    pub async fn update(&self) -> Result<CycleReport, UpdateError> {
        let Some(slot) = self.claim() else {
            return Err(UpdateError::InFlight);
        };
        Shared::run(slot).await
    }

    fn claim(&self) -> Option<InFlight<C>> {
        self.shared
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.shared.updated.store(false, Ordering::Release);
        Some(InFlight {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn client(&self) -> &C {
        &self.shared.client
    }

    /// `true` once the most recent cycle published successfully.
    pub fn is_updated(&self) -> bool {
        self.shared.updated.load(Ordering::Acquire)
    }

    pub fn update_in_progress(&self) -> bool {
        self.shared.in_progress.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> CyclePhase {
        CyclePhase::from_u8(self.shared.phase.load(Ordering::Acquire))
    }

    /// Copy of the published environment; empty before the first successful cycle.
    pub fn get_env_data(&self) -> EnvData {
        self.shared.store.snapshot()
    }

    pub fn try_env_data(&self) -> Result<EnvData, StateError> {
        self.shared.store.try_snapshot()
    }

    pub fn get_const_data(&self) -> EnvConstants {
        self.shared.constants.read().clone()
    }

    pub fn get_updated_points(&self) -> MovingObstaclePoints {
        self.shared.store.updated_points()
    }

    /// Blocks publishing until the guard is dropped.
    pub fn acquire_grid_read_lock(&self) -> GridReadGuard<'_> {
        self.shared.store.read_grid()
    }

    /// Replaces the inflation parameters. Takes effect from the next cycle.
    pub fn set_inflation_params(&self, radius: i32, weight: f64) -> Result<(), NavigationError> {
        let params = InflationParams::new(radius, weight)?;
        *self.shared.inflation.lock() = params;
        info!(radius, weight, "inflation parameters updated");
        Ok(())
    }

    pub fn inflation_params(&self) -> InflationParams {
        *self.shared.inflation.lock()
    }

    /// Loads planner constants from a `key=value` file.
    pub fn import_config(&self, path: impl AsRef<Path>) -> std::io::Result<Vec<ConfigParseError>> {
        let mut constants = self.get_const_data();
        let errors = constants.import_file(path)?;
        *self.shared.constants.write() = constants;
        Ok(errors)
    }

    pub fn import_constants(&self, text: &str) -> Vec<ConfigParseError> {
        let mut constants = self.get_const_data();
        let errors = constants.import_str(text);
        *self.shared.constants.write() = constants;
        errors
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<UpdateEvent>> {
        self.shared.events.subscribe()
    }
}

impl<C: FetchClient> Shared<C> {
    async fn run(slot: InFlight<C>) -> Result<CycleReport, UpdateError> {
        let shared = Arc::clone(&slot.shared);
        let outcome = shared
            .cycle()
            .instrument(info_span!("update_cycle"))
            .await;

        match &outcome {
            Ok(report) => {
                debug!(
                    mode = %report.mode,
                    width = report.width,
                    height = report.height,
                    changed_cells = report.changed_cells,
                    "cycle published"
                );
                shared.events.publish(UpdateEvent::Published {
                    mode: report.mode,
                    width: report.width,
                    height: report.height,
                    changed_cells: report.changed_cells,
                });
            }
            Err(e) => {
                match e.kind() {
                    FailureKind::Transport => error!(kind = %e.kind(), "update cycle failed: {}", e),
                    _ => warn!(kind = %e.kind(), "update cycle failed: {}", e),
                }
                shared.events.publish(UpdateEvent::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
        drop(slot);
        outcome
    }

    fn enter(&self, phase: CyclePhase) {
        trace!(?phase, "cycle phase");
        self.phase.store(phase as u8, Ordering::Release);
    }

    async fn cycle(&self) -> Result<CycleReport, UpdateError> {
        self.enter(CyclePhase::Fetching);
        let raw = tokio::time::timeout(self.fetch_timeout, self.client.fetch())
            .await
            .map_err(|_| UpdateError::Timeout(self.fetch_timeout))??;

        self.enter(CyclePhase::Parsing);
        let is_changed = read_is_changed(&raw)?;
        if is_changed {
            self.force_full_next.store(true, Ordering::Release);
        }
        let grid_dirty = is_changed || self.force_full_next.load(Ordering::Acquire);
        let snapshot = CycleSnapshot::parse(&raw, grid_dirty)?;
        let inflation = *self.inflation.lock();

        let (update, points, report) = match snapshot.layout {
            Some(layout) => {
                self.enter(CyclePhase::Rebuilding);
                let grid = CostGrid::from_obstacles(
                    layout.width,
                    layout.height,
                    &layout.stationary,
                    &inflation,
                )?;
                trace!("rebuilt baseline\n{}", grid);
                let points = MovingObstaclePoints::new().advance(
                    UpdateMode::Rebuild,
                    &grid,
                    &snapshot.moving,
                    &inflation,
                );
                let report = CycleReport {
                    mode: UpdateMode::Rebuild,
                    width: grid.width(),
                    height: grid.height(),
                    changed_cells: points.len(),
                };
                let update = EnvUpdate::Rebuild {
                    grid,
                    goal: layout.goal,
                    start: snapshot.location,
                };
                (update, points, report)
            }
            None => {
                self.enter(CyclePhase::Refreshing);
                let baseline = self.store.baseline();
                let points = self.store.updated_points().advance(
                    UpdateMode::Refresh,
                    &baseline,
                    &snapshot.moving,
                    &inflation,
                );
                let report = CycleReport {
                    mode: UpdateMode::Refresh,
                    width: baseline.width(),
                    height: baseline.height(),
                    changed_cells: points.len(),
                };
                (EnvUpdate::Refresh { start: snapshot.location }, points, report)
            }
        };

        self.enter(CyclePhase::Publishing);
        self.store.publish(update, points);
        if report.mode == UpdateMode::Rebuild {
            self.force_full_next.store(false, Ordering::Release);
        }
        self.updated.store(true, Ordering::Release);
        Ok(report)
    }
}
