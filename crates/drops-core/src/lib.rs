//! Environment link for the DROPS planner pipeline.
//!
//! [`EnvironmentLink`] polls an environment service through a [`FetchClient`], rebuilds the
//! baseline cost grid when the static layout changes, tracks cells touched by moving
//! obstacles between rebuilds, and publishes both for planner-side readers.

pub mod blackboard;
pub mod bus;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod link;
pub mod payload;

pub use blackboard::{EnvData, GridPose, GridReadGuard};
pub use bus::{Topic, UpdateEvent};
pub use crate::config::{Settings, load_settings, load_settings_from};
pub use constants::EnvConstants;
pub use error::{
    ConfigParseError, FailureKind, SchemaError, SettingsError, StateError, TransportError,
    UpdateError,
};
pub use fetch::{FetchClient, FileFetchClient, ReplayFetchClient};
pub use link::{CycleReport, CyclePhase, EnvironmentLink, LinkOptions};
pub use payload::CycleSnapshot;
