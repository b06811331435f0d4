//! Schema validation of the environment service payload.
//!
//! Fields that only matter on a dirty cycle (grid size, static obstacles, goal) are read
//! only when the cycle is dirty. On a clean cycle they may be absent or stale and are never
//! looked at.

use drops_navigation::Obstacle;
use serde_json::{Map, Value};

use crate::blackboard::GridPose;
use crate::error::SchemaError;

/// Grid geometry and static layout, present only on dirty cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub width: usize,
    pub height: usize,
    pub stationary: Vec<Obstacle>,
    pub goal: GridPose,
}

/// One validated payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSnapshot {
    /// Grid geometry and static layout; `Some` exactly on a dirty cycle.
    pub layout: Option<GridLayout>,
    pub location: GridPose,
    pub moving: Vec<Obstacle>,
}

/// Reads the service's dirty flag alone.
pub fn read_is_changed(raw: &Value) -> Result<bool, SchemaError> {
    let root = as_object(raw, "<root>")?;
    let value = field(root, "", "is_changed")?;
    value.as_bool().ok_or_else(|| SchemaError::WrongType {
        field: "is_changed".into(),
        expected: "boolean",
    })
}

impl CycleSnapshot {
    /// Validates a payload whose dirty flag has already been read with [`read_is_changed`].
    ///
    /// `grid_dirty` decides whether the layout fields are read at all. Callers widen the
    /// service's flag with their own pending-rebuild state, so the first cycle, or one after
    /// a failed rebuild, still reads the full layout.
    pub fn parse(raw: &Value, grid_dirty: bool) -> Result<Self, SchemaError> {
        let root = as_object(raw, "<root>")?;

        let obstacles = as_object(field(root, "", "obstacles")?, "obstacles")?;
        let moving = obstacle_list(obstacles, "obstacles", "moving_obstacles", moving_obstacle)?;
        let location = pose(root, "location")?;

        let layout = if grid_dirty {
            Some(GridLayout {
                width: dimension(root, "grid_width")?,
                height: dimension(root, "grid_height")?,
                stationary: obstacle_list(
                    obstacles,
                    "obstacles",
                    "stationary_obstacles",
                    stationary_obstacle,
                )?,
                goal: pose(root, "goal")?,
            })
        } else {
            None
        };

        Ok(Self {
            layout,
            location,
            moving,
        })
    }
}

fn path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn as_object<'a>(value: &'a Value, at: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::WrongType {
        field: at.to_string(),
        expected: "object",
    })
}

fn field<'a>(obj: &'a Map<String, Value>, parent: &str, key: &str) -> Result<&'a Value, SchemaError> {
    obj.get(key)
        .ok_or_else(|| SchemaError::Missing(path(parent, key)))
}

fn integer(obj: &Map<String, Value>, parent: &str, key: &str) -> Result<i32, SchemaError> {
    let value = field(obj, parent, key)?;
    let wide = value.as_i64().ok_or_else(|| SchemaError::WrongType {
        field: path(parent, key),
        expected: "integer",
    })?;
    i32::try_from(wide).map_err(|_| SchemaError::OutOfRange {
        field: path(parent, key),
        value: wide,
    })
}

fn dimension(root: &Map<String, Value>, key: &str) -> Result<usize, SchemaError> {
    let value = integer(root, "", key)?;
    match usize::try_from(value) {
        Ok(cells) if cells > 0 => Ok(cells),
        _ => Err(SchemaError::OutOfRange {
            field: key.to_string(),
            value: i64::from(value),
        }),
    }
}

fn pose(root: &Map<String, Value>, key: &str) -> Result<GridPose, SchemaError> {
    let obj = as_object(field(root, "", key)?, key)?;
    Ok(GridPose::new(
        integer(obj, key, "x")?,
        integer(obj, key, "y")?,
        integer(obj, key, "theta")?,
    ))
}

fn radius(obj: &Map<String, Value>, at: &str) -> Result<i32, SchemaError> {
    let radius = integer(obj, at, "radius")?;
    if radius < 0 {
        return Err(SchemaError::OutOfRange {
            field: path(at, "radius"),
            value: i64::from(radius),
        });
    }
    Ok(radius)
}

fn moving_obstacle(obj: &Map<String, Value>, at: &str) -> Result<Obstacle, SchemaError> {
    Ok(Obstacle::new(
        integer(obj, at, "x")?,
        integer(obj, at, "y")?,
        radius(obj, at)?,
        integer(obj, at, "heading")?,
        integer(obj, at, "velocity")?,
    ))
}

fn stationary_obstacle(obj: &Map<String, Value>, at: &str) -> Result<Obstacle, SchemaError> {
    Ok(Obstacle::stationary(
        integer(obj, at, "x")?,
        integer(obj, at, "y")?,
        radius(obj, at)?,
    ))
}

fn obstacle_list<F>(
    obstacles: &Map<String, Value>,
    parent: &str,
    key: &str,
    read: F,
) -> Result<Vec<Obstacle>, SchemaError>
where
    F: Fn(&Map<String, Value>, &str) -> Result<Obstacle, SchemaError>,
{
    let list_path = path(parent, key);
    let items = field(obstacles, parent, key)?
        .as_array()
        .ok_or_else(|| SchemaError::WrongType {
            field: list_path.clone(),
            expected: "array",
        })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let at = format!("{list_path}[{i}]");
            read(as_object(item, &at)?, &at)
        })
        .collect()
}
