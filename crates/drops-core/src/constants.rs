//! Planner constants, read from a `key=value` file.

use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ConfigParseError;

/// Tuning constants handed through to the planner unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConstants {
    pub obs_thresh: u8,
    pub cost_inscribed_thresh: u8,
    pub cost_possibly_circumscribed_thresh: i32,
    /// Meters per second.
    pub est_velocity: f64,
    /// Seconds.
    pub timetoturn45degs: f64,
    pub cellsize_m: f64,
    pub motion_prim_file: String,
}

impl Default for EnvConstants {
    fn default() -> Self {
        Self {
            obs_thresh: 255,
            cost_inscribed_thresh: 254,
            cost_possibly_circumscribed_thresh: 0,
            est_velocity: 1.0,
            timetoturn45degs: 2.0,
            cellsize_m: 0.025,
            motion_prim_file: String::new(),
        }
    }
}

fn parse_into<T: FromStr>(
    slot: &mut T,
    line: usize,
    key: &str,
    value: &str,
) -> Result<(), ConfigParseError> {
    let parsed = value.parse().map_err(|_| ConfigParseError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })?;
    *slot = parsed;
    Ok(())
}

impl EnvConstants {
    /// Applies `key=value` lines on top of the current values.
    ///
    /// Keys are case-insensitive. Blank lines and lines starting with `#` are skipped.
    /// A bad line is reported and leaves the previous value in place; it never aborts the
    /// remaining lines.
    pub fn import_str(&mut self, text: &str) -> Vec<ConfigParseError> {
        let mut errors = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                errors.push(ConfigParseError::MalformedLine {
                    line,
                    text: trimmed.to_string(),
                });
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            let applied = match key.as_str() {
                "obs_thresh" => parse_into(&mut self.obs_thresh, line, &key, value),
                "cost_inscribed_thresh" => {
                    parse_into(&mut self.cost_inscribed_thresh, line, &key, value)
                }
                "cost_possibly_circumscribed_thresh" => {
                    parse_into(&mut self.cost_possibly_circumscribed_thresh, line, &key, value)
                }
                "est_velocity" => parse_into(&mut self.est_velocity, line, &key, value),
                "timetoturn45degs" => parse_into(&mut self.timetoturn45degs, line, &key, value),
                "cellsize_m" => parse_into(&mut self.cellsize_m, line, &key, value),
                "motion_prim_file" => {
                    self.motion_prim_file = value.to_string();
                    Ok(())
                }
                _ => Err(ConfigParseError::UnknownKey { line, key: key.clone() }),
            };

            match applied {
                Ok(()) => debug!(key = %key, value, "constant applied"),
                Err(e) => errors.push(e),
            }
        }

        for e in &errors {
            warn!("Constants: {}", e);
        }
        errors
    }

    /// Reads and applies a constants file. Only an unreadable file is an error; per-line
    /// problems come back in the `Ok` list.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<Vec<ConfigParseError>> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.import_str(&text))
    }
}
