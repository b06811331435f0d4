//! Obstacle descriptions and the inflation parameters used to rasterize them.

#![warn(missing_docs)]

use crate::error::NavigationError;

/// Number of cells the cost halo extends past an obstacle's physical radius by default.
pub const DEFAULT_INFLATION_RADIUS: i32 = 6;

/// Default decay steepness of the cost halo.
pub const DEFAULT_INFLATION_WEIGHT: f64 = 0.6;

/// A circular obstacle in grid coordinates.
///
/// Stationary obstacles carry a zero heading and velocity. The heading is in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obstacle {
    /// Center x-coordinate (cell).
    pub x: i32,
    /// Center y-coordinate (cell).
    pub y: i32,
    /// Physical radius in cells.
    pub radius: i32,
    /// Direction of travel in degrees.
    pub heading: i32,
    /// Speed reported by the environment service.
    pub velocity: i32,
}

impl Obstacle {
    /// Creates a new obstacle.
    #[must_use]
    pub const fn new(x: i32, y: i32, radius: i32, heading: i32, velocity: i32) -> Self {
        Self {
            x,
            y,
            radius,
            heading,
            velocity,
        }
    }

    /// Creates an obstacle with no heading or velocity.
    #[must_use]
    pub const fn stationary(x: i32, y: i32, radius: i32) -> Self {
        Self::new(x, y, radius, 0, 0)
    }
}

/// Controls the cost halo drawn around every obstacle.
///
/// `radius` is the ring of cells beyond the physical radius over which cost decays to zero,
/// `weight` the steepness of that decay. Construct through [`InflationParams::new`] so the
/// invariants `radius >= 0` and `weight > 0` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InflationParams {
    radius: i32,
    weight: f64,
}

impl InflationParams {
    /// Validates and creates inflation parameters.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidInflation)` if `radius` is negative or `weight`
    /// is not a positive finite number.
    pub fn new(radius: i32, weight: f64) -> Result<Self, NavigationError> {
        if radius < 0 {
            return Err(NavigationError::InvalidInflation(
                "radius must not be negative",
            ));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(NavigationError::InvalidInflation(
                "weight must be positive and finite",
            ));
        }
        Ok(Self { radius, weight })
    }

    /// Extra cells of halo beyond the obstacle's physical radius.
    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Decay steepness of the halo.
    pub const fn weight(&self) -> f64 {
        self.weight
    }
}

impl Default for InflationParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_INFLATION_RADIUS,
            weight: DEFAULT_INFLATION_WEIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_obstacle_has_no_motion() {
        let obstacle = Obstacle::stationary(3, 4, 2);
        assert_eq!(obstacle, Obstacle::new(3, 4, 2, 0, 0));
    }

    #[test]
    fn test_inflation_validation() {
        assert!(InflationParams::new(0, 1.0).is_ok());
        assert!(matches!(
            InflationParams::new(-1, 1.0),
            Err(NavigationError::InvalidInflation(_))
        ));
        assert!(matches!(
            InflationParams::new(2, 0.0),
            Err(NavigationError::InvalidInflation(_))
        ));
        assert!(matches!(
            InflationParams::new(2, f64::NAN),
            Err(NavigationError::InvalidInflation(_))
        ));
    }

    #[test]
    fn test_default_inflation() {
        let params = InflationParams::default();
        assert_eq!(params.radius(), DEFAULT_INFLATION_RADIUS);
        assert_eq!(params.weight(), DEFAULT_INFLATION_WEIGHT);
    }
}
