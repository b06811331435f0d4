//! This module defines the error types used by the `drops-navigation` crate.

#![warn(missing_docs)]

/// Error type for grid and inflation operations.
///
/// This enum encapsulates the ways a cost grid or its inflation parameters can be
/// rejected before any rasterization takes place.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// Error for invalid grid dimensions.
    /// This variant is returned when width or height is zero, or when the cell count overflows.
    InvalidDimensions(&'static str),
    /// Error for invalid inflation parameters.
    /// This variant is returned for a negative radius or a non-positive/non-finite weight.
    InvalidInflation(&'static str),
    /// Error for out-of-bounds access.
    /// This variant is returned when attempting to access grid cells outside the valid range.
    OutOfBounds(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::InvalidDimensions(msg) => write!(f, "Invalid grid dimensions: {}", msg),
            NavigationError::InvalidInflation(msg) => {
                write!(f, "Invalid inflation parameters: {}", msg)
            }
            NavigationError::OutOfBounds(msg) => write!(f, "Grid access out of bounds: {}", msg),
        }
    }
}

impl core::error::Error for NavigationError {}
