//! Error type for the field-map and kick kernel.
//!
//! The driver wraps these in `anyhow` with context; the library itself only
//! ever returns `KickError`.

use crate::fieldmap::grid::Axis;
use crate::Float;
use std::error::Error;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum KickError {
    /// A grid axis could not be built.
    InvalidAxis { axis: Axis, reason: String },
    /// A sample buffer is shorter than its layout addresses.
    BufferTooShort { expected: usize, found: usize },
    /// Two arrays that must be parallel have different lengths.
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A field layout does not have the shape of its grid.
    ShapeMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },
    /// An element parameter would make the kick factor NaN or infinite.
    DegenerateElement { quantity: &'static str, value: Float },
    /// A reference quantity of an active particle is unusable.
    DegenerateParticle {
        index: usize,
        quantity: &'static str,
        value: Float,
    },
    /// A particle is off the grid, or has a NaN coordinate, while the
    /// boundary policy is `Error`.
    OutOfGrid { index: usize, axis: Axis, coord: Float },
}

impl fmt::Display for KickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAxis { axis, reason } => write!(f, "invalid {axis} axis: {reason}"),
            Self::BufferTooShort { expected, found } => write!(
                f,
                "field buffer holds {found} samples but its layout needs {expected}"
            ),
            Self::LengthMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what} has length {found}, expected {expected}"),
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "field layout has shape {found:?}, grid has shape {expected:?}"
            ),
            Self::DegenerateElement { quantity, value } => {
                write!(f, "element {quantity} = {value} gives a degenerate kick")
            }
            Self::DegenerateParticle {
                index,
                quantity,
                value,
            } => write!(f, "particle {index} has degenerate {quantity} = {value}"),
            Self::OutOfGrid { index, axis, coord } => write!(
                f,
                "particle {index} is outside the field map along {axis} ({axis} = {coord})"
            ),
        }
    }
}

impl Error for KickError {}
