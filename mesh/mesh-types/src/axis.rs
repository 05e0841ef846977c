//! Coordinate axes.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the three coordinate axes.
///
/// # Example
///
/// ```
/// use mesh_types::Axis;
///
/// let axis: Axis = "Z".parse().unwrap();
/// assert_eq!(axis, Axis::Z);
/// assert_eq!(axis.others(), [Axis::X, Axis::Y]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// The X axis (left/right).
    X,
    /// The Y axis (front/back).
    Y,
    /// The Z axis (up/down).
    Z,
}

impl Axis {
    /// All axes in order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Component index of this axis (x = 0, y = 1, z = 2).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// The two remaining axes, in ascending order.
    #[inline]
    #[must_use]
    pub const fn others(self) -> [Self; 2] {
        match self {
            Self::X => [Self::Y, Self::Z],
            Self::Y => [Self::X, Self::Z],
            Self::Z => [Self::X, Self::Y],
        }
    }

    /// Unit vector along this axis.
    #[must_use]
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Self::X => Vector3::x(),
            Self::Y => Vector3::y(),
            Self::Z => Vector3::z(),
        }
    }

    /// The coordinate of `point` along this axis.
    #[inline]
    #[must_use]
    pub fn coord(self, point: &Point3<f64>) -> f64 {
        point[self.index()]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(name)
    }
}

/// Returned when a string does not name an axis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid axis '{0}', expected one of x, y, z")]
pub struct ParseAxisError(pub String);

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            _ => Err(ParseAxisError(s.to_string())),
        }
    }
}
