//! Driver primitives
//!
//! A driver primitive is the smallest raw input source a device driver can
//! report: a button, one direction of a hat switch, or one half of an
//! analog axis. Primitives are the keys of the button map's reverse index,
//! so they are small `Copy` value types with full ordering.

use std::fmt;

/// Direction of a hat (d-pad) press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HatDirection {
    /// Hat pressed up.
    Up,
    /// Hat pressed down.
    Down,
    /// Hat pressed left.
    Left,
    /// Hat pressed right.
    Right,
}

/// Polarity of a half-axis.
///
/// An analog axis is split into two semi-axes so that each polarity can be
/// bound independently (e.g. a trigger that only reports positive travel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemiAxisDirection {
    /// Values greater than zero.
    Positive,
    /// Values less than zero.
    Negative,
}

impl SemiAxisDirection {
    /// The opposite polarity of the same axis.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            SemiAxisDirection::Positive => SemiAxisDirection::Negative,
            SemiAxisDirection::Negative => SemiAxisDirection::Positive,
        }
    }
}

/// A raw input source on a device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DriverPrimitive {
    /// A driver button, identified by its index.
    Button {
        /// Driver index of the button.
        index: u32,
    },
    /// One direction of a hat switch.
    Hat {
        /// Driver index of the hat.
        index: u32,
        /// The pressed direction.
        direction: HatDirection,
    },
    /// One polarity of an analog axis.
    SemiAxis {
        /// Driver index of the axis.
        index: u32,
        /// The polarity this primitive covers.
        direction: SemiAxisDirection,
    },
}

impl DriverPrimitive {
    /// A button primitive.
    #[must_use]
    pub fn button(index: u32) -> Self {
        DriverPrimitive::Button { index }
    }

    /// A hat-direction primitive.
    #[must_use]
    pub fn hat(index: u32, direction: HatDirection) -> Self {
        DriverPrimitive::Hat { index, direction }
    }

    /// A semi-axis primitive.
    #[must_use]
    pub fn semi_axis(index: u32, direction: SemiAxisDirection) -> Self {
        DriverPrimitive::SemiAxis { index, direction }
    }

    /// Driver index of the underlying control.
    #[must_use]
    pub fn index(&self) -> u32 {
        match *self {
            DriverPrimitive::Button { index }
            | DriverPrimitive::Hat { index, .. }
            | DriverPrimitive::SemiAxis { index, .. } => index,
        }
    }

    /// The same axis with inverted polarity.
    ///
    /// Only semi-axes have an opposite; buttons and hat directions return
    /// `None`.
    #[must_use]
    pub fn opposite(&self) -> Option<Self> {
        match *self {
            DriverPrimitive::SemiAxis { index, direction } => Some(DriverPrimitive::SemiAxis {
                index,
                direction: direction.opposite(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for DriverPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DriverPrimitive::Button { index } => write!(f, "button {index}"),
            DriverPrimitive::Hat { index, direction } => {
                write!(f, "hat {index} {direction:?}")
            }
            DriverPrimitive::SemiAxis { index, direction } => {
                let sign = match direction {
                    SemiAxisDirection::Positive => '+',
                    SemiAxisDirection::Negative => '-',
                };
                write!(f, "axis {index}{sign}")
            }
        }
    }
}
