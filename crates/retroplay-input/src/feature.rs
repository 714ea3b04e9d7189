//! Controller features
//!
//! A feature is a logical capability of a controller profile ("a button",
//! "left stick", "accelerometer"), independent of the physical primitive(s)
//! driving it. The button map stores features keyed by name; multi-axis
//! features keep one primitive slot per direction so individual directions
//! can be rebound or stolen without dropping the whole feature.

use crate::primitive::DriverPrimitive;

/// Name of a controller feature, unique within a controller profile.
pub type FeatureName = String;

/// Discriminant of a [`Feature`], used when prompting and when verifying
/// typed accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Single-primitive feature (button, trigger).
    Scalar,
    /// Four-direction analog stick.
    AnalogStick,
    /// Three-axis accelerometer.
    Accelerometer,
}

/// Cardinal directions, in the order the wizard prompts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalDirection {
    /// Stick pushed up.
    Up,
    /// Stick pushed down.
    Down,
    /// Stick pushed right.
    Right,
    /// Stick pushed left.
    Left,
}

impl CardinalDirection {
    /// Prompt order used when mapping an analog stick.
    pub const PROMPT_ORDER: [CardinalDirection; 4] = [
        CardinalDirection::Up,
        CardinalDirection::Down,
        CardinalDirection::Right,
        CardinalDirection::Left,
    ];
}

/// Primitive bindings of an analog-stick feature.
///
/// A direction whose primitive was stolen by a later binding is left unbound
/// (`None`) rather than invalidating the whole stick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalogStick {
    /// Primitive bound to the up direction.
    pub up: Option<DriverPrimitive>,
    /// Primitive bound to the down direction.
    pub down: Option<DriverPrimitive>,
    /// Primitive bound to the right direction.
    pub right: Option<DriverPrimitive>,
    /// Primitive bound to the left direction.
    pub left: Option<DriverPrimitive>,
}

impl AnalogStick {
    /// Bindings in prompt order (up, down, right, left).
    #[must_use]
    pub fn slots(&self) -> [Option<DriverPrimitive>; 4] {
        [self.up, self.down, self.right, self.left]
    }

    fn is_empty(&self) -> bool {
        self.slots().iter().all(Option::is_none)
    }
}

/// Primitive bindings of an accelerometer feature.
///
/// Only the positive semi-axes are stored; the negated counterparts are
/// derived when the reverse index is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accelerometer {
    /// Primitive bound to the positive X axis.
    pub positive_x: Option<DriverPrimitive>,
    /// Primitive bound to the positive Y axis.
    pub positive_y: Option<DriverPrimitive>,
    /// Primitive bound to the positive Z axis.
    pub positive_z: Option<DriverPrimitive>,
}

impl Accelerometer {
    /// Bindings in axis order (x, y, z).
    #[must_use]
    pub fn slots(&self) -> [Option<DriverPrimitive>; 3] {
        [self.positive_x, self.positive_y, self.positive_z]
    }

    fn is_empty(&self) -> bool {
        self.slots().iter().all(Option::is_none)
    }
}

/// A feature's stored primitive bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Single primitive.
    Scalar(DriverPrimitive),
    /// Four directional primitives.
    AnalogStick(AnalogStick),
    /// Three positive-axis primitives.
    Accelerometer(Accelerometer),
}

impl Feature {
    /// The feature's kind discriminant.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Scalar(_) => FeatureKind::Scalar,
            Feature::AnalogStick(_) => FeatureKind::AnalogStick,
            Feature::Accelerometer(_) => FeatureKind::Accelerometer,
        }
    }

    /// All primitives currently bound to this feature, as stored.
    #[must_use]
    pub fn primitives(&self) -> Vec<DriverPrimitive> {
        match self {
            Feature::Scalar(primitive) => vec![*primitive],
            Feature::AnalogStick(stick) => stick.slots().iter().copied().flatten().collect(),
            Feature::Accelerometer(accel) => accel.slots().iter().copied().flatten().collect(),
        }
    }

    /// Remove `primitive` from whichever slot holds it.
    ///
    /// Returns true if the feature has no bound primitives left and should
    /// be dropped from the map.
    pub(crate) fn unbind(&mut self, primitive: DriverPrimitive) -> bool {
        match self {
            Feature::Scalar(bound) => *bound == primitive,
            Feature::AnalogStick(stick) => {
                for slot in [
                    &mut stick.up,
                    &mut stick.down,
                    &mut stick.right,
                    &mut stick.left,
                ] {
                    if *slot == Some(primitive) {
                        *slot = None;
                    }
                }
                stick.is_empty()
            }
            Feature::Accelerometer(accel) => {
                for slot in [
                    &mut accel.positive_x,
                    &mut accel.positive_y,
                    &mut accel.positive_z,
                ] {
                    if *slot == Some(primitive) {
                        *slot = None;
                    }
                }
                accel.is_empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_kind() {
        let scalar = Feature::Scalar(DriverPrimitive::button(0));
        assert_eq!(scalar.kind(), FeatureKind::Scalar);

        let stick = Feature::AnalogStick(AnalogStick::default());
        assert_eq!(stick.kind(), FeatureKind::AnalogStick);
    }

    #[test]
    fn test_unbind_scalar_empties_feature() {
        let mut feature = Feature::Scalar(DriverPrimitive::button(4));
        assert!(feature.unbind(DriverPrimitive::button(4)));
    }

    #[test]
    fn test_unbind_one_stick_direction_keeps_feature() {
        let mut feature = Feature::AnalogStick(AnalogStick {
            up: Some(DriverPrimitive::button(1)),
            down: Some(DriverPrimitive::button(2)),
            right: None,
            left: None,
        });

        assert!(!feature.unbind(DriverPrimitive::button(1)));
        match feature {
            Feature::AnalogStick(stick) => {
                assert_eq!(stick.up, None);
                assert_eq!(stick.down, Some(DriverPrimitive::button(2)));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unbind_last_stick_direction_empties_feature() {
        let mut feature = Feature::AnalogStick(AnalogStick {
            up: Some(DriverPrimitive::button(1)),
            ..AnalogStick::default()
        });

        assert!(feature.unbind(DriverPrimitive::button(1)));
    }

    #[test]
    fn test_primitives_skips_unbound_slots() {
        let feature = Feature::Accelerometer(Accelerometer {
            positive_x: Some(DriverPrimitive::button(7)),
            positive_y: None,
            positive_z: None,
        });

        assert_eq!(feature.primitives(), vec![DriverPrimitive::button(7)]);
    }
}
