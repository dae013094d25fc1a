//! Handles and categories shared by the model-construction API.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Variable category of a node.
///
/// Global unknowns are numbered category by category in this order: motion
/// DOFs first, then relative-motion DOFs, then Lagrange multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    /// Absolute motion of frames, vectors and rotations.
    Motion,
    /// Relative motion allowed by a joint.
    RelativeMotion,
    /// Lagrange multipliers of constraints.
    LagrangeMultiplier,
}

impl Field {
    /// Number of categories.
    pub const COUNT: usize = 3;

    /// All categories in numbering order.
    pub const ALL: [Self; Self::COUNT] =
        [Self::Motion, Self::RelativeMotion, Self::LagrangeMultiplier];

    /// Position of the category in numbering order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Motion => 0,
            Self::RelativeMotion => 1,
            Self::LagrangeMultiplier => 2,
        }
    }

    /// Whether the category carries velocities and accelerations.
    #[must_use]
    pub const fn is_kinematic(self) -> bool {
        !matches!(self, Self::LagrangeMultiplier)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Motion => "motion",
            Self::RelativeMotion => "relative motion",
            Self::LagrangeMultiplier => "Lagrange multiplier",
        };
        f.write_str(name)
    }
}

/// Handle to a node: its category and its position within that category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId {
    field: Field,
    index: usize,
}

impl NodeId {
    /// Create a node handle.
    #[must_use]
    pub const fn new(field: Field, index: usize) -> Self {
        Self { field, index }
    }

    /// Category of the node.
    #[must_use]
    pub const fn field(self) -> Field {
        self.field
    }

    /// Position of the node within its category.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({} #{})", self.field, self.index)
    }
}

/// Handle to an element, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementId(usize);

impl ElementId {
    /// Create an element handle.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Insertion index of the element.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.0)
    }
}

/// Whether inertia is part of the equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnalysisType {
    /// Equilibrium under (pseudo-)time dependent loads; no velocities.
    Static,
    /// Full dynamics with velocities and accelerations.
    #[default]
    Dynamic,
}

impl AnalysisType {
    /// Whether velocities and accelerations are tracked.
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// Nodal quantity read by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodalField {
    /// Configuration coordinates (position + quaternion for frames).
    Motion,
    /// Velocity (body-fixed twist for frames).
    Velocity,
    /// Acceleration (body-fixed twist derivative for frames).
    Acceleration,
}

impl NodalField {
    /// Dataset label used by loggers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Motion => "MOTION",
            Self::Velocity => "VELOCITY",
            Self::Acceleration => "ACCELERATION",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert!(Field::Motion < Field::LagrangeMultiplier);
        assert!(!Field::LagrangeMultiplier.is_kinematic());
    }

    #[test]
    fn test_ids_display() {
        let node = NodeId::new(Field::RelativeMotion, 2);
        assert_eq!(node.to_string(), "Node(relative motion #2)");
        assert_eq!(node.field(), Field::RelativeMotion);
        assert_eq!(node.index(), 2);
        assert_eq!(ElementId::new(4).to_string(), "Element(4)");
    }

    #[test]
    fn test_labels() {
        assert_eq!(NodalField::Motion.label(), "MOTION");
        assert!(AnalysisType::default().is_dynamic());
        assert!(!AnalysisType::Static.is_dynamic());
    }
}
