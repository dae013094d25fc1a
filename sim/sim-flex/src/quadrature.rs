//! Gauss-Legendre quadrature on `[-1, 1]`.

/// One quadrature point: abscissa in `[-1, 1]` and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussPoint {
    /// Abscissa.
    pub x: f64,
    /// Weight.
    pub w: f64,
}

/// Gauss-Legendre rules with 1 to 3 points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GaussRule {
    /// Exact for linear integrands.
    One,
    /// Exact for cubic integrands.
    #[default]
    Two,
    /// Exact for quintic integrands.
    Three,
}

impl GaussRule {
    /// Quadrature points of the rule.
    #[must_use]
    pub fn points(self) -> Vec<GaussPoint> {
        match self {
            Self::One => vec![GaussPoint { x: 0.0, w: 2.0 }],
            Self::Two => {
                let x = 1.0 / 3.0_f64.sqrt();
                vec![GaussPoint { x: -x, w: 1.0 }, GaussPoint { x, w: 1.0 }]
            }
            Self::Three => {
                let x = 0.6_f64.sqrt();
                vec![
                    GaussPoint { x: -x, w: 5.0 / 9.0 },
                    GaussPoint { x: 0.0, w: 8.0 / 9.0 },
                    GaussPoint { x, w: 5.0 / 9.0 },
                ]
            }
        }
    }
}
