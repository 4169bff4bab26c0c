//! Feasibility maps applied after every position update

/// Maps an arbitrary position into the feasible region, in place.
///
/// Implementations must be idempotent: projecting twice equals projecting once.
pub trait Projection: Send + Sync {
    fn project(&self, position: &mut [f64]);

    /// True if `project` would leave `position` unchanged.
    fn is_feasible(&self, position: &[f64]) -> bool;
}

/// Clamp into the non-negative orthant, optionally capped from above.
///
/// Only positions are clamped; velocities keep their momentum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NonNegative {
    upper: Option<f64>,
}

impl NonNegative {
    pub fn new() -> Self {
        Self { upper: None }
    }

    /// Also clamp entries above `upper`.
    pub fn with_upper(upper: f64) -> Self {
        Self { upper: Some(upper) }
    }

    pub fn upper(&self) -> Option<f64> {
        self.upper
    }
}

impl Projection for NonNegative {
    fn project(&self, position: &mut [f64]) {
        for v in position.iter_mut() {
            if v.is_nan() || *v < 0.0 {
                *v = 0.0;
            }
            if let Some(u) = self.upper {
                if *v > u {
                    *v = u;
                }
            }
        }
    }

    fn is_feasible(&self, position: &[f64]) -> bool {
        position
            .iter()
            .all(|&v| v >= 0.0 && self.upper.map_or(true, |u| v <= u))
    }
}
