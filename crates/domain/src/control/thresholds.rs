use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Two-point switching thresholds, `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    min: f64,
    max: f64,
}

impl Thresholds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Thresholds must be finite: min={min}, max={max}"
            )));
        }
        if min >= max {
            return Err(DomainError::InvalidConfiguration(format!(
                "Threshold min ({min}) must be below max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Closed operating range, used for power and state-of-charge limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    pub fn new(what: &str, min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(DomainError::InvalidConfiguration(format!(
                "Invalid {what} bounds: [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Inclusive on both ends. NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_require_min_below_max() {
        assert!(Thresholds::new(35.0, 45.0).is_ok());
        assert!(Thresholds::new(45.0, 45.0).is_err());
        assert!(Thresholds::new(50.0, 45.0).is_err());
        assert!(Thresholds::new(f64::NAN, 45.0).is_err());
    }

    #[test]
    fn test_bounds_contains_is_inclusive() {
        let soc = Bounds::new("state of charge", 10.0, 90.0).unwrap();
        assert!(soc.contains(10.0));
        assert!(soc.contains(90.0));
        assert!(!soc.contains(9.9));
        assert!(!soc.contains(f64::NAN));
    }

    #[test]
    fn test_bounds_clamp() {
        let power = Bounds::new("power", -5000.0, 5000.0).unwrap();
        assert_eq!(power.clamp(7200.0), 5000.0);
        assert_eq!(power.clamp(-7200.0), -5000.0);
        assert_eq!(power.clamp(1200.0), 1200.0);
    }

    #[test]
    fn test_invalid_bounds_message() {
        let err = Bounds::new("power", 10.0, -10.0).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidConfiguration("Invalid power bounds: [10, -10]".to_string())
        );
    }
}
