//! Clamp-and-report protection for device settings.
//!
//! Every bounded setting goes through [`clamp_and_apply`]: the requested value
//! is pulled into the device-reported range, the clamped value (never the raw
//! one) is forwarded, and any correction is reported as a [`Warning`].

use crate::driver::Parameter;
use crate::error::{Error, Result, Warning};
use log::{trace, warn};
use std::fmt;

/// Device-reported range of a parameter, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True if `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    fn is_valid(&self) -> bool {
        !self.min.is_nan() && !self.max.is_nan() && self.min <= self.max
    }
}

/// Which correction, if any, was applied to a requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    None,
    ToMinimum,
    ToMaximum,
}

impl fmt::Display for Clamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Clamp::None => "within range",
            Clamp::ToMinimum => "clamped to minimum",
            Clamp::ToMaximum => "clamped to maximum",
        })
    }
}

/// What [`clamp_and_apply`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampReport {
    /// Setting the request was for.
    pub parameter: Parameter,
    /// Value the caller asked for.
    pub requested: f64,
    /// Value that was sent to the device.
    pub applied: f64,
    /// Correction applied to reach `applied`.
    pub clamp: Clamp,
}

impl ClampReport {
    pub fn was_clamped(&self) -> bool {
        self.clamp != Clamp::None
    }

    /// The advisory for this report, if the value was corrected.
    pub fn warning(&self) -> Option<Warning> {
        self.was_clamped().then(|| Warning::Clamped {
            parameter: self.parameter,
            requested: self.requested,
            applied: self.applied,
            direction: self.clamp,
        })
    }
}

/// Pulls `requested` into `bounds` without side effects.
///
/// Callers must have checked that `bounds` is valid and `requested` is not NaN.
pub fn clamp(requested: f64, bounds: Bounds) -> (f64, Clamp) {
    if requested < bounds.min {
        (bounds.min, Clamp::ToMinimum)
    } else if requested > bounds.max {
        (bounds.max, Clamp::ToMaximum)
    } else {
        (requested, Clamp::None)
    }
}

/// Clamps `requested` into `bounds` and hands the result to `apply`.
///
/// Returns [`Error::InvalidBounds`] if the device reported `min > max` (or a
/// NaN bound) and [`Error::ArgumentOutOfRange`] for a NaN request; `apply` is
/// not called in either case. Errors from `apply` propagate unchanged.
pub fn clamp_and_apply<F>(
    parameter: Parameter,
    requested: f64,
    bounds: Bounds,
    apply: F,
) -> Result<ClampReport>
where
    F: FnOnce(f64) -> Result<()>,
{
    if !bounds.is_valid() {
        return Err(Error::InvalidBounds {
            parameter,
            min: bounds.min,
            max: bounds.max,
        });
    }
    if requested.is_nan() {
        return Err(Error::ArgumentOutOfRange(format!(
            "{} must be a number",
            parameter
        )));
    }

    let (applied, direction) = clamp(requested, bounds);
    trace!(
        "Applying {} = {}{} (requested {}, bounds [{}, {}])",
        parameter,
        applied,
        parameter.unit(),
        requested,
        bounds.min,
        bounds.max
    );
    apply(applied)?;

    let report = ClampReport {
        parameter,
        requested,
        applied,
        clamp: direction,
    };
    if report.was_clamped() {
        warn!(
            "{} {}{} out of range, {}: applied {}{}",
            parameter,
            requested,
            parameter.unit(),
            direction,
            applied,
            parameter.unit()
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    fn apply_recorded(requested: f64, bounds: Bounds) -> (ClampReport, Option<f64>) {
        let sent = Cell::new(None);
        let report = clamp_and_apply(Parameter::Wavelength, requested, bounds, |v| {
            sent.set(Some(v));
            Ok(())
        })
        .unwrap();
        (report, sent.get())
    }

    #[test]
    fn test_wavelength_scenarios() {
        let bounds = Bounds::new(100.0, 1600.0);

        let (report, sent) = apply_recorded(50.0, bounds);
        assert_eq!(report.clamp, Clamp::ToMinimum);
        assert_eq!(sent, Some(100.0));

        let (report, sent) = apply_recorded(2000.0, bounds);
        assert_eq!(report.clamp, Clamp::ToMaximum);
        assert_eq!(sent, Some(1600.0));

        let (report, sent) = apply_recorded(635.0, bounds);
        assert_eq!(report.clamp, Clamp::None);
        assert_eq!(sent, Some(635.0));
        assert!(report.warning().is_none());
    }

    #[test]
    fn test_exactly_one_outcome_per_request() {
        let bounds = Bounds::new(-2.5, 7.25);
        for i in -40..=40 {
            let v = i as f64 * 0.5;
            let (report, sent) = apply_recorded(v, bounds);
            assert_eq!(sent, Some(report.applied));
            match report.clamp {
                Clamp::None => {
                    assert!(bounds.contains(v));
                    assert_relative_eq!(report.applied, v);
                }
                Clamp::ToMinimum => {
                    assert!(v < bounds.min);
                    assert_relative_eq!(report.applied, bounds.min);
                }
                Clamp::ToMaximum => {
                    assert!(v > bounds.max);
                    assert_relative_eq!(report.applied, bounds.max);
                }
            }
        }
    }

    #[test]
    fn test_bounds_edges_are_inclusive() {
        let bounds = Bounds::new(400.0, 1100.0);
        assert_eq!(apply_recorded(400.0, bounds).0.clamp, Clamp::None);
        assert_eq!(apply_recorded(1100.0, bounds).0.clamp, Clamp::None);

        let degenerate = Bounds::new(3.0, 3.0);
        let (report, sent) = apply_recorded(9.0, degenerate);
        assert_eq!(report.clamp, Clamp::ToMaximum);
        assert_eq!(sent, Some(3.0));
    }

    #[test]
    fn test_warning_carries_requested_and_applied() {
        let (report, _) = apply_recorded(2000.0, Bounds::new(100.0, 1600.0));
        match report.warning() {
            Some(Warning::Clamped {
                parameter,
                requested,
                applied,
                direction,
            }) => {
                assert_eq!(parameter, Parameter::Wavelength);
                assert_relative_eq!(requested, 2000.0);
                assert_relative_eq!(applied, 1600.0);
                assert_eq!(direction, Clamp::ToMaximum);
            }
            other => panic!("Expected clamp warning, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_bounds_do_not_apply() {
        let called = Cell::new(false);
        let result = clamp_and_apply(Parameter::PowerRange, 1.0, Bounds::new(5.0, 1.0), |_| {
            called.set(true);
            Ok(())
        });
        assert!(matches!(
            result,
            Err(Error::InvalidBounds {
                parameter: Parameter::PowerRange,
                ..
            })
        ));
        assert!(!called.get());

        let nan_bounds = clamp_and_apply(
            Parameter::PowerRange,
            1.0,
            Bounds::new(f64::NAN, 1.0),
            |_| Ok(()),
        );
        assert!(matches!(nan_bounds, Err(Error::InvalidBounds { .. })));
    }

    #[test]
    fn test_nan_request_rejected() {
        let result = clamp_and_apply(
            Parameter::AverageTime,
            f64::NAN,
            Bounds::new(0.0, 1.0),
            |_| panic!("apply must not run"),
        );
        assert!(matches!(result, Err(Error::ArgumentOutOfRange(_))));
    }

    #[test]
    fn test_infinite_request_clamps() {
        let (report, sent) = apply_recorded(f64::INFINITY, Bounds::new(0.0, 10.0));
        assert_eq!(report.clamp, Clamp::ToMaximum);
        assert_eq!(sent, Some(10.0));
    }

    #[test]
    fn test_apply_error_propagates() {
        let result = clamp_and_apply(Parameter::Wavelength, 500.0, Bounds::new(0.0, 1.0), |_| {
            Err(Error::ArgumentOutOfRange("rejected".to_string()))
        });
        assert!(matches!(result, Err(Error::ArgumentOutOfRange(_))));
    }
}
