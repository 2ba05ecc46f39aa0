//! Control modes and curve point addressing.
//!
//! Consumers address curve settings positionally: points 0-15 are the
//! curve table, 16 is the start temperature, 17 and 18 are the minimum and
//! maximum duty bounds. This module only validates and resolves those
//! positions; reading and writing goes through the transaction manager.

use crate::error::{D5NextError, Result};
use crate::protocol::{ControlField, NUM_CURVE_POINTS};

/// Position of the curve start temperature.
pub const IDX_START_TEMP: usize = NUM_CURVE_POINTS;
/// Position of the minimum duty bound.
pub const IDX_MIN_DUTY: usize = NUM_CURVE_POINTS + 1;
/// Position of the maximum duty bound.
pub const IDX_MAX_DUTY: usize = NUM_CURVE_POINTS + 2;

// =============================================================================
// Control Mode
// =============================================================================

/// How the device drives a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    /// Fixed duty from the manual setpoint.
    Manual = 0,
    /// PID loop on the selected temperature source.
    Pid = 1,
    /// Temperature/power curve.
    Curve = 2,
}

impl ControlMode {
    /// Parse a raw mode value.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for anything but 0, 1 or 2.
    pub fn from_raw(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(ControlMode::Manual),
            1 => Ok(ControlMode::Pid),
            2 => Ok(ControlMode::Curve),
            other => Err(D5NextError::InvalidArgument(format!(
                "control mode {} out of range (0=manual, 1=pid, 2=curve)",
                other
            ))),
        }
    }

    pub const fn raw(self) -> u16 {
        self as u16
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlMode::Manual => "Manual",
            ControlMode::Pid => "PID",
            ControlMode::Curve => "Curve",
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Point Addressing
// =============================================================================

/// What a consumer point position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurvePoint {
    /// Entry of the curve table.
    Table(usize),
    StartTemp,
    MinDuty,
    MaxDuty,
}

/// Which half of a point is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointAttribute {
    /// Milli-degrees Celsius.
    Temp,
    /// Normalized 0-255 duty.
    Duty,
}

impl PointAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            PointAttribute::Temp => "temp",
            PointAttribute::Duty => "duty",
        }
    }
}

impl CurvePoint {
    /// Resolve a consumer point position.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for positions beyond 18.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            idx if idx < NUM_CURVE_POINTS => Ok(CurvePoint::Table(idx)),
            IDX_START_TEMP => Ok(CurvePoint::StartTemp),
            IDX_MIN_DUTY => Ok(CurvePoint::MinDuty),
            IDX_MAX_DUTY => Ok(CurvePoint::MaxDuty),
            other => Err(D5NextError::InvalidArgument(format!(
                "point {} out of range (0-{})",
                other, IDX_MAX_DUTY
            ))),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            CurvePoint::Table(idx) => *idx,
            CurvePoint::StartTemp => IDX_START_TEMP,
            CurvePoint::MinDuty => IDX_MIN_DUTY,
            CurvePoint::MaxDuty => IDX_MAX_DUTY,
        }
    }

    /// Control report field holding this half of the point.
    ///
    /// # Errors
    /// Returns `Unsupported` for a temperature of a duty bound or a duty of
    /// the start temperature.
    pub fn field(&self, attribute: PointAttribute) -> Result<ControlField> {
        match (self, attribute) {
            (CurvePoint::Table(idx), PointAttribute::Temp) => Ok(ControlField::CurveTemp(*idx)),
            (CurvePoint::Table(idx), PointAttribute::Duty) => Ok(ControlField::CurvePower(*idx)),
            (CurvePoint::StartTemp, PointAttribute::Temp) => Ok(ControlField::CurveStartTemp),
            (CurvePoint::MinDuty, PointAttribute::Duty) => Ok(ControlField::MinDuty),
            (CurvePoint::MaxDuty, PointAttribute::Duty) => Ok(ControlField::MaxDuty),
            (_, attribute) => Err(D5NextError::Unsupported {
                sensor: "curve point",
                attribute: attribute.name(),
            }),
        }
    }
}

// =============================================================================
// Curve Evaluation
// =============================================================================

/// Interpolate duty cycle from a temperature curve.
///
/// Returns the device duty for `temp`, both in device units (centi-degrees,
/// fixed-point percent). Uses linear interpolation between points and
/// clamps outside the table.
pub fn interpolate_duty(curve: &[(u16, u16)], temp: u16) -> Option<u16> {
    let mut sorted: Vec<_> = curve.to_vec();
    sorted.sort_by_key(|(t, _)| *t);

    let first = *sorted.first()?;
    let last = *sorted.last()?;
    if temp <= first.0 {
        return Some(first.1);
    }
    if temp >= last.0 {
        return Some(last.1);
    }

    for window in sorted.windows(2) {
        let (t1, d1) = window[0];
        let (t2, d2) = window[1];

        if temp >= t1 && temp <= t2 {
            if t2 == t1 {
                return Some(d2);
            }
            let ratio = (temp - t1) as f32 / (t2 - t1) as f32;
            let duty = d1 as f32 + ratio * (d2 as f32 - d1 as f32);
            return Some(duty.round() as u16);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_points_in_order() {
        for idx in 0..NUM_CURVE_POINTS {
            let point = CurvePoint::from_index(idx).unwrap();
            assert_eq!(point, CurvePoint::Table(idx));
            assert_eq!(point.index(), idx);
            assert_eq!(
                point.field(PointAttribute::Temp).unwrap(),
                ControlField::CurveTemp(idx)
            );
            assert_eq!(
                point.field(PointAttribute::Duty).unwrap(),
                ControlField::CurvePower(idx)
            );
        }
    }

    #[test]
    fn test_extra_points_never_address_table() {
        assert_eq!(
            CurvePoint::from_index(16).unwrap().field(PointAttribute::Temp).unwrap(),
            ControlField::CurveStartTemp
        );
        assert_eq!(
            CurvePoint::from_index(17).unwrap().field(PointAttribute::Duty).unwrap(),
            ControlField::MinDuty
        );
        assert_eq!(
            CurvePoint::from_index(18).unwrap().field(PointAttribute::Duty).unwrap(),
            ControlField::MaxDuty
        );
    }

    #[test]
    fn test_mismatched_attribute_unsupported() {
        let start = CurvePoint::StartTemp;
        assert!(matches!(
            start.field(PointAttribute::Duty),
            Err(D5NextError::Unsupported { .. })
        ));
        assert!(CurvePoint::MinDuty.field(PointAttribute::Temp).is_err());
        assert!(CurvePoint::MaxDuty.field(PointAttribute::Temp).is_err());
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(matches!(
            CurvePoint::from_index(19),
            Err(D5NextError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_control_mode_from_raw() {
        assert_eq!(ControlMode::from_raw(0).unwrap(), ControlMode::Manual);
        assert_eq!(ControlMode::from_raw(1).unwrap(), ControlMode::Pid);
        assert_eq!(ControlMode::from_raw(2).unwrap(), ControlMode::Curve);
        assert!(ControlMode::from_raw(3).is_err());
        assert_eq!(ControlMode::Curve.raw(), 2);
    }

    #[test]
    fn test_interpolate_exact_point() {
        let curve = vec![(2000, 2500), (4000, 5000), (6000, 10_000)];
        assert_eq!(interpolate_duty(&curve, 2000), Some(2500));
        assert_eq!(interpolate_duty(&curve, 4000), Some(5000));
        assert_eq!(interpolate_duty(&curve, 6000), Some(10_000));
    }

    #[test]
    fn test_interpolate_middle() {
        let curve = vec![(2000, 2500), (4000, 5000)];
        assert_eq!(interpolate_duty(&curve, 3000), Some(3750));
    }

    #[test]
    fn test_interpolate_clamps() {
        let curve = vec![(2000, 2500), (4000, 5000)];
        assert_eq!(interpolate_duty(&curve, 1000), Some(2500));
        assert_eq!(interpolate_duty(&curve, 8000), Some(5000));
    }

    #[test]
    fn test_empty_curve() {
        assert_eq!(interpolate_duty(&[], 3000), None);
    }
}
