//! Cooling control model.
//!
//! Control modes, curve point addressing and curve interpolation.

mod curve;

pub use curve::{
    ControlMode, CurvePoint, IDX_MAX_DUTY, IDX_MIN_DUTY, IDX_START_TEMP, PointAttribute,
    interpolate_duty,
};
