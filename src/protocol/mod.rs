//! HID protocol implementation for the Aquacomputer D5 Next.
//!
//! This module contains the report layouts, codecs, checksum and unit
//! conversions. Everything here is pure; device I/O lives in `device`.

pub mod channel;
pub mod checksum;
pub mod commands;
pub mod control;
pub mod status;
pub mod units;

pub use channel::{Channel, ControlChannel, NUM_CHANNELS};
pub use commands::*;
pub use control::{
    ControlBlock, ControlField, CurveSettings, FanControl, FanProperties, NUM_CURVE_POINTS,
    PidField, PidSettings,
};
pub use status::{ChannelReadings, SensorReport, SerialNumber};
