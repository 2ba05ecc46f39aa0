//! Parsing utilities for CLI arguments and configuration values.
//!
//! This module provides reusable parsing functions for common input formats
//! used throughout the application.

use crate::cooling::ControlMode;
use crate::error::{D5NextError, Result};
use crate::protocol::Channel;
use crate::sensors::{Attribute, SensorType};

// =============================================================================
// Channel Parsing
// =============================================================================

/// Parse a channel name or number into a Channel enum.
///
/// # Arguments
/// * `name` - "pump", "fan", or the consumer number ("0" = pump, "1" = fan)
///
/// # Example
/// ```
/// use aquacomputer_rust_devices::utils::parsing::parse_channel;
/// use aquacomputer_rust_devices::protocol::Channel;
///
/// assert_eq!(parse_channel("Fan").unwrap(), Channel::Fan);
/// assert_eq!(parse_channel("0").unwrap(), Channel::Pump);
/// ```
pub fn parse_channel(name: &str) -> Result<Channel> {
    match name.to_lowercase().as_str() {
        "pump" => Ok(Channel::Pump),
        "fan" => Ok(Channel::Fan),
        other => match other.parse::<u32>() {
            Ok(number) => Channel::from_number(number),
            Err(_) => Err(D5NextError::InvalidArgument(format!(
                "Unknown channel '{}'. Use: pump, fan, 0 or 1",
                name
            ))),
        },
    }
}

// =============================================================================
// Control Mode Parsing
// =============================================================================

/// Parse a control mode name or raw value.
///
/// Accepts "manual", "pid", "curve" or 0, 1, 2.
pub fn parse_mode(name: &str) -> Result<ControlMode> {
    match name.to_lowercase().as_str() {
        "manual" => Ok(ControlMode::Manual),
        "pid" => Ok(ControlMode::Pid),
        "curve" => Ok(ControlMode::Curve),
        other => match other.parse::<u16>() {
            Ok(raw) => ControlMode::from_raw(raw),
            Err(_) => Err(D5NextError::InvalidArgument(format!(
                "Unknown mode '{}'. Use: manual, pid or curve",
                name
            ))),
        },
    }
}

// =============================================================================
// Curve Parsing
// =============================================================================

/// Parse a list of curve points.
///
/// # Arguments
/// * `list` - Comma-separated `TEMP:DUTY` pairs, °C and percent
///
/// # Example
/// ```
/// use aquacomputer_rust_devices::utils::parsing::parse_curve_points;
///
/// let points = parse_curve_points("25:20, 35:50,45:100").unwrap();
/// assert_eq!(points, vec![(25, 20), (35, 50), (45, 100)]);
/// ```
pub fn parse_curve_points(list: &str) -> Result<Vec<(u8, u8)>> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let invalid = || {
                D5NextError::InvalidArgument(format!(
                    "Invalid curve point '{}'. Use TEMP:DUTY, e.g. 30:40",
                    part
                ))
            };
            let (temp, duty) = part.split_once(':').ok_or_else(invalid)?;
            let temp: u8 = temp.trim().parse().map_err(|_| invalid())?;
            let duty: u8 = duty.trim().parse().map_err(|_| invalid())?;
            if duty > 100 {
                return Err(invalid());
            }
            Ok((temp, duty))
        })
        .collect()
}

// =============================================================================
// Sensor Parsing
// =============================================================================

/// Parse a sensor type name ("temp", "fan", "pwm", "power", "in", "curr").
pub fn parse_sensor_type(name: &str) -> Result<SensorType> {
    let lower = name.to_lowercase();
    SensorType::ALL
        .into_iter()
        .find(|sensor| sensor.name() == lower)
        .ok_or_else(|| D5NextError::InvalidArgument(format!("Unknown sensor type '{}'", name)))
}

/// Parse an attribute name ("input", "label", "max", "enable").
pub fn parse_attribute(name: &str) -> Result<Attribute> {
    match name.to_lowercase().as_str() {
        "input" => Ok(Attribute::Input),
        "label" => Ok(Attribute::Label),
        "max" => Ok(Attribute::Max),
        "enable" => Ok(Attribute::Enable),
        _ => Err(D5NextError::InvalidArgument(format!(
            "Unknown attribute '{}'. Use: input, label, max or enable",
            name
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================
