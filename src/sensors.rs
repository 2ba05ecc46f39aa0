//! Consumer-facing sensor surface.
//!
//! Describes which (sensor type, attribute, channel) combinations the D5 Next
//! exposes, their labels and whether they are writable. Channel numbers are
//! consumer numbers: pump first, then fan. Values are read and written
//! through [`crate::device::D5Next::read`] and [`crate::device::D5Next::write`].

use crate::error::{D5NextError, Result};
use crate::protocol::Channel;

/// Kind of sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    /// Coolant temperature, milli-degrees Celsius.
    Temp,
    /// Speed, RPM.
    Fan,
    /// Duty cycle 0-255 and control mode.
    Pwm,
    /// Micro-watts.
    Power,
    /// Milli-volts.
    In,
    /// Milli-amps.
    Curr,
}

/// Attribute of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Input,
    Label,
    Max,
    Enable,
}

/// Access mode of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Voltage channel of the +5V rail, after the two control channels.
pub const VOLTAGE_CHANNEL_5V: u32 = 2;

impl SensorType {
    pub const ALL: [SensorType; 6] = [
        SensorType::Temp,
        SensorType::Fan,
        SensorType::Pwm,
        SensorType::Power,
        SensorType::In,
        SensorType::Curr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorType::Temp => "temp",
            SensorType::Fan => "fan",
            SensorType::Pwm => "pwm",
            SensorType::Power => "power",
            SensorType::In => "in",
            SensorType::Curr => "curr",
        }
    }

    /// Number of channels of this type.
    pub fn channel_count(&self) -> u32 {
        match self {
            SensorType::Temp => 1,
            SensorType::In => 3,
            _ => 2,
        }
    }

    /// Attributes exposed for every channel of this type.
    pub fn attributes(&self) -> &'static [Attribute] {
        match self {
            SensorType::Temp | SensorType::Power | SensorType::In | SensorType::Curr => {
                &[Attribute::Input, Attribute::Label]
            }
            SensorType::Fan => &[Attribute::Input, Attribute::Label, Attribute::Max],
            SensorType::Pwm => &[Attribute::Input, Attribute::Enable],
        }
    }

    /// Validate a channel number for this type.
    pub fn check_channel(&self, channel: u32) -> Result<()> {
        if channel < self.channel_count() {
            Ok(())
        } else {
            Err(D5NextError::InvalidArgument(format!(
                "{} channel {} out of range (0-{})",
                self.name(),
                channel,
                self.channel_count() - 1
            )))
        }
    }
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Input => "input",
            Attribute::Label => "label",
            Attribute::Max => "max",
            Attribute::Enable => "enable",
        }
    }
}

/// Error for a combination the device does not model.
pub fn unsupported(sensor: SensorType, attribute: Attribute) -> D5NextError {
    D5NextError::Unsupported {
        sensor: sensor.name(),
        attribute: attribute.name(),
    }
}

/// Access mode of an attribute.
///
/// # Errors
/// Returns `Unsupported` if the sensor type has no such attribute.
pub fn access(sensor: SensorType, attribute: Attribute) -> Result<Access> {
    if !sensor.attributes().contains(&attribute) {
        return Err(unsupported(sensor, attribute));
    }
    Ok(match (sensor, attribute) {
        (SensorType::Pwm, Attribute::Input | Attribute::Enable) => Access::ReadWrite,
        _ => Access::ReadOnly,
    })
}

/// Label of a sensor channel.
pub fn label(sensor: SensorType, channel: u32) -> Result<&'static str> {
    sensor.check_channel(channel)?;
    if sensor == SensorType::In && channel == VOLTAGE_CHANNEL_5V {
        return Ok("+5V voltage");
    }
    Ok(match (sensor, Channel::from_number(channel)?) {
        (SensorType::Temp, _) => "Coolant temp",
        (SensorType::Fan, Channel::Pump) => "Pump speed",
        (SensorType::Fan, Channel::Fan) => "Fan speed",
        (SensorType::Power, Channel::Pump) => "Pump power",
        (SensorType::Power, Channel::Fan) => "Fan power",
        (SensorType::In, Channel::Pump) => "Pump voltage",
        (SensorType::In, Channel::Fan) => "Fan voltage",
        (SensorType::Curr, Channel::Pump) => "Pump current",
        (SensorType::Curr, Channel::Fan) => "Fan current",
        (SensorType::Pwm, _) => return Err(unsupported(sensor, Attribute::Label)),
    })
}

/// Every exposed (sensor, attribute, channel) triple.
pub fn enumerate() -> Vec<(SensorType, Attribute, u32)> {
    SensorType::ALL
        .iter()
        .flat_map(|&sensor| {
            (0..sensor.channel_count()).flat_map(move |channel| {
                sensor
                    .attributes()
                    .iter()
                    .map(move |&attribute| (sensor, attribute, channel))
            })
        })
        .collect()
}
