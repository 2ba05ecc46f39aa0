//! Sensor report parsing for the D5 Next.
//!
//! The pump pushes report 0x01 once per second. All fields are big-endian
//! at fixed offsets; offsets count the report id at byte 0.

use byteorder::{BigEndian, ByteOrder};
use serde::{Serialize, Serializer};

use crate::error::{D5NextError, Result};
use crate::protocol::channel::{Channel, ControlChannel, NUM_CHANNELS};
use crate::protocol::commands::{
    ChannelOffsets, FAN_OFFSETS, OFFSET_COOLANT_TEMP, OFFSET_FIRMWARE_VERSION,
    OFFSET_PLUS_5V_VOLTAGE, OFFSET_POWER_CYCLES, OFFSET_SERIAL_FIRST_PART,
    OFFSET_SERIAL_SECOND_PART, PUMP_OFFSETS, SENSOR_REPORT_ID, SENSOR_REPORT_MIN_SIZE,
};
use crate::protocol::units;

// =============================================================================
// Status Structures
// =============================================================================

/// Device serial number, printed as two zero-padded 5-digit groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SerialNumber(pub u16, pub u16);

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05}-{:05}", self.0, self.1)
    }
}

/// Measurements for one control channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelReadings {
    /// RPM.
    pub speed: u16,
    /// Current duty setpoint, normalized 0-255.
    pub setpoint: u16,
    /// Micro-watts.
    pub power: u32,
    /// Milli-volts.
    pub voltage: u32,
    /// Milli-amps.
    pub current: u16,
}

impl ChannelReadings {
    fn parse(buf: &[u8], offsets: &ChannelOffsets) -> Self {
        Self {
            speed: BigEndian::read_u16(&buf[offsets.speed..]),
            setpoint: units::device_duty_to_normalized(BigEndian::read_u16(&buf[offsets.setpoint..])),
            power: units::centi_watts_to_micro_watts(BigEndian::read_u16(&buf[offsets.power..])),
            voltage: units::centi_to_milli_volts(BigEndian::read_u16(&buf[offsets.voltage..])),
            current: BigEndian::read_u16(&buf[offsets.current..]),
        }
    }
}

/// Decoded sensor report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReport {
    pub serial_number: SerialNumber,
    pub firmware_version: u16,
    /// How many times the device was powered on.
    pub power_cycles: u32,
    /// Coolant temperature in milli-degrees Celsius.
    pub coolant_temp: i32,
    /// +5V rail in milli-volts.
    pub plus_5v_voltage: u32,
    /// Indexed by `ControlChannel`; serialized by consumer channel name.
    #[serde(serialize_with = "serialize_channels")]
    channels: [ChannelReadings; NUM_CHANNELS],
}

#[derive(Serialize)]
struct ChannelsByName<'a> {
    pump: &'a ChannelReadings,
    fan: &'a ChannelReadings,
}

fn serialize_channels<S: Serializer>(
    channels: &[ChannelReadings; NUM_CHANNELS],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    ChannelsByName {
        pump: &channels[ControlChannel::Pump.index()],
        fan: &channels[ControlChannel::Fan.index()],
    }
    .serialize(serializer)
}

impl SensorReport {
    /// Parse a raw input report.
    ///
    /// # Arguments
    /// * `buf` - Input report, report id at byte 0
    ///
    /// # Returns
    /// `Ok(None)` for reports other than the sensor report.
    ///
    /// # Errors
    /// Returns `InvalidResponse` if a sensor report is too short.
    pub fn parse(buf: &[u8]) -> Result<Option<Self>> {
        match buf.first() {
            Some(&SENSOR_REPORT_ID) => {}
            _ => return Ok(None),
        }

        if buf.len() < SENSOR_REPORT_MIN_SIZE {
            return Err(D5NextError::InvalidResponse {
                message: format!(
                    "Sensor report too short: {} bytes, expected at least {}",
                    buf.len(),
                    SENSOR_REPORT_MIN_SIZE
                ),
            });
        }

        let mut channels = [ChannelReadings::default(); NUM_CHANNELS];
        channels[ControlChannel::Fan.index()] = ChannelReadings::parse(buf, &FAN_OFFSETS);
        channels[ControlChannel::Pump.index()] = ChannelReadings::parse(buf, &PUMP_OFFSETS);

        Ok(Some(Self {
            serial_number: SerialNumber(
                BigEndian::read_u16(&buf[OFFSET_SERIAL_FIRST_PART..]),
                BigEndian::read_u16(&buf[OFFSET_SERIAL_SECOND_PART..]),
            ),
            firmware_version: BigEndian::read_u16(&buf[OFFSET_FIRMWARE_VERSION..]),
            power_cycles: BigEndian::read_u32(&buf[OFFSET_POWER_CYCLES..]),
            coolant_temp: units::centi_to_milli_degrees(BigEndian::read_u16(
                &buf[OFFSET_COOLANT_TEMP..],
            )),
            plus_5v_voltage: units::centi_to_milli_volts(BigEndian::read_u16(
                &buf[OFFSET_PLUS_5V_VOLTAGE..],
            )),
            channels,
        }))
    }

    /// Readings for a protocol channel.
    pub fn channel(&self, channel: ControlChannel) -> &ChannelReadings {
        &self.channels[channel.index()]
    }

    /// Readings for a consumer channel.
    pub fn readings(&self, channel: Channel) -> &ChannelReadings {
        self.channel(channel.internal())
    }
}

impl std::fmt::Display for SensorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "+-----------------------------------+")?;
        writeln!(f, "|     Aquacomputer D5 Next Status   |")?;
        writeln!(f, "+-----------------------------------+")?;
        writeln!(
            f,
            "|  Coolant Temp:   {:>6.2} C         |",
            self.coolant_temp as f32 / 1000.0
        )?;
        writeln!(
            f,
            "|  +5V Rail:       {:>6.2} V         |",
            self.plus_5v_voltage as f32 / 1000.0
        )?;
        for channel in Channel::ALL {
            let r = self.readings(channel);
            writeln!(f, "+-----------------------------------+")?;
            writeln!(f, "|  {:<5} Speed:    {:>5} RPM        |", channel, r.speed)?;
            writeln!(f, "|  {:<5} Duty:       {:>3}/255        |", channel, r.setpoint)?;
            writeln!(
                f,
                "|  {:<5} Power:    {:>6.2} W         |",
                channel,
                r.power as f32 / 1_000_000.0
            )?;
            writeln!(
                f,
                "|  {:<5} Voltage:  {:>6.2} V         |",
                channel,
                r.voltage as f32 / 1000.0
            )?;
            writeln!(
                f,
                "|  {:<5} Current:  {:>6.3} A         |",
                channel,
                r.current as f32 / 1000.0
            )?;
        }
        writeln!(f, "+-----------------------------------+")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::commands::SENSOR_REPORT_SIZE;

    fn put(buf: &mut [u8], offset: usize, value: u16) {
        BigEndian::write_u16(&mut buf[offset..], value);
    }

    /// Sensor report with distinct values on each channel.
    pub(crate) fn sample_sensor_report() -> [u8; SENSOR_REPORT_SIZE] {
        let mut buf = [0u8; SENSOR_REPORT_SIZE];
        buf[0] = SENSOR_REPORT_ID;
        put(&mut buf, OFFSET_SERIAL_FIRST_PART, 1234);
        put(&mut buf, OFFSET_SERIAL_SECOND_PART, 56789);
        put(&mut buf, OFFSET_FIRMWARE_VERSION, 1023);
        BigEndian::write_u32(&mut buf[OFFSET_POWER_CYCLES..], 77);
        put(&mut buf, OFFSET_PLUS_5V_VOLTAGE, 502);
        put(&mut buf, OFFSET_COOLANT_TEMP, 0x0100);

        put(&mut buf, FAN_OFFSETS.voltage, 1200);
        put(&mut buf, FAN_OFFSETS.current, 150);
        put(&mut buf, FAN_OFFSETS.power, 180);
        put(&mut buf, FAN_OFFSETS.speed, 900);
        put(&mut buf, FAN_OFFSETS.setpoint, 0x0A1A);

        put(&mut buf, PUMP_OFFSETS.voltage, 1190);
        put(&mut buf, PUMP_OFFSETS.current, 420);
        put(&mut buf, PUMP_OFFSETS.power, 500);
        put(&mut buf, PUMP_OFFSETS.speed, 3100);
        put(&mut buf, PUMP_OFFSETS.setpoint, 10_000);
        buf
    }

    #[test]
    fn test_parse_sensor_report() {
        let report = SensorReport::parse(&sample_sensor_report()).unwrap().unwrap();
        assert_eq!(report.coolant_temp, 2560);
        assert_eq!(report.serial_number, SerialNumber(1234, 56789));
        assert_eq!(report.firmware_version, 1023);
        assert_eq!(report.power_cycles, 77);
        assert_eq!(report.plus_5v_voltage, 5020);

        let fan = report.channel(ControlChannel::Fan);
        assert_eq!(fan.speed, 900);
        assert_eq!(fan.setpoint, 66);
        assert_eq!(fan.power, 1_800_000);
        assert_eq!(fan.voltage, 12_000);
        assert_eq!(fan.current, 150);

        let pump = report.readings(Channel::Pump);
        assert_eq!(pump.speed, 3100);
        assert_eq!(pump.setpoint, 255);
        assert_eq!(pump.power, 5_000_000);
        assert_eq!(pump.voltage, 11_900);
        assert_eq!(pump.current, 420);
    }

    #[test]
    fn test_other_report_ignored() {
        let mut buf = sample_sensor_report();
        buf[0] = 0x02;
        assert_eq!(SensorReport::parse(&buf).unwrap(), None);
        assert_eq!(SensorReport::parse(&[]).unwrap(), None);
    }

    #[test]
    fn test_short_sensor_report() {
        let buf = sample_sensor_report();
        let result = SensorReport::parse(&buf[..SENSOR_REPORT_MIN_SIZE - 1]);
        assert!(matches!(result, Err(D5NextError::InvalidResponse { .. })));
        assert!(SensorReport::parse(&buf[..SENSOR_REPORT_MIN_SIZE]).unwrap().is_some());
    }

    #[test]
    fn test_json_uses_consumer_channel_names() {
        let report = SensorReport::parse(&sample_sensor_report()).unwrap().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["channels"]["pump"]["speed"], 3100);
        assert_eq!(json["channels"]["fan"]["speed"], 900);
        assert_eq!(json["coolant_temp"], 2560);
        assert_eq!(json["serial_number"], serde_json::json!([1234, 56789]));
    }

    #[test]
    fn test_serial_number_format() {
        assert_eq!(SerialNumber(42, 7).to_string(), "00042-00007");
        assert_eq!(SerialNumber(12345, 65535).to_string(), "12345-65535");
    }
}
