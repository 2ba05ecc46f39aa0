//! Control report codec for the D5 Next.
//!
//! The whole device configuration travels as one 809-byte feature report.
//! Layout (offsets include the report id at byte 0):
//!
//! | Region            | Offset | Length |
//! |-------------------|--------|--------|
//! | version           | 0      | 1      |
//! | header padding    | 1      | 46     |
//! | fan properties    | 47     | 2 x 9  |
//! | fan control       | 65     | 2 x 85 |
//! | trailer padding   | 235    | 572    |
//! | checksum (BE)     | 807    | 2      |
//!
//! Both padding regions hold vendor state (lighting among others) and are
//! carried through unchanged.

use byteorder::{BigEndian, ByteOrder};

use crate::cooling::ControlMode;
use crate::error::{D5NextError, Result};
use crate::protocol::channel::{ControlChannel, NUM_CHANNELS};
use crate::protocol::checksum::{self, CHECKSUM_OFFSET};
use crate::protocol::commands::CONTROL_REPORT_SIZE;

// =============================================================================
// Layout
// =============================================================================

/// Number of points in a curve table.
pub const NUM_CURVE_POINTS: usize = 16;

const OFFSET_VERSION: usize = 0;
const OFFSET_HEADER_PADDING: usize = 1;
const HEADER_PADDING_LEN: usize = 46;
const OFFSET_FAN_PROPERTIES: usize = OFFSET_HEADER_PADDING + HEADER_PADDING_LEN;
/// Encoded size of one `FanProperties` record.
pub const FAN_PROPERTIES_SIZE: usize = 9;
const OFFSET_FAN_CONTROL: usize = OFFSET_FAN_PROPERTIES + NUM_CHANNELS * FAN_PROPERTIES_SIZE;
/// Encoded size of one `FanControl` record.
pub const FAN_CONTROL_SIZE: usize = 85;
const OFFSET_TRAILER_PADDING: usize = OFFSET_FAN_CONTROL + NUM_CHANNELS * FAN_CONTROL_SIZE;
const TRAILER_PADDING_LEN: usize = 572;

// FanProperties, relative to the record start.
const PROP_FLAGS: usize = 0;
const PROP_MIN_DUTY: usize = 1;
const PROP_MAX_DUTY: usize = 3;
const PROP_FALLBACK_DUTY: usize = 5;
const PROP_MAX_SPEED: usize = 7;

// FanControl, relative to the record start.
const CTRL_MODE: usize = 0;
const CTRL_MANUAL_DUTY: usize = 1;
const CTRL_SOURCE: usize = 3;
const CTRL_PID: usize = 5;
const CTRL_CURVE_START_TEMP: usize = 19;
const CTRL_CURVE_TEMPS: usize = 21;
const CTRL_CURVE_POWERS: usize = CTRL_CURVE_TEMPS + NUM_CURVE_POINTS * 2;

// =============================================================================
// Field Addressing
// =============================================================================

/// One value of the PID record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidField {
    Setpoint,
    Proportional,
    Integral,
    Derivative,
    DerivativeTime,
    Hysteresis,
    Flags,
}

impl PidField {
    pub const ALL: [PidField; 7] = [
        PidField::Setpoint,
        PidField::Proportional,
        PidField::Integral,
        PidField::Derivative,
        PidField::DerivativeTime,
        PidField::Hysteresis,
        PidField::Flags,
    ];

    const fn offset(self) -> usize {
        match self {
            PidField::Setpoint => 0,
            PidField::Proportional => 2,
            PidField::Integral => 4,
            PidField::Derivative => 6,
            PidField::DerivativeTime => 8,
            PidField::Hysteresis => 10,
            PidField::Flags => 12,
        }
    }
}

/// A single addressable field of one channel's configuration.
///
/// Duty fields hold device fixed-point percent, temperatures hold
/// centi-degrees. Values are raw device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    Mode,
    ManualDuty,
    /// Opaque temperature source selector, 0 = internal coolant sensor.
    Source,
    Pid(PidField),
    CurveStartTemp,
    CurveTemp(usize),
    CurvePower(usize),
    Flags,
    MinDuty,
    MaxDuty,
    FallbackDuty,
    MaxSpeed,
}

impl ControlField {
    /// Check that `value` fits this field before any device access.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for curve indices outside 0..16, byte fields
    /// above 255 and modes outside Manual/PID/Curve.
    pub fn check(self, value: u16) -> Result<()> {
        self.check_index()?;
        match self {
            ControlField::Mode => ControlMode::from_raw(value).map(|_| ()),
            ControlField::Flags if value > u8::MAX as u16 => Err(D5NextError::InvalidArgument(
                format!("flags value {} does not fit in a byte", value),
            )),
            _ => Ok(()),
        }
    }

    fn check_index(self) -> Result<()> {
        match self {
            ControlField::CurveTemp(idx) | ControlField::CurvePower(idx)
                if idx >= NUM_CURVE_POINTS =>
            {
                Err(D5NextError::InvalidArgument(format!(
                    "curve point {} out of range (0-{})",
                    idx,
                    NUM_CURVE_POINTS - 1
                )))
            }
            _ => Ok(()),
        }
    }

    /// Absolute byte offset of this field in the control report.
    pub fn offset(self, channel: ControlChannel) -> Result<usize> {
        self.check_index()?;
        let props = OFFSET_FAN_PROPERTIES + channel.index() * FAN_PROPERTIES_SIZE;
        let ctrl = OFFSET_FAN_CONTROL + channel.index() * FAN_CONTROL_SIZE;
        Ok(match self {
            ControlField::Mode => ctrl + CTRL_MODE,
            ControlField::ManualDuty => ctrl + CTRL_MANUAL_DUTY,
            ControlField::Source => ctrl + CTRL_SOURCE,
            ControlField::Pid(pid) => ctrl + CTRL_PID + pid.offset(),
            ControlField::CurveStartTemp => ctrl + CTRL_CURVE_START_TEMP,
            ControlField::CurveTemp(idx) => ctrl + CTRL_CURVE_TEMPS + idx * 2,
            ControlField::CurvePower(idx) => ctrl + CTRL_CURVE_POWERS + idx * 2,
            ControlField::Flags => props + PROP_FLAGS,
            ControlField::MinDuty => props + PROP_MIN_DUTY,
            ControlField::MaxDuty => props + PROP_MAX_DUTY,
            ControlField::FallbackDuty => props + PROP_FALLBACK_DUTY,
            ControlField::MaxSpeed => props + PROP_MAX_SPEED,
        })
    }
}

impl std::fmt::Display for ControlField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlField::Pid(pid) => write!(f, "Pid{:?}", pid),
            ControlField::CurveTemp(idx) => write!(f, "CurveTemp[{}]", idx),
            ControlField::CurvePower(idx) => write!(f, "CurvePower[{}]", idx),
            other => write!(f, "{:?}", other),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Fixed per-channel bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanProperties {
    pub flags: u8,
    /// Fixed-point percent.
    pub min_duty: u16,
    /// Fixed-point percent.
    pub max_duty: u16,
    /// Fixed-point percent.
    pub fallback_duty: u16,
    /// RPM.
    pub max_speed: u16,
}

impl FanProperties {
    fn decode(buf: &[u8]) -> Self {
        Self {
            flags: buf[PROP_FLAGS],
            min_duty: BigEndian::read_u16(&buf[PROP_MIN_DUTY..]),
            max_duty: BigEndian::read_u16(&buf[PROP_MAX_DUTY..]),
            fallback_duty: BigEndian::read_u16(&buf[PROP_FALLBACK_DUTY..]),
            max_speed: BigEndian::read_u16(&buf[PROP_MAX_SPEED..]),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[PROP_FLAGS] = self.flags;
        BigEndian::write_u16(&mut buf[PROP_MIN_DUTY..], self.min_duty);
        BigEndian::write_u16(&mut buf[PROP_MAX_DUTY..], self.max_duty);
        BigEndian::write_u16(&mut buf[PROP_FALLBACK_DUTY..], self.fallback_duty);
        BigEndian::write_u16(&mut buf[PROP_MAX_SPEED..], self.max_speed);
    }
}

/// PID controller parameters, raw device values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidSettings {
    pub setpoint: u16,
    pub proportional: u16,
    pub integral: u16,
    pub derivative: u16,
    pub derivative_time: u16,
    pub hysteresis: u16,
    pub flags: u16,
}

impl PidSettings {
    fn slot(&mut self, field: PidField) -> &mut u16 {
        match field {
            PidField::Setpoint => &mut self.setpoint,
            PidField::Proportional => &mut self.proportional,
            PidField::Integral => &mut self.integral,
            PidField::Derivative => &mut self.derivative,
            PidField::DerivativeTime => &mut self.derivative_time,
            PidField::Hysteresis => &mut self.hysteresis,
            PidField::Flags => &mut self.flags,
        }
    }

    pub fn get(&self, field: PidField) -> u16 {
        match field {
            PidField::Setpoint => self.setpoint,
            PidField::Proportional => self.proportional,
            PidField::Integral => self.integral,
            PidField::Derivative => self.derivative,
            PidField::DerivativeTime => self.derivative_time,
            PidField::Hysteresis => self.hysteresis,
            PidField::Flags => self.flags,
        }
    }
}

/// Temperature to power curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurveSettings {
    /// Centi-degrees.
    pub start_temp: u16,
    /// Centi-degrees.
    pub temps: [u16; NUM_CURVE_POINTS],
    /// Fixed-point percent.
    pub powers: [u16; NUM_CURVE_POINTS],
}

/// Per-channel control configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanControl {
    /// Raw mode byte, see [`ControlMode`].
    pub mode: u8,
    /// Fixed-point percent.
    pub manual_duty: u16,
    pub source: u16,
    pub pid: PidSettings,
    pub curve: CurveSettings,
}

impl FanControl {
    /// Decoded control mode.
    pub fn control_mode(&self) -> Result<ControlMode> {
        ControlMode::from_raw(self.mode as u16)
    }

    fn decode(buf: &[u8]) -> Self {
        let pid = &buf[CTRL_PID..];
        let mut curve = CurveSettings {
            start_temp: BigEndian::read_u16(&buf[CTRL_CURVE_START_TEMP..]),
            ..Default::default()
        };
        BigEndian::read_u16_into(
            &buf[CTRL_CURVE_TEMPS..CTRL_CURVE_POWERS],
            &mut curve.temps,
        );
        BigEndian::read_u16_into(
            &buf[CTRL_CURVE_POWERS..FAN_CONTROL_SIZE],
            &mut curve.powers,
        );

        Self {
            mode: buf[CTRL_MODE],
            manual_duty: BigEndian::read_u16(&buf[CTRL_MANUAL_DUTY..]),
            source: BigEndian::read_u16(&buf[CTRL_SOURCE..]),
            pid: PidSettings {
                setpoint: BigEndian::read_u16(&pid[PidField::Setpoint.offset()..]),
                proportional: BigEndian::read_u16(&pid[PidField::Proportional.offset()..]),
                integral: BigEndian::read_u16(&pid[PidField::Integral.offset()..]),
                derivative: BigEndian::read_u16(&pid[PidField::Derivative.offset()..]),
                derivative_time: BigEndian::read_u16(&pid[PidField::DerivativeTime.offset()..]),
                hysteresis: BigEndian::read_u16(&pid[PidField::Hysteresis.offset()..]),
                flags: BigEndian::read_u16(&pid[PidField::Flags.offset()..]),
            },
            curve,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[CTRL_MODE] = self.mode;
        BigEndian::write_u16(&mut buf[CTRL_MANUAL_DUTY..], self.manual_duty);
        BigEndian::write_u16(&mut buf[CTRL_SOURCE..], self.source);
        for field in PidField::ALL {
            BigEndian::write_u16(&mut buf[CTRL_PID + field.offset()..], self.pid.get(field));
        }
        BigEndian::write_u16(&mut buf[CTRL_CURVE_START_TEMP..], self.curve.start_temp);
        BigEndian::write_u16_into(&self.curve.temps, &mut buf[CTRL_CURVE_TEMPS..CTRL_CURVE_POWERS]);
        BigEndian::write_u16_into(
            &self.curve.powers,
            &mut buf[CTRL_CURVE_POWERS..FAN_CONTROL_SIZE],
        );
    }
}

// =============================================================================
// Control Block
// =============================================================================

/// Decoded image of the control report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    pub version: u8,
    header_padding: [u8; HEADER_PADDING_LEN],
    pub properties: [FanProperties; NUM_CHANNELS],
    pub controls: [FanControl; NUM_CHANNELS],
    trailer_padding: [u8; TRAILER_PADDING_LEN],
    /// Checksum as read from the device.
    pub checksum: u16,
}

impl ControlBlock {
    /// Decode a control report.
    ///
    /// # Arguments
    /// * `buf` - Control report, report id at byte 0
    ///
    /// # Errors
    /// Returns `InvalidResponse` if the buffer is shorter than the report.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < CONTROL_REPORT_SIZE {
            return Err(D5NextError::InvalidResponse {
                message: format!(
                    "Control report too short: {} bytes, expected {}",
                    buf.len(),
                    CONTROL_REPORT_SIZE
                ),
            });
        }

        let mut header_padding = [0u8; HEADER_PADDING_LEN];
        header_padding.copy_from_slice(&buf[OFFSET_HEADER_PADDING..OFFSET_FAN_PROPERTIES]);
        let mut trailer_padding = [0u8; TRAILER_PADDING_LEN];
        trailer_padding.copy_from_slice(&buf[OFFSET_TRAILER_PADDING..CHECKSUM_OFFSET]);

        let properties = ControlChannel::ALL.map(|channel| {
            let start = OFFSET_FAN_PROPERTIES + channel.index() * FAN_PROPERTIES_SIZE;
            FanProperties::decode(&buf[start..start + FAN_PROPERTIES_SIZE])
        });
        let controls = ControlChannel::ALL.map(|channel| {
            let start = OFFSET_FAN_CONTROL + channel.index() * FAN_CONTROL_SIZE;
            FanControl::decode(&buf[start..start + FAN_CONTROL_SIZE])
        });

        Ok(Self {
            version: buf[OFFSET_VERSION],
            header_padding,
            properties,
            controls,
            trailer_padding,
            checksum: BigEndian::read_u16(&buf[CHECKSUM_OFFSET..]),
        })
    }

    /// Encode the block as-is, including the stored checksum.
    pub fn encode(&self) -> [u8; CONTROL_REPORT_SIZE] {
        let mut buf = [0u8; CONTROL_REPORT_SIZE];
        buf[OFFSET_VERSION] = self.version;
        buf[OFFSET_HEADER_PADDING..OFFSET_FAN_PROPERTIES].copy_from_slice(&self.header_padding);
        for channel in ControlChannel::ALL {
            let start = OFFSET_FAN_PROPERTIES + channel.index() * FAN_PROPERTIES_SIZE;
            self.properties[channel.index()].encode(&mut buf[start..start + FAN_PROPERTIES_SIZE]);
            let start = OFFSET_FAN_CONTROL + channel.index() * FAN_CONTROL_SIZE;
            self.controls[channel.index()].encode(&mut buf[start..start + FAN_CONTROL_SIZE]);
        }
        buf[OFFSET_TRAILER_PADDING..CHECKSUM_OFFSET].copy_from_slice(&self.trailer_padding);
        BigEndian::write_u16(&mut buf[CHECKSUM_OFFSET..], self.checksum);
        buf
    }

    /// Encode with a freshly computed checksum, updating `self.checksum`.
    pub fn encode_sealed(&mut self) -> [u8; CONTROL_REPORT_SIZE] {
        let mut buf = self.encode();
        self.checksum = checksum::seal(&mut buf);
        buf
    }

    /// Whether the stored checksum matches the contents.
    pub fn is_checksum_valid(&self) -> bool {
        checksum::validate(&self.encode())
    }

    pub fn properties(&self, channel: ControlChannel) -> &FanProperties {
        &self.properties[channel.index()]
    }

    pub fn control(&self, channel: ControlChannel) -> &FanControl {
        &self.controls[channel.index()]
    }

    /// Read one field in raw device units.
    pub fn field(&self, channel: ControlChannel, field: ControlField) -> Result<u16> {
        field.check_index()?;
        let props = &self.properties[channel.index()];
        let ctrl = &self.controls[channel.index()];
        Ok(match field {
            ControlField::Mode => ctrl.mode as u16,
            ControlField::ManualDuty => ctrl.manual_duty,
            ControlField::Source => ctrl.source,
            ControlField::Pid(pid) => ctrl.pid.get(pid),
            ControlField::CurveStartTemp => ctrl.curve.start_temp,
            ControlField::CurveTemp(idx) => ctrl.curve.temps[idx],
            ControlField::CurvePower(idx) => ctrl.curve.powers[idx],
            ControlField::Flags => props.flags as u16,
            ControlField::MinDuty => props.min_duty,
            ControlField::MaxDuty => props.max_duty,
            ControlField::FallbackDuty => props.fallback_duty,
            ControlField::MaxSpeed => props.max_speed,
        })
    }

    /// Overwrite one field with a raw device value.
    pub fn set_field(&mut self, channel: ControlChannel, field: ControlField, value: u16) -> Result<()> {
        field.check(value)?;
        let props = &mut self.properties[channel.index()];
        let ctrl = &mut self.controls[channel.index()];
        match field {
            ControlField::Mode => ctrl.mode = value as u8,
            ControlField::ManualDuty => ctrl.manual_duty = value,
            ControlField::Source => ctrl.source = value,
            ControlField::Pid(pid) => *ctrl.pid.slot(pid) = value,
            ControlField::CurveStartTemp => ctrl.curve.start_temp = value,
            ControlField::CurveTemp(idx) => ctrl.curve.temps[idx] = value,
            ControlField::CurvePower(idx) => ctrl.curve.powers[idx] = value,
            ControlField::Flags => props.flags = value as u8,
            ControlField::MinDuty => props.min_duty = value,
            ControlField::MaxDuty => props.max_duty = value,
            ControlField::FallbackDuty => props.fallback_duty = value,
            ControlField::MaxSpeed => props.max_speed = value,
        }
        Ok(())
    }

    /// Hex dump of the encoded report, 16 bytes per line.
    pub fn hex_dump(&self) -> String {
        let bytes = self.encode();
        let mut out = String::with_capacity(bytes.len() * 3 + bytes.len() / 16);
        for line in bytes.chunks(16) {
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            out.push_str(&hex.join(" "));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A sealed report with distinctive padding and known field values.
    pub(crate) fn sample_report() -> [u8; CONTROL_REPORT_SIZE] {
        let mut buf = [0u8; CONTROL_REPORT_SIZE];
        buf[0] = 0x03;
        for (i, byte) in buf[OFFSET_HEADER_PADDING..OFFSET_FAN_PROPERTIES]
            .iter_mut()
            .enumerate()
        {
            *byte = 0xA0 ^ i as u8;
        }
        for (i, byte) in buf[OFFSET_TRAILER_PADDING..CHECKSUM_OFFSET]
            .iter_mut()
            .enumerate()
        {
            *byte = (i % 253) as u8;
        }
        // Fan: manual mode at 25.86%, max speed 4000 RPM.
        let fan_ctrl = OFFSET_FAN_CONTROL;
        buf[fan_ctrl + CTRL_MODE] = 0;
        BigEndian::write_u16(&mut buf[fan_ctrl + CTRL_MANUAL_DUTY..], 0x0A1A);
        BigEndian::write_u16(&mut buf[OFFSET_FAN_PROPERTIES + PROP_MAX_SPEED..], 4000);
        // Pump: curve mode, source 7, curve temps 20.00..35.00 degC.
        let pump_ctrl = OFFSET_FAN_CONTROL + FAN_CONTROL_SIZE;
        buf[pump_ctrl + CTRL_MODE] = 2;
        BigEndian::write_u16(&mut buf[pump_ctrl + CTRL_SOURCE..], 7);
        BigEndian::write_u16(&mut buf[pump_ctrl + CTRL_CURVE_START_TEMP..], 2500);
        for i in 0..NUM_CURVE_POINTS {
            let temp = 2000 + i as u16 * 100;
            let power = i as u16 * 625;
            BigEndian::write_u16(&mut buf[pump_ctrl + CTRL_CURVE_TEMPS + i * 2..], temp);
            BigEndian::write_u16(&mut buf[pump_ctrl + CTRL_CURVE_POWERS + i * 2..], power);
        }
        let props_pump = OFFSET_FAN_PROPERTIES + FAN_PROPERTIES_SIZE;
        BigEndian::write_u16(&mut buf[props_pump + PROP_MIN_DUTY..], 2000);
        BigEndian::write_u16(&mut buf[props_pump + PROP_MAX_DUTY..], 10_000);
        BigEndian::write_u16(&mut buf[props_pump + PROP_MAX_SPEED..], 4800);
        checksum::seal(&mut buf);
        buf
    }

    #[test]
    fn test_layout_totals_report_size() {
        assert_eq!(OFFSET_FAN_PROPERTIES, 47);
        assert_eq!(OFFSET_FAN_CONTROL, 65);
        assert_eq!(OFFSET_TRAILER_PADDING, 235);
        assert_eq!(CHECKSUM_OFFSET, 807);
        assert_eq!(CHECKSUM_OFFSET + 2, CONTROL_REPORT_SIZE);
        assert_eq!(CTRL_CURVE_POWERS + NUM_CURVE_POINTS * 2, FAN_CONTROL_SIZE);
    }

    #[test]
    fn test_decode_fields() {
        let block = ControlBlock::decode(&sample_report()).unwrap();
        assert_eq!(block.version, 0x03);
        let fan = block.control(ControlChannel::Fan);
        assert_eq!(fan.control_mode().unwrap(), ControlMode::Manual);
        assert_eq!(fan.manual_duty, 0x0A1A);
        assert_eq!(block.properties(ControlChannel::Fan).max_speed, 4000);

        let pump = block.control(ControlChannel::Pump);
        assert_eq!(pump.control_mode().unwrap(), ControlMode::Curve);
        assert_eq!(pump.source, 7);
        assert_eq!(pump.curve.start_temp, 2500);
        assert_eq!(pump.curve.temps[15], 3500);
        assert_eq!(pump.curve.powers[1], 625);
        assert_eq!(block.properties(ControlChannel::Pump).min_duty, 2000);
        assert!(block.is_checksum_valid());
    }

    #[test]
    fn test_encode_is_byte_exact() {
        let report = sample_report();
        let block = ControlBlock::decode(&report).unwrap();
        assert_eq!(block.encode(), report);
    }

    #[test]
    fn test_decode_rejects_short_report() {
        let report = sample_report();
        let result = ControlBlock::decode(&report[..CONTROL_REPORT_SIZE - 1]);
        assert!(matches!(result, Err(D5NextError::InvalidResponse { .. })));
    }

    #[test]
    fn test_set_field_touches_only_that_field() {
        let report = sample_report();
        let mut block = ControlBlock::decode(&report).unwrap();
        block
            .set_field(ControlChannel::Fan, ControlField::ManualDuty, 5020)
            .unwrap();
        let encoded = block.encode();

        let offset = ControlField::ManualDuty.offset(ControlChannel::Fan).unwrap();
        assert_eq!(BigEndian::read_u16(&encoded[offset..]), 5020);
        for (i, (a, b)) in report.iter().zip(encoded.iter()).enumerate() {
            if i != offset && i != offset + 1 {
                assert_eq!(a, b, "byte {} changed", i);
            }
        }
    }

    #[test]
    fn test_field_offsets_match_codec() {
        let mut block = ControlBlock::decode(&sample_report()).unwrap();
        let fields = [
            ControlField::ManualDuty,
            ControlField::Source,
            ControlField::Pid(PidField::Hysteresis),
            ControlField::CurveStartTemp,
            ControlField::CurveTemp(3),
            ControlField::CurvePower(15),
            ControlField::MinDuty,
            ControlField::MaxDuty,
            ControlField::FallbackDuty,
            ControlField::MaxSpeed,
        ];
        for channel in ControlChannel::ALL {
            for field in fields {
                block.set_field(channel, field, 0xBEEF).unwrap();
                let encoded = block.encode();
                let offset = field.offset(channel).unwrap();
                assert_eq!(BigEndian::read_u16(&encoded[offset..]), 0xBEEF, "{}", field);
                assert_eq!(block.field(channel, field).unwrap(), 0xBEEF);
            }
            block.set_field(channel, ControlField::Mode, 1).unwrap();
            let offset = ControlField::Mode.offset(channel).unwrap();
            assert_eq!(block.encode()[offset], 1);
        }
    }

    #[test]
    fn test_padding_preserved_after_mutation() {
        let report = sample_report();
        let mut block = ControlBlock::decode(&report).unwrap();
        block
            .set_field(ControlChannel::Pump, ControlField::CurvePower(4), 9999)
            .unwrap();
        let encoded = block.encode_sealed();
        assert_eq!(
            encoded[OFFSET_HEADER_PADDING..OFFSET_FAN_PROPERTIES],
            report[OFFSET_HEADER_PADDING..OFFSET_FAN_PROPERTIES]
        );
        assert_eq!(
            encoded[OFFSET_TRAILER_PADDING..CHECKSUM_OFFSET],
            report[OFFSET_TRAILER_PADDING..CHECKSUM_OFFSET]
        );
        assert!(checksum::validate(&encoded));
        assert_ne!(block.checksum, ControlBlock::decode(&report).unwrap().checksum);
    }

    #[test]
    fn test_field_checks() {
        assert!(ControlField::CurveTemp(15).check(0).is_ok());
        assert!(ControlField::CurveTemp(16).check(0).is_err());
        assert!(ControlField::CurvePower(16).offset(ControlChannel::Fan).is_err());
        assert!(ControlField::Mode.check(2).is_ok());
        assert!(ControlField::Mode.check(3).is_err());
        assert!(ControlField::Flags.check(256).is_err());
        assert!(ControlField::Source.check(u16::MAX).is_ok());
    }

    #[test]
    fn test_hex_dump_lines() {
        let block = ControlBlock::decode(&sample_report()).unwrap();
        let dump = block.hex_dump();
        assert_eq!(dump.lines().count(), CONTROL_REPORT_SIZE.div_ceil(16));
        assert!(dump.starts_with("03 a0 a1"));
    }
}
