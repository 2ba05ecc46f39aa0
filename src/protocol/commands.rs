//! Report identifiers and fixed layout constants for the D5 Next.
//!
//! The pump pushes a sensor report once per second and exposes its whole
//! configuration as a single feature report that is read, patched and
//! written back.

// =============================================================================
// Constants
// =============================================================================

/// Aquacomputer Vendor ID.
pub const AQUACOMPUTER_VID: u16 = 0x0C70;

/// D5 Next Product ID.
pub const D5NEXT_PID: u16 = 0xF00E;

/// Interval at which the device pushes sensor reports.
pub const TELEMETRY_INTERVAL_MS: u64 = 1000;

/// Telemetry older than interval * factor is considered absent.
pub const DEFAULT_STALE_FACTOR: u32 = 2;

// =============================================================================
// Report IDs
// =============================================================================

/// Periodic sensor report (input, pushed by the device).
pub const SENSOR_REPORT_ID: u8 = 0x01;

/// Companion report sent after each configuration write.
pub const SECONDARY_STATUS_REPORT_ID: u8 = 0x02;

/// Control/configuration feature report.
pub const CONTROL_REPORT_ID: u8 = 0x03;

// =============================================================================
// Report Sizes
// =============================================================================

/// Size of the sensor report on the wire, report id included.
pub const SENSOR_REPORT_SIZE: usize = 0x9E;

/// Smallest sensor report that still carries every decoded field.
pub const SENSOR_REPORT_MIN_SIZE: usize = 0x7B;

/// Size of the control report, report id included.
pub const CONTROL_REPORT_SIZE: usize = 809;

/// Size of the companion report.
pub const SECONDARY_STATUS_REPORT_SIZE: usize = 0x0B;

/// Contents of the report the vendor software always sends after a write.
/// The device ignores configuration changes without it.
pub const SECONDARY_STATUS_REPORT: [u8; SECONDARY_STATUS_REPORT_SIZE] = [
    0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x34, 0xC6,
];

// =============================================================================
// Checksum Range
// =============================================================================

/// First byte of the control report covered by the checksum.
pub const CHECKSUM_START: usize = 0x01;

/// Number of bytes covered by the checksum.
pub const CHECKSUM_LENGTH: usize = 0x326;

// =============================================================================
// Sensor Report Offsets
// =============================================================================

pub const OFFSET_SERIAL_FIRST_PART: usize = 0x03;
pub const OFFSET_SERIAL_SECOND_PART: usize = 0x05;
pub const OFFSET_FIRMWARE_VERSION: usize = 0x0D;
/// Big-endian u32.
pub const OFFSET_POWER_CYCLES: usize = 0x18;
pub const OFFSET_PLUS_5V_VOLTAGE: usize = 0x39;
pub const OFFSET_COOLANT_TEMP: usize = 0x57;

/// Per-channel measurement block in the sensor report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOffsets {
    pub voltage: usize,
    pub current: usize,
    pub power: usize,
    pub speed: usize,
    pub setpoint: usize,
}

pub const FAN_OFFSETS: ChannelOffsets = ChannelOffsets {
    voltage: 0x61,
    current: 0x63,
    power: 0x65,
    speed: 0x67,
    setpoint: 0x77,
};

pub const PUMP_OFFSETS: ChannelOffsets = ChannelOffsets {
    voltage: 0x6E,
    current: 0x70,
    power: 0x72,
    speed: 0x74,
    setpoint: 0x79,
};
