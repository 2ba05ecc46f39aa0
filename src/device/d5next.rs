//! Aquacomputer D5 Next device implementation.
//!
//! High-level interface combining the control-report transactions with the
//! pushed sensor telemetry.

use std::ffi::CString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hidapi::HidApi;
use log::{debug, info};

use crate::config::Settings;
use crate::cooling::{ControlMode, CurvePoint, PointAttribute};
use crate::device::telemetry::TelemetryCache;
use crate::device::transaction::ControlTransactions;
use crate::device::transport::{HidTransport, TelemetryListener, Transport};
use crate::error::{D5NextError, Result};
use crate::protocol::units::{self, DEVICE_DUTY_MAX};
use crate::protocol::{
    AQUACOMPUTER_VID, Channel, ControlBlock, ControlField, CurveSettings, D5NEXT_PID,
    FanProperties, NUM_CURVE_POINTS, SensorReport, SerialNumber,
};
use crate::sensors::{self, Attribute, SensorType, VOLTAGE_CHANNEL_5V, unsupported};

// =============================================================================
// Constants
// =============================================================================

/// Poll interval while waiting for the first sensor report.
const TELEMETRY_POLL_MS: u64 = 50;

/// Highest curve temperature accepted, milli-degrees Celsius.
pub const MAX_CURVE_TEMP: i64 = 100_000;

// Read paths report transport failures as missing data.
fn no_data(e: D5NextError) -> D5NextError {
    if e.is_transport() {
        debug!("Read failed, reporting no data: {}", e);
        D5NextError::NoData
    } else {
        e
    }
}

fn normalized_duty(value: i64) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| D5NextError::InvalidArgument(format!("duty {} out of range (0-255)", value)))
}

// =============================================================================
// D5Next
// =============================================================================

/// Aquacomputer D5 Next device handle.
///
/// Configuration changes go through a per-device transaction lock; sensor
/// values come from the reports the pump pushes every second.
///
/// # Example
///
/// ```no_run
/// use aquacomputer_rust_devices::config::Settings;
/// use aquacomputer_rust_devices::device::D5Next;
/// use aquacomputer_rust_devices::protocol::Channel;
///
/// let d5next = D5Next::open(&Settings::default())?;
/// let status = d5next.wait_for_telemetry(std::time::Duration::from_secs(3))?;
/// println!("{}", status);
///
/// d5next.set_duty(Channel::Fan, 128)?;
/// # Ok::<(), aquacomputer_rust_devices::error::D5NextError>(())
/// ```
pub struct D5Next<T = HidTransport> {
    control: ControlTransactions<T>,
    telemetry: Arc<TelemetryCache>,
    listener: Option<TelemetryListener>,
}

impl D5Next<HidTransport> {
    /// Open the configured device, or the first D5 Next found.
    ///
    /// Opens two handles: one for feature-report transactions and one for
    /// the telemetry listener thread.
    ///
    /// # Errors
    /// Returns `DeviceNotFound` if no D5 Next is connected.
    pub fn open(settings: &Settings) -> Result<Self> {
        let api = HidApi::new()?;

        let path = match &settings.device_path {
            Some(path) => CString::new(path.as_str()).map_err(|_| {
                D5NextError::InvalidArgument(format!("Invalid device path '{}'", path))
            })?,
            None => api
                .device_list()
                .find(|info| info.vendor_id() == AQUACOMPUTER_VID && info.product_id() == D5NEXT_PID)
                .map(|info| info.path().to_owned())
                .ok_or(D5NextError::DeviceNotFound)?,
        };

        let control = api.open_path(&path)?;
        let reader = api.open_path(&path)?;

        let telemetry = Arc::new(TelemetryCache::new(settings.stale_after()));
        let cache = telemetry.clone();
        let listener =
            TelemetryListener::spawn(reader, settings.read_timeout_ms, move |raw| cache.update(raw))?;

        info!("Opened D5 Next at {}", path.to_string_lossy());

        Ok(Self {
            control: ControlTransactions::new(HidTransport::new(control)),
            telemetry,
            listener: Some(listener),
        })
    }

    /// List all connected D5 Next devices.
    ///
    /// Returns a vector of (path, serial_number) tuples.
    pub fn list_devices() -> Result<Vec<(String, Option<String>)>> {
        let api = HidApi::new()?;

        let devices: Vec<_> = api
            .device_list()
            .filter(|info| info.vendor_id() == AQUACOMPUTER_VID && info.product_id() == D5NEXT_PID)
            .map(|info| {
                (
                    info.path().to_string_lossy().into_owned(),
                    info.serial_number().map(String::from),
                )
            })
            .collect();

        Ok(devices)
    }
}

impl<T: Transport> D5Next<T> {
    /// Build a device over an existing transport and telemetry cache.
    ///
    /// The caller is responsible for feeding the cache.
    pub fn with_transport(transport: T, telemetry: Arc<TelemetryCache>) -> Self {
        Self {
            control: ControlTransactions::new(transport),
            telemetry,
            listener: None,
        }
    }

    pub fn telemetry(&self) -> &Arc<TelemetryCache> {
        &self.telemetry
    }

    /// Whether the telemetry listener thread is alive.
    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(TelemetryListener::is_running)
    }

    // =========================================================================
    // Telemetry
    // =========================================================================

    /// Latest fresh sensor report.
    ///
    /// # Errors
    /// Returns `NoData` if no report arrived within the staleness window.
    pub fn status(&self) -> Result<SensorReport> {
        self.telemetry
            .read()
            .map(|snapshot| snapshot.report)
            .ok_or(D5NextError::NoData)
    }

    /// Block until a fresh sensor report is available.
    pub fn wait_for_telemetry(&self, timeout: Duration) -> Result<SensorReport> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.status() {
                Ok(report) => return Ok(report),
                Err(D5NextError::NoData) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(TELEMETRY_POLL_MS));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Serial number from the last sensor report, however old.
    pub fn serial_number(&self) -> Result<SerialNumber> {
        self.last_report().map(|report| report.serial_number)
    }

    pub fn firmware_version(&self) -> Result<u16> {
        self.last_report().map(|report| report.firmware_version)
    }

    pub fn power_cycles(&self) -> Result<u32> {
        self.last_report().map(|report| report.power_cycles)
    }

    fn last_report(&self) -> Result<SensorReport> {
        self.telemetry
            .latest()
            .map(|snapshot| snapshot.report)
            .ok_or(D5NextError::NoData)
    }

    // =========================================================================
    // Sensor Surface
    // =========================================================================

    /// Read a numeric sensor value.
    ///
    /// Channel numbers are consumer numbers (0 = pump, 1 = fan; voltage
    /// channel 2 is the +5V rail). Units: milli-degrees, RPM, 0-255 duty,
    /// micro-watts, milli-volts, milli-amps. `pwm enable` is the raw control
    /// mode (0 = manual, 1 = PID, 2 = curve).
    ///
    /// # Errors
    /// - `InvalidArgument` for a channel the sensor type does not have
    /// - `Unsupported` for attributes that are not numeric values
    /// - `NoData` when telemetry is stale or the control report cannot be fetched
    pub fn read(&self, sensor: SensorType, attribute: Attribute, channel: u32) -> Result<i64> {
        sensor.check_channel(channel)?;
        sensors::access(sensor, attribute)?;
        if attribute == Attribute::Label {
            return Err(unsupported(sensor, attribute));
        }

        let report = self.status()?;
        match sensor {
            SensorType::Temp => Ok(report.coolant_temp as i64),
            SensorType::In if channel == VOLTAGE_CHANNEL_5V => Ok(report.plus_5v_voltage as i64),
            _ => self.read_channel(&report, sensor, attribute, Channel::from_number(channel)?),
        }
    }

    fn read_channel(
        &self,
        report: &SensorReport,
        sensor: SensorType,
        attribute: Attribute,
        channel: Channel,
    ) -> Result<i64> {
        let readings = report.readings(channel);
        match (sensor, attribute) {
            (SensorType::Fan, Attribute::Input) => Ok(readings.speed as i64),
            (SensorType::Fan, Attribute::Max) => self
                .control
                .read_field(channel.internal(), ControlField::MaxSpeed)
                .map(i64::from)
                .map_err(no_data),
            (SensorType::Pwm, Attribute::Input) => {
                let block = self.control.fetch_block().map_err(no_data)?;
                let ctrl = block.control(channel.internal());
                if matches!(ctrl.control_mode(), Ok(ControlMode::Manual)) {
                    Ok(units::device_duty_to_normalized(ctrl.manual_duty) as i64)
                } else {
                    Ok(readings.setpoint as i64)
                }
            }
            (SensorType::Pwm, Attribute::Enable) => self
                .control
                .read_field(channel.internal(), ControlField::Mode)
                .map(i64::from)
                .map_err(no_data),
            (SensorType::Power, Attribute::Input) => Ok(readings.power as i64),
            (SensorType::In, Attribute::Input) => Ok(readings.voltage as i64),
            (SensorType::Curr, Attribute::Input) => Ok(readings.current as i64),
            _ => Err(unsupported(sensor, attribute)),
        }
    }

    /// Read a string attribute (labels).
    pub fn read_string(
        &self,
        sensor: SensorType,
        attribute: Attribute,
        channel: u32,
    ) -> Result<&'static str> {
        sensors::access(sensor, attribute)?;
        if attribute != Attribute::Label {
            return Err(unsupported(sensor, attribute));
        }
        sensors::label(sensor, channel)
    }

    /// Write a sensor value.
    ///
    /// Only `pwm input` (0-255, manual duty) and `pwm enable` (control mode)
    /// are writable. Arguments are validated before the device is touched.
    ///
    /// # Errors
    /// `InvalidArgument`, `Unsupported`, or `Transport` if the transaction fails.
    pub fn write(
        &self,
        sensor: SensorType,
        attribute: Attribute,
        channel: u32,
        value: i64,
    ) -> Result<()> {
        sensor.check_channel(channel)?;
        if sensors::access(sensor, attribute)? != sensors::Access::ReadWrite {
            return Err(unsupported(sensor, attribute));
        }
        let channel = Channel::from_number(channel)?;

        match attribute {
            Attribute::Input => self.set_duty(channel, normalized_duty(value)?),
            Attribute::Enable => {
                let raw = u16::try_from(value).map_err(|_| {
                    D5NextError::InvalidArgument(format!("control mode {} out of range", value))
                })?;
                self.set_mode(channel, ControlMode::from_raw(raw)?)
            }
            _ => Err(unsupported(sensor, attribute)),
        }
    }

    // =========================================================================
    // Curve Points
    // =========================================================================

    /// Read one half of a curve point.
    ///
    /// Temperatures are milli-degrees, duties 0-255. See [`CurvePoint`] for
    /// the index layout.
    pub fn read_point(&self, channel: u32, index: usize, attribute: PointAttribute) -> Result<i64> {
        let channel = Channel::from_number(channel)?;
        let field = CurvePoint::from_index(index)?.field(attribute)?;
        let raw = self
            .control
            .read_field(channel.internal(), field)
            .map_err(no_data)?;

        Ok(match attribute {
            PointAttribute::Temp => units::centi_to_milli_degrees(raw) as i64,
            PointAttribute::Duty => units::device_duty_to_normalized(raw) as i64,
        })
    }

    /// Write one half of a curve point.
    ///
    /// # Arguments
    /// * `value` - Milli-degrees (0 to 100 °C) or duty 0-255
    pub fn write_point(
        &self,
        channel: u32,
        index: usize,
        attribute: PointAttribute,
        value: i64,
    ) -> Result<()> {
        let channel = Channel::from_number(channel)?;
        let field = CurvePoint::from_index(index)?.field(attribute)?;

        let raw = match attribute {
            PointAttribute::Temp => {
                if !(0..=MAX_CURVE_TEMP).contains(&value) {
                    return Err(D5NextError::InvalidArgument(format!(
                        "temperature {} out of range (0-{} m°C)",
                        value, MAX_CURVE_TEMP
                    )));
                }
                units::milli_to_centi_degrees(value) as u16
            }
            PointAttribute::Duty => units::normalized_duty_to_device(normalized_duty(value)?),
        };

        self.control.write_field(channel.internal(), field, raw)
    }

    // =========================================================================
    // Typed Control
    // =========================================================================

    /// Set the manual duty of a channel (0-255).
    pub fn set_duty(&self, channel: Channel, duty: u8) -> Result<()> {
        self.control.write_field(
            channel.internal(),
            ControlField::ManualDuty,
            units::normalized_duty_to_device(duty),
        )
    }

    pub fn set_mode(&self, channel: Channel, mode: ControlMode) -> Result<()> {
        self.control
            .write_field(channel.internal(), ControlField::Mode, mode.raw())
    }

    /// Current control mode, fetched from the device.
    pub fn mode(&self, channel: Channel) -> Result<ControlMode> {
        let raw = self.control.read_field(channel.internal(), ControlField::Mode)?;
        ControlMode::from_raw(raw)
    }

    /// Read a raw field of the control report.
    pub fn read_field(&self, channel: Channel, field: ControlField) -> Result<u16> {
        self.control.read_field(channel.internal(), field)
    }

    /// Write a raw field of the control report.
    pub fn write_field(&self, channel: Channel, field: ControlField, value: u16) -> Result<()> {
        self.control.write_field(channel.internal(), field, value)
    }

    /// Curve table of a channel, raw device units.
    pub fn curve(&self, channel: Channel) -> Result<CurveSettings> {
        Ok(self.control.fetch_block()?.control(channel.internal()).curve)
    }

    /// Fixed bounds of a channel, raw device units.
    pub fn properties(&self, channel: Channel) -> Result<FanProperties> {
        Ok(*self.control.fetch_block()?.properties(channel.internal()))
    }

    /// Replace the whole curve table, one transaction per value.
    ///
    /// # Arguments
    /// * `points` - (centi-degrees, fixed-point percent) pairs
    ///
    /// # Errors
    /// Returns `InvalidArgument` before any write if a duty exceeds 100%.
    pub fn set_curve(&self, channel: Channel, points: &[(u16, u16); NUM_CURVE_POINTS]) -> Result<()> {
        if let Some((_, duty)) = points.iter().find(|(_, duty)| *duty > DEVICE_DUTY_MAX) {
            return Err(D5NextError::InvalidArgument(format!(
                "curve duty {} above {}",
                duty, DEVICE_DUTY_MAX
            )));
        }

        let ctrl = channel.internal();
        for (idx, &(temp, duty)) in points.iter().enumerate() {
            self.control.write_field(ctrl, ControlField::CurveTemp(idx), temp)?;
            self.control.write_field(ctrl, ControlField::CurvePower(idx), duty)?;
        }
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Freshly fetched control block.
    pub fn control_block(&self) -> Result<ControlBlock> {
        self.control.fetch_block()
    }

    /// Hex dump of a freshly fetched control report followed by the decoded
    /// setpoints, checksum and fan curve.
    pub fn raw_dump(&self) -> Result<String> {
        let block = self.control.fetch_block()?;
        let mut out = block.hex_dump();
        for channel in Channel::ALL {
            let ctrl = block.control(channel.internal());
            out.push_str(&format!(
                "{} setpoint: {:#06x} ({:.2}%)\n",
                channel.to_string().to_lowercase(),
                ctrl.manual_duty,
                units::device_duty_to_percent(ctrl.manual_duty)
            ));
        }
        out.push_str(&format!(
            "checksum: {:#06x}{}\n",
            block.checksum,
            if block.is_checksum_valid() { "" } else { " (mismatch)" }
        ));
        let curve = &block.control(Channel::Fan.internal()).curve;
        for (temp, power) in curve.temps.iter().zip(curve.powers.iter()) {
            out.push_str(&format!("fan curve: temp {:#06x} power {:#06x}\n", temp, power));
        }
        Ok(out)
    }
}
