//! Aquacomputer D5 Next Control CLI
//!
//! Command-line interface for monitoring and controlling the Aquacomputer D5 Next pump.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use aquacomputer_rust_devices::config::{self, Settings};
use aquacomputer_rust_devices::cooling::{
    ControlMode, IDX_MAX_DUTY, IDX_MIN_DUTY, IDX_START_TEMP, PointAttribute, interpolate_duty,
};
use aquacomputer_rust_devices::device::D5Next;
use aquacomputer_rust_devices::protocol::units::device_duty_to_percent;
use aquacomputer_rust_devices::protocol::{Channel, NUM_CURVE_POINTS};
use aquacomputer_rust_devices::sensors::{self, Access};
use aquacomputer_rust_devices::utils::parsing::{
    parse_attribute, parse_channel, parse_curve_points, parse_mode, parse_sensor_type,
};

/// How long to wait for the first pushed sensor report.
const TELEMETRY_WAIT: Duration = Duration::from_secs(3);

// =============================================================================
// CLI Arguments
// =============================================================================

/// Aquacomputer D5 Next Control Tool
#[derive(Parser, Debug)]
#[command(name = "d5next-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Settings file (default: <config dir>/d5next-rust/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// HID device path, overrides the settings file
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected D5 Next devices
    List,

    /// Show current sensor readings
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Continuously monitor sensor readings
    Monitor {
        /// Update interval in seconds
        #[arg(short, long, default_value = "1")]
        interval: u64,
    },

    /// Show serial number, firmware and control modes
    Info,

    /// Dump the raw control report
    Dump,

    /// Show every sensor with label, value and access mode
    Sensors,

    /// Read a single sensor value, e.g. `read fan input 1`
    Read {
        /// temp, fan, pwm, power, in, curr
        sensor: String,
        /// input, label, max, enable
        attribute: String,
        /// Consumer channel number (0 = pump, 1 = fan, in 2 = +5V)
        #[arg(default_value = "0")]
        channel: u32,
    },

    /// Set the manual duty of a channel
    SetDuty {
        /// Channel: pump, fan, 0 or 1
        channel: String,
        /// Duty cycle (0-255)
        duty: u8,
        /// Also switch the channel to manual mode
        #[arg(long)]
        manual: bool,
    },

    /// Set the control mode of a channel
    SetMode {
        /// Channel: pump, fan, 0 or 1
        channel: String,
        /// manual, pid or curve
        mode: String,
    },

    /// Show the curve table and bounds of a channel
    Curve {
        /// Channel: pump, fan, 0 or 1
        channel: String,
    },

    /// Set one curve point
    SetPoint {
        /// Channel: pump, fan, 0 or 1
        channel: String,
        /// Curve point (0-15)
        #[arg(value_parser = clap::value_parser!(u8).range(0..16))]
        index: u8,
        /// Temperature in °C
        #[arg(long)]
        temp: Option<f32>,
        /// Duty cycle (0-255)
        #[arg(long)]
        duty: Option<u8>,
    },

    /// Set the temperature at which the curve starts
    SetStartTemp {
        /// Channel: pump, fan, 0 or 1
        channel: String,
        /// Temperature in °C
        temp: f32,
    },

    /// Set the minimum and/or maximum duty of a channel
    SetBounds {
        /// Channel: pump, fan, 0 or 1
        channel: String,
        /// Minimum duty (0-255)
        #[arg(long)]
        min: Option<u8>,
        /// Maximum duty (0-255)
        #[arg(long)]
        max: Option<u8>,
    },

    /// Apply a curve preset
    Profile {
        /// Preset: silent, performance, fixed:XX, a saved preset name,
        /// or TEMP:DUTY pairs such as 25:20,35:50,45:100
        name: String,

        /// Channel to apply the preset to: pump or fan
        #[arg(short, long, default_value = "fan")]
        channel: String,

        /// Switch the channel to curve mode afterwards
        #[arg(long)]
        activate: bool,

        /// Save the resolved curve points under this name in the settings file
        #[arg(long)]
        save_as: Option<String>,
    },

    /// Show or initialize the settings file
    Config {
        /// Write the current settings to the settings file
        #[arg(long)]
        save: bool,
    },
}

// =============================================================================
// Setup
// =============================================================================

fn logging_init(loglevel: LevelFilter) -> Result<LoggerHandle> {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .context("Cannot init logging")?
        .start()
        .context("Cannot start logging")?;
    Ok(log_handle)
}

fn settings_path(args: &Args) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => config::get_config_path().context("Failed to locate config directory"),
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let path = settings_path(args)?;
    let mut settings = Settings::load_from(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(device) = &args.device {
        settings.device_path = Some(device.clone());
    }
    debug!("Settings: {:?}", settings);
    Ok(settings)
}

fn open_device(settings: &Settings) -> Result<D5Next> {
    D5Next::open(settings).context("Failed to open D5 Next")
}

fn milli_degrees(celsius: f32) -> i64 {
    (celsius as f64 * 1000.0).round() as i64
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter())?;
    info!(
        "D5 Next CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let settings = load_settings(&args)?;

    match &args.command {
        Command::List => cmd_list(),
        Command::Status { json } => cmd_status(&settings, *json),
        Command::Monitor { interval } => cmd_monitor(&settings, *interval),
        Command::Info => cmd_info(&settings),
        Command::Dump => cmd_dump(&settings),
        Command::Sensors => cmd_sensors(&settings),
        Command::Read {
            sensor,
            attribute,
            channel,
        } => cmd_read(&settings, sensor, attribute, *channel),
        Command::SetDuty {
            channel,
            duty,
            manual,
        } => cmd_set_duty(&settings, channel, *duty, *manual),
        Command::SetMode { channel, mode } => cmd_set_mode(&settings, channel, mode),
        Command::Curve { channel } => cmd_curve(&settings, channel),
        Command::SetPoint {
            channel,
            index,
            temp,
            duty,
        } => cmd_set_point(&settings, channel, *index as usize, *temp, *duty),
        Command::SetStartTemp { channel, temp } => cmd_set_start_temp(&settings, channel, *temp),
        Command::SetBounds { channel, min, max } => cmd_set_bounds(&settings, channel, *min, *max),
        Command::Profile {
            name,
            channel,
            activate,
            save_as,
        } => cmd_profile(&args, settings.clone(), name, channel, *activate, save_as.as_deref()),
        Command::Config { save } => cmd_config(&args, &settings, *save),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_list() -> Result<()> {
    let devices = D5Next::list_devices().context("Failed to enumerate devices")?;

    if devices.is_empty() {
        println!("❌ No D5 Next devices found.");
        return Ok(());
    }

    println!("🔍 Found {} device(s):\n", devices.len());
    for (i, (path, serial)) in devices.iter().enumerate() {
        let serial_str = serial.as_deref().unwrap_or("unknown");
        println!("  {}. Serial: {}", i + 1, serial_str);
        println!("     Path: {}", path);
    }

    Ok(())
}

fn cmd_status(settings: &Settings, json: bool) -> Result<()> {
    let d5next = open_device(settings)?;
    let status = d5next
        .wait_for_telemetry(TELEMETRY_WAIT)
        .context("No sensor report received")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
    } else {
        print!("{}", status);
    }
    Ok(())
}

fn cmd_monitor(settings: &Settings, interval_secs: u64) -> Result<()> {
    let d5next = open_device(settings)?;

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    println!("🌡️  Monitoring D5 Next (Ctrl+C to stop)...\n");

    while running.load(Ordering::SeqCst) {
        if !d5next.is_listening() {
            bail!("Telemetry listener stopped, device disconnected?");
        }

        match d5next.status() {
            Ok(status) => {
                // Clear screen and move cursor to top
                print!("\x1B[2J\x1B[1;1H");
                print!("{}", status);
            }
            Err(e) => {
                eprintln!("⚠️  Read error: {}", e);
            }
        }

        std::thread::sleep(Duration::from_secs(interval_secs));
    }

    println!("\n👋 Monitoring stopped.");
    Ok(())
}

fn cmd_info(settings: &Settings) -> Result<()> {
    let d5next = open_device(settings)?;
    d5next
        .wait_for_telemetry(TELEMETRY_WAIT)
        .context("No sensor report received")?;

    println!("╭─────────────────────────────────╮");
    println!("│      Aquacomputer D5 Next       │");
    println!("├─────────────────────────────────┤");
    println!("│  Serial:       {:>15}  │", d5next.serial_number()?.to_string());
    println!("│  Firmware:     {:>15}  │", d5next.firmware_version()?);
    println!("│  Power cycles: {:>15}  │", d5next.power_cycles()?);
    for channel in Channel::ALL {
        let mode = d5next
            .mode(channel)
            .with_context(|| format!("Failed to read {} mode", channel))?;
        println!("│  {:<5} mode:   {:>15}  │", channel, mode.name());
    }
    println!("╰─────────────────────────────────╯");

    Ok(())
}

fn cmd_dump(settings: &Settings) -> Result<()> {
    let d5next = open_device(settings)?;
    let dump = d5next
        .raw_dump()
        .context("Failed to read control report")?;
    print!("{}", dump);
    Ok(())
}

fn cmd_sensors(settings: &Settings) -> Result<()> {
    let d5next = open_device(settings)?;
    if let Err(e) = d5next.wait_for_telemetry(TELEMETRY_WAIT) {
        warn!("No sensor report yet: {}", e);
    }

    println!(
        "{:<6} {:<7} {:>3}  {:<14} {:>10}  {}",
        "type", "attr", "ch", "label", "value", "access"
    );
    println!("{}", "─".repeat(56));

    for (sensor, attribute, channel) in sensors::enumerate() {
        if attribute == sensors::Attribute::Label {
            continue;
        }
        let label = sensors::label(sensor, channel).unwrap_or("-");
        let value = match d5next.read(sensor, attribute, channel) {
            Ok(value) => value.to_string(),
            Err(e) => {
                debug!("{} {} {}: {}", sensor.name(), attribute.name(), channel, e);
                "n/a".to_string()
            }
        };
        let access = match sensors::access(sensor, attribute)? {
            Access::ReadOnly => "ro",
            Access::ReadWrite => "rw",
        };
        println!(
            "{:<6} {:<7} {:>3}  {:<14} {:>10}  {}",
            sensor.name(),
            attribute.name(),
            channel,
            label,
            value,
            access
        );
    }

    Ok(())
}

fn cmd_read(settings: &Settings, sensor: &str, attribute: &str, channel: u32) -> Result<()> {
    let sensor = parse_sensor_type(sensor)?;
    let attribute = parse_attribute(attribute)?;
    let d5next = open_device(settings)?;

    if attribute == sensors::Attribute::Label {
        println!("{}", d5next.read_string(sensor, attribute, channel)?);
        return Ok(());
    }

    // Telemetry-backed values need the first pushed report.
    if let Err(e) = d5next.wait_for_telemetry(TELEMETRY_WAIT) {
        warn!("No sensor report yet: {}", e);
    }
    let value = d5next
        .read(sensor, attribute, channel)
        .with_context(|| format!("Failed to read {} {} {}", sensor.name(), attribute.name(), channel))?;
    println!("{}", value);
    Ok(())
}

fn cmd_set_duty(settings: &Settings, channel: &str, duty: u8, manual: bool) -> Result<()> {
    let channel = parse_channel(channel)?;
    let d5next = open_device(settings)?;

    d5next
        .set_duty(channel, duty)
        .with_context(|| format!("Failed to set {} duty", channel))?;
    if manual {
        d5next
            .set_mode(channel, ControlMode::Manual)
            .with_context(|| format!("Failed to set {} mode", channel))?;
    }

    println!("✅ {} duty set to {}/255", channel, duty);
    Ok(())
}

fn cmd_set_mode(settings: &Settings, channel: &str, mode: &str) -> Result<()> {
    let channel = parse_channel(channel)?;
    let mode = parse_mode(mode)?;
    let d5next = open_device(settings)?;

    d5next
        .set_mode(channel, mode)
        .with_context(|| format!("Failed to set {} mode", channel))?;

    println!("✅ {} mode set to {}", channel, mode);
    Ok(())
}

fn cmd_curve(settings: &Settings, channel: &str) -> Result<()> {
    let channel = parse_channel(channel)?;
    let d5next = open_device(settings)?;

    let block = d5next
        .control_block()
        .context("Failed to read control report")?;
    let ctrl = block.control(channel.internal());
    let props = block.properties(channel.internal());

    match ctrl.control_mode() {
        Ok(mode) => println!("{} mode: {}", channel, mode),
        Err(_) => println!("{} mode: unknown ({})", channel, ctrl.mode),
    }
    println!(
        "Manual duty: {:.2}%   Bounds: {:.2}% - {:.2}%   Max speed: {} RPM",
        device_duty_to_percent(ctrl.manual_duty),
        device_duty_to_percent(props.min_duty),
        device_duty_to_percent(props.max_duty),
        props.max_speed
    );
    println!(
        "Curve start: {:.2} °C\n",
        ctrl.curve.start_temp as f32 / 100.0
    );

    println!("  #   Temp (°C)   Duty (%)");
    for i in 0..NUM_CURVE_POINTS {
        println!(
            "  {:>2}  {:>9.2}   {:>8.2}",
            i,
            ctrl.curve.temps[i] as f32 / 100.0,
            device_duty_to_percent(ctrl.curve.powers[i])
        );
    }

    if let Ok(status) = d5next.wait_for_telemetry(TELEMETRY_WAIT) {
        let points: Vec<(u16, u16)> = ctrl
            .curve
            .temps
            .iter()
            .copied()
            .zip(ctrl.curve.powers.iter().copied())
            .collect();
        let coolant = (status.coolant_temp / 10).clamp(0, u16::MAX as i32) as u16;
        if let Some(duty) = interpolate_duty(&points, coolant) {
            println!(
                "\nAt {:.2} °C the curve gives {:.2}%",
                status.coolant_temp as f32 / 1000.0,
                device_duty_to_percent(duty)
            );
        }
    }

    Ok(())
}

fn cmd_set_point(
    settings: &Settings,
    channel: &str,
    index: usize,
    temp: Option<f32>,
    duty: Option<u8>,
) -> Result<()> {
    let channel = parse_channel(channel)?;
    if temp.is_none() && duty.is_none() {
        bail!("Nothing to do: pass --temp and/or --duty");
    }
    let d5next = open_device(settings)?;

    if let Some(temp) = temp {
        d5next
            .write_point(channel.number(), index, PointAttribute::Temp, milli_degrees(temp))
            .with_context(|| format!("Failed to set temperature of point {}", index))?;
    }
    if let Some(duty) = duty {
        d5next
            .write_point(channel.number(), index, PointAttribute::Duty, duty as i64)
            .with_context(|| format!("Failed to set duty of point {}", index))?;
    }

    println!("✅ {} curve point {} updated", channel, index);
    Ok(())
}

fn cmd_set_start_temp(settings: &Settings, channel: &str, temp: f32) -> Result<()> {
    let channel = parse_channel(channel)?;
    let d5next = open_device(settings)?;

    d5next
        .write_point(
            channel.number(),
            IDX_START_TEMP,
            PointAttribute::Temp,
            milli_degrees(temp),
        )
        .context("Failed to set curve start temperature")?;

    println!("✅ {} curve starts at {:.2} °C", channel, temp);
    Ok(())
}

fn cmd_set_bounds(settings: &Settings, channel: &str, min: Option<u8>, max: Option<u8>) -> Result<()> {
    let channel = parse_channel(channel)?;
    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        bail!("Minimum duty {} above maximum {}", min, max);
    }
    if min.is_none() && max.is_none() {
        bail!("Nothing to do: pass --min and/or --max");
    }
    let d5next = open_device(settings)?;

    if let Some(min) = min {
        d5next
            .write_point(channel.number(), IDX_MIN_DUTY, PointAttribute::Duty, min as i64)
            .context("Failed to set minimum duty")?;
    }
    if let Some(max) = max {
        d5next
            .write_point(channel.number(), IDX_MAX_DUTY, PointAttribute::Duty, max as i64)
            .context("Failed to set maximum duty")?;
    }

    println!("✅ {} duty bounds updated", channel);
    Ok(())
}

fn cmd_profile(
    args: &Args,
    mut settings: Settings,
    name: &str,
    channel: &str,
    activate: bool,
    save_as: Option<&str>,
) -> Result<()> {
    let channel = parse_channel(channel)?;

    let profile = if name.contains(':') && !name.to_lowercase().starts_with("fixed:") {
        config::CurveProfile::Custom(parse_curve_points(name)?)
    } else {
        settings.profile(name)?
    };

    if let Some(preset) = save_as {
        settings.profiles.insert(preset.to_string(), profile.points());
        let path = settings_path(args)?;
        settings
            .save_to(&path)
            .with_context(|| format!("Failed to save preset to {}", path.display()))?;
        println!("💾 Saved preset '{}' to {}", preset, path.display());
    }

    let curve = profile.to_device_curve().context("Failed to build curve")?;

    let d5next = open_device(&settings)?;
    d5next
        .set_curve(channel, &curve)
        .context("Failed to apply profile")?;
    if activate {
        d5next
            .set_mode(channel, ControlMode::Curve)
            .context("Failed to switch to curve mode")?;
    }

    println!("✅ Applied {} profile to {}", profile, channel);
    Ok(())
}

fn cmd_config(args: &Args, settings: &Settings, save: bool) -> Result<()> {
    let path = settings_path(args)?;

    if save {
        settings
            .save_to(&path)
            .with_context(|| format!("Failed to save settings to {}", path.display()))?;
        println!("💾 Settings written to {}", path.display());
    }

    println!("📄 {}", path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(settings).context("Failed to serialize settings")?
    );
    Ok(())
}
