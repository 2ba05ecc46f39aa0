//! Settings and curve presets.
//!
//! Settings live in `config.json` under the user config directory:
//! - Linux: ~/.config/d5next-rust/
//! - Windows: %APPDATA%\d5next-rust\
//!
//! A missing file means defaults. Curve presets are (temperature °C,
//! duty %) tables spread over the 16 device curve points.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cooling::interpolate_duty;
use crate::error::{D5NextError, Result};
use crate::protocol::{DEFAULT_STALE_FACTOR, NUM_CURVE_POINTS, TELEMETRY_INTERVAL_MS};

// =============================================================================
// Config Path
// =============================================================================

const APP_NAME: &str = "d5next-rust";
const CONFIG_FILE: &str = "config.json";

/// Get the configuration directory path.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| D5NextError::Config("Could not find config directory".into()))
}

/// Get the full path to the config file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

// =============================================================================
// Settings
// =============================================================================

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// HID path of the device to open; first D5 Next found if unset.
    #[serde(default)]
    pub device_path: Option<String>,

    /// Expected interval between sensor reports.
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,

    /// Sensor data older than interval * factor is treated as missing.
    #[serde(default = "default_stale_factor")]
    pub stale_factor: u32,

    /// How long the telemetry reader blocks per read.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: i32,

    /// User-defined curve presets by name.
    #[serde(default)]
    pub profiles: HashMap<String, Vec<(u8, u8)>>,
}

fn default_telemetry_interval_ms() -> u64 {
    TELEMETRY_INTERVAL_MS
}

fn default_stale_factor() -> u32 {
    DEFAULT_STALE_FACTOR
}

fn default_read_timeout_ms() -> i32 {
    200
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_path: None,
            telemetry_interval_ms: default_telemetry_interval_ms(),
            stale_factor: default_stale_factor(),
            read_timeout_ms: default_read_timeout_ms(),
            profiles: HashMap::new(),
        }
    }
}

impl Settings {
    /// Age after which telemetry is considered stale.
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms) * self.stale_factor
    }

    /// Load settings from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load settings from `path`, defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| D5NextError::Config(format!("Failed to read settings: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| D5NextError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to `path`, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| D5NextError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| D5NextError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| D5NextError::Config(format!("Failed to write settings: {}", e)))
    }

    /// Resolve a preset by name: built-ins first, then user profiles.
    pub fn profile(&self, name: &str) -> Result<CurveProfile> {
        match CurveProfile::builtin(name) {
            Some(profile) => Ok(profile),
            None => self
                .profiles
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, points)| CurveProfile::Custom(points.clone()))
                .ok_or_else(|| D5NextError::InvalidArgument(format!("Unknown profile '{}'", name))),
        }
    }
}

// =============================================================================
// Curve Profiles
// =============================================================================

/// Lowest temperature of generated curves.
pub const PROFILE_MIN_TEMP: u8 = 20;
/// Highest temperature of generated curves.
pub const PROFILE_MAX_TEMP: u8 = 50;

/// Pre-defined or custom curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveProfile {
    /// Low speeds, ramps late.
    Silent,
    /// Aggressive cooling.
    Performance,
    /// Same duty at every temperature.
    Fixed(u8),
    /// Custom (temperature °C, duty %) points.
    Custom(Vec<(u8, u8)>),
}

/// Silent profile - minimal noise, ramps above 35°C.
pub const PROFILE_SILENT: [(u8, u8); 6] =
    [(20, 25), (30, 25), (35, 30), (40, 50), (45, 75), (50, 100)];

/// Performance profile - aggressive cooling.
pub const PROFILE_PERFORMANCE: [(u8, u8); 5] = [(20, 50), (30, 60), (35, 70), (40, 85), (45, 100)];

impl CurveProfile {
    /// Built-in profile by name.
    pub fn builtin(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        match lower.as_str() {
            "silent" => Some(CurveProfile::Silent),
            "performance" => Some(CurveProfile::Performance),
            _ => lower
                .strip_prefix("fixed:")
                .and_then(|rest| rest.parse().ok())
                .map(CurveProfile::Fixed),
        }
    }

    /// Get profile name for display.
    pub fn name(&self) -> &'static str {
        match self {
            CurveProfile::Silent => "Silent",
            CurveProfile::Performance => "Performance",
            CurveProfile::Fixed(_) => "Fixed",
            CurveProfile::Custom(_) => "Custom",
        }
    }

    /// Curve points as (°C, percent) pairs.
    pub fn points(&self) -> Vec<(u8, u8)> {
        match self {
            CurveProfile::Silent => PROFILE_SILENT.to_vec(),
            CurveProfile::Performance => PROFILE_PERFORMANCE.to_vec(),
            CurveProfile::Fixed(duty) => vec![(PROFILE_MIN_TEMP, *duty), (PROFILE_MAX_TEMP, *duty)],
            CurveProfile::Custom(points) => points.clone(),
        }
    }

    /// Spread this profile over the device curve.
    ///
    /// # Returns
    /// 16 (centi-degrees, fixed-point percent) points from 20°C to 50°C.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty profile or duties above 100%.
    pub fn to_device_curve(&self) -> Result<[(u16, u16); NUM_CURVE_POINTS]> {
        let points = self.points();
        if points.is_empty() {
            return Err(D5NextError::InvalidArgument("Profile has no points".into()));
        }
        if let Some((_, duty)) = points.iter().find(|(_, duty)| *duty > 100) {
            return Err(D5NextError::InvalidArgument(format!(
                "Profile duty {}% above 100%",
                duty
            )));
        }

        let device_points: Vec<(u16, u16)> = points
            .iter()
            .map(|&(temp, duty)| (temp as u16 * 100, duty as u16 * 100))
            .collect();

        let span = (PROFILE_MAX_TEMP - PROFILE_MIN_TEMP) as u32 * 100;
        let mut curve = [(0u16, 0u16); NUM_CURVE_POINTS];
        for (i, point) in curve.iter_mut().enumerate() {
            let temp = PROFILE_MIN_TEMP as u32 * 100 + span * i as u32 / (NUM_CURVE_POINTS as u32 - 1);
            let temp = temp as u16;
            let duty = interpolate_duty(&device_points, temp)
                .ok_or_else(|| D5NextError::InvalidArgument("Profile has no points".into()))?;
            *point = (temp, duty);
        }
        Ok(curve)
    }
}

impl std::fmt::Display for CurveProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveProfile::Fixed(duty) => write!(f, "Fixed ({}%)", duty),
            _ => write!(f, "{}", self.name()),
        }
    }
}
