//! Aquacomputer Rust Devices Library
//!
//! A Rust driver for the Aquacomputer D5 Next pump.
//!
//! # Features
//!
//! - Read pushed telemetry (coolant temperature, speeds, power, voltages)
//! - Control pump and fan duty and control mode
//! - Edit the temperature curves and duty bounds
//! - Apply pre-defined or custom curve presets
//!
//! # Example
//!
//! ```no_run
//! use aquacomputer_rust_devices::config::Settings;
//! use aquacomputer_rust_devices::device::D5Next;
//! use aquacomputer_rust_devices::protocol::Channel;
//! use aquacomputer_rust_devices::sensors::{Attribute, SensorType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let d5next = D5Next::open(&settings)?;
//!
//!     // Wait for the first pushed sensor report
//!     let status = d5next.wait_for_telemetry(std::time::Duration::from_secs(3))?;
//!     println!("{}", status);
//!
//!     // Consumer surface: channel 1 is the fan
//!     let rpm = d5next.read(SensorType::Fan, Attribute::Input, 1)?;
//!     println!("Fan: {} RPM", rpm);
//!
//!     // Half speed on the fan
//!     d5next.set_duty(Channel::Fan, 128)?;
//!
//!     // Or a preset curve
//!     let curve = settings.profile("silent")?.to_device_curve()?;
//!     d5next.set_curve(Channel::Pump, &curve)?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cooling;
pub mod device;
pub mod error;
pub mod protocol;
pub mod sensors;
pub mod utils;

// Re-exports for convenience
pub use device::D5Next;
pub use error::{D5NextError, Result};
pub use protocol::Channel;
