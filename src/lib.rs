//! # tlpm-guard
//!
//! A Rust crate for driving Thorlabs optical power meters (PM100 series,
//! PM101/102/103, PM160, PM200, PM400, ...) through the vendor's TLPM driver.
//!
//! The vendor driver does the real work: USB/VISA transport, discovery and the
//! measurement firmware. This crate reaches it through the
//! [`PowerMeterDriver`] trait and adds what the raw driver lacks: a
//! clamp-and-report guard for every setting, decoding of the sensor head
//! codes, and session bookkeeping that stops one device being opened twice.
//!
//! ## Features
//!
//! *   Device discovery (`Registry::enumerate`, `find_by_serial`, `find_by_index`).
//! *   Session lifecycle (`connect`, `connect_default`, `connect_force`, `disconnect`,
//!     automatic disconnect on drop).
//! *   Settings, clamped to device-reported bounds with a warning on every correction:
//!     *   Wavelength (`set_wavelength`).
//!     *   Averaging time (`set_average_time`).
//!     *   Power range (`set_power_range`) and auto ranging (`set_power_auto_range`).
//!     *   Attenuation (`set_attenuation`, model dependent).
//!     *   Display brightness (`set_brightness`, 0.0 - 1.0).
//!     *   Communication timeout (`set_timeout`).
//! *   Measurements (`read_power`, `read_power_and_voltage`).
//! *   Sensor head information with decoded type, subtype and flags (`sensor_info`).
//! *   Dark-current zeroing with a bounded wait (`dark_adjust`, `read_dark_offset`).
//! *   TOML configuration of the driver location and session defaults (`Config`).
//! *   A simulated driver for tests and demos (`mock::MockDriver`).
//!
//! ## Model Support & Limitations
//!
//! *   **Attenuation:** Not available on PM100USB, PM101, PM102 and PM103. Calls
//!     are skipped with a `Warning::Unsupported`.
//! *   **Voltage readout:** PM100A, PM100D, PM100USB, PM160T, PM200 and PM400. Other
//!     models return the power half of `read_power_and_voltage` and a warning.
//! *   **Dark adjustment:** PM400 only.
//! *   **Claims:** The registry only prevents double connects among sessions
//!     created from the same registry. It cannot see other processes.
//!
//! ## Errors and Warnings
//!
//! Operations that cannot proceed return an [`Error`] (connection failures,
//! calls on a disconnected session, driver failures, timeouts). Conditions the
//! crate recovers from locally are returned as [`Warning`]s inside an
//! [`Outcome`] next to the successful value, and are logged through the
//! `log` facade.
//!
//! ## Basic Usage
//!
//! ```
//! use tlpm_guard::{mock::MockDriver, ConnectOptions, Registry, Result};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     // A real application wraps the vendor library in its own PowerMeterDriver
//!     let registry = Registry::new(MockDriver::simulated());
//!
//!     let devices = registry.enumerate()?;
//!     println!("Found {} power meter(s)", devices.len());
//!
//!     let mut meter = registry.session();
//!     meter.connect(&devices[0], ConnectOptions::default())?;
//!
//!     let outcome = meter.set_wavelength(1550.0)?;
//!     for warning in &outcome.warnings {
//!         println!("Warning: {}", warning);
//!     }
//!     println!("Wavelength set to {} nm", outcome.value.applied);
//!
//!     let power = meter.read_power()?;
//!     println!("Power: {}", power);
//!
//!     let sensor = meter.sensor_info()?.into_value();
//!     println!("Sensor: {} ({})", sensor.name, sensor.type_label());
//!
//!     let _ = meter.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! This project is licensed under the WTFPL.

mod capability;
pub mod config;
mod consts;
pub mod driver;
mod error;
pub mod guard;
mod measure;
pub mod mock;
mod registry;
pub mod sensor;
mod session;
mod settings;

pub use capability::ModelCapabilities;
pub use config::{Config, DriverConfig, SessionConfig};
pub use driver::{
    BoundKind, DeviceHandle, DiscoveredResource, DriverResult, Parameter, PowerMeterDriver,
    PowerUnit, Quantity, RawSensorInfo,
};
pub use error::{DriverError, Error, Outcome, Result, Warning};
pub use guard::{clamp_and_apply, Bounds, Clamp, ClampReport};
pub use measure::PowerAndVoltage;
pub use registry::{Registry, ResourceDescriptor};
pub use sensor::{
    decode, DecodeError, DecodedSensor, SensorDescriptor, SensorFlag, SensorSubtype, SensorType,
};
pub use session::{ConnectOptions, Reading, Session, SessionState, Settings, Unit};
