//! Capability interface the crate requires from the vendor power meter driver.
//!
//! Everything that touches hardware (USB/VISA transport, discovery, measurement
//! firmware) lives behind [`PowerMeterDriver`]. Implementations wrap the
//! vendor library; [`crate::mock::MockDriver`] simulates one.

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use std::fmt;

/// Result type for raw driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opaque handle to an opened device, issued by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u32);

/// Settable numeric parameters of a power meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Correction wavelength in nanometres.
    Wavelength,
    /// Averaging time in seconds.
    AverageTime,
    /// Input attenuation in dB.
    Attenuation,
    /// Display brightness, 0.0 to 1.0.
    Brightness,
    /// Power range upper limit in watts.
    PowerRange,
    /// Communication timeout in milliseconds.
    Timeout,
}

impl Parameter {
    /// Unit suffix used when logging values of this parameter.
    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Wavelength => "nm",
            Parameter::AverageTime => "s",
            Parameter::Attenuation => "dB",
            Parameter::Brightness => "",
            Parameter::PowerRange => "W",
            Parameter::Timeout => "ms",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parameter::Wavelength => "wavelength",
            Parameter::AverageTime => "average time",
            Parameter::Attenuation => "attenuation",
            Parameter::Brightness => "display brightness",
            Parameter::PowerRange => "power range",
            Parameter::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Which end of a parameter's range to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Min,
    Max,
}

/// Measurable quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Power,
    Voltage,
}

/// Unit the device reports power readings in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    Watt,
    Dbm,
}

/// One resource as reported by the driver's discovery call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Transport-layer address (e.g. a VISA resource string).
    pub resource_name: String,
    pub model_name: String,
    pub serial_number: String,
    pub manufacturer: String,
    /// False when the driver knows the device is held elsewhere.
    pub available: bool,
}

/// Sensor head information exactly as the driver returns it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSensorInfo {
    pub name: String,
    pub serial_number: String,
    /// Free text from the sensor's calibration record.
    pub calibration_message: String,
    pub type_code: u8,
    pub subtype_code: u8,
    pub flag_bits: u16,
}

/// The operations this crate needs from a vendor driver.
///
/// All calls block until the driver returns. Implementations must tolerate
/// concurrent calls on distinct handles to be shared across threads.
pub trait PowerMeterDriver: Send + Sync {
    /// Loads the driver binary described by `config`.
    fn load(config: &DriverConfig) -> Result<Self>
    where
        Self: Sized;

    /// Lists the resources currently attached.
    fn discover(&self) -> DriverResult<Vec<DiscoveredResource>>;

    /// Opens a resource, optionally querying its identity and resetting it.
    fn open(&self, resource_name: &str, id_query: bool, reset: bool) -> DriverResult<DeviceHandle>;

    fn close(&self, handle: DeviceHandle) -> DriverResult<()>;

    /// Returns the device-reported minimum or maximum of a parameter.
    fn bound(
        &self,
        handle: DeviceHandle,
        parameter: Parameter,
        which: BoundKind,
    ) -> DriverResult<f64>;

    fn set_parameter(
        &self,
        handle: DeviceHandle,
        parameter: Parameter,
        value: f64,
    ) -> DriverResult<()>;

    fn set_auto_range(&self, handle: DeviceHandle, enabled: bool) -> DriverResult<()>;

    fn measure(&self, handle: DeviceHandle, quantity: Quantity) -> DriverResult<f64>;

    fn power_unit(&self, handle: DeviceHandle) -> DriverResult<PowerUnit>;

    fn sensor_info(&self, handle: DeviceHandle) -> DriverResult<RawSensorInfo>;

    /// Starts the dark-current zeroing routine and returns immediately.
    fn start_dark_adjust(&self, handle: DeviceHandle) -> DriverResult<()>;

    fn is_dark_adjust_in_progress(&self, handle: DeviceHandle) -> DriverResult<bool>;

    /// Dark offset in volts.
    fn dark_offset(&self, handle: DeviceHandle) -> DriverResult<f64>;
}
