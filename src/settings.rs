//! Device settings. Bounded values pass through the clamp guard first.

use crate::consts;
use crate::driver::{BoundKind, DeviceHandle, Parameter, PowerMeterDriver};
use crate::error::{Outcome, Result};
use crate::guard::{self, Bounds, ClampReport};
use crate::session::Session;
use log::{debug, trace};
use std::time::Duration;

impl<D: PowerMeterDriver> Session<D> {
    /// Sets the correction wavelength in nanometres, clamped to the sensor's range.
    pub fn set_wavelength(&mut self, nm: f64) -> Result<Outcome<ClampReport>> {
        let report = self.apply_bounded(Parameter::Wavelength, nm, "set wavelength")?;
        self.settings.wavelength_nm = Some(report.applied);
        Ok(into_outcome(report))
    }

    /// Sets the averaging time in seconds, clamped to the device range.
    pub fn set_average_time(&mut self, seconds: f64) -> Result<Outcome<ClampReport>> {
        let report = self.apply_bounded(Parameter::AverageTime, seconds, "set average time")?;
        self.settings.average_time_s = Some(report.applied);
        Ok(into_outcome(report))
    }

    /// Sets the upper limit of the power range in watts, clamped to the device range.
    pub fn set_power_range(&mut self, watts: f64) -> Result<Outcome<ClampReport>> {
        let report = self.apply_bounded(Parameter::PowerRange, watts, "set power range")?;
        self.settings.power_range_w = Some(report.applied);
        Ok(into_outcome(report))
    }

    /// Sets the display brightness, clamped to 0.0 (off) .. 1.0 (full).
    pub fn set_brightness(&mut self, level: f64) -> Result<Outcome<ClampReport>> {
        let (handle, _) = self.require_connected("set display brightness")?;
        let bounds = Bounds::new(consts::BRIGHTNESS_MIN, consts::BRIGHTNESS_MAX);
        let driver = self.registry.driver();
        let report = guard::clamp_and_apply(Parameter::Brightness, level, bounds, |value| {
            driver.set_parameter(handle, Parameter::Brightness, value)?;
            Ok(())
        })?;
        self.settings.brightness = Some(report.applied);
        Ok(into_outcome(report))
    }

    /// Sets the input attenuation in dB, clamped to the device range.
    ///
    /// On models without attenuation nothing is sent and the value is `None`
    /// with a [`crate::Warning::Unsupported`].
    pub fn set_attenuation(&mut self, db: f64) -> Result<Outcome<Option<ClampReport>>> {
        let (_, capabilities) = self.require_connected("set attenuation")?;
        if !capabilities.attenuation {
            return Ok(Outcome::with_warning(
                None,
                self.skip_unsupported("set attenuation"),
            ));
        }
        let report = self.apply_bounded(Parameter::Attenuation, db, "set attenuation")?;
        self.settings.attenuation_db = Some(report.applied);
        Ok(into_outcome(report).map(Some))
    }

    /// Sets the communication timeout. Forwarded without bounds checking.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let (handle, _) = self.require_connected("set timeout")?;
        let millis = timeout.as_millis() as f64;
        debug!("Setting timeout to {} ms", millis);
        self.registry
            .driver()
            .set_parameter(handle, Parameter::Timeout, millis)?;
        self.settings.timeout = Some(timeout);
        Ok(())
    }

    /// Switches automatic power ranging on or off.
    pub fn set_power_auto_range(&mut self, enabled: bool) -> Result<()> {
        let (handle, _) = self.require_connected("set power auto range")?;
        debug!("Setting power auto range {}", if enabled { "on" } else { "off" });
        self.registry.driver().set_auto_range(handle, enabled)?;
        self.settings.auto_range = Some(enabled);
        Ok(())
    }

    /// Queries the device range of `parameter` and applies the clamped value.
    fn apply_bounded(
        &mut self,
        parameter: Parameter,
        requested: f64,
        operation: &'static str,
    ) -> Result<ClampReport> {
        let (handle, _) = self.require_connected(operation)?;
        let bounds = self.query_bounds(handle, parameter)?;
        let driver = self.registry.driver();
        guard::clamp_and_apply(parameter, requested, bounds, |value| {
            driver.set_parameter(handle, parameter, value)?;
            Ok(())
        })
    }

    /// Reads the device-reported range of `parameter`.
    pub fn bounds(&self, parameter: Parameter) -> Result<Bounds> {
        let (handle, _) = self.require_connected("query bounds")?;
        self.query_bounds(handle, parameter)
    }

    fn query_bounds(&self, handle: DeviceHandle, parameter: Parameter) -> Result<Bounds> {
        let driver = self.registry.driver();
        let min = driver.bound(handle, parameter, BoundKind::Min)?;
        let max = driver.bound(handle, parameter, BoundKind::Max)?;
        trace!("Bounds for {}: [{}, {}]", parameter, min, max);
        Ok(Bounds::new(min, max))
    }
}

fn into_outcome(report: ClampReport) -> Outcome<ClampReport> {
    match report.warning() {
        Some(warning) => Outcome::with_warning(report, warning),
        None => Outcome::ok(report),
    }
}
