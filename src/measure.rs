//! Measurements, sensor information and dark-current calibration.

use crate::driver::{DeviceHandle, PowerMeterDriver, Quantity};
use crate::error::{Error, Outcome, Result, Warning};
use crate::sensor::SensorDescriptor;
use crate::session::{Reading, Session, Unit};
use log::{debug, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Result of [`Session::read_power_and_voltage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerAndVoltage {
    pub power: Reading,
    /// `None` on models that cannot read voltage.
    pub voltage: Option<Reading>,
}

impl<D: PowerMeterDriver> Session<D> {
    // --- Measurements ---

    /// Reads the current power in the device's configured unit.
    pub fn read_power(&mut self) -> Result<Reading> {
        let (handle, _) = self.require_connected("read power")?;
        let driver = self.registry.driver();
        let value = driver.measure(handle, Quantity::Power)?;
        let unit = Unit::from(driver.power_unit(handle)?);
        let reading = Reading { value, unit };
        trace!("Power reading: {}", reading);
        self.last_power = Some(reading);
        Ok(reading)
    }

    /// Reads power, and voltage where the model supports it.
    ///
    /// On models without voltage readout the power half still succeeds and a
    /// [`Warning::Unsupported`] is returned for the voltage half.
    pub fn read_power_and_voltage(&mut self) -> Result<Outcome<PowerAndVoltage>> {
        let (handle, capabilities) = self.require_connected("read power and voltage")?;
        let power = self.read_power()?;

        if !capabilities.voltage {
            return Ok(Outcome::with_warning(
                PowerAndVoltage {
                    power,
                    voltage: None,
                },
                self.skip_unsupported("read voltage"),
            ));
        }

        let value = self.registry.driver().measure(handle, Quantity::Voltage)?;
        let voltage = Reading {
            value,
            unit: Unit::Volt,
        };
        trace!("Voltage reading: {}", voltage);
        self.last_voltage = Some(voltage);
        Ok(Outcome::ok(PowerAndVoltage {
            power,
            voltage: Some(voltage),
        }))
    }

    // --- Sensor Info ---

    /// Reads and decodes the attached sensor head.
    ///
    /// Codes that cannot be decoded appear both in the descriptor's `errors`
    /// and as [`Warning::Decode`]s.
    pub fn sensor_info(&mut self) -> Result<Outcome<SensorDescriptor>> {
        let (handle, _) = self.require_connected("read sensor info")?;
        let raw = self.registry.driver().sensor_info(handle)?;
        let descriptor = SensorDescriptor::from_raw(raw);
        debug!(
            "Sensor {} (SN {}): {}, {}, flags {:?}",
            descriptor.name,
            descriptor.serial_number,
            descriptor.type_label(),
            descriptor.subtype_label(),
            descriptor.flag_labels()
        );

        let mut outcome = Outcome::ok(());
        for error in &descriptor.errors {
            warn!("Sensor {}: {}", descriptor.name, error);
            outcome.push(Warning::Decode(*error));
        }
        Ok(outcome.map(|()| descriptor))
    }

    // --- Dark Adjustment ---

    /// Runs the dark-current zeroing routine, waiting at most the registry's
    /// configured `dark_adjust_timeout`.
    ///
    /// Cover the sensor before calling. Skipped with a warning when not
    /// connected or on models without dark adjustment.
    pub fn dark_adjust(&mut self) -> Result<Outcome<()>> {
        let config = self.registry.session_config();
        let timeout = config.dark_adjust_timeout();
        let poll_interval = config.dark_adjust_poll_interval();
        self.dark_adjust_with_timeout(timeout, poll_interval)
    }

    /// Runs the dark-current zeroing routine with an explicit wait limit.
    ///
    /// Returns [`Error::Timeout`] if the device still reports the routine in
    /// progress after `timeout`, and [`Error::ArgumentOutOfRange`] for a zero
    /// `poll_interval`. Skipped with a warning unless connected to a model
    /// with dark adjustment.
    pub fn dark_adjust_with_timeout(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Outcome<()>> {
        if poll_interval.is_zero() {
            return Err(Error::ArgumentOutOfRange(
                "dark adjust poll interval must be greater than zero".to_string(),
            ));
        }
        let Some(handle) = self.calibration_handle() else {
            return Ok(Outcome::with_warning((), self.skip_unsupported("dark adjust")));
        };

        let driver = self.registry.driver();
        debug!("Starting dark adjustment (timeout {:?})", timeout);
        driver.start_dark_adjust(handle)?;

        let start = Instant::now();
        loop {
            if !driver.is_dark_adjust_in_progress(handle)? {
                break;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                warn!("Dark adjustment still running after {:?}", elapsed);
                return Err(Error::Timeout {
                    operation: "dark adjustment",
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
            thread::sleep(poll_interval.min(timeout - elapsed));
        }
        debug!("Dark adjustment finished in {:?}", start.elapsed());
        Ok(Outcome::ok(()))
    }

    /// Reads the dark offset in volts.
    ///
    /// `None` with a warning on models without it, or when not connected.
    pub fn read_dark_offset(&mut self) -> Result<Outcome<Option<Reading>>> {
        let Some(handle) = self.calibration_handle() else {
            return Ok(Outcome::with_warning(
                None,
                self.skip_unsupported("read dark offset"),
            ));
        };
        let value = self.registry.driver().dark_offset(handle)?;
        let reading = Reading {
            value,
            unit: Unit::Volt,
        };
        trace!("Dark offset: {}", reading);
        self.dark_offset = Some(reading);
        Ok(Outcome::ok(Some(reading)))
    }

    /// Handle of a live connection to a model with dark adjustment.
    fn calibration_handle(&self) -> Option<DeviceHandle> {
        self.live_connection()
            .filter(|(_, capabilities)| capabilities.dark_adjust)
            .map(|(handle, _)| handle)
    }
}
