//! Simulated power meter driver.
//!
//! `MockDriver` answers every [`PowerMeterDriver`] call from in-memory state
//! and records the calls it receives, so sessions can be exercised without
//! hardware or the vendor library.

use crate::config::DriverConfig;
use crate::driver::{
    BoundKind, DeviceHandle, DiscoveredResource, DriverResult, Parameter, PowerMeterDriver,
    PowerUnit, Quantity, RawSensorInfo,
};
use crate::error::{DriverError, Result};
use log::trace;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One call received by [`MockDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Discover,
    Open {
        resource_name: String,
        id_query: bool,
        reset: bool,
    },
    Close(DeviceHandle),
    Bound(Parameter, BoundKind),
    SetParameter(Parameter, f64),
    SetAutoRange(bool),
    Measure(Quantity),
    PowerUnit,
    SensorInfo,
    StartDarkAdjust,
    DarkAdjustInProgress,
    DarkOffset,
}

#[derive(Debug, Default)]
struct MockState {
    resources: Vec<DiscoveredResource>,
    bounds: HashMap<Parameter, (f64, f64)>,
    values: HashMap<Parameter, f64>,
    auto_range: bool,
    power: f64,
    power_unit: Option<PowerUnit>,
    voltage: f64,
    sensor: RawSensorInfo,
    dark_offset: f64,
    // None: the routine never finishes
    dark_adjust_polls: Option<u32>,
    polls_remaining: Option<u32>,
    open_error: Option<String>,
    close_error: Option<String>,
    next_handle: u32,
    open_handles: HashSet<DeviceHandle>,
    calls: Vec<DriverCall>,
    loaded_config: Option<DriverConfig>,
}

/// In-memory stand-in for the vendor driver.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// A driver with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver with one PM100D and an S120C photodiode head attached.
    pub fn simulated() -> Self {
        Self::new()
            .with_device("USB0::0x1313::0x8078::P0012345::INSTR", "PM100D", "P0012345")
            .with_bounds(Parameter::Wavelength, 400.0, 1100.0)
            .with_bounds(Parameter::AverageTime, 0.0003, 3.0)
            .with_bounds(Parameter::Attenuation, -60.0, 60.0)
            .with_bounds(Parameter::PowerRange, 5.0e-9, 0.05)
            .with_power(1.25e-3, PowerUnit::Watt)
            .with_voltage(0.42)
            .with_sensor(RawSensorInfo {
                name: "S120C".to_string(),
                serial_number: "190613012".to_string(),
                calibration_message: "Cal. 13-Jun-2019".to_string(),
                type_code: 0x01,
                subtype_code: 0x12,
                flag_bits: 0x0121,
            })
            .with_dark_offset(1.5e-6)
            .with_dark_adjust_polls(2)
    }

    // --- Builder ---

    /// Adds an available Thorlabs device.
    pub fn with_device(self, resource_name: &str, model_name: &str, serial_number: &str) -> Self {
        self.with_resource(DiscoveredResource {
            resource_name: resource_name.to_string(),
            model_name: model_name.to_string(),
            serial_number: serial_number.to_string(),
            manufacturer: "Thorlabs".to_string(),
            available: true,
        })
    }

    pub fn with_resource(mut self, resource: DiscoveredResource) -> Self {
        self.state_mut().resources.push(resource);
        self
    }

    pub fn with_bounds(mut self, parameter: Parameter, min: f64, max: f64) -> Self {
        self.state_mut().bounds.insert(parameter, (min, max));
        self
    }

    pub fn with_power(mut self, value: f64, unit: PowerUnit) -> Self {
        let state = self.state_mut();
        state.power = value;
        state.power_unit = Some(unit);
        self
    }

    pub fn with_voltage(mut self, value: f64) -> Self {
        self.state_mut().voltage = value;
        self
    }

    pub fn with_sensor(mut self, sensor: RawSensorInfo) -> Self {
        self.state_mut().sensor = sensor;
        self
    }

    pub fn with_dark_offset(mut self, value: f64) -> Self {
        self.state_mut().dark_offset = value;
        self
    }

    /// The routine reports "in progress" for `polls` queries, then finishes.
    pub fn with_dark_adjust_polls(mut self, polls: u32) -> Self {
        self.state_mut().dark_adjust_polls = Some(polls);
        self
    }

    /// The routine never finishes.
    pub fn with_stuck_dark_adjust(mut self) -> Self {
        self.state_mut().dark_adjust_polls = None;
        self
    }

    /// Every `open` call fails with `message`.
    pub fn failing_open(mut self, message: &str) -> Self {
        self.state_mut().open_error = Some(message.to_string());
        self
    }

    /// Every `close` call fails with `message` (the handle is still dropped).
    pub fn failing_close(mut self, message: &str) -> Self {
        self.state_mut().close_error = Some(message.to_string());
        self
    }

    // --- Inspection ---

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Last value written for `parameter`.
    pub fn parameter_value(&self, parameter: Parameter) -> Option<f64> {
        self.state().values.get(&parameter).copied()
    }

    pub fn auto_range(&self) -> bool {
        self.state().auto_range
    }

    pub fn open_handle_count(&self) -> usize {
        self.state().open_handles.len()
    }

    /// Configuration this driver was loaded with, if created by `load`.
    pub fn loaded_config(&self) -> Option<DriverConfig> {
        self.state().loaded_config.clone()
    }

    // Every critical section is self-contained, so poisoning is ignored
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut MockState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call` and checks that `handle` is open.
    fn record(
        &self,
        handle: DeviceHandle,
        call: DriverCall,
    ) -> DriverResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        trace!("MockDriver call: {:?}", call);
        state.calls.push(call);
        if !state.open_handles.contains(&handle) {
            return Err(DriverError::with_code(
                "mock",
                format!("invalid session handle {:?}", handle),
                0xBFFF_000E,
            ));
        }
        Ok(state)
    }
}

impl PowerMeterDriver for MockDriver {
    fn load(config: &DriverConfig) -> Result<Self> {
        let driver = Self::simulated();
        driver.state().loaded_config = Some(config.clone());
        Ok(driver)
    }

    fn discover(&self) -> DriverResult<Vec<DiscoveredResource>> {
        let mut state = self.state();
        state.calls.push(DriverCall::Discover);
        Ok(state.resources.clone())
    }

    fn open(&self, resource_name: &str, id_query: bool, reset: bool) -> DriverResult<DeviceHandle> {
        let mut state = self.state();
        state.calls.push(DriverCall::Open {
            resource_name: resource_name.to_string(),
            id_query,
            reset,
        });
        if let Some(message) = &state.open_error {
            return Err(DriverError::new("open", message.clone()));
        }
        if !state
            .resources
            .iter()
            .any(|r| r.resource_name == resource_name)
        {
            return Err(DriverError::new(
                "open",
                format!("resource '{}' not found", resource_name),
            ));
        }
        state.next_handle += 1;
        let handle = DeviceHandle(state.next_handle);
        state.open_handles.insert(handle);
        Ok(handle)
    }

    fn close(&self, handle: DeviceHandle) -> DriverResult<()> {
        let mut state = self.record(handle, DriverCall::Close(handle))?;
        state.open_handles.remove(&handle);
        match &state.close_error {
            Some(message) => Err(DriverError::new("close", message.clone())),
            None => Ok(()),
        }
    }

    fn bound(
        &self,
        handle: DeviceHandle,
        parameter: Parameter,
        which: BoundKind,
    ) -> DriverResult<f64> {
        let state = self.record(handle, DriverCall::Bound(parameter, which))?;
        let (min, max) = state.bounds.get(&parameter).copied().ok_or_else(|| {
            DriverError::new("bound", format!("{} has no reported range", parameter))
        })?;
        Ok(match which {
            BoundKind::Min => min,
            BoundKind::Max => max,
        })
    }

    fn set_parameter(
        &self,
        handle: DeviceHandle,
        parameter: Parameter,
        value: f64,
    ) -> DriverResult<()> {
        let mut state = self.record(handle, DriverCall::SetParameter(parameter, value))?;
        state.values.insert(parameter, value);
        Ok(())
    }

    fn set_auto_range(&self, handle: DeviceHandle, enabled: bool) -> DriverResult<()> {
        let mut state = self.record(handle, DriverCall::SetAutoRange(enabled))?;
        state.auto_range = enabled;
        Ok(())
    }

    fn measure(&self, handle: DeviceHandle, quantity: Quantity) -> DriverResult<f64> {
        let state = self.record(handle, DriverCall::Measure(quantity))?;
        Ok(match quantity {
            Quantity::Power => state.power,
            Quantity::Voltage => state.voltage,
        })
    }

    fn power_unit(&self, handle: DeviceHandle) -> DriverResult<PowerUnit> {
        let state = self.record(handle, DriverCall::PowerUnit)?;
        Ok(state.power_unit.unwrap_or(PowerUnit::Watt))
    }

    fn sensor_info(&self, handle: DeviceHandle) -> DriverResult<RawSensorInfo> {
        let state = self.record(handle, DriverCall::SensorInfo)?;
        Ok(state.sensor.clone())
    }

    fn start_dark_adjust(&self, handle: DeviceHandle) -> DriverResult<()> {
        let mut state = self.record(handle, DriverCall::StartDarkAdjust)?;
        state.polls_remaining = state.dark_adjust_polls;
        Ok(())
    }

    fn is_dark_adjust_in_progress(&self, handle: DeviceHandle) -> DriverResult<bool> {
        let mut state = self.record(handle, DriverCall::DarkAdjustInProgress)?;
        if state.dark_adjust_polls.is_none() {
            return Ok(true);
        }
        Ok(match state.polls_remaining {
            Some(0) | None => false,
            Some(n) => {
                state.polls_remaining = Some(n - 1);
                true
            }
        })
    }

    fn dark_offset(&self, handle: DeviceHandle) -> DriverResult<f64> {
        let state = self.record(handle, DriverCall::DarkOffset)?;
        Ok(state.dark_offset)
    }
}
