//! Connection lifecycle of a single power meter.

use crate::capability::ModelCapabilities;
use crate::driver::{DeviceHandle, PowerMeterDriver, PowerUnit};
use crate::error::{Error, Outcome, Result, Warning};
use crate::registry::{Registry, ResourceDescriptor};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Inside the driver's open call.
    Connecting,
    Connected,
    /// Inside the driver's close call.
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
        })
    }
}

/// Options passed to the driver's open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// Ask the device to identify itself while opening.
    pub id_query: bool,
    /// Reset the device to its power-on state while opening.
    pub reset_device: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            id_query: true,
            reset_device: false,
        }
    }
}

/// Measurement units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Watt,
    Dbm,
    Volt,
}

impl From<PowerUnit> for Unit {
    fn from(unit: PowerUnit) -> Self {
        match unit {
            PowerUnit::Watt => Unit::Watt,
            PowerUnit::Dbm => Unit::Dbm,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Watt => "W",
            Unit::Dbm => "dBm",
            Unit::Volt => "V",
        })
    }
}

/// A single value read from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Numeric value as reported by the driver.
    pub value: f64,
    /// Unit of `value`.
    pub unit: Unit,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Last value successfully written for each setting. `None` until written.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Settings {
    pub wavelength_nm: Option<f64>,
    pub attenuation_db: Option<f64>,
    pub brightness: Option<f64>,
    pub average_time_s: Option<f64>,
    pub timeout: Option<Duration>,
    pub power_range_w: Option<f64>,
    pub auto_range: Option<bool>,
}

#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) handle: DeviceHandle,
    pub(crate) descriptor: ResourceDescriptor,
    pub(crate) capabilities: ModelCapabilities,
    // False for a forced connect onto a resource claimed elsewhere
    owns_claim: bool,
}

/// One connection to a power meter.
///
/// At most one session per resource can be connected through a registry at a
/// time. Dropping a connected session disconnects it.
///
/// **Note:** A session is meant to be driven from one thread; every operation
/// takes `&mut self`.
#[derive(Debug)]
pub struct Session<D: PowerMeterDriver> {
    pub(crate) registry: Registry<D>,
    pub(crate) state: SessionState,
    pub(crate) connection: Option<Connection>,
    pub(crate) settings: Settings,
    pub(crate) last_power: Option<Reading>,
    pub(crate) last_voltage: Option<Reading>,
    pub(crate) dark_offset: Option<Reading>,
}

impl<D: PowerMeterDriver> Session<D> {
    /// Creates a disconnected session.
    pub fn new(registry: &Registry<D>) -> Self {
        Self {
            registry: registry.clone(),
            state: SessionState::Disconnected,
            connection: None,
            settings: Settings::default(),
            last_power: None,
            last_voltage: None,
            dark_offset: None,
        }
    }

    // --- Lifecycle ---

    /// Opens the resource. Fails if the resource is unavailable or claimed.
    pub fn connect(
        &mut self,
        descriptor: &ResourceDescriptor,
        options: ConnectOptions,
    ) -> Result<()> {
        self.connect_internal(descriptor, options, false)
    }

    /// Opens the resource with the registry's configured [`ConnectOptions`].
    pub fn connect_default(&mut self, descriptor: &ResourceDescriptor) -> Result<()> {
        let options = self.registry.session_config().connect;
        self.connect_internal(descriptor, options, false)
    }

    /// Opens the resource without checking availability.
    ///
    /// **Warning:** Use only when the registry's view is known to be stale.
    /// Two sessions may end up sharing one device.
    pub fn connect_force(
        &mut self,
        descriptor: &ResourceDescriptor,
        options: ConnectOptions,
    ) -> Result<()> {
        self.connect_internal(descriptor, options, true)
    }

    fn connect_internal(
        &mut self,
        descriptor: &ResourceDescriptor,
        options: ConnectOptions,
        force: bool,
    ) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        let owns_claim = if force {
            let claimed = self.registry.mark_claimed(descriptor);
            if !claimed || !descriptor.available {
                warn!(
                    "Force-connecting to {} although it is marked unavailable",
                    descriptor.resource_name
                );
            }
            claimed
        } else {
            if !descriptor.available || !self.registry.mark_claimed(descriptor) {
                return Err(Error::AlreadyClaimed {
                    resource: descriptor.resource_name.clone(),
                });
            }
            true
        };

        self.state = SessionState::Connecting;
        debug!(
            "Connecting to {} ({} SN {}), id_query={}, reset={}",
            descriptor.resource_name,
            descriptor.model_name,
            descriptor.serial_number,
            options.id_query,
            options.reset_device
        );

        let handle = match self.registry.driver().open(
            &descriptor.resource_name,
            options.id_query,
            options.reset_device,
        ) {
            Ok(handle) => handle,
            Err(source) => {
                if owns_claim {
                    self.registry.mark_released(descriptor);
                }
                self.state = SessionState::Disconnected;
                return Err(Error::Connection {
                    resource: descriptor.resource_name.clone(),
                    source,
                });
            }
        };

        let capabilities = ModelCapabilities::for_model(&descriptor.model_name);
        trace!("Model capabilities for {}: {:?}", descriptor.model_name, capabilities);

        self.connection = Some(Connection {
            handle,
            descriptor: descriptor.clone(),
            capabilities,
            owns_claim,
        });
        self.settings = Settings::default();
        self.last_power = None;
        self.last_voltage = None;
        self.dark_offset = None;
        self.state = SessionState::Connected;
        debug!("Connected to {} as {:?}", descriptor.resource_name, handle);
        Ok(())
    }

    /// Releases the device.
    ///
    /// The session always ends up disconnected. If the driver fails to release
    /// the handle, the failure is returned as a [`Warning::DisconnectFailed`].
    /// Does nothing when not connected.
    pub fn disconnect(&mut self) -> Outcome<()> {
        let Some(connection) = self.connection.take() else {
            debug!("Disconnect requested while {}; nothing to do", self.state);
            return Outcome::ok(());
        };

        self.state = SessionState::Disconnecting;
        let result = self.registry.driver().close(connection.handle);
        if connection.owns_claim {
            self.registry.mark_released(&connection.descriptor);
        }
        self.state = SessionState::Disconnected;

        match result {
            Ok(()) => {
                debug!("Disconnected from {}", connection.descriptor.resource_name);
                Outcome::ok(())
            }
            Err(source) => {
                warn!(
                    "Failed to release {}: {}",
                    connection.descriptor.resource_name, source
                );
                Outcome::with_warning(
                    (),
                    Warning::DisconnectFailed {
                        resource: connection.descriptor.resource_name,
                        source,
                    },
                )
            }
        }
    }

    // --- Info ---

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// The descriptor this session was opened from, while connected.
    pub fn descriptor(&self) -> Option<&ResourceDescriptor> {
        self.connection.as_ref().map(|c| &c.descriptor)
    }

    /// Capabilities of the connected model, while connected.
    pub fn model_capabilities(&self) -> Option<ModelCapabilities> {
        self.connection.as_ref().map(|c| c.capabilities)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_power(&self) -> Option<Reading> {
        self.last_power
    }

    pub fn last_voltage(&self) -> Option<Reading> {
        self.last_voltage
    }

    pub fn dark_offset(&self) -> Option<Reading> {
        self.dark_offset
    }

    // --- Internal helpers ---

    /// Handle and capabilities of the live connection, or a state error.
    pub(crate) fn require_connected(
        &self,
        operation: &'static str,
    ) -> Result<(DeviceHandle, ModelCapabilities)> {
        self.live_connection().ok_or(Error::InvalidState {
            operation,
            state: self.state,
        })
    }

    /// Handle and capabilities, or `None` unless the session is connected.
    pub(crate) fn live_connection(&self) -> Option<(DeviceHandle, ModelCapabilities)> {
        match (&self.state, &self.connection) {
            (SessionState::Connected, Some(c)) => Some((c.handle, c.capabilities)),
            _ => None,
        }
    }

    pub(crate) fn model_name(&self) -> &str {
        self.connection
            .as_ref()
            .map_or("", |c| c.descriptor.model_name.as_str())
    }

    /// Logs and builds the warning for an operation the model lacks.
    pub(crate) fn skip_unsupported(&self, operation: &'static str) -> Warning {
        if self.connection.is_none() {
            warn!(
                "{} needs a connected device (session is {}); skipping",
                operation, self.state
            );
        } else {
            warn!(
                "{} is unsupported on this model ({}); skipping",
                operation,
                self.model_name()
            );
        }
        crate::error::unsupported(operation, self.model_name())
    }
}

impl<D: PowerMeterDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            debug!("Session dropped while connected; disconnecting");
            // Warnings were already logged by disconnect
            let _ = self.disconnect();
        }
    }
}
