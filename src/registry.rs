//! Resource enumeration and claim bookkeeping.

use crate::config::{Config, SessionConfig};
use crate::driver::PowerMeterDriver;
use crate::error::{Error, Result};
use crate::session::Session;
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A power meter found by [`Registry::enumerate`].
///
/// Immutable snapshot; it goes stale if devices are plugged or unplugged.
/// Enumerate again to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Transport-layer address used to open the device.
    pub resource_name: String,
    pub model_name: String,
    pub serial_number: String,
    pub manufacturer: String,
    /// False if the driver reports the device busy or this registry has it claimed.
    pub available: bool,
}

/// Owns the loaded driver and tracks which resources have a connected session.
///
/// Cloning is cheap and every clone shares the same driver and claim set, so
/// sessions on different threads arbitrate through one registry. Claims are
/// not visible to other registries or other processes.
pub struct Registry<D: PowerMeterDriver> {
    driver: Arc<D>,
    claimed: Arc<Mutex<HashSet<String>>>,
    session_config: SessionConfig,
}

impl<D: PowerMeterDriver> Clone for Registry<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            claimed: Arc::clone(&self.claimed),
            session_config: self.session_config.clone(),
        }
    }
}

impl<D: PowerMeterDriver> std::fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("claimed", &*self.claims())
            .field("session_config", &self.session_config)
            .finish_non_exhaustive()
    }
}

impl<D: PowerMeterDriver> Registry<D> {
    /// Wraps an already loaded driver, using default session settings.
    pub fn new(driver: D) -> Self {
        Self::with_session_config(driver, SessionConfig::default())
    }

    pub fn with_session_config(driver: D, session_config: SessionConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            claimed: Arc::new(Mutex::new(HashSet::new())),
            session_config,
        }
    }

    /// Loads the driver described by `config` once and wraps it.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        debug!(
            "Loading power meter driver from {}",
            config.driver.binary_path().display()
        );
        let driver = D::load(&config.driver)?;
        Ok(Self::with_session_config(driver, config.session.clone()))
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Creates a disconnected session bound to this registry.
    pub fn session(&self) -> Session<D> {
        Session::new(self)
    }

    /// Lists attached power meters in driver order.
    pub fn enumerate(&self) -> Result<Vec<ResourceDescriptor>> {
        let discovered = self.driver.discover()?;
        let claimed = self.claims();
        let descriptors: Vec<ResourceDescriptor> = discovered
            .into_iter()
            .map(|r| {
                let is_claimed = claimed.contains(&r.resource_name);
                debug!(
                    "Found power meter: Model={}, SN={}, Resource={}, Available={}",
                    r.model_name,
                    r.serial_number,
                    r.resource_name,
                    r.available && !is_claimed
                );
                ResourceDescriptor {
                    available: r.available && !is_claimed,
                    resource_name: r.resource_name,
                    model_name: r.model_name,
                    serial_number: r.serial_number,
                    manufacturer: r.manufacturer,
                }
            })
            .collect();
        trace!("Enumerated {} resource(s)", descriptors.len());
        Ok(descriptors)
    }

    /// Finds the resource with the given serial number.
    pub fn find_by_serial(&self, serial: &str) -> Result<ResourceDescriptor> {
        self.enumerate()?
            .into_iter()
            .find(|d| d.serial_number == serial)
            .ok_or_else(|| Error::DeviceNotFoundBySerial {
                serial: serial.to_string(),
                message: "No power meter found with this serial number".to_string(),
            })
    }

    /// Finds the resource at `index` in enumeration order (0-based).
    pub fn find_by_index(&self, index: usize) -> Result<ResourceDescriptor> {
        let mut descriptors = self.enumerate()?;
        if index >= descriptors.len() {
            return Err(Error::DeviceNotFoundByIndex {
                index,
                message: format!("Index out of range (found {} devices)", descriptors.len()),
            });
        }
        Ok(descriptors.swap_remove(index))
    }

    /// Claims a resource. Returns false if it was already claimed.
    pub fn mark_claimed(&self, descriptor: &ResourceDescriptor) -> bool {
        let inserted = self.claims().insert(descriptor.resource_name.clone());
        if inserted {
            debug!("Claimed {}", descriptor.resource_name);
        }
        inserted
    }

    /// Releases a claim. Returns false if the resource was not claimed.
    pub fn mark_released(&self, descriptor: &ResourceDescriptor) -> bool {
        let removed = self.claims().remove(&descriptor.resource_name);
        if removed {
            debug!("Released {}", descriptor.resource_name);
        } else {
            warn!(
                "Release of {} requested but it was not claimed",
                descriptor.resource_name
            );
        }
        removed
    }

    pub fn is_claimed(&self, resource_name: &str) -> bool {
        self.claims().contains(resource_name)
    }

    // Every critical section is a single insert/remove/lookup, so poisoning is ignored
    fn claims(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
