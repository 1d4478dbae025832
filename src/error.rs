use crate::driver::Parameter;
use crate::guard::Clamp;
use crate::sensor::DecodeError;
use crate::session::SessionState;
use thiserror::Error;

/// A failure reported by the external power meter driver.
///
/// Drivers build these from whatever status their vendor call returned; the
/// crate only wraps and forwards them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}{}", .code.map(|c| format!(" (status 0x{:08X})", c)).unwrap_or_default())]
pub struct DriverError {
    /// Name of the driver call that failed (e.g. `"open"`).
    pub operation: &'static str,
    /// Driver-supplied description.
    pub message: String,
    /// Raw vendor status code, if one was available.
    pub code: Option<u32>,
}

impl DriverError {
    /// Creates a driver error without a vendor status code.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            code: None,
        }
    }

    /// Creates a driver error carrying the vendor status code.
    pub fn with_code(operation: &'static str, message: impl Into<String>, code: u32) -> Self {
        Self {
            operation,
            message: message.into(),
            code: Some(code),
        }
    }
}

/// Errors that abort the operation that raised them.
///
/// Recoverable conditions (clamped values, unsupported operations, decode
/// problems, failed releases) are reported as [`Warning`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A driver call failed while a session was connected.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
    /// The driver could not open the resource.
    #[error("Failed to connect to '{resource}': {source}")]
    Connection {
        /// Resource name that was being opened.
        resource: String,
        /// Underlying driver failure.
        #[source]
        source: DriverError,
    },
    /// The resource is already in use by another session (or flagged unavailable by the driver).
    #[error("Resource '{resource}' is already claimed; use connect_force to override")]
    AlreadyClaimed {
        /// Resource name that was requested.
        resource: String,
    },
    /// The operation is not valid in the session's current state.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },
    /// The device reported a minimum above its maximum (or a non-numeric bound).
    #[error("Device reported invalid bounds for {parameter}: min={min}, max={max}")]
    InvalidBounds {
        /// Parameter whose bounds were queried.
        parameter: Parameter,
        /// Reported minimum.
        min: f64,
        /// Reported maximum.
        max: f64,
    },
    /// Function argument cannot be applied at all (e.g. NaN).
    #[error("Argument out of range: {0}")]
    ArgumentOutOfRange(String),
    /// A bounded wait on the device expired.
    #[error("Timeout after {elapsed_ms} ms waiting for {operation}")]
    Timeout {
        /// Operation that was being waited on.
        operation: &'static str,
        /// Time spent waiting.
        elapsed_ms: u64,
    },
    /// No enumerated resource carries the given serial number.
    #[error("Device not found with serial number '{serial}': {message}")]
    DeviceNotFoundBySerial {
        /// The serial number that was searched for.
        serial: String,
        /// Additional error details.
        message: String,
    },
    /// No enumerated resource at the given index.
    #[error("Device not found at index {index}: {message}")]
    DeviceNotFoundByIndex {
        /// The index that was requested.
        index: usize,
        /// Additional error details.
        message: String,
    },
    /// The configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    /// The configuration parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for power meter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Advisory conditions reported alongside a successful result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    /// A requested setting was outside the device bounds and was corrected.
    #[error("{parameter} {requested} out of range, {direction}: applied {applied}")]
    Clamped {
        /// Setting that was corrected.
        parameter: Parameter,
        /// Value the caller asked for.
        requested: f64,
        /// Value actually sent to the device.
        applied: f64,
        /// Which bound was used.
        direction: Clamp,
    },
    /// The connected model does not offer this operation; nothing was sent.
    #[error("{operation} is unsupported on this model ({model})")]
    Unsupported {
        /// Operation that was skipped.
        operation: &'static str,
        /// Model name of the connected device.
        model: String,
    },
    /// Part of the sensor descriptor could not be decoded.
    #[error("Sensor decode: {0}")]
    Decode(#[from] DecodeError),
    /// Releasing the device handle failed; the session was closed regardless.
    #[error("Failed to release '{resource}' cleanly: {source}")]
    DisconnectFailed {
        /// Resource that was being released.
        resource: String,
        /// Underlying driver failure.
        #[source]
        source: DriverError,
    },
}

/// A successful result together with any warnings raised while producing it.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Outcome<T> {
    /// The operation's result.
    pub value: T,
    /// Advisories, in the order they were raised.
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    /// Wraps a value with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Wraps a value with a single warning.
    pub fn with_warning(value: T, warning: Warning) -> Self {
        Self {
            value,
            warnings: vec![warning],
        }
    }

    /// Appends a warning after those already collected.
    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// True if at least one warning was raised.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Discards the warnings.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Transforms the value and keeps the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

// Helper for the warning every capability-gated operation emits
pub(crate) fn unsupported(operation: &'static str, model: &str) -> Warning {
    Warning::Unsupported {
        operation,
        model: model.to_string(),
    }
}
