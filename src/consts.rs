//! Internal constants: sensor codes, flag bit ranges, model families and defaults.

// --- Sensor Type Codes ---
pub mod sensor_type {
    pub const NONE: u8 = 0x00;
    pub const PHOTODIODE: u8 = 0x01;
    pub const THERMOPILE: u8 = 0x02;
    pub const PYROELECTRIC: u8 = 0x03;
}

// --- Sensor Subtype Codes ---
// Interpreted relative to the sensor type.
pub mod sensor_subtype {
    pub const NONE: u8 = 0x00;
    pub const ADAPTER: u8 = 0x01;
    pub const STANDARD: u8 = 0x02;
    /// Photodiode only.
    pub const INTEGRATED_FILTER: u8 = 0x03;
    pub const WITH_TEMPERATURE: u8 = 0x12;
}

// --- Sensor Flag Bits (16-bit field) ---
pub mod sensor_flags {
    // Bits 3..0: measurement kind (enumerated, not a mask)
    pub const MEASUREMENT_MASK: u16 = 0x000F;
    pub const MEASUREMENT_NONE: u16 = 0x0000;
    pub const MEASUREMENT_POWER: u16 = 0x0001;
    pub const MEASUREMENT_ENERGY: u16 = 0x0002;

    // Bits 7..4: settable capabilities (OR-able)
    pub const SETTABLE_MASK: u16 = 0x00F0;
    pub const RESPONSIVITY_SETTABLE: u16 = 1 << 4;
    pub const WAVELENGTH_SETTABLE: u16 = 1 << 5;
    pub const TIME_CONSTANT_SETTABLE: u16 = 1 << 6;
    // Bit 7 reserved

    // Bits 11..8: temperature sensor
    pub const TEMPERATURE_MASK: u16 = 0x0F00;
    pub const TEMPERATURE_SENSOR: u16 = 1 << 8;
    // Bits 11..9 reserved

    // Bits 15..12 reserved
    pub const RESERVED_MASK: u16 = 0xF000;
}

// --- Model Families ---
// Matched by prefix, so "PM101A" resolves to the PM101 family.
pub mod models {
    /// Models without an attenuation setting.
    pub const ATTENUATION_UNSUPPORTED: &[&str] = &["PM100USB", "PM101", "PM102", "PM103"];
    /// Models that can read back the photodiode voltage.
    pub const VOLTAGE_SUPPORTED: &[&str] =
        &["PM100A", "PM100D", "PM100USB", "PM160T", "PM200", "PM400"];
    /// The only family with a dark-current zeroing routine.
    pub const DARK_ADJUST_SUPPORTED: &[&str] = &["PM400"];
}

// --- Fixed Bounds ---
pub const BRIGHTNESS_MIN: f64 = 0.0;
pub const BRIGHTNESS_MAX: f64 = 1.0;

// --- Defaults ---
pub const DEFAULT_DARK_ADJUST_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_DARK_ADJUST_POLL_INTERVAL_MS: u64 = 100;

pub const DEFAULT_DRIVER_PATH: &str =
    r"C:\Program Files\IVI Foundation\VISA\VisaCom64\Primary Interop Assemblies";
pub const DEFAULT_DRIVER_BINARY: &str = "Thorlabs.TLPM_64.Interop.dll";
pub const DEFAULT_DRIVER_CLASS: &str = "Thorlabs.TLPM_64.Interop.TLPM";
