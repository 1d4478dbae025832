//! Decoding of sensor head type, subtype and flag codes.
//!
//! The driver describes the attached sensor head with three numbers. Decoding
//! is total: unrecognised codes become [`DecodeError`]s next to whatever could
//! be decoded, never a failure of the whole call.

use crate::consts::{sensor_flags, sensor_subtype, sensor_type};
use crate::driver::RawSensorInfo;
use log::trace;
use thiserror::Error;

/// Sensor head technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    /// No sensor head attached.
    None,
    /// Silicon, germanium or InGaAs photodiode head.
    Photodiode,
    /// Thermal head for high powers.
    Thermopile,
    /// Pyroelectric head for pulse energy.
    Pyroelectric,
}

impl SensorType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            sensor_type::NONE => Some(SensorType::None),
            sensor_type::PHOTODIODE => Some(SensorType::Photodiode),
            sensor_type::THERMOPILE => Some(SensorType::Thermopile),
            sensor_type::PYROELECTRIC => Some(SensorType::Pyroelectric),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorType::None => "No sensor",
            SensorType::Photodiode => "Photodiode sensor",
            SensorType::Thermopile => "Thermopile sensor",
            SensorType::Pyroelectric => "Pyroelectric sensor",
        }
    }
}

/// Sensor head variant. Which variants exist depends on the [`SensorType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSubtype {
    None,
    Adapter,
    Standard,
    /// Photodiode with an integrated filter.
    IntegratedFilter,
    WithTemperatureSensor,
}

impl SensorSubtype {
    /// Looks up `code` in the subtype table of `sensor_type`.
    pub fn from_code(sensor_type: SensorType, code: u8) -> Option<Self> {
        use SensorType as T;
        match (sensor_type, code) {
            (T::None, sensor_subtype::NONE) => Some(SensorSubtype::None),
            (T::Photodiode | T::Thermopile | T::Pyroelectric, sensor_subtype::ADAPTER) => {
                Some(SensorSubtype::Adapter)
            }
            (T::Photodiode | T::Thermopile | T::Pyroelectric, sensor_subtype::STANDARD) => {
                Some(SensorSubtype::Standard)
            }
            (T::Photodiode, sensor_subtype::INTEGRATED_FILTER) => {
                Some(SensorSubtype::IntegratedFilter)
            }
            (T::Photodiode | T::Thermopile | T::Pyroelectric, sensor_subtype::WITH_TEMPERATURE) => {
                Some(SensorSubtype::WithTemperatureSensor)
            }
            _ => None,
        }
    }

    pub fn label(&self, sensor_type: SensorType) -> &'static str {
        use SensorSubtype as S;
        use SensorType as T;
        match (sensor_type, self) {
            (T::Photodiode, S::Adapter) => "Photodiode adapter",
            (T::Photodiode, S::Standard) => "Photodiode sensor",
            (T::Photodiode, S::IntegratedFilter) => "Photodiode sensor with integrated filter",
            (T::Photodiode, S::WithTemperatureSensor) => {
                "Photodiode sensor with temperature sensor"
            }
            (T::Thermopile, S::Adapter) => "Thermopile adapter",
            (T::Thermopile, S::Standard) => "Thermopile sensor",
            (T::Thermopile, S::WithTemperatureSensor) => {
                "Thermopile sensor with temperature sensor"
            }
            (T::Pyroelectric, S::Adapter) => "Pyroelectric adapter",
            (T::Pyroelectric, S::Standard) => "Pyroelectric sensor",
            (T::Pyroelectric, S::WithTemperatureSensor) => {
                "Pyroelectric sensor with temperature sensor"
            }
            (T::None, S::None) => "No sensor",
            _ => "Unknown subtype",
        }
    }
}

/// One decoded capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorFlag {
    /// Head measures power.
    PowerSensor,
    /// Head measures pulse energy.
    EnergySensor,
    /// Responsivity can be overridden.
    ResponsivitySettable,
    /// Correction wavelength can be set.
    WavelengthSettable,
    /// Thermal time constant can be set.
    TimeConstantSettable,
    /// Head carries a temperature sensor.
    TemperatureSensor,
    /// Bits within a sub-field that have no known meaning.
    Unknown(u16),
}

impl SensorFlag {
    pub fn label(&self) -> &'static str {
        match self {
            SensorFlag::PowerSensor => "Power sensor",
            SensorFlag::EnergySensor => "Energy sensor",
            SensorFlag::ResponsivitySettable => "Responsivity settable",
            SensorFlag::WavelengthSettable => "Wavelength settable",
            SensorFlag::TimeConstantSettable => "Time constant settable",
            SensorFlag::TemperatureSensor => "Temperature sensor",
            SensorFlag::Unknown(_) => "Unknown flag",
        }
    }
}

/// A code that could not be decoded. Never fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The type code is not in the type table.
    #[error("unknown sensor type 0x{0:02X}")]
    UnknownType(u8),
    /// The subtype code is not defined for this sensor type.
    #[error("unknown subtype 0x{subtype_code:02X} for sensor type 0x{type_code:02X}")]
    UnknownSubtype {
        /// Sensor type the subtype was looked up under.
        type_code: u8,
        /// The unrecognised subtype code.
        subtype_code: u8,
    },
    /// Flag bits with no known meaning.
    #[error("unknown flag bits 0x{bits:04X}")]
    UnknownFlag {
        /// The unrecognised bits, still in their original positions.
        bits: u16,
    },
}

/// Result of [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSensor {
    pub sensor_type: Option<SensorType>,
    pub subtype: Option<SensorSubtype>,
    /// In evaluation order: measurement kind, settable capabilities, temperature.
    pub flags: Vec<SensorFlag>,
    pub errors: Vec<DecodeError>,
}

/// Decodes the three sensor codes reported by the driver.
pub fn decode(type_code: u8, subtype_code: u8, flag_bits: u16) -> DecodedSensor {
    trace!(
        "Decoding sensor codes: type=0x{:02X}, subtype=0x{:02X}, flags=0x{:04X}",
        type_code,
        subtype_code,
        flag_bits
    );
    let mut errors = Vec::new();

    let sensor_type = SensorType::from_code(type_code);
    let subtype = match sensor_type {
        Some(ty) => {
            let subtype = SensorSubtype::from_code(ty, subtype_code);
            if subtype.is_none() {
                errors.push(DecodeError::UnknownSubtype {
                    type_code,
                    subtype_code,
                });
            }
            subtype
        }
        None => {
            // Subtype tables are per type; nothing to look it up in.
            errors.push(DecodeError::UnknownType(type_code));
            None
        }
    };

    let flags = decode_flags(flag_bits, &mut errors);

    DecodedSensor {
        sensor_type,
        subtype,
        flags,
        errors,
    }
}

fn decode_flags(bits: u16, errors: &mut Vec<DecodeError>) -> Vec<SensorFlag> {
    let mut flags = Vec::new();
    let mut unknown = |flags: &mut Vec<SensorFlag>, bits: u16| {
        flags.push(SensorFlag::Unknown(bits));
        errors.push(DecodeError::UnknownFlag { bits });
    };

    // Measurement kind is an enumerated nibble, not a mask
    match bits & sensor_flags::MEASUREMENT_MASK {
        sensor_flags::MEASUREMENT_NONE => {}
        sensor_flags::MEASUREMENT_POWER => flags.push(SensorFlag::PowerSensor),
        sensor_flags::MEASUREMENT_ENERGY => flags.push(SensorFlag::EnergySensor),
        other => unknown(&mut flags, other),
    }

    let settable = bits & sensor_flags::SETTABLE_MASK;
    for (mask, flag) in [
        (
            sensor_flags::RESPONSIVITY_SETTABLE,
            SensorFlag::ResponsivitySettable,
        ),
        (
            sensor_flags::WAVELENGTH_SETTABLE,
            SensorFlag::WavelengthSettable,
        ),
        (
            sensor_flags::TIME_CONSTANT_SETTABLE,
            SensorFlag::TimeConstantSettable,
        ),
    ] {
        if settable & mask != 0 {
            flags.push(flag);
        }
    }
    let settable_unknown = settable
        & !(sensor_flags::RESPONSIVITY_SETTABLE
            | sensor_flags::WAVELENGTH_SETTABLE
            | sensor_flags::TIME_CONSTANT_SETTABLE);
    if settable_unknown != 0 {
        unknown(&mut flags, settable_unknown);
    }

    let temperature = bits & sensor_flags::TEMPERATURE_MASK;
    if temperature & sensor_flags::TEMPERATURE_SENSOR != 0 {
        flags.push(SensorFlag::TemperatureSensor);
    }
    let temperature_unknown = temperature & !sensor_flags::TEMPERATURE_SENSOR;
    if temperature_unknown != 0 {
        unknown(&mut flags, temperature_unknown);
    }

    let reserved = bits & sensor_flags::RESERVED_MASK;
    if reserved != 0 {
        unknown(&mut flags, reserved);
    }

    flags
}

/// Snapshot of the attached sensor head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub name: String,
    pub serial_number: String,
    pub calibration_message: String,
    pub type_code: u8,
    pub subtype_code: u8,
    pub flag_bits: u16,
    pub sensor_type: Option<SensorType>,
    pub subtype: Option<SensorSubtype>,
    pub flags: Vec<SensorFlag>,
    /// Codes that could not be decoded. Empty for a fully known sensor.
    pub errors: Vec<DecodeError>,
}

impl SensorDescriptor {
    /// Decodes the codes in `raw`; name, serial and calibration text are kept as-is.
    pub fn from_raw(raw: RawSensorInfo) -> Self {
        let decoded = decode(raw.type_code, raw.subtype_code, raw.flag_bits);
        Self {
            name: raw.name,
            serial_number: raw.serial_number,
            calibration_message: raw.calibration_message,
            type_code: raw.type_code,
            subtype_code: raw.subtype_code,
            flag_bits: raw.flag_bits,
            sensor_type: decoded.sensor_type,
            subtype: decoded.subtype,
            flags: decoded.flags,
            errors: decoded.errors,
        }
    }

    pub fn type_label(&self) -> &'static str {
        self.sensor_type.map_or("Unknown sensor type", |ty| ty.label())
    }

    pub fn subtype_label(&self) -> &'static str {
        match (self.sensor_type, self.subtype) {
            (Some(ty), Some(sub)) => sub.label(ty),
            _ => "Unknown subtype",
        }
    }

    pub fn flag_labels(&self) -> Vec<&'static str> {
        self.flags.iter().map(SensorFlag::label).collect()
    }

    pub fn has_flag(&self, flag: SensorFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// True if every code was recognised.
    pub fn is_fully_decoded(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(d: &DecodedSensor) -> Vec<&'static str> {
        d.flags.iter().map(SensorFlag::label).collect()
    }

    #[test]
    fn test_photodiode_power_sensor() {
        let d = decode(0x01, 0x02, 0x0001);
        assert_eq!(d.sensor_type, Some(SensorType::Photodiode));
        assert_eq!(d.subtype, Some(SensorSubtype::Standard));
        assert_eq!(d.sensor_type.unwrap().label(), "Photodiode sensor");
        assert_eq!(
            d.subtype.unwrap().label(SensorType::Photodiode),
            "Photodiode sensor"
        );
        assert_eq!(labels(&d), vec!["Power sensor"]);
        assert!(d.errors.is_empty());
    }

    #[test]
    fn test_subtypes_are_relative_to_type() {
        assert_eq!(
            SensorSubtype::from_code(SensorType::Photodiode, 0x03),
            Some(SensorSubtype::IntegratedFilter)
        );
        // Integrated filter only exists for photodiodes
        assert_eq!(SensorSubtype::from_code(SensorType::Thermopile, 0x03), None);
        assert_eq!(
            SensorSubtype::from_code(SensorType::Pyroelectric, 0x12),
            Some(SensorSubtype::WithTemperatureSensor)
        );
        assert_eq!(SensorSubtype::from_code(SensorType::None, 0x01), None);

        let d = decode(0x02, 0x03, 0x0000);
        assert_eq!(d.sensor_type, Some(SensorType::Thermopile));
        assert_eq!(d.subtype, None);
        assert_eq!(
            d.errors,
            vec![DecodeError::UnknownSubtype {
                type_code: 0x02,
                subtype_code: 0x03
            }]
        );
    }

    #[test]
    fn test_unknown_type_keeps_flags() {
        let d = decode(0x07, 0x02, 0x0121);
        assert_eq!(d.sensor_type, None);
        assert_eq!(d.subtype, None);
        assert_eq!(d.errors, vec![DecodeError::UnknownType(0x07)]);
        assert_eq!(
            labels(&d),
            vec!["Power sensor", "Wavelength settable", "Temperature sensor"]
        );
    }

    #[test]
    fn test_settable_capabilities_combine() {
        let d = decode(0x02, 0x02, 0x0072);
        assert_eq!(
            d.flags,
            vec![
                SensorFlag::EnergySensor,
                SensorFlag::ResponsivitySettable,
                SensorFlag::WavelengthSettable,
                SensorFlag::TimeConstantSettable,
            ]
        );
        assert!(d.errors.is_empty());
    }

    #[test]
    fn test_unknown_bits_reported_per_subfield() {
        // measurement nibble 0x3, bit 7, bit 9 and bit 15 are all unknown
        let d = decode(0x01, 0x12, 0x83A3);
        assert_eq!(
            d.flags,
            vec![
                SensorFlag::Unknown(0x0003),
                SensorFlag::WavelengthSettable,
                SensorFlag::Unknown(0x0080),
                SensorFlag::TemperatureSensor,
                SensorFlag::Unknown(0x0200),
                SensorFlag::Unknown(0x8000),
            ]
        );
        assert_eq!(
            d.errors,
            vec![
                DecodeError::UnknownFlag { bits: 0x0003 },
                DecodeError::UnknownFlag { bits: 0x0080 },
                DecodeError::UnknownFlag { bits: 0x0200 },
                DecodeError::UnknownFlag { bits: 0x8000 },
            ]
        );
    }

    #[test]
    fn test_decoding_is_total_and_deterministic() {
        for type_code in [0u8, 1, 2, 3, 4, 0x7F, 0xFF] {
            for subtype_code in [0u8, 1, 2, 3, 0x12, 0x13, 0xFF] {
                for flag_bits in [0u16, 0x0001, 0x0002, 0x00F0, 0x0100, 0x0FFF, 0xFFFF] {
                    let first = decode(type_code, subtype_code, flag_bits);
                    let second = decode(type_code, subtype_code, flag_bits);
                    assert_eq!(first, second);
                }
            }
        }
    }

    #[test]
    fn test_no_sensor() {
        let d = decode(0x00, 0x00, 0x0000);
        assert_eq!(d.sensor_type, Some(SensorType::None));
        assert_eq!(d.subtype, Some(SensorSubtype::None));
        assert!(d.flags.is_empty());
        assert!(d.errors.is_empty());
    }

    #[test]
    fn test_descriptor_from_raw() {
        let descriptor = SensorDescriptor::from_raw(RawSensorInfo {
            name: "S120C".to_string(),
            serial_number: "11223344".to_string(),
            calibration_message: "Cal. 12-Mar-2024".to_string(),
            type_code: 0x01,
            subtype_code: 0x12,
            flag_bits: 0x0121,
        });
        assert_eq!(descriptor.name, "S120C");
        assert_eq!(descriptor.type_label(), "Photodiode sensor");
        assert_eq!(
            descriptor.subtype_label(),
            "Photodiode sensor with temperature sensor"
        );
        assert_eq!(
            descriptor.flag_labels(),
            vec!["Power sensor", "Wavelength settable", "Temperature sensor"]
        );
        assert!(descriptor.has_flag(SensorFlag::TemperatureSensor));
        assert!(descriptor.is_fully_decoded());

        let unknown = SensorDescriptor::from_raw(RawSensorInfo {
            type_code: 0x09,
            ..RawSensorInfo::default()
        });
        assert_eq!(unknown.type_label(), "Unknown sensor type");
        assert_eq!(unknown.subtype_label(), "Unknown subtype");
        assert!(!unknown.is_fully_decoded());
    }
}
