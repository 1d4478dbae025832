//! Model-dependent feature support.

use crate::consts::models;

/// Features of the connected model that not every power meter offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// Input attenuation can be set.
    pub attenuation: bool,
    /// Photodiode voltage can be read.
    pub voltage: bool,
    /// Dark-current zeroing and dark offset readout exist.
    pub dark_adjust: bool,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        ModelCapabilities {
            attenuation: true,
            voltage: false,
            dark_adjust: false,
        }
    }
}

impl ModelCapabilities {
    /// Resolves capabilities from a model name such as `"PM100D"` or `"PM101A"`.
    pub fn for_model(model_name: &str) -> Self {
        let model = model_name.trim().to_ascii_uppercase();
        ModelCapabilities {
            attenuation: !in_family(&model, models::ATTENUATION_UNSUPPORTED),
            voltage: in_family(&model, models::VOLTAGE_SUPPORTED),
            dark_adjust: in_family(&model, models::DARK_ADJUST_SUPPORTED),
        }
    }
}

fn in_family(model: &str, families: &[&str]) -> bool {
    families.iter().any(|family| model.starts_with(family))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pm100d() {
        let caps = ModelCapabilities::for_model("PM100D");
        assert!(caps.attenuation);
        assert!(caps.voltage);
        assert!(!caps.dark_adjust);
    }

    #[test]
    fn test_pm400_has_dark_adjust() {
        let caps = ModelCapabilities::for_model("PM400");
        assert!(caps.dark_adjust);
        assert!(caps.voltage);
    }

    #[test]
    fn test_series_suffix_and_case() {
        let caps = ModelCapabilities::for_model(" pm101a ");
        assert!(!caps.attenuation);
        assert!(!caps.voltage);
        assert!(!caps.dark_adjust);

        assert!(!ModelCapabilities::for_model("PM100USB").attenuation);
        assert!(ModelCapabilities::for_model("PM100USB").voltage);
    }

    #[test]
    fn test_unknown_model_gets_defaults() {
        assert_eq!(
            ModelCapabilities::for_model("PM5020"),
            ModelCapabilities::default()
        );
    }
}
