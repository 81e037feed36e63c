//! Board profile definitions
//!
//! A profile binds every logical signal the radio driver needs to a GPIO
//! chip and line offset, together with the SPI defaults and RF band of the
//! attached module.

use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// SX127x parts are rated for a 10 MHz SPI clock; run at half that.
pub const SPI_MAX_SPEED_HZ: u32 = 5_000_000;

/// Number of DIO lines routed from the radio module to the host
pub const DIO_COUNT: usize = 4;

/// Physical location of a logical signal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinBinding {
    /// GPIO chip name ("gpiochip0") or device path ("/dev/gpiochip0")
    pub chip: String,
    /// Line offset on that chip
    pub offset: u32,
}

impl PinBinding {
    pub fn new(chip: &str, offset: u32) -> Self {
        Self {
            chip: chip.to_string(),
            offset,
        }
    }

    /// Character device path for the chip
    ///
    /// Bare chip names resolve under `/dev`, anything containing a `/` is
    /// taken as a path.
    pub fn chip_path(&self) -> PathBuf {
        if self.chip.contains('/') {
            PathBuf::from(&self.chip)
        } else {
            PathBuf::from("/dev").join(&self.chip)
        }
    }
}

impl fmt::Display for PinBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip, self.offset)
    }
}

/// Pin assignments for one hardware revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    /// Proto shield LED (active low)
    pub led: PinBinding,
    /// User switch
    pub switch: PinBinding,
    /// Radio DIO0..DIO3
    pub dio: [PinBinding; DIO_COUNT],
}

impl PinMap {
    /// All bindings with their role names, in acquisition order
    pub fn roles(&self) -> Vec<(String, &PinBinding)> {
        let mut roles = vec![
            ("LED".to_string(), &self.led),
            ("SWITCH".to_string(), &self.switch),
        ];
        for (i, dio) in self.dio.iter().enumerate() {
            roles.push((format!("DIO{}", i), dio));
        }
        roles
    }

    /// Reject empty chip names and bindings shared between roles
    pub fn validate(&self) -> Result<()> {
        let roles = self.roles();

        for (role, binding) in &roles {
            if binding.chip.trim().is_empty() {
                return Err(BoardError::Config(format!("{} has an empty chip name", role)));
            }
        }

        for (i, (role, binding)) in roles.iter().enumerate() {
            if let Some((other, _)) = roles[..i].iter().find(|(_, b)| *b == *binding) {
                return Err(BoardError::Config(format!(
                    "{} and {} are both bound to {}",
                    other, role, binding
                )));
            }
        }

        Ok(())
    }
}

/// SPI defaults for the radio
///
/// The clock is not part of the settings: every session runs at
/// [`SPI_MAX_SPEED_HZ`]. Unknown keys are rejected so a pin-map file cannot
/// appear to change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpiSettings {
    /// SPI bus number (0 or 1 on a Raspberry Pi)
    pub bus: u8,
    /// Chip select on that bus
    pub chip_select: u8,
}

/// Complete board profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardProfile {
    /// Short identifier (e.g., "rpi")
    pub id: String,
    /// Board name
    pub name: String,
    /// Board description
    #[serde(default)]
    pub description: String,
    /// Attached RF module
    #[serde(default)]
    pub radio: String,
    /// True when the module uses the low-band RF pins (137-175 and
    /// 410-525 MHz), false for high band (862-1020 MHz)
    pub low_band: bool,
    /// SPI defaults
    #[serde(default)]
    pub spi: SpiSettings,
    /// Pin assignments
    pub pins: PinMap,
}

impl BoardProfile {
    /// Validate the id and pin map
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BoardError::Config("profile id is empty".to_string()));
        }
        self.pins.validate()
    }

    /// Human readable band description
    pub fn band(&self) -> &'static str {
        if self.low_band {
            "low band (137-175 MHz, 410-525 MHz)"
        } else {
            "high band (862-1020 MHz)"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin_map() -> PinMap {
        PinMap {
            led: PinBinding::new("gpiochip0", 18),
            switch: PinBinding::new("gpiochip0", 4),
            dio: [
                PinBinding::new("gpiochip0", 22),
                PinBinding::new("gpiochip0", 23),
                PinBinding::new("gpiochip0", 24),
                PinBinding::new("gpiochip0", 25),
            ],
        }
    }

    #[test]
    fn test_chip_path() {
        assert_eq!(
            PinBinding::new("gpiochip5", 1).chip_path(),
            PathBuf::from("/dev/gpiochip5")
        );
        assert_eq!(
            PinBinding::new("/dev/gpiochip2", 1).chip_path(),
            PathBuf::from("/dev/gpiochip2")
        );
    }

    #[test]
    fn test_valid_pin_map() {
        assert!(pin_map().validate().is_ok());
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut pins = pin_map();
        pins.dio[3] = pins.dio[2].clone();

        let err = pins.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid board configuration: DIO2 and DIO3 are both bound to gpiochip0:24"
        );
    }

    #[test]
    fn test_same_offset_different_chip_allowed() {
        let mut pins = pin_map();
        pins.dio[3] = PinBinding::new("gpiochip1", 24);
        assert!(pins.validate().is_ok());
    }

    #[test]
    fn test_empty_chip_rejected() {
        let mut pins = pin_map();
        pins.switch.chip = String::new();
        assert!(matches!(pins.validate(), Err(BoardError::Config(_))));
    }

    #[test]
    fn test_roles_order() {
        let pins = pin_map();
        let names: Vec<String> = pins.roles().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["LED", "SWITCH", "DIO0", "DIO1", "DIO2", "DIO3"]);
    }
}
