//! Split-bank single-board computer with a modtronix inAir9B
//!
//! Second hardware revision of the proto shield. The SoC exposes the header
//! through several GPIO banks, so the radio DIO lines land on `gpiochip5`
//! and `gpiochip6` while the LED and switch stay on `gpiochip0`.

use super::profile::{BoardProfile, PinBinding, PinMap, SpiSettings};
use once_cell::sync::Lazy;

/// Split-bank SBC + inAir9B profile
pub static SBC_PROFILE: Lazy<BoardProfile> = Lazy::new(|| BoardProfile {
    id: "sbc".to_string(),
    name: "Split-bank SBC + inAir9B".to_string(),
    description: "Header spread over gpiochip0/5/6, proto shield with LED and switch".to_string(),
    radio: "modtronix inAir9B (SX1276)".to_string(),
    low_band: true,
    spi: SpiSettings::default(),
    pins: PinMap {
        led: PinBinding::new("gpiochip0", 14),
        switch: PinBinding::new("gpiochip0", 8),
        dio: [
            PinBinding::new("gpiochip6", 15),
            PinBinding::new("gpiochip5", 1),
            PinBinding::new("gpiochip5", 0),
            // Shares a bank with DIO1/DIO2; check against the shield wiring
            // before relying on DIO3 interrupts.
            PinBinding::new("gpiochip5", 2),
        ],
    },
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sbc_profile() {
        let profile = &*SBC_PROFILE;
        assert_eq!(profile.id, "sbc");
        assert_eq!(profile.pins.dio[0], PinBinding::new("gpiochip6", 15));
        assert_eq!(profile.pins.switch, PinBinding::new("gpiochip0", 8));
        assert!(profile.validate().is_ok());
    }
}
