//! Raspberry Pi with a modtronix inAir9B
//!
//! The inAir9B sits on a proto shield together with one LED and a switch.
//! All signals are on the main header bank, so every line lives on
//! `gpiochip0` and the offsets are the BCM GPIO numbers.
//!
//! | Signal | BCM GPIO |
//! |--------|----------|
//! | LED    | 18       |
//! | Switch | 4        |
//! | DIO0   | 22       |
//! | DIO1   | 23       |
//! | DIO2   | 24       |
//! | DIO3   | 25       |

use super::profile::{BoardProfile, PinBinding, PinMap, SpiSettings};
use once_cell::sync::Lazy;

const CHIP: &str = "gpiochip0";

/// Raspberry Pi + inAir9B profile
pub static RPI_PROFILE: Lazy<BoardProfile> = Lazy::new(|| BoardProfile {
    id: "rpi".to_string(),
    name: "Raspberry Pi + inAir9B".to_string(),
    description: "Raspberry Pi 40-pin header, proto shield with LED and switch".to_string(),
    radio: "modtronix inAir9B (SX1276)".to_string(),
    low_band: true,
    spi: SpiSettings::default(),
    pins: PinMap {
        led: PinBinding::new(CHIP, 18),
        switch: PinBinding::new(CHIP, 4),
        dio: [
            PinBinding::new(CHIP, 22),
            PinBinding::new(CHIP, 23),
            PinBinding::new(CHIP, 24),
            PinBinding::new(CHIP, 25),
        ],
    },
});
