//! Board profiles
//!
//! This module provides the built-in board profiles and loading of custom
//! pin maps from TOML files. Each profile binds the LED, switch and radio
//! DIO lines to GPIO chip/offset pairs for one hardware revision.

pub mod config;
pub mod profile;
pub mod rpi;
pub mod sbc;

pub use profile::{BoardProfile, PinBinding, PinMap, SpiSettings, DIO_COUNT, SPI_MAX_SPEED_HZ};
pub use rpi::RPI_PROFILE;
pub use sbc::SBC_PROFILE;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Registry of built-in board profiles
pub static BOARD_PROFILES: Lazy<HashMap<&'static str, &'static BoardProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("rpi", &*RPI_PROFILE);
    m.insert("raspberry-pi", &*RPI_PROFILE);
    m.insert("rpi-inair9b", &*RPI_PROFILE);
    m.insert("sbc", &*SBC_PROFILE);
    m.insert("sbc-inair9b", &*SBC_PROFILE);
    m
});

/// Get a built-in profile by name or alias
pub fn get_profile(name: &str) -> Option<&'static BoardProfile> {
    BOARD_PROFILES.get(name.to_lowercase().as_str()).copied()
}

/// Profile ids only (deduplicated)
pub fn profile_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BOARD_PROFILES
        .values()
        .map(|&profile| profile.id.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let profile = get_profile("RPi").unwrap();
        assert_eq!(profile.id, "rpi");
        assert_eq!(get_profile("sbc-inair9b").unwrap().id, "sbc");
        assert!(get_profile("stm32").is_none());
    }

    #[test]
    fn test_profile_names_are_ids() {
        assert_eq!(profile_names(), vec!["rpi", "sbc"]);
    }

    #[test]
    fn test_builtin_profiles_validate() {
        for name in profile_names() {
            let profile = get_profile(name).unwrap();
            assert_eq!(profile.id, name);
            profile.validate().unwrap();
        }
    }
}
