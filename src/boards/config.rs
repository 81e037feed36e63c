//! Pin-map files
//!
//! Board revisions are expressed as TOML files with the same shape as
//! [`BoardProfile`]:
//!
//! ```toml
//! id = "rpi-rev2"
//! name = "Raspberry Pi + inAir9B, rev 2"
//! low_band = true
//!
//! [spi]
//! bus = 0
//! chip_select = 1
//!
//! [pins]
//! led = { chip = "gpiochip0", offset = 18 }
//! switch = { chip = "gpiochip0", offset = 4 }
//! dio = [
//!     { chip = "gpiochip0", offset = 22 },
//!     { chip = "gpiochip0", offset = 23 },
//!     { chip = "gpiochip0", offset = 24 },
//!     { chip = "gpiochip0", offset = 25 },
//! ]
//! ```

use super::profile::BoardProfile;
use crate::error::{BoardError, Result};
use std::fs;
use std::path::Path;

impl BoardProfile {
    /// Load and validate a profile from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let profile = Self::from_toml_str(&content).map_err(|e| match e {
            BoardError::Config(msg) => BoardError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        log::debug!("Loaded board profile '{}' from {}", profile.id, path.display());
        Ok(profile)
    }

    /// Parse and validate a profile from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let profile: BoardProfile =
            toml::from_str(content).map_err(|e| BoardError::Config(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Render the profile as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BoardError::Config(e.to_string()))
    }

    /// Write the profile to a TOML file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::{PinBinding, RPI_PROFILE, SBC_PROFILE};
    use std::io::Write;
    use tempfile::tempdir;

    const REV2: &str = r#"
id = "rpi-rev2"
name = "Raspberry Pi + inAir9B, rev 2"
low_band = false

[spi]
bus = 0
chip_select = 1

[pins]
led = { chip = "gpiochip0", offset = 17 }
switch = { chip = "gpiochip0", offset = 4 }
dio = [
    { chip = "gpiochip0", offset = 22 },
    { chip = "gpiochip0", offset = 23 },
    { chip = "gpiochip0", offset = 24 },
    { chip = "gpiochip0", offset = 25 },
]
"#;

    #[test]
    fn test_parse_profile() {
        let profile = BoardProfile::from_toml_str(REV2).unwrap();
        assert_eq!(profile.id, "rpi-rev2");
        assert!(!profile.low_band);
        assert_eq!(profile.spi.chip_select, 1);
        assert_eq!(profile.pins.led, PinBinding::new("gpiochip0", 17));
        assert!(profile.description.is_empty());
    }

    #[test]
    fn test_parse_rejects_duplicate_lines() {
        let broken = REV2.replace("offset = 25", "offset = 24");
        let err = BoardProfile::from_toml_str(&broken).unwrap_err();
        assert!(err.to_string().contains("DIO2 and DIO3"));
    }

    #[test]
    fn test_parse_rejects_spi_clock() {
        let overclocked = REV2.replace(
            "chip_select = 1",
            "chip_select = 1\nmax_speed_hz = 20000000",
        );
        let err = BoardProfile::from_toml_str(&overclocked).unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
        assert!(err.to_string().contains("max_speed_hz"));
    }

    #[test]
    fn test_parse_rejects_missing_dio() {
        let broken = REV2.replace("    { chip = \"gpiochip0\", offset = 25 },\n", "");
        assert!(matches!(
            BoardProfile::from_toml_str(&broken),
            Err(BoardError::Config(_))
        ));
    }

    #[test]
    fn test_export_and_reload_builtin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sbc.toml");

        SBC_PROFILE.write_to(&path).unwrap();
        let loaded = BoardProfile::from_path(&path).unwrap();
        assert_eq!(loaded, *SBC_PROFILE);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rev2.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(REV2.as_bytes()).unwrap();

        let profile = BoardProfile::from_path(&path).unwrap();
        assert_ne!(profile, *RPI_PROFILE);
        assert_eq!(profile.pins.dio[3], PinBinding::new("gpiochip0", 25));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = BoardProfile::from_path(Path::new("/nonexistent/board.toml")).unwrap_err();
        assert!(matches!(err, BoardError::Io { .. }));
    }
}
