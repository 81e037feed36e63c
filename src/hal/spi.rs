//! SPI sessions through `/dev/spidevB.C`

use super::{SpiProvider, SpiSession};
use crate::error::{BoardError, Result};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::io::Write;
use std::path::PathBuf;

/// Device node for a bus/chip-select pair
pub fn spidev_path(bus: u8, chip_select: u8) -> PathBuf {
    PathBuf::from(format!("/dev/spidev{}.{}", bus, chip_select))
}

/// SPI provider backed by the spidev kernel driver
#[derive(Debug, Default, Clone, Copy)]
pub struct SpidevProvider;

impl SpidevProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SpiProvider for SpidevProvider {
    fn open(&self, bus: u8, chip_select: u8, max_speed_hz: u32) -> Result<Box<dyn SpiSession>> {
        let path = spidev_path(bus, chip_select);
        let resource = format!("SPI device {}", path.display());

        let mut spi = Spidev::open(&path).map_err(|e| BoardError::unavailable(&resource, e))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(max_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| BoardError::unavailable(&resource, e))?;

        log::debug!("Opened {} at {} Hz", path.display(), max_speed_hz);
        Ok(Box::new(SpidevSession {
            spi,
            path,
            max_speed_hz,
        }))
    }
}

struct SpidevSession {
    spi: Spidev,
    path: PathBuf,
    max_speed_hz: u32,
}

impl SpidevSession {
    fn io_error(&self, e: std::io::Error) -> BoardError {
        BoardError::unavailable(format!("SPI device {}", self.path.display()), e)
    }
}

impl SpiSession for SpidevSession {
    fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(BoardError::InvalidArgument(format!(
                "transfer buffers differ in length ({} vs {})",
                tx.len(),
                rx.len()
            )));
        }
        let mut transfer = SpidevTransfer::read_write(tx, rx);
        self.spi.transfer(&mut transfer).map_err(|e| self.io_error(e))
    }

    fn write(&mut self, tx: &[u8]) -> Result<()> {
        self.spi.write_all(tx).map_err(|e| self.io_error(e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        log::debug!("Closing {}", self.path.display());
        // The file descriptor is closed when the Spidev is dropped
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spidev_path() {
        assert_eq!(spidev_path(0, 0), PathBuf::from("/dev/spidev0.0"));
        assert_eq!(spidev_path(1, 2), PathBuf::from("/dev/spidev1.2"));
    }
}
