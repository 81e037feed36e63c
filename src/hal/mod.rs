//! Hardware abstraction for GPIO lines and SPI sessions
//!
//! The board adapter only talks to these traits:
//! - [`GpioProvider`] hands out exclusively owned input and output lines
//! - [`SpiProvider`] opens SPI sessions with a fixed clock ceiling
//!
//! [`cdev`] and [`spi`] implement them on top of the Linux character
//! devices, [`mock`] implements them in memory for tests.

pub mod cdev;
pub mod mock;
pub mod spi;

pub use cdev::CdevGpio;
pub use spi::SpidevProvider;

use crate::boards::PinBinding;
use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Logic level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        if value == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

/// Pull resistor applied to an input line
///
/// The proto shield has no external pull resistors, so every input is
/// pulled down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    PullDown,
}

/// Logical signal on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Led,
    Switch,
    Dio(u8),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Led => write!(f, "LED"),
            Signal::Switch => write!(f, "SWITCH"),
            Signal::Dio(n) => write!(f, "DIO{}", n),
        }
    }
}

/// Rising edge seen on an input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Line that fired
    pub signal: Signal,
    /// Kernel timestamp in nanoseconds (CLOCK_MONOTONIC)
    pub timestamp_ns: u64,
}

/// Requested output line
pub trait OutputLine: Send {
    /// Drive the line to `level`
    fn set_value(&mut self, level: Level) -> Result<()>;
}

/// Requested input line
///
/// Input lines are shared with edge watcher threads, so every method takes
/// `&self`.
pub trait InputLine: Send + Sync {
    /// Current level of the line
    fn value(&self) -> Result<Level>;

    /// Block up to `timeout` for a rising edge
    ///
    /// Returns the kernel timestamp of the edge, or `None` if the timeout
    /// expired first. Falling edges are consumed and ignored.
    fn wait_rising_edge(&self, timeout: Duration) -> Result<Option<u64>>;
}

/// Source of GPIO lines
pub trait GpioProvider {
    /// Request `pin` as an output driven to `initial`
    fn request_output(
        &self,
        pin: &PinBinding,
        consumer: &str,
        initial: Level,
    ) -> Result<Box<dyn OutputLine>>;

    /// Request `pin` as an input with rising-edge detection enabled
    fn request_input(&self, pin: &PinBinding, consumer: &str, bias: Bias)
        -> Result<Box<dyn InputLine>>;
}

/// Open SPI session
pub trait SpiSession: Send {
    /// Clock ceiling configured on the session
    fn max_speed_hz(&self) -> u32;

    /// Full duplex transfer, `rx` must be the same length as `tx`
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()>;

    /// Write-only transfer
    fn write(&mut self, tx: &[u8]) -> Result<()>;

    /// Close the underlying device
    fn close(self: Box<Self>) -> Result<()>;
}

/// Source of SPI sessions
pub trait SpiProvider {
    fn open(&self, bus: u8, chip_select: u8, max_speed_hz: u32) -> Result<Box<dyn SpiSession>>;
}
