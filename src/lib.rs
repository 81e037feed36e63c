//! LoRa Board Adaptation
//!
//! Maps the signals an SX127x LoRa driver needs (LED, switch, DIO0-DIO3,
//! SPI) onto the GPIO chips and SPI devices of a Linux single-board
//! computer.
//!
//! # Features
//!
//! - **Board profiles**: built-in pin maps for the Raspberry Pi and the
//!   split-bank SBC revision of the inAir9B proto shield
//! - **Pin-map files**: new board revisions as TOML, no code changes
//! - **Lifecycle**: `setup` acquires every line, `teardown` releases them
//! - **Interrupt callbacks**: rising edges on DIO lines and the switch are
//!   dispatched on watcher threads
//! - **Test doubles**: [`hal::mock`] runs the adapter without hardware
//!
//! # Usage
//!
//! ```no_run
//! use lora_board::{boards, BoardAdapter};
//! use std::time::Duration;
//!
//! let profile = boards::get_profile("rpi").unwrap().clone();
//! let mut board = BoardAdapter::new(profile)?;
//!
//! board.setup()?;
//! let spi = board.open_spi(0, 0)?;
//! let mut rx = [0u8; 2];
//! spi.transfer(&[0x42, 0x00], &mut rx)?;
//!
//! board.register_interrupt_callback(0, |event| {
//!     println!("{} at {} ns", event.signal, event.timestamp_ns);
//! })?;
//! board.blink(Duration::from_millis(250), 3)?;
//! board.teardown()?;
//! # Ok::<(), lora_board::BoardError>(())
//! ```

pub mod board;
pub mod boards;
pub mod error;
pub mod hal;
pub mod irq;

pub use board::BoardAdapter;
pub use boards::{BoardProfile, PinBinding, PinMap, SpiSettings};
pub use error::{BoardError, Result};
pub use hal::{EdgeEvent, Level, Signal};
