//! In-memory GPIO and SPI providers
//!
//! Used by the crate's own tests and by radio drivers that want to run
//! against a [`crate::BoardAdapter`] without hardware. Both providers are
//! cheap to clone; clones share state, so a test keeps one clone to inspect
//! and drive lines after handing the other to the adapter.
//!
//! Line exclusivity is modelled the way the kernel does it: a chip/offset can
//! only be requested once until the returned handle is dropped.

use super::{Bias, GpioProvider, InputLine, Level, OutputLine, SpiProvider, SpiSession};
use crate::boards::PinBinding;
use crate::error::{BoardError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated GPIO line
#[derive(Debug)]
pub struct MockLine {
    level: Mutex<Level>,
    writes: Mutex<Vec<Level>>,
    bias: Mutex<Option<Bias>>,
    edges: Mutex<VecDeque<u64>>,
    edge_ready: Condvar,
    fail_writes: Mutex<bool>,
    epoch: Instant,
}

impl MockLine {
    fn new() -> Self {
        Self {
            level: Mutex::new(Level::Low),
            writes: Mutex::new(Vec::new()),
            bias: Mutex::new(None),
            edges: Mutex::new(VecDeque::new()),
            edge_ready: Condvar::new(),
            fail_writes: Mutex::new(false),
            epoch: Instant::now(),
        }
    }

    /// Current level
    pub fn level(&self) -> Level {
        *lock(&self.level)
    }

    /// Every level written through an output handle, in order
    pub fn writes(&self) -> Vec<Level> {
        lock(&self.writes).clone()
    }

    /// Bias applied by the last input request
    pub fn bias(&self) -> Option<Bias> {
        *lock(&self.bias)
    }

    /// Drive an input line from outside; a Low to High change queues a
    /// rising edge
    pub fn set_level(&self, level: Level) {
        let mut current = lock(&self.level);
        if *current == Level::Low && level == Level::High {
            self.push_edge();
        }
        *current = level;
    }

    /// Queue a rising edge without changing the level
    pub fn pulse(&self) {
        self.push_edge();
    }

    /// Make subsequent writes through output handles fail
    pub fn fail_writes(&self, fail: bool) {
        *lock(&self.fail_writes) = fail;
    }

    fn push_edge(&self) {
        let timestamp = self.epoch.elapsed().as_nanos() as u64;
        lock(&self.edges).push_back(timestamp);
        self.edge_ready.notify_all();
    }
}

#[derive(Debug, Default)]
struct GpioState {
    claimed: HashSet<PinBinding>,
    missing_chips: HashSet<String>,
    lines: HashMap<PinBinding, Arc<MockLine>>,
    requests: Vec<(PinBinding, String)>,
}

impl GpioState {
    fn claim(&mut self, pin: &PinBinding, consumer: &str) -> Result<Arc<MockLine>> {
        if self.missing_chips.contains(&pin.chip) {
            return Err(BoardError::unavailable(
                format!("line {}", pin),
                "No such file or directory",
            ));
        }
        if !self.claimed.insert(pin.clone()) {
            return Err(BoardError::unavailable(
                format!("line {}", pin),
                "Device or resource busy",
            ));
        }
        self.requests.push((pin.clone(), consumer.to_string()));
        Ok(Arc::clone(
            self.lines
                .entry(pin.clone())
                .or_insert_with(|| Arc::new(MockLine::new())),
        ))
    }
}

/// GPIO provider that keeps every line in memory
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request on `chip` fail as if the device node did not exist
    pub fn remove_chip(&self, chip: &str) {
        lock(&self.state).missing_chips.insert(chip.to_string());
    }

    /// Hold `pin` on behalf of some other process
    pub fn claim_externally(&self, pin: &PinBinding) {
        lock(&self.state).claimed.insert(pin.clone());
    }

    /// Whether `pin` is currently requested
    pub fn is_claimed(&self, pin: &PinBinding) -> bool {
        lock(&self.state).claimed.contains(pin)
    }

    /// Number of lines currently requested
    pub fn claimed_count(&self) -> usize {
        lock(&self.state).claimed.len()
    }

    /// Line state for `pin`, created on first use
    pub fn line(&self, pin: &PinBinding) -> Arc<MockLine> {
        let mut state = lock(&self.state);
        Arc::clone(
            state
                .lines
                .entry(pin.clone())
                .or_insert_with(|| Arc::new(MockLine::new())),
        )
    }

    /// Every successful request as (pin, consumer), in order
    pub fn requests(&self) -> Vec<(PinBinding, String)> {
        lock(&self.state).requests.clone()
    }
}

impl GpioProvider for MockGpio {
    fn request_output(
        &self,
        pin: &PinBinding,
        consumer: &str,
        initial: Level,
    ) -> Result<Box<dyn OutputLine>> {
        let line = lock(&self.state).claim(pin, consumer)?;
        *lock(&line.level) = initial;
        Ok(Box::new(MockOutput {
            state: Arc::clone(&self.state),
            pin: pin.clone(),
            line,
        }))
    }

    fn request_input(
        &self,
        pin: &PinBinding,
        consumer: &str,
        bias: Bias,
    ) -> Result<Box<dyn InputLine>> {
        let line = lock(&self.state).claim(pin, consumer)?;
        *lock(&line.bias) = Some(bias);
        Ok(Box::new(MockInput {
            state: Arc::clone(&self.state),
            pin: pin.clone(),
            line,
        }))
    }
}

struct MockOutput {
    state: Arc<Mutex<GpioState>>,
    pin: PinBinding,
    line: Arc<MockLine>,
}

impl OutputLine for MockOutput {
    fn set_value(&mut self, level: Level) -> Result<()> {
        if *lock(&self.line.fail_writes) {
            return Err(BoardError::unavailable(
                format!("line {}", self.pin),
                "Input/output error",
            ));
        }
        *lock(&self.line.level) = level;
        lock(&self.line.writes).push(level);
        Ok(())
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        lock(&self.state).claimed.remove(&self.pin);
    }
}

struct MockInput {
    state: Arc<Mutex<GpioState>>,
    pin: PinBinding,
    line: Arc<MockLine>,
}

impl InputLine for MockInput {
    fn value(&self) -> Result<Level> {
        Ok(self.line.level())
    }

    fn wait_rising_edge(&self, timeout: Duration) -> Result<Option<u64>> {
        let edges = lock(&self.line.edges);
        let (mut edges, _) = self
            .line
            .edge_ready
            .wait_timeout_while(edges, timeout, |queue| queue.is_empty())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(edges.pop_front())
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        lock(&self.state).claimed.remove(&self.pin);
    }
}

#[derive(Debug, Default)]
struct SpiState {
    unavailable: HashSet<(u8, u8)>,
    opened: Vec<(u8, u8, u32)>,
    open_sessions: usize,
    closed: usize,
    written: Vec<Vec<u8>>,
}

/// SPI provider whose sessions loop transmitted bytes back
#[derive(Debug, Clone, Default)]
pub struct MockSpi {
    state: Arc<Mutex<SpiState>>,
}

impl MockSpi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening `bus`/`chip_select` fail
    pub fn remove_device(&self, bus: u8, chip_select: u8) {
        lock(&self.state).unavailable.insert((bus, chip_select));
    }

    /// Every successful open as (bus, chip_select, max_speed_hz)
    pub fn opened(&self) -> Vec<(u8, u8, u32)> {
        lock(&self.state).opened.clone()
    }

    /// Sessions opened and not yet closed or dropped
    pub fn open_sessions(&self) -> usize {
        lock(&self.state).open_sessions
    }

    /// Sessions closed through [`SpiSession::close`]
    pub fn closed(&self) -> usize {
        lock(&self.state).closed
    }

    /// Every buffer sent through `transfer` or `write`
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.state).written.clone()
    }
}

impl SpiProvider for MockSpi {
    fn open(&self, bus: u8, chip_select: u8, max_speed_hz: u32) -> Result<Box<dyn SpiSession>> {
        let mut state = lock(&self.state);
        if state.unavailable.contains(&(bus, chip_select)) {
            return Err(BoardError::unavailable(
                format!("SPI device /dev/spidev{}.{}", bus, chip_select),
                "No such file or directory",
            ));
        }
        state.opened.push((bus, chip_select, max_speed_hz));
        state.open_sessions += 1;

        Ok(Box::new(MockSpiSession {
            state: Arc::clone(&self.state),
            max_speed_hz,
        }))
    }
}

struct MockSpiSession {
    state: Arc<Mutex<SpiState>>,
    max_speed_hz: u32,
}

impl SpiSession for MockSpiSession {
    fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(BoardError::InvalidArgument(
                "transfer buffers differ in length".to_string(),
            ));
        }
        rx.copy_from_slice(tx);
        lock(&self.state).written.push(tx.to_vec());
        Ok(())
    }

    fn write(&mut self, tx: &[u8]) -> Result<()> {
        lock(&self.state).written.push(tx.to_vec());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        lock(&self.state).closed += 1;
        Ok(())
    }
}

impl Drop for MockSpiSession {
    fn drop(&mut self) {
        lock(&self.state).open_sessions -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_exclusive_until_dropped() {
        let gpio = MockGpio::new();
        let pin = PinBinding::new("gpiochip0", 18);

        let first = gpio.request_output(&pin, "test", Level::High).unwrap();
        let err = gpio.request_input(&pin, "test", Bias::PullDown).err().unwrap();
        assert!(err.is_hardware_unavailable());

        drop(first);
        assert!(!gpio.is_claimed(&pin));
        assert!(gpio.request_input(&pin, "test", Bias::PullDown).is_ok());
    }

    #[test]
    fn test_rising_edge_queue() {
        let gpio = MockGpio::new();
        let pin = PinBinding::new("gpiochip0", 22);
        let input = gpio.request_input(&pin, "test", Bias::PullDown).unwrap();

        assert_eq!(input.wait_rising_edge(Duration::from_millis(5)).unwrap(), None);

        let line = gpio.line(&pin);
        line.set_level(Level::High);
        line.set_level(Level::High);
        assert_eq!(input.value().unwrap(), Level::High);
        assert!(input.wait_rising_edge(Duration::from_millis(5)).unwrap().is_some());
        assert_eq!(input.wait_rising_edge(Duration::from_millis(5)).unwrap(), None);
    }

    #[test]
    fn test_spi_loopback() {
        let spi = MockSpi::new();
        let mut session = spi.open(0, 1, 5_000_000).unwrap();
        let mut rx = [0u8; 2];
        session.transfer(&[0x42, 0x00], &mut rx).unwrap();

        assert_eq!(rx, [0x42, 0x00]);
        assert_eq!(spi.opened(), vec![(0, 1, 5_000_000)]);
        assert_eq!(spi.open_sessions(), 1);

        session.close().unwrap();
        assert_eq!(spi.open_sessions(), 0);
        assert_eq!(spi.closed(), 1);
    }

    #[test]
    fn test_spi_transfer_length_mismatch() {
        let spi = MockSpi::new();
        let mut session = spi.open(0, 0, 5_000_000).unwrap();
        let mut rx = [0u8; 1];

        let err = session.transfer(&[0x42, 0x00], &mut rx).unwrap_err();
        assert!(matches!(err, BoardError::InvalidArgument(_)));
        assert!(spi.written().is_empty());
    }
}
