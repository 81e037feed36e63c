//! Board adapter
//!
//! [`BoardAdapter`] owns every GPIO line and the SPI session used by the
//! radio driver. It has two states: uninitialized (nothing held) and
//! initialized (lines held after [`BoardAdapter::setup`]). The SPI session
//! can be opened independently of the lines.
//!
//! The LED on the proto shield is active low: writing logic 0 turns it on.

use crate::boards::{BoardProfile, DIO_COUNT, SPI_MAX_SPEED_HZ};
use crate::error::{BoardError, Result};
use crate::hal::{
    Bias, CdevGpio, EdgeEvent, GpioProvider, InputLine, Level, OutputLine, Signal, SpiProvider,
    SpiSession, SpidevProvider,
};
use crate::irq::{EdgeCallback, EdgeWatcher, SWITCH_DEBOUNCE};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Consumer label attached to every line request
pub const DEFAULT_CONSUMER: &str = "lora-board";

/// Half-period of the blink performed after a successful setup
pub const SETUP_BLINK_PERIOD: Duration = Duration::from_millis(100);

/// Number of blinks performed after a successful setup
pub const SETUP_BLINK_COUNT: u32 = 2;

/// DIO indices the SX127x defines; only the first [`DIO_COUNT`] are routed
const MAX_DIO_INDEX: u8 = 5;

/// Handles held by the adapter
#[derive(Default)]
struct BoardState {
    led: Option<Box<dyn OutputLine>>,
    switch: Option<Arc<dyn InputLine>>,
    dio: [Option<Arc<dyn InputLine>>; DIO_COUNT],
    spi: Option<Box<dyn SpiSession>>,
    watchers: Vec<EdgeWatcher>,
}

impl BoardState {
    fn lines_held(&self) -> bool {
        self.led.is_some() || self.switch.is_some() || self.dio.iter().any(Option::is_some)
    }

    fn is_empty(&self) -> bool {
        !self.lines_held() && self.spi.is_none() && self.watchers.is_empty()
    }
}

/// Lines acquired by `setup`, committed to the state only when all succeed
struct AcquiredLines {
    led: Box<dyn OutputLine>,
    switch: Arc<dyn InputLine>,
    dio: [Option<Arc<dyn InputLine>>; DIO_COUNT],
}

/// Board adapter for one profile
///
/// Generic over the GPIO and SPI providers so drivers can run against
/// [`crate::hal::mock`] in tests; the defaults talk to the Linux character
/// devices.
pub struct BoardAdapter<G = CdevGpio, S = SpidevProvider>
where
    G: GpioProvider,
    S: SpiProvider,
{
    profile: BoardProfile,
    gpio: G,
    spi_provider: S,
    consumer: String,
    state: BoardState,
}

impl BoardAdapter<CdevGpio, SpidevProvider> {
    /// Adapter for real hardware
    pub fn new(profile: BoardProfile) -> Result<Self> {
        Self::with_providers(profile, CdevGpio::new(), SpidevProvider::new())
    }
}

impl<G, S> BoardAdapter<G, S>
where
    G: GpioProvider,
    S: SpiProvider,
{
    /// Adapter using the given providers
    ///
    /// Fails with [`BoardError::Config`] if the profile does not validate.
    pub fn with_providers(profile: BoardProfile, gpio: G, spi_provider: S) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            gpio,
            spi_provider,
            consumer: DEFAULT_CONSUMER.to_string(),
            state: BoardState::default(),
        })
    }

    /// Override the consumer label shown by `gpioinfo`
    pub fn with_consumer(mut self, consumer: &str) -> Self {
        self.consumer = consumer.to_string();
        self
    }

    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    /// Whether the RF module uses the low-band RF pins
    pub fn low_band(&self) -> bool {
        self.profile.low_band
    }

    /// Whether `setup` has acquired the board's lines
    pub fn is_initialized(&self) -> bool {
        self.state.lines_held()
    }

    /// Acquire the LED, switch and DIO lines and blink twice
    ///
    /// Lines are requested in order LED, switch, DIO0..DIO3. If any request
    /// or the blink fails, the lines acquired so far are released and the
    /// adapter stays uninitialized.
    pub fn setup(&mut self) -> Result<()> {
        if self.state.lines_held() {
            return Err(BoardError::unavailable(
                format!("{} line {}", Signal::Led, self.profile.pins.led),
                "already requested by this board",
            ));
        }

        log::info!("Setting up board '{}'", self.profile.id);
        let lines = self.acquire_lines()?;

        self.state.led = Some(lines.led);
        self.state.switch = Some(lines.switch);
        self.state.dio = lines.dio;

        if let Err(e) = self.blink(SETUP_BLINK_PERIOD, SETUP_BLINK_COUNT) {
            self.release_lines();
            return Err(e);
        }
        log::info!("Board '{}' ready", self.profile.id);
        Ok(())
    }

    fn release_lines(&mut self) {
        self.state.led = None;
        self.state.switch = None;
        self.state.dio = Default::default();
    }

    fn acquire_lines(&self) -> Result<AcquiredLines> {
        let pins = &self.profile.pins;

        // LED starts off (active low)
        let led = self
            .gpio
            .request_output(&pins.led, &self.consumer, Level::High)?;
        log::debug!("{} on {}", Signal::Led, pins.led);

        let switch: Arc<dyn InputLine> = Arc::from(self.gpio.request_input(
            &pins.switch,
            &self.consumer,
            Bias::PullDown,
        )?);
        log::debug!("SWITCH on {}", pins.switch);

        let mut dio: [Option<Arc<dyn InputLine>>; DIO_COUNT] = Default::default();
        for (i, pin) in pins.dio.iter().enumerate() {
            let line = self.gpio.request_input(pin, &self.consumer, Bias::PullDown)?;
            dio[i] = Some(Arc::from(line));
            log::debug!("DIO{} on {}", i, pin);
        }

        Ok(AcquiredLines { led, switch, dio })
    }

    /// Release everything the adapter holds
    ///
    /// Stops interrupt watchers, closes the SPI session, turns the LED off
    /// and releases all lines. Failures along the way are logged and do not
    /// stop the remaining steps; the adapter always ends uninitialized.
    /// Fails with [`BoardError::InvalidState`] only when nothing was held.
    pub fn teardown(&mut self) -> Result<()> {
        if self.state.is_empty() {
            return Err(BoardError::invalid_state(
                "teardown without setup or an open SPI session",
            ));
        }

        log::info!("Tearing down board '{}'", self.profile.id);

        for mut watcher in self.state.watchers.drain(..) {
            if let Err(e) = watcher.stop() {
                log::warn!("Stopping {} watcher: {}", watcher.signal(), e);
            }
        }

        match self.state.spi.take() {
            Some(spi) => {
                if let Err(e) = spi.close() {
                    log::warn!("Closing SPI session: {}", e);
                }
            }
            None => log::debug!("No SPI session open"),
        }

        if let Some(led) = self.state.led.as_mut() {
            if let Err(e) = led.set_value(Level::High) {
                log::warn!("Turning LED off: {}", e);
            }
        }
        self.release_lines();

        Ok(())
    }

    /// Open the SPI session on `bus`/`chip_select` at 5 MHz
    ///
    /// A session that is already open is closed first.
    pub fn open_spi(&mut self, bus: u8, chip_select: u8) -> Result<&mut dyn SpiSession> {
        if let Some(old) = self.state.spi.take() {
            log::debug!("Replacing open SPI session");
            if let Err(e) = old.close() {
                log::warn!("Closing previous SPI session: {}", e);
            }
        }

        let session = self.spi_provider.open(bus, chip_select, SPI_MAX_SPEED_HZ)?;
        log::info!(
            "SPI bus {} chip select {} open at {} Hz",
            bus,
            chip_select,
            session.max_speed_hz()
        );

        Ok(self.state.spi.insert(session).as_mut())
    }

    /// Open the SPI session on the profile's default bus and chip select
    pub fn open_default_spi(&mut self) -> Result<&mut dyn SpiSession> {
        let (bus, chip_select) = (self.profile.spi.bus, self.profile.spi.chip_select);
        self.open_spi(bus, chip_select)
    }

    /// Borrow the open SPI session
    pub fn spi(&mut self) -> Result<&mut dyn SpiSession> {
        match self.state.spi.as_mut() {
            Some(spi) => Ok(spi.as_mut()),
            None => Err(BoardError::invalid_state("SPI session is not open")),
        }
    }

    fn led(&mut self) -> Result<&mut Box<dyn OutputLine>> {
        self.state.led.as_mut().ok_or_else(|| {
            BoardError::invalid_state(format!("{} line not acquired, call setup first", Signal::Led))
        })
    }

    /// Turn the LED on (logic 0)
    pub fn led_on(&mut self) -> Result<()> {
        self.led()?.set_value(Level::Low)
    }

    /// Turn the LED off (logic 1)
    pub fn led_off(&mut self) -> Result<()> {
        self.led()?.set_value(Level::High)
    }

    /// Blink the LED `count` times, blocking for `2 * period * count`
    ///
    /// The LED is on for the first half of each cycle and ends off.
    pub fn blink(&mut self, period: Duration, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        self.led_on()?;
        for _ in 0..count {
            thread::sleep(period);
            self.led_off()?;
            thread::sleep(period);
            self.led_on()?;
        }
        self.led_off()
    }

    /// Current level of the switch line
    pub fn switch_level(&self) -> Result<Level> {
        self.state
            .switch
            .as_ref()
            .ok_or_else(|| BoardError::invalid_state("switch line not acquired, call setup first"))?
            .value()
    }

    /// Current level of DIO line `index`
    pub fn dio_level(&self, index: u8) -> Result<Level> {
        self.dio_line(index)?.value()
    }

    fn dio_line(&self, index: u8) -> Result<Arc<dyn InputLine>> {
        if index > MAX_DIO_INDEX {
            return Err(BoardError::InvalidDio(index));
        }
        if usize::from(index) >= DIO_COUNT {
            return Err(BoardError::unavailable(
                format!("DIO{}", index),
                format!("not routed on board '{}'", self.profile.id),
            ));
        }
        self.state.dio[usize::from(index)]
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| {
                BoardError::invalid_state(format!("DIO{} not acquired, call setup first", index))
            })
    }

    fn ensure_unwatched(&self, signal: Signal) -> Result<()> {
        if self.state.watchers.iter().any(|w| w.signal() == signal) {
            return Err(BoardError::invalid_state(format!(
                "a callback is already registered for {}",
                signal
            )));
        }
        Ok(())
    }

    /// Call `callback` on every rising edge of DIO line `dio_index`
    ///
    /// The callback runs on a dedicated thread until `teardown`.
    pub fn register_interrupt_callback<F>(&mut self, dio_index: u8, callback: F) -> Result<()>
    where
        F: FnMut(EdgeEvent) + Send + 'static,
    {
        let line = self.dio_line(dio_index)?;
        let signal = Signal::Dio(dio_index);
        self.ensure_unwatched(signal)?;

        let watcher = EdgeWatcher::spawn(signal, line, None, Box::new(callback))?;
        self.state.watchers.push(watcher);
        log::info!("Interrupt callback registered for {}", signal);
        Ok(())
    }

    /// Call `callback` on rising edges of the switch, debounced by 300 ms
    pub fn register_switch_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(EdgeEvent) + Send + 'static,
    {
        let line = self
            .state
            .switch
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| BoardError::invalid_state("switch line not acquired, call setup first"))?;
        self.ensure_unwatched(Signal::Switch)?;

        let watcher = EdgeWatcher::spawn(
            Signal::Switch,
            line,
            Some(SWITCH_DEBOUNCE),
            Box::new(callback),
        )?;
        self.state.watchers.push(watcher);
        log::info!("Switch callback registered");
        Ok(())
    }

    /// Register DIO0..DIO3 callbacks and an optional switch callback at once
    ///
    /// `None` entries are skipped. Registration stops at the first failure;
    /// callbacks registered before it stay active.
    pub fn register_event_callbacks(
        &mut self,
        dio: [Option<EdgeCallback>; DIO_COUNT],
        switch: Option<EdgeCallback>,
    ) -> Result<()> {
        for (i, callback) in dio.into_iter().enumerate() {
            if let Some(callback) = callback {
                self.register_interrupt_callback(i as u8, callback)?;
            }
        }
        if let Some(callback) = switch {
            self.register_switch_callback(callback)?;
        }
        Ok(())
    }
}

impl<G, S> Drop for BoardAdapter<G, S>
where
    G: GpioProvider,
    S: SpiProvider,
{
    fn drop(&mut self) {
        if !self.state.is_empty() {
            if let Err(e) = self.teardown() {
                log::warn!("Teardown on drop: {}", e);
            }
        }
    }
}
