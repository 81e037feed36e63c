//! Edge watcher threads
//!
//! Every registered callback gets one thread that blocks on rising edges of
//! its input line and calls the callback from that thread. The wait is cut
//! into short slices so the thread notices the stop flag set by
//! [`EdgeWatcher::stop`].

use crate::error::{BoardError, Result};
use crate::hal::{EdgeEvent, InputLine, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest a watcher blocks before re-checking its stop flag
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Debounce window applied to the user switch
pub const SWITCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Callback invoked on a rising edge
pub type EdgeCallback = Box<dyn FnMut(EdgeEvent) + Send + 'static>;

/// Running watcher for one line
pub struct EdgeWatcher {
    signal: Signal,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EdgeWatcher {
    /// Spawn a watcher thread for `line`
    ///
    /// Edges closer than `debounce` to the previously delivered edge are
    /// dropped.
    pub fn spawn(
        signal: Signal,
        line: Arc<dyn InputLine>,
        debounce: Option<Duration>,
        mut callback: EdgeCallback,
    ) -> Result<Self> {
        // Edges that arrived before anyone was listening are stale
        while line.wait_rising_edge(Duration::ZERO)?.is_some() {}

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let debounce_ns = debounce.map(|d| d.as_nanos() as u64);

        let handle = thread::Builder::new()
            .name(format!("irq-{}", signal).to_lowercase())
            .spawn(move || {
                let mut last: Option<u64> = None;

                while flag.load(Ordering::SeqCst) {
                    match line.wait_rising_edge(POLL_INTERVAL) {
                        Ok(Some(timestamp_ns)) => {
                            if let (Some(window), Some(prev)) = (debounce_ns, last) {
                                if timestamp_ns.saturating_sub(prev) < window {
                                    log::trace!("{} edge debounced", signal);
                                    continue;
                                }
                            }
                            last = Some(timestamp_ns);
                            callback(EdgeEvent {
                                signal,
                                timestamp_ns,
                            });
                        }
                        Ok(None) => {}
                        Err(e) => {
                            log::error!("{} watcher stopped: {}", signal, e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| BoardError::unavailable(format!("{} watcher thread", signal), e))?;

        log::debug!("Watching {} for rising edges", signal);
        Ok(Self {
            signal,
            running,
            handle: Some(handle),
        })
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Ask the thread to exit and wait for it
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                BoardError::invalid_state(format!("{} callback panicked", self.signal))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for EdgeWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::PinBinding;
    use crate::hal::mock::MockGpio;
    use crate::hal::{Bias, GpioProvider, Level};
    use std::sync::mpsc;

    fn watched_line(gpio: &MockGpio, offset: u32) -> Arc<dyn InputLine> {
        let pin = PinBinding::new("gpiochip0", offset);
        Arc::from(gpio.request_input(&pin, "test", Bias::PullDown).unwrap())
    }

    #[test]
    fn test_callback_receives_edges() {
        let gpio = MockGpio::new();
        let line = watched_line(&gpio, 22);
        let (tx, rx) = mpsc::channel();

        let mut watcher = EdgeWatcher::spawn(
            Signal::Dio(0),
            line,
            None,
            Box::new(move |event| tx.send(event).unwrap()),
        )
        .unwrap();

        gpio.line(&PinBinding::new("gpiochip0", 22)).set_level(Level::High);
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(event.signal, Signal::Dio(0));

        watcher.stop().unwrap();
    }

    #[test]
    fn test_stale_edges_are_discarded() {
        let gpio = MockGpio::new();
        let line = watched_line(&gpio, 23);
        gpio.line(&PinBinding::new("gpiochip0", 23)).pulse();

        let (tx, rx) = mpsc::channel();
        let mut watcher = EdgeWatcher::spawn(
            Signal::Dio(1),
            line,
            None,
            Box::new(move |event| tx.send(event).unwrap()),
        )
        .unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(250)).is_err());
        watcher.stop().unwrap();
    }

    #[test]
    fn test_debounce_drops_close_edges() {
        let gpio = MockGpio::new();
        let line = watched_line(&gpio, 4);
        let (tx, rx) = mpsc::channel();

        let mut watcher = EdgeWatcher::spawn(
            Signal::Switch,
            line,
            Some(SWITCH_DEBOUNCE),
            Box::new(move |event| tx.send(event).unwrap()),
        )
        .unwrap();

        let switch = gpio.line(&PinBinding::new("gpiochip0", 4));
        switch.pulse();
        switch.pulse();
        switch.pulse();

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        watcher.stop().unwrap();
    }

    #[test]
    fn test_stop_joins_thread() {
        let gpio = MockGpio::new();
        let line = watched_line(&gpio, 24);
        let mut watcher =
            EdgeWatcher::spawn(Signal::Dio(2), line, None, Box::new(|_| {})).unwrap();

        watcher.stop().unwrap();
        // A second stop is a no-op
        watcher.stop().unwrap();
    }
}
