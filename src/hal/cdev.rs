//! GPIO lines through the Linux character device interface
//!
//! Uses the gpiocdev crate (uAPI v1 or v2, whichever the kernel offers).
//! Each line is its own request, so releasing a line is dropping its
//! handle.

use super::{Bias, GpioProvider, InputLine, Level, OutputLine};
use crate::boards::PinBinding;
use crate::error::{BoardError, Result};
use gpiocdev::line::{Bias as CdevBias, EdgeDetection, EdgeKind, Offset, Value};
use gpiocdev::Request;
use std::time::{Duration, Instant};

fn to_value(level: Level) -> Value {
    match level {
        Level::Low => Value::Inactive,
        Level::High => Value::Active,
    }
}

fn from_value(value: Value) -> Level {
    match value {
        Value::Inactive => Level::Low,
        Value::Active => Level::High,
    }
}

fn to_bias(bias: Bias) -> CdevBias {
    match bias {
        Bias::PullDown => CdevBias::PullDown,
    }
}

/// GPIO provider backed by `/dev/gpiochipN`
#[derive(Debug, Default, Clone, Copy)]
pub struct CdevGpio;

impl CdevGpio {
    pub fn new() -> Self {
        Self
    }
}

impl GpioProvider for CdevGpio {
    fn request_output(
        &self,
        pin: &PinBinding,
        consumer: &str,
        initial: Level,
    ) -> Result<Box<dyn OutputLine>> {
        let request = Request::builder()
            .on_chip(pin.chip_path())
            .with_consumer(consumer)
            .with_line(pin.offset)
            .as_output(to_value(initial))
            .request()
            .map_err(|e| BoardError::unavailable(format!("output line {}", pin), e))?;

        log::debug!("Requested output line {} as '{}'", pin, consumer);
        Ok(Box::new(CdevOutput {
            request,
            offset: pin.offset,
        }))
    }

    fn request_input(
        &self,
        pin: &PinBinding,
        consumer: &str,
        bias: Bias,
    ) -> Result<Box<dyn InputLine>> {
        let request = Request::builder()
            .on_chip(pin.chip_path())
            .with_consumer(consumer)
            .with_line(pin.offset)
            .as_input()
            .with_bias(to_bias(bias))
            .with_edge_detection(EdgeDetection::RisingEdge)
            .request()
            .map_err(|e| BoardError::unavailable(format!("input line {}", pin), e))?;

        log::debug!("Requested input line {} as '{}' ({:?})", pin, consumer, bias);
        Ok(Box::new(CdevInput {
            request,
            offset: pin.offset,
            name: pin.to_string(),
        }))
    }
}

struct CdevOutput {
    request: Request,
    offset: Offset,
}

impl OutputLine for CdevOutput {
    fn set_value(&mut self, level: Level) -> Result<()> {
        self.request
            .set_value(self.offset, to_value(level))
            .map_err(|e| BoardError::unavailable(format!("line offset {}", self.offset), e))
    }
}

struct CdevInput {
    request: Request,
    offset: Offset,
    name: String,
}

impl InputLine for CdevInput {
    fn value(&self) -> Result<Level> {
        self.request
            .value(self.offset)
            .map(from_value)
            .map_err(|e| BoardError::unavailable(format!("input line {}", self.name), e))
    }

    fn wait_rising_edge(&self, timeout: Duration) -> Result<Option<u64>> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let ready = self
                .request
                .wait_edge_event(remaining)
                .map_err(|e| BoardError::unavailable(format!("input line {}", self.name), e))?;
            if !ready {
                return Ok(None);
            }

            let event = self
                .request
                .read_edge_event()
                .map_err(|e| BoardError::unavailable(format!("input line {}", self.name), e))?;
            if event.kind == EdgeKind::Rising {
                return Ok(Some(event.timestamp_ns));
            }
        }
    }
}
