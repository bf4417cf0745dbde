//! Host doubles for the PWM channel and the blocking delay.
use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{self, ErrorKind, ErrorType, SetDutyCycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRejected;

impl pwm::Error for WriteRejected {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// PWM channel keeping every duty level written to it.
#[derive(Debug, Default)]
pub struct RecordingPwm {
    pub max_duty: u16,
    pub history: Vec<u16>,
    pub fail: bool,
}

impl RecordingPwm {
    pub fn new(max_duty: u16) -> Self {
        Self {
            max_duty,
            ..Default::default()
        }
    }

    pub fn failing(max_duty: u16) -> Self {
        Self {
            max_duty,
            fail: true,
            ..Default::default()
        }
    }

    pub fn last(&self) -> Option<u16> {
        self.history.last().copied()
    }
}

impl ErrorType for RecordingPwm {
    type Error = WriteRejected;
}

impl SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail {
            return Err(WriteRejected);
        }
        self.history.push(duty);
        Ok(())
    }
}

/// Simulated clock: records each wait instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits_us: Vec<u32>,
}

impl RecordingDelay {
    pub fn total_us(&self) -> u64 {
        self.waits_us.iter().map(|&us| us as u64).sum()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_us.push(ns / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_us.push(us);
    }
}
