//! Control signals: batches of (actuator index, target angle) requests.
//!
//! A [`ControlSignal`] is built per motion request and consumed by the
//! [`Mechanism`](crate::robot::mechanism::Mechanism). Range and uniqueness of the indices are
//! checked by the mechanism, which owns the size they are checked against.
use core::fmt::Display;

use heapless::Vec;

use crate::config::MAX_ACTUATORS;
use crate::error::{ArmError, ArmResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub index: usize,
    pub angle: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlSignal {
    commands: Vec<Command, MAX_ACTUATORS>,
}

impl ControlSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a signal from `(index, angle)` pairs, keeping their order.
    pub fn from_pairs(pairs: &[(usize, f32)]) -> ArmResult<Self> {
        let mut signal = Self::new();
        for &(index, angle) in pairs {
            signal.push(index, angle)?;
        }
        Ok(signal)
    }

    pub fn push(&mut self, index: usize, angle: f32) -> ArmResult<()> {
        self.commands
            .push(Command { index, angle })
            .map_err(|_| ArmError::AllocationFailure {
                capacity: MAX_ACTUATORS,
            })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Target requested for `index`, first occurrence wins.
    pub fn target(&self, index: usize) -> Option<f32> {
        self.commands
            .iter()
            .find(|cmd| cmd.index == index)
            .map(|cmd| cmd.angle)
    }
}

impl Display for ControlSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("[")?;
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} -> {:.1}", cmd.index, cmd.angle)?;
        }
        f.write_str("]")
    }
}
