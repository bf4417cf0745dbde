//! Library root for the servo arm.
//!
//! Re-exports the main modules: [`robot`] (actuators and the mechanism), [`kinematics`]
//! (geometry, inverse kinematics and eased motion), [`config`] and [`error`].
//! The [`tasks`] module holds the ESP32 firmware tasks and is only built with the `esp32`
//! feature, everything else runs on any target.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod kinematics;
pub mod robot;
#[cfg(feature = "esp32")]
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_utils;
