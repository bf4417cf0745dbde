//! Core robot types.
//!
//! - [`servo`]: a single actuator, its calibration and its limits.
//! - [`commands`]: control signals, the joint space targets of a batch move.
//! - [`mechanism`]: the indexed set of actuators and its high level moves.
pub mod commands;
pub mod mechanism;
pub mod servo;
