//! Kinematics and motion planning for the arm.
//!
//! - [`point`] holds the cylindrical and cartesian target types.
//! - [`model`] describes the arm geometry: rotation joint, planar chain, offsets.
//! - [`conversion`] turns a cylindrical point into joint angles and back.
//! - [`motion_engine`] plays eased, synchronized trajectories on the servos.
//!
//! Used by the mechanism to execute point and joint space moves.
pub mod conversion;
pub mod model;
pub mod motion_engine;
pub mod point;
