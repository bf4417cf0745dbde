//! Errors reported by the mechanism, the motion engine and the kinematic transform.
//!
//! Every variant is a local validation failure or a request to stop: nothing here is
//! retried, and validation always happens before an actuator is touched.
use thiserror::Error;

pub type ArmResult<T> = Result<T, ArmError>;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ArmError {
    /// The index does not name an actuator owned by the mechanism.
    #[error("actuator index {index} out of range, mechanism has {size} actuators")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("actuator index {0} appears more than once")]
    DuplicateIndex(usize),

    /// A fixed capacity collection (actuators, signal entries, chain links) is full.
    #[error("capacity of {capacity} entries exhausted")]
    AllocationFailure { capacity: usize },

    /// The planar target lies outside the band the chain can reach.
    #[error("target at distance {distance} outside reachable band [{min_reach}, {max_reach}]")]
    Unreachable {
        distance: f32,
        min_reach: f32,
        max_reach: f32,
    },

    /// A solved joint angle falls outside the travel or the limits of its actuator.
    #[error("joint {joint} would need {angle} degrees, outside its range [{lower}, {upper}]")]
    JointOutOfRange {
        joint: usize,
        angle: f32,
        lower: f32,
        upper: f32,
    },

    #[error(
        "chain description mismatch: {joints} joints, {angles} horizontal angles, \
         {directions} directions, {lengths} lengths"
    )]
    ChainLengthMismatch {
        joints: usize,
        angles: usize,
        directions: usize,
        lengths: usize,
    },

    #[error("no kinematic model configured")]
    NoKinematicModel,

    /// The move was cancelled through the abort signal before reaching its target.
    #[error("motion aborted at step {step} of {steps}")]
    Aborted { step: u32, steps: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_range_names_index_and_size() {
        let err = ArmError::IndexOutOfRange { index: 7, size: 6 };
        let msg = err.to_string();
        assert!(msg.contains("index 7"));
        assert!(msg.contains("6 actuators"));
    }

    #[test]
    fn unreachable_reports_band() {
        let err = ArmError::Unreachable {
            distance: 300.0,
            min_reach: 0.0,
            max_reach: 263.0,
        };
        assert!(err.to_string().contains("[0, 263]"));
    }

    #[test]
    fn aborted_reports_progress() {
        let err = ArmError::Aborted { step: 12, steps: 50 };
        assert_eq!(err.to_string(), "motion aborted at step 12 of 50");
    }

    #[test]
    fn joint_out_of_range_names_joint_and_bounds() {
        let err = ArmError::JointOutOfRange {
            joint: 0,
            angle: -30.0,
            lower: 0.0,
            upper: 180.0,
        };
        assert_eq!(
            err.to_string(),
            "joint 0 would need -30 degrees, outside its range [0, 180]"
        );
    }
}
