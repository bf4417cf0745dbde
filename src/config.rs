use fugit::MicrosDurationU32;

use crate::error::ArmResult;
use crate::kinematics::model::{Direction, KinematicModel, Link, RotationJoint};
use crate::robot::servo::Limits;

/// Most actuators one mechanism (and one control signal) can hold.
pub const MAX_ACTUATORS: usize = 16;
/// Most links in the planar chain of a kinematic model.
pub const MAX_LINKS: usize = 8;

/// CONST FOR MOVEMENT
/// Time a full sweep of FULL_SWEEP_DEGREES is spread over.
pub const MAX_MOVE_DURATION: MicrosDurationU32 = MicrosDurationU32::from_ticks(2_000_000);
pub const FULL_SWEEP_DEGREES: f32 = 180.0;

/// CONST FOR THE KINEMATIC SOLVER (same unit as the link lengths)
pub const REACH_TOLERANCE: f32 = 1e-3;
pub const SOLVER_MAX_ITERATIONS: usize = 1000;
/// Slack (degrees) allowed when checking solved joint angles against their range.
pub const JOINT_TOLERANCE: f32 = 1e-3;

// REFERENCE ARM: 6 x MG996R
// [base, shoulder, elbow, wrist, wrist roll, gripper]
pub const ARM_SERVO_COUNT: usize = 6;
pub const BOOT_ANGLE: f32 = 90.0;

pub const BASE_JOINT: usize = 0;
pub const SHOULDER_JOINT: usize = 1;
pub const ELBOW_JOINT: usize = 2;
pub const WRIST_JOINT: usize = 3;
pub const WRIST_ROLL_JOINT: usize = 4;
pub const GRIPPER_JOINT: usize = 5;

// ARM SIZE (mm)
pub const HEIGHT_OFFSET: f32 = 70.0;
pub const RADIUS_OFFSET: f32 = 0.0;
pub const UPPER_ARM_LENGTH: f32 = 105.0;
pub const FOREARM_LENGTH: f32 = 98.0;
pub const HAND_LENGTH: f32 = 60.0;

/// Geometry of the reference arm: base turns the plane, shoulder, elbow and wrist
/// place the hand in it.
pub fn reference_arm_model() -> ArmResult<KinematicModel> {
    KinematicModel::new(HEIGHT_OFFSET, RADIUS_OFFSET, RotationJoint::new(BASE_JOINT))
        .with_link(Link {
            joint: SHOULDER_JOINT,
            horizontal_angle: 0.0,
            direction: Direction::Raising,
            length: UPPER_ARM_LENGTH,
        })?
        .with_link(Link {
            joint: ELBOW_JOINT,
            horizontal_angle: 90.0,
            direction: Direction::Lowering,
            length: FOREARM_LENGTH,
        })?
        .with_link(Link {
            joint: WRIST_JOINT,
            horizontal_angle: 90.0,
            direction: Direction::Lowering,
            length: HAND_LENGTH,
        })
}

/// Per joint limits keeping the reference arm clear of its own frame.
pub fn reference_arm_limits() -> [Limits; ARM_SERVO_COUNT] {
    [
        Limits { lower: 0.0, upper: 180.0 },
        Limits { lower: 3.0, upper: 177.0 },
        Limits { lower: 10.0, upper: 170.0 },
        Limits { lower: 10.0, upper: 170.0 },
        Limits { lower: 0.0, upper: 180.0 },
        Limits { lower: 20.0, upper: 120.0 },
    ]
}
