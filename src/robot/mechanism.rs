//! The articulated device: a fixed, index addressed set of actuators.
//!
//! Every operation taking an index checks it against the size fixed at creation and fails
//! with [`ArmError::IndexOutOfRange`] before touching anything. High level moves clamp the
//! requested angle to the actuator limits and hand the timing to the [`MotionEngine`].
//! Point moves never clamp: a solved angle the actuator cannot hold fails the whole move.
use core::fmt::Display;

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use heapless::Vec;
use log::{debug, info, warn};

use crate::config::{JOINT_TOLERANCE, MAX_ACTUATORS};
use crate::error::{ArmError, ArmResult};
use crate::kinematics::conversion::{cylindrical_to_signal, forward};
use crate::kinematics::model::KinematicModel;
use crate::kinematics::motion_engine::MotionEngine;
use crate::kinematics::point::CylindricalPoint;
use crate::robot::commands::ControlSignal;
use crate::robot::servo::{Actuator, Calibration};

pub struct Mechanism<PWM, D> {
    actuators: Vec<Actuator<PWM>, MAX_ACTUATORS>,
    model: Option<KinematicModel>,
    engine: MotionEngine<D>,
}

impl<PWM, D> Mechanism<PWM, D> {
    pub fn size(&self) -> usize {
        self.actuators.len()
    }

    pub fn actuator(&self, index: usize) -> ArmResult<&Actuator<PWM>> {
        self.check_index(index)?;
        Ok(&self.actuators[index])
    }

    pub fn engine(&self) -> &MotionEngine<D> {
        &self.engine
    }

    pub fn kinematic_model(&self) -> Option<&KinematicModel> {
        self.model.as_ref()
    }

    pub fn set_calibration(&mut self, index: usize, calibration: Calibration) -> ArmResult<()> {
        self.actuator_mut(index)?.set_calibration(calibration);
        Ok(())
    }

    pub fn set_limits(&mut self, index: usize, lower: f32, upper: f32) -> ArmResult<()> {
        self.actuator_mut(index)?.set_limits(lower, upper);
        Ok(())
    }

    /// Installs the geometry used by [`Mechanism::move_to`]. Every joint it names must exist
    /// and appear once.
    pub fn set_kinematic_model(&mut self, model: KinematicModel) -> ArmResult<()> {
        for (i, joint) in model.joints().enumerate() {
            self.check_index(joint)?;
            if model.joints().take(i).any(|previous| previous == joint) {
                return Err(ArmError::DuplicateIndex(joint));
            }
        }
        self.model = Some(model);
        Ok(())
    }

    /// Checks every command of `signal`, in order, against the size and for repeats.
    pub fn validate(&self, signal: &ControlSignal) -> ArmResult<()> {
        for (i, cmd) in signal.iter().enumerate() {
            self.check_index(cmd.index)?;
            if signal.iter().take(i).any(|previous| previous.index == cmd.index) {
                return Err(ArmError::DuplicateIndex(cmd.index));
            }
        }
        Ok(())
    }

    /// Joint angles solving `point` with the installed kinematic model.
    ///
    /// # Errors
    /// * `Unreachable` if the chain cannot reach the point.
    /// * `JointOutOfRange` if a solved angle lies outside the travel or limits of its
    ///   actuator. The rotation joint is first tried one full turn away.
    pub fn solve(&self, point: &CylindricalPoint) -> ArmResult<ControlSignal> {
        let model = self.model.as_ref().ok_or(ArmError::NoKinematicModel)?;
        let solved = cylindrical_to_signal(model, point)?;

        let mut signal = ControlSignal::new();
        for cmd in solved.iter() {
            let actuator = self.actuator(cmd.index)?;
            let turns = cmd.index == model.rotation.joint;
            signal.push(cmd.index, reachable(actuator, cmd.angle, turns)?)?;
        }
        Ok(signal)
    }

    /// Where the current joint angles put the end of the chain.
    pub fn position(&self) -> ArmResult<CylindricalPoint> {
        let model = self.model.as_ref().ok_or(ArmError::NoKinematicModel)?;
        Ok(forward(model, |joint| self.actuators[joint].angle()))
    }

    pub fn report(&self) -> Report {
        let mut angles = Vec::new();
        for actuator in self.actuators.iter() {
            // same capacity as the actuator list
            let _ = angles.push((actuator.id(), actuator.angle()));
        }
        Report { angles }
    }

    fn check_index(&self, index: usize) -> ArmResult<()> {
        if index >= self.actuators.len() {
            return Err(ArmError::IndexOutOfRange {
                index,
                size: self.actuators.len(),
            });
        }
        Ok(())
    }

    fn actuator_mut(&mut self, index: usize) -> ArmResult<&mut Actuator<PWM>> {
        self.check_index(index)?;
        Ok(&mut self.actuators[index])
    }
}

impl<PWM, D> Mechanism<PWM, D>
where
    PWM: SetDutyCycle,
    D: DelayNs,
{
    /// Creates one inactive actuator per output, index following iteration order.
    ///
    /// # Errors
    /// * `AllocationFailure` if more than `MAX_ACTUATORS` outputs are given.
    pub fn new(
        outputs: impl IntoIterator<Item = PWM>,
        calibration: Calibration,
        engine: MotionEngine<D>,
    ) -> ArmResult<Self> {
        let mut actuators = Vec::new();
        for (id, pwm) in outputs.into_iter().enumerate() {
            actuators
                .push(Actuator::new(pwm, id, calibration))
                .map_err(|_| ArmError::AllocationFailure {
                    capacity: MAX_ACTUATORS,
                })?;
        }
        info!("mechanism created with {} actuators", actuators.len());

        Ok(Self {
            actuators,
            model: None,
            engine,
        })
    }

    /// Binds another PWM channel to `index`, returning the one it replaces.
    pub fn set_channel(&mut self, index: usize, pwm: PWM) -> ArmResult<PWM> {
        Ok(self.actuator_mut(index)?.replace_output(pwm))
    }

    /// Immediate set, clamped to the mechanical range only.
    pub fn set_angle(&mut self, index: usize, angle: f32) -> ArmResult<f32> {
        Ok(self.actuator_mut(index)?.set_angle(angle))
    }

    /// Immediate set of every command, after validating the whole signal.
    pub fn set_batch(&mut self, signal: &ControlSignal) -> ArmResult<()> {
        self.validate(signal)?;
        for cmd in signal.iter() {
            self.actuators[cmd.index].set_angle(cmd.angle);
        }
        Ok(())
    }

    pub fn activate_all(&mut self) {
        for actuator in self.actuators.iter_mut() {
            actuator.activate();
        }
    }

    /// Smooth move of one actuator, target clamped to its limits.
    ///
    /// # Returns
    /// The step count of the trajectory.
    pub fn move_one(&mut self, index: usize, angle: f32) -> ArmResult<u32> {
        self.check_index(index)?;
        let actuator = &mut self.actuators[index];
        let target = limited(actuator, angle);
        self.engine.move_one(actuator, target)
    }

    /// Synchronized smooth move of the actuators named by `signal`.
    ///
    /// The whole signal is validated first, so a bad entry moves nothing. Actuators not
    /// named by the signal are left out of the trajectory.
    pub fn move_batch(&mut self, signal: &ControlSignal) -> ArmResult<u32> {
        self.validate(signal)?;
        debug!("move batch {signal}");
        let mut batch = pick(&mut self.actuators, signal);
        self.engine.move_batch(&mut batch)
    }

    /// Moves the chain end to `point` through the installed kinematic model. Nothing moves
    /// unless every joint can hold its solved angle, see [`Mechanism::solve`].
    pub fn move_to(&mut self, point: &CylindricalPoint) -> ArmResult<u32> {
        let signal = self.solve(point)?;
        self.move_batch(&signal)
    }
}

/// Borrowed view of the actuators named by an already validated signal, each paired
/// with its limited target.
fn pick<'a, PWM>(
    actuators: &'a mut [Actuator<PWM>],
    signal: &ControlSignal,
) -> Vec<(&'a mut Actuator<PWM>, f32), MAX_ACTUATORS> {
    let mut batch = Vec::new();
    for (index, actuator) in actuators.iter_mut().enumerate() {
        if let Some(angle) = signal.target(index) {
            let target = limited(actuator, angle);
            // at most one entry per actuator
            let _ = batch.push((actuator, target));
        }
    }
    batch
}

/// `angle` if `actuator` can hold it without clamping. `turns` allows the same heading
/// one full turn away.
fn reachable<PWM>(actuator: &Actuator<PWM>, angle: f32, turns: bool) -> ArmResult<f32> {
    let limits = actuator.limits();
    let lower = limits.lower.max(0.0);
    let upper = limits.upper.min(actuator.calibration().angle_range);
    let fits = |a: f32| a >= lower - JOINT_TOLERANCE && a <= upper + JOINT_TOLERANCE;

    let mut candidate = angle;
    if turns && !fits(candidate) {
        candidate = angle % 360.0;
        if candidate < 0.0 {
            candidate += 360.0;
        }
    }
    if !fits(candidate) {
        return Err(ArmError::JointOutOfRange {
            joint: actuator.id(),
            angle,
            lower,
            upper,
        });
    }
    // only rounding noise is absorbed here
    Ok(candidate.max(lower).min(upper))
}

fn limited<PWM>(actuator: &Actuator<PWM>, angle: f32) -> f32 {
    let target = actuator.limits().clamp(angle);
    if target != angle {
        warn!(
            "servo {} target {:.1} clamped to {:.1} by limits {}",
            actuator.id(),
            angle,
            target,
            actuator.limits()
        );
    }
    target
}

/// Snapshot of every actuator angle, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    angles: Vec<(usize, f32), MAX_ACTUATORS>,
}

impl Report {
    pub fn iter(&self) -> impl Iterator<Item = &(usize, f32)> {
        self.angles.iter()
    }

    pub fn angle(&self, index: usize) -> Option<f32> {
        self.angles
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, angle)| *angle)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (index, angle) in self.angles.iter() {
            writeln!(f, "servo {index}: {angle:.1} degrees")?;
        }
        Ok(())
    }
}
