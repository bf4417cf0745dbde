use core::f32::consts::PI;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use fugit::MicrosDurationU32;
use heapless::Vec;
use log::{debug, info, trace, warn};
#[cfg(not(test))]
use micromath::F32Ext;

use crate::config::{FULL_SWEEP_DEGREES, MAX_ACTUATORS, MAX_MOVE_DURATION};
use crate::error::{ArmError, ArmResult};
use crate::robot::servo::Actuator;

pub type AbortSignal = Signal<CriticalSectionRawMutex, ()>;

/// Raised from another context to stop the move in flight at its next step.
pub static ABORT_MOTION: AbortSignal = Signal::new();

/// Number of eased steps for a move of `delta` degrees.
///
/// A full 180 degree sweep takes as many periods as fit in `max_move`, shorter moves
/// proportionally fewer. Slower servos (longer period) get fewer, larger steps.
pub fn step_count(delta: f32, period: MicrosDurationU32, max_move: MicrosDurationU32) -> u32 {
    let period = period.to_micros();
    if period == 0 {
        return 0;
    }
    let periods = max_move.to_micros() as f32 / period as f32;
    (delta.abs() / FULL_SWEEP_DEGREES * periods).round() as u32
}

/// S-curve progress at `step` of `steps`: 0 at the start, 1 at the end, slow-fast-slow.
pub fn ease_ratio(step: u32, steps: u32) -> f32 {
    if steps == 0 {
        return 1.0;
    }
    0.5 - (PI * step as f32 / steps as f32).cos() / 2.0
}

/// Start angle and signed displacement of one actuator in a batch.
#[derive(Debug, Clone, Copy)]
struct Leg {
    start: f32,
    delta: f32,
}

/// Moves actuators along eased trajectories, blocking the caller for the whole move.
///
/// Waiting goes through [`DelayNs`], one wait per step, so the trajectory depends only
/// on the step count and not on wall clock accuracy.
pub struct MotionEngine<D> {
    delay: D,
    max_move: MicrosDurationU32,
    abort: Option<&'static AbortSignal>,
}

impl<D> MotionEngine<D>
where
    D: DelayNs,
{
    pub fn new(delay: D) -> Self {
        Self {
            delay,
            max_move: MAX_MOVE_DURATION,
            abort: None,
        }
    }

    pub fn with_max_move_duration(mut self, max_move: MicrosDurationU32) -> Self {
        self.max_move = max_move;
        self
    }

    /// Polls `abort` before every step of every move.
    pub fn with_abort(mut self, abort: &'static AbortSignal) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn max_move_duration(&self) -> MicrosDurationU32 {
        self.max_move
    }

    /// Smoothly moves one actuator to `target`.
    ///
    /// # Returns
    /// The number of steps the trajectory was planned with.
    pub fn move_one<PWM: SetDutyCycle>(
        &mut self,
        actuator: &mut Actuator<PWM>,
        target: f32,
    ) -> ArmResult<u32> {
        self.move_batch(&mut [(actuator, target)])
    }

    /// Smoothly moves every actuator of `batch` to its paired target, all arriving on
    /// the same step.
    ///
    /// Each step applies one shared ease ratio to every displacement and then waits for
    /// the longest period in the batch. After the last step every actuator is set to
    /// its exact target. Targets beyond the mechanical range are planned, and left in
    /// `batch`, at the nearest end of travel.
    pub fn move_batch<PWM: SetDutyCycle>(
        &mut self,
        batch: &mut [(&mut Actuator<PWM>, f32)],
    ) -> ArmResult<u32> {
        let mut legs: Vec<Leg, MAX_ACTUATORS> = Vec::new();
        let mut steps = 0;
        let mut period = 0;
        for (actuator, target) in batch.iter_mut() {
            let calibration = actuator.calibration();
            // plan only the travel the servo can actually make
            *target = target.max(0.0).min(calibration.angle_range);
            let start = actuator.angle();
            let delta = *target - start;
            steps = steps.max(step_count(delta, calibration.period, self.max_move));
            period = period.max(calibration.period.to_micros());
            legs.push(Leg { start, delta })
                .map_err(|_| ArmError::AllocationFailure {
                    capacity: MAX_ACTUATORS,
                })?;
        }

        if let Some(abort) = self.abort {
            // only requests raised during this move count
            abort.reset();
        }
        debug!(
            "moving {} servos in {steps} steps of {period}us",
            batch.len()
        );

        for step in 1..steps {
            if self.abort_requested() {
                warn!("move aborted at step {step} of {steps}");
                return Err(ArmError::Aborted { step, steps });
            }
            let ratio = ease_ratio(step, steps);
            trace!("step {step}/{steps} ratio {ratio:.4}");
            for ((actuator, _), leg) in batch.iter_mut().zip(legs.iter()) {
                actuator.set_angle(leg.start + leg.delta * ratio);
            }
            self.delay.delay_us(period);
        }

        // land exactly on target whatever the easing accumulated
        for (actuator, target) in batch.iter_mut() {
            actuator.set_angle(*target);
        }
        info!("move of {} servos completed in {steps} steps", batch.len());
        Ok(steps)
    }

    fn abort_requested(&self) -> bool {
        self.abort
            .map(|abort| abort.try_take().is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::servo::Calibration;
    use crate::test_utils::{RecordingDelay, RecordingPwm};

    const MAX_DUTY: u16 = 40_000;

    fn servo(id: usize, period_us: u32) -> Actuator<RecordingPwm> {
        let calibration = Calibration {
            period: MicrosDurationU32::from_ticks(period_us),
            ..Calibration::mg996r()
        };
        let mut servo = Actuator::new(RecordingPwm::new(MAX_DUTY), id, calibration);
        servo.activate();
        servo
    }

    fn level(servo: &Actuator<RecordingPwm>, angle: f32) -> u16 {
        servo.calibration().duty_level(angle, MAX_DUTY)
    }

    #[test]
    fn step_count_scales_with_distance_and_period() {
        let max = MAX_MOVE_DURATION;
        assert_eq!(step_count(180.0, MicrosDurationU32::from_ticks(20_000), max), 100);
        assert_eq!(step_count(-90.0, MicrosDurationU32::from_ticks(20_000), max), 50);
        assert_eq!(step_count(90.0, MicrosDurationU32::from_ticks(10_000), max), 100);
        assert_eq!(step_count(0.0, MicrosDurationU32::from_ticks(20_000), max), 0);
        assert_eq!(step_count(90.0, MicrosDurationU32::from_ticks(0), max), 0);
    }

    #[test]
    fn ease_ratio_is_an_s_curve() {
        assert!(ease_ratio(0, 10).abs() < 1e-6);
        assert!((ease_ratio(5, 10) - 0.5).abs() < 1e-6);
        assert!((ease_ratio(10, 10) - 1.0).abs() < 1e-6);
        // slow at the ends, fast in the middle
        let first = ease_ratio(1, 10) - ease_ratio(0, 10);
        let middle = ease_ratio(5, 10) - ease_ratio(4, 10);
        assert!(middle > first * 5.0);
        assert_eq!(ease_ratio(0, 0), 1.0);
    }

    #[test]
    fn single_move_lands_exactly_on_target() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        let steps = engine.move_one(&mut servo, 33.3).unwrap();

        let period = MicrosDurationU32::from_ticks(20_000);
        assert_eq!(steps, step_count(33.3 - 90.0, period, MAX_MOVE_DURATION));
        assert_eq!(servo.angle(), 33.3);
        assert_eq!(engine.delay().waits_us.len() as u32, steps - 1);
        assert!(engine.delay().waits_us.iter().all(|&us| us == 20_000));
    }

    #[test]
    fn single_move_to_extremes() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        engine.move_one(&mut servo, 180.0).unwrap();
        assert_eq!(servo.angle(), 180.0);
        assert_eq!(servo.output().last(), Some(5_000));

        engine.move_one(&mut servo, 0.0).unwrap();
        assert_eq!(servo.angle(), 0.0);
        assert_eq!(servo.output().last(), Some(1_000));
    }

    #[test]
    fn zero_distance_move_does_not_wait() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        assert_eq!(engine.move_one(&mut servo, 90.0).unwrap(), 0);
        assert_eq!(servo.angle(), 90.0);
        assert!(engine.delay().waits_us.is_empty());
    }

    #[test]
    fn tiny_move_skips_to_target() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        // 1.5 degrees over 100 periods per sweep rounds to a single step
        assert_eq!(engine.move_one(&mut servo, 91.5).unwrap(), 1);
        assert_eq!(servo.angle(), 91.5);
        assert!(engine.delay().waits_us.is_empty());
    }

    #[test]
    fn trajectory_is_monotonic() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        engine.move_one(&mut servo, 0.0).unwrap();

        let history = &servo.output().history;
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn batch_arrives_together() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut short = servo(0, 20_000);
        let mut long = servo(1, 10_000);
        long.set_angle(5.0);
        let writes_before = (short.output().history.len(), long.output().history.len());

        let steps = engine
            .move_batch(&mut [(&mut short, 95.0), (&mut long, 175.0)])
            .unwrap();

        // 5 degrees at 20ms needs 3 steps, 170 degrees at 10ms needs 189
        assert_eq!(steps, 189);
        assert_eq!(short.angle(), 95.0);
        assert_eq!(long.angle(), 175.0);

        // lockstep on the slowest period
        let waits = &engine.delay().waits_us;
        assert_eq!(waits.len(), 188);
        assert!(waits.iter().all(|&us| us == 20_000));
        assert_eq!(engine.delay().total_us(), 188 * 20_000);

        // one write per step plus the final exact set for both
        assert_eq!(short.output().history.len() - writes_before.0, 189);
        assert_eq!(long.output().history.len() - writes_before.1, 189);
    }

    #[test]
    fn short_mover_still_in_transit_after_its_own_steps() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut short = servo(0, 20_000);
        let mut long = servo(1, 10_000);
        long.set_angle(5.0);
        let base = short.output().history.len();
        let long_base = long.output().history.len();

        engine
            .move_batch(&mut [(&mut short, 95.0), (&mut long, 175.0)])
            .unwrap();

        let history = &short.output().history[base..];
        let final_level = level(&short, 95.0);
        // at its own third step the 5 degree mover has barely started
        assert!(history[2] < final_level);
        assert_eq!(history[2], level(&short, 90.0 + 5.0 * ease_ratio(3, 189)));
        // half way through both have covered half their displacement
        let mid_long = long.output().history[long_base + 93];
        assert_eq!(mid_long, level(&long, 5.0 + 170.0 * ease_ratio(94, 189)));
        assert_eq!(history[93], level(&short, 90.0 + 5.0 * ease_ratio(94, 189)));
        assert_eq!(*history.last().unwrap(), final_level);
    }

    #[test]
    fn batch_with_opposite_directions_stays_in_pulse_bounds() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut a = servo(0, 20_000);
        let mut b = servo(1, 20_000);

        let steps = engine.move_batch(&mut [(&mut a, 0.0), (&mut b, 180.0)]).unwrap();

        assert_eq!(steps, 50);
        assert_eq!(a.angle(), 0.0);
        assert_eq!(b.angle(), 180.0);
        for servo in [&a, &b] {
            assert!(servo
                .output()
                .history
                .iter()
                .all(|&duty| (1_000..=5_000).contains(&duty)));
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut batch: [(&mut Actuator<RecordingPwm>, f32); 0] = [];
        assert_eq!(engine.move_batch(&mut batch).unwrap(), 0);
    }

    #[test]
    fn custom_max_duration_changes_step_count() {
        let mut engine = MotionEngine::new(RecordingDelay::default())
            .with_max_move_duration(MicrosDurationU32::from_ticks(1_000_000));
        let mut servo = servo(0, 20_000);

        assert_eq!(engine.move_one(&mut servo, 180.0).unwrap(), 25);
        assert_eq!(servo.angle(), 180.0);
    }

    #[test]
    fn abort_stops_mid_trajectory() {
        static ABORT: AbortSignal = Signal::new();

        struct AbortingDelay {
            waits: u32,
            abort_after: u32,
        }

        impl DelayNs for AbortingDelay {
            fn delay_ns(&mut self, _ns: u32) {
                self.waits += 1;
                if self.waits == self.abort_after {
                    ABORT.signal(());
                }
            }
        }

        let mut engine = MotionEngine::new(AbortingDelay {
            waits: 0,
            abort_after: 10,
        })
        .with_abort(&ABORT);
        let mut servo = servo(0, 20_000);

        let result = engine.move_one(&mut servo, 0.0);

        assert_eq!(result, Err(ArmError::Aborted { step: 11, steps: 50 }));
        let expected = 90.0 - 90.0 * ease_ratio(10, 50);
        assert!((servo.angle() - expected).abs() < 1e-4);
    }

    #[test]
    fn stale_abort_is_discarded() {
        static ABORT: AbortSignal = Signal::new();
        ABORT.signal(());

        let mut engine = MotionEngine::new(RecordingDelay::default()).with_abort(&ABORT);
        let mut servo = servo(0, 20_000);

        assert_eq!(engine.move_one(&mut servo, 10.0).unwrap(), 44);
        assert_eq!(servo.angle(), 10.0);
    }

    #[test]
    fn target_beyond_travel_is_planned_to_end_stop() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut servo = servo(0, 20_000);

        let steps = engine.move_one(&mut servo, 1.0e6).unwrap();

        assert_eq!(steps, 50);
        assert_eq!(servo.angle(), 180.0);
        assert_eq!(engine.delay().waits_us.len(), 49);
        assert_eq!(servo.output().last(), Some(5_000));
    }

    #[test]
    fn batch_targets_are_bounded_to_travel() {
        let mut engine = MotionEngine::new(RecordingDelay::default());
        let mut low = servo(0, 20_000);
        let mut high = servo(1, 20_000);

        let mut batch = [(&mut low, -400.0), (&mut high, f32::NAN)];
        let steps = engine.move_batch(&mut batch).unwrap();

        assert_eq!(steps, 50);
        assert_eq!(batch[0].1, 0.0);
        assert_eq!(batch[1].1, 0.0);
        assert_eq!(low.angle(), 0.0);
        assert_eq!(high.angle(), 0.0);
    }
}
