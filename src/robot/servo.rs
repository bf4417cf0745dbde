//! Single servo actuator.
//!
//! An [`Actuator`] owns one PWM channel together with the calibration needed to turn an
//! angle into a pulse width, and the pulse width into a duty level for that channel.
//! The pulse is never stored: it is recomputed from the current angle on every write.
use core::fmt::Display;

use embedded_hal::pwm::SetDutyCycle;
use fugit::{HertzU32, MicrosDurationU32};
use log::{error, info, trace};
#[cfg(not(test))]
use micromath::F32Ext;

/// Timing data of a servo model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Length of one PWM period.
    pub period: MicrosDurationU32,
    /// Pulse width commanding 0 degrees.
    pub min_pulse: MicrosDurationU32,
    /// Pulse width commanding `angle_range` degrees.
    pub max_pulse: MicrosDurationU32,
    /// Full mechanical travel in degrees.
    pub angle_range: f32,
}

impl Calibration {
    pub const fn new(
        period: MicrosDurationU32,
        min_pulse: MicrosDurationU32,
        max_pulse: MicrosDurationU32,
        angle_range: f32,
    ) -> Self {
        Self {
            period,
            min_pulse,
            max_pulse,
            angle_range,
        }
    }

    /// MG996R (and MG995): 50Hz, 500-2500us over 180 degrees.
    pub const fn mg996r() -> Self {
        Self::new(
            MicrosDurationU32::from_ticks(20_000),
            MicrosDurationU32::from_ticks(500),
            MicrosDurationU32::from_ticks(2_500),
            180.0,
        )
    }

    /// SG90: 50Hz, 500-2400us over 180 degrees.
    pub const fn sg90() -> Self {
        Self::new(
            MicrosDurationU32::from_ticks(20_000),
            MicrosDurationU32::from_ticks(500),
            MicrosDurationU32::from_ticks(2_400),
            180.0,
        )
    }

    /// PWM frequency matching the period, as the LEDC timer wants it.
    pub fn frequency(&self) -> HertzU32 {
        HertzU32::from_raw(1_000_000 / self.period.to_micros().max(1))
    }

    /// Pulse width in microseconds commanding `angle`.
    pub fn pulse_width(&self, angle: f32) -> f32 {
        let min = self.min_pulse.to_micros() as f32;
        let max = self.max_pulse.to_micros() as f32;
        (angle / self.angle_range) * (max - min) + min
    }

    /// Scales the pulse for `angle` to a channel whose full period is `max_duty` counts.
    ///
    /// Example: 1500us / 20000us * 40000 = 3000
    pub fn duty_level(&self, angle: f32, max_duty: u16) -> u16 {
        let period = self.period.to_micros() as f32;
        let level = self.pulse_width(angle) / period * max_duty as f32;
        // NaN from a zero period or range ends up at 0
        level.round().max(0.0).min(max_duty as f32) as u16
    }
}

/// Inclusive angle bounds enforced by high level moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub lower: f32,
    pub upper: f32,
}

impl Limits {
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.max(self.lower).min(self.upper)
    }
}

impl Display for Limits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{:.1}, {:.1}]", self.lower, self.upper)
    }
}

pub struct Actuator<PWM> {
    pwm: PWM,
    id: usize,
    calibration: Calibration,
    limits: Limits,
    angle: f32,
    active: bool,
}

impl<PWM> core::fmt::Debug for Actuator<PWM> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Actuator")
            .field("id", &self.id)
            .field("angle", &self.angle)
            .field("limits", &self.limits)
            .field("active", &self.active)
            .finish()
    }
}

impl<PWM> Actuator<PWM> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn output(&self) -> &PWM {
        &self.pwm
    }

    /// Replaces the timing data. The caller keeps the current angle and limits valid
    /// for the new range.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Stores the bounds used by later smooth moves. The current angle is left as is.
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        self.limits = Limits { lower, upper };
    }

    /// Pulse width currently commanded, derived from the angle.
    pub fn pulse_width(&self) -> f32 {
        self.calibration.pulse_width(self.angle)
    }
}

impl<PWM> Actuator<PWM>
where
    PWM: SetDutyCycle,
{
    /// Creates an inactive actuator resting at mid travel with no limits beyond its range.
    pub fn new(pwm: PWM, id: usize, calibration: Calibration) -> Self {
        Self {
            pwm,
            id,
            calibration,
            limits: Limits {
                lower: 0.0,
                upper: calibration.angle_range,
            },
            angle: calibration.angle_range / 2.0,
            active: false,
        }
    }

    /// Sets the servo angle in degrees, without easing.
    ///
    /// The angle is clamped into `[0, angle_range]`, the full mechanical travel, not the
    /// user limits. Once active, the duty of the new angle is written immediately.
    ///
    /// # Returns
    /// The angle actually stored.
    pub fn set_angle(&mut self, angle: f32) -> f32 {
        // f32::max drops NaN, so a NaN request lands on 0
        self.angle = angle.max(0.0).min(self.calibration.angle_range);
        if self.active {
            self.write_duty();
        }
        self.angle
    }

    /// Starts driving the channel at the current angle. Calling it again does nothing.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.write_duty();
        info!(
            "servo {} active at {:.1} degrees ({}Hz)",
            self.id,
            self.angle,
            self.calibration.frequency().raw()
        );
    }

    /// Swaps the output channel, returning the previous one.
    pub fn replace_output(&mut self, pwm: PWM) -> PWM {
        let old = core::mem::replace(&mut self.pwm, pwm);
        if self.active {
            self.write_duty();
        }
        old
    }

    fn write_duty(&mut self) {
        // THE WIDTH OF THE PULSE DRIVES THE ANGLE, NOT FREQ
        let duty = self
            .calibration
            .duty_level(self.angle, self.pwm.max_duty_cycle());
        trace!("servo {} duty: {duty}", self.id);
        if let Err(e) = self.pwm.set_duty_cycle(duty) {
            error!(
                "servo {} error writing angle {:.1}: {:?}",
                self.id, self.angle, e
            );
        }
    }
}
