use anyhow::anyhow;
use embassy_time::Timer;
use esp_hal::delay::Delay;
use esp_hal::gpio::AnyPin;
use esp_hal::ledc::channel::{self, Channel, ChannelIFace, Number};
use esp_hal::ledc::timer::{self, LSClockSource, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::LEDC;
use esp_hal::time::Rate;
use log::{error, info};

use crate::config::{
    reference_arm_limits, reference_arm_model, ARM_SERVO_COUNT, BOOT_ANGLE, HEIGHT_OFFSET,
};
use crate::kinematics::motion_engine::{MotionEngine, ABORT_MOTION};
use crate::kinematics::point::CylindricalPoint;
use crate::robot::commands::ControlSignal;
use crate::robot::mechanism::Mechanism;
use crate::robot::servo::Calibration;

type Arm = Mechanism<Channel<'static, LowSpeed>, Delay>;

const TEST_POSE_ANGLE: f32 = 60.0;
const RESET_POSE_ANGLE: f32 = 90.0;

#[embassy_executor::task]
pub async fn arm_task(servo_pins: [AnyPin<'static>; ARM_SERVO_COUNT], ledc: LEDC<'static>) {
    info!("Starting arm task");
    if let Err(e) = run(servo_pins, ledc).await {
        error!("[ARM_TASK] stopped: {e}");
    }
}

async fn run(
    servo_pins: [AnyPin<'static>; ARM_SERVO_COUNT],
    ledc: LEDC<'static>,
) -> anyhow::Result<()> {
    let calibration = Calibration::mg996r();
    let ledc = mk_static!(Ledc<'static>, Ledc::new(ledc));
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
    let ledc: &'static Ledc<'static> = ledc;

    let mut timer_low = ledc.timer::<LowSpeed>(timer::Number::Timer0);
    timer_low
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: LSClockSource::APBClk,
            frequency: Rate::from_hz(calibration.frequency().raw()),
        })
        .map_err(|e| anyhow!("ledc timer: {e:?}"))?;
    let timer_low = mk_static!(timer::Timer<'static, LowSpeed>, timer_low);

    let [p0, p1, p2, p3, p4, p5] = servo_pins;
    let channels: [Channel<'static, LowSpeed>; ARM_SERVO_COUNT] = [
        ledc.channel(Number::Channel0, p0),
        ledc.channel(Number::Channel1, p1),
        ledc.channel(Number::Channel2, p2),
        ledc.channel(Number::Channel3, p3),
        ledc.channel(Number::Channel4, p4),
        ledc.channel(Number::Channel5, p5),
    ];
    let mut outputs = heapless::Vec::<_, ARM_SERVO_COUNT>::new();
    for mut channel in channels {
        // silent until the arm is activated
        channel
            .configure(channel::config::Config {
                timer: timer_low,
                duty_pct: 0,
                pin_config: channel::config::PinConfig::PushPull,
            })
            .map_err(|e| anyhow!("ledc channel: {e:?}"))?;
        let _ = outputs.push(channel);
    }

    let engine = MotionEngine::new(Delay::new()).with_abort(&ABORT_MOTION);
    let mut arm: Arm = Mechanism::new(outputs, calibration, engine).map_err(|e| anyhow!("{e}"))?;
    setup(&mut arm).map_err(|e| anyhow!("{e}"))?;
    arm.activate_all();
    info!("Arm ready:\n{}", arm.report());

    let reach = CylindricalPoint::new(180.0, 30.0, HEIGHT_OFFSET + 80.0);
    loop {
        let test_pose = uniform_pose(TEST_POSE_ANGLE).map_err(|e| anyhow!("{e}"))?;
        if let Err(e) = arm.move_batch(&test_pose) {
            error!("[ARM_TASK] test pose: {e}");
        }
        info!("Test pose:\n{}", arm.report());

        let reset_pose = uniform_pose(RESET_POSE_ANGLE).map_err(|e| anyhow!("{e}"))?;
        if let Err(e) = arm.move_batch(&reset_pose) {
            error!("[ARM_TASK] reset pose: {e}");
        }

        match arm.move_to(&reach) {
            Ok(steps) => info!("Reached {reach:?} in {steps} steps"),
            Err(e) => error!("[ARM_TASK] reach {reach:?}: {e}"),
        }

        Timer::after_secs(2).await;
    }
}

/// Boot pose, per joint limits and geometry of the reference arm.
fn setup(arm: &mut Arm) -> crate::error::ArmResult<()> {
    for (index, limits) in reference_arm_limits().into_iter().enumerate() {
        arm.set_angle(index, BOOT_ANGLE)?;
        arm.set_limits(index, limits.lower, limits.upper)?;
    }
    arm.set_kinematic_model(reference_arm_model()?)
}

fn uniform_pose(angle: f32) -> crate::error::ArmResult<ControlSignal> {
    let mut signal = ControlSignal::new();
    for index in 0..ARM_SERVO_COUNT {
        signal.push(index, angle)?;
    }
    Ok(signal)
}
