#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::future::pending;
use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{AnyPin, Pin};
use esp_hal::timer::timg::TimerGroup;
use log::info;
use servo_arm::config::ARM_SERVO_COUNT;
use servo_arm::tasks::arm_task::arm_task;

esp_bootloader_esp_idf::esp_app_desc!();

//ARM: [base, shoulder, elbow, wrist, wrist roll, gripper]
//PINS: [32, 33, 25, 26, 27, 14]

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let p = esp_hal::init(config);

    let timer0 = TimerGroup::new(p.TIMG1);
    esp_hal_embassy::init(timer0.timer0);
    info!("Embassy initialized");

    let servo_pins: [AnyPin<'static>; ARM_SERVO_COUNT] = [
        p.GPIO32.degrade(),
        p.GPIO33.degrade(),
        p.GPIO25.degrade(),
        p.GPIO26.degrade(),
        p.GPIO27.degrade(),
        p.GPIO14.degrade(),
    ];

    info!("Starting servo arm...");
    spawner
        .spawn(arm_task(servo_pins, p.LEDC))
        .expect("Fail spawning arm task");

    loop {
        pending::<()>().await;
    }
}
