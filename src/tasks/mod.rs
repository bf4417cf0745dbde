//! Embassy tasks of the ESP32 firmware.
//!
//! - [`arm_task`]: sets up the LEDC channels and drives the reference arm.
//!
//! Tasks are spawned from `main.rs`.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.init_with(|| $val)
    }};
}

pub mod arm_task;
