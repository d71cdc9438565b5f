#![cfg_attr(not(test), no_std)]

//! ESP32-S3 glue for the siesta firmware: RTC-retained sleep record,
//! deep-sleep and reset entry points, the console UART, and the flash
//! failure log.

pub mod power;
pub mod retained;
pub mod serial;
pub mod storage;
