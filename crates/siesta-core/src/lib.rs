#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the siesta duty-cycle firmware: sleep
//! scheduling, the operator console, wifi bring-up policy, and the boot
//! and abort state machine. Hardware enters through [`platform::Platform`].

pub mod app;
pub mod console;
pub mod failure;
pub mod platform;
pub mod sleep;
pub mod wifi;
