//! Deep-sleep entry and software reset.

use core::time::Duration;

use esp_hal::{
    peripherals::LPWR,
    rtc_cntl::{Rtc, sleep::TimerWakeupSource},
    system::software_reset,
};

/// Powers down with only the wakeup timer armed. The device comes back
/// through the bootloader when the timer fires.
pub fn deep_sleep_secs(secs: u32) -> ! {
    let mut rtc = Rtc::new(unsafe { LPWR::steal() });
    let timer = TimerWakeupSource::new(Duration::from_secs(u64::from(secs)));
    rtc.sleep_deep(&[&timer])
}

pub fn restart() -> ! {
    software_reset()
}
