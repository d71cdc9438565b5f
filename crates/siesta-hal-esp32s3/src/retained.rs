//! Sleep-record slot in RTC fast RAM, preserved across deep sleep.

use siesta_core::platform::SLEEP_RECORD_BYTES;

// Survives deep sleep and software resets; holds arbitrary bits after a
// cold power-up, so callers must validate what they read.
#[esp_hal::ram(unstable(rtc_fast))]
static mut SLEEP_SLOT: [u8; SLEEP_RECORD_BYTES] = [0; SLEEP_RECORD_BYTES];

pub fn read() -> [u8; SLEEP_RECORD_BYTES] {
    critical_section::with(|_| unsafe { SLEEP_SLOT })
}

pub fn write(raw: [u8; SLEEP_RECORD_BYTES]) {
    critical_section::with(|_| unsafe { SLEEP_SLOT = raw });
}
