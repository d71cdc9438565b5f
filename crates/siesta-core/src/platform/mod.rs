//! Platform abstraction layer.

pub mod mock;

/// Raw size of the retained sleep slot, framing included.
pub const SLEEP_RECORD_BYTES: usize = 16;

/// Upper bound for one rendered failure-record line.
pub const FAILURE_RECORD_BYTES: usize = 64;

/// Hardware and host services injected into the core.
///
/// One implementation per target: the ESP32-S3 board, the host simulator,
/// and the scripted mock used by tests. The core has no other way to reach
/// hardware.
pub trait Platform {
    /// Monotonic milliseconds since boot.
    fn now_ms(&mut self) -> u64;

    /// Short cooperative pause; the only way the core spends idle time.
    fn sleep_tick(&mut self, ms: u32);

    /// Liveness signal for targets running a hardware watchdog.
    fn feed_watchdog(&mut self);

    /// Best-effort epoch seconds, used to stamp failure records.
    fn wall_clock_secs(&mut self) -> u64;

    /// True when a console byte is waiting. Side-effect-free; this is also
    /// the interrupt predicate polled by every interruptible wait.
    fn console_byte_ready(&mut self) -> bool;

    fn console_read_byte(&mut self) -> Option<u8>;

    /// Raw retained slot. Survives a deep-sleep reset, not a power loss.
    fn retained_read(&mut self) -> [u8; SLEEP_RECORD_BYTES];

    fn retained_write(&mut self, raw: [u8; SLEEP_RECORD_BYTES]);

    fn wifi_is_associated(&mut self) -> bool;

    /// Visits the SSID of every network currently visible to the radio.
    fn wifi_scan(&mut self, visit: &mut dyn FnMut(&str));

    /// Starts associating with the given credentials. Returns false when the
    /// radio refused the request; completion is observed through
    /// [`Platform::wifi_is_associated`].
    fn wifi_begin_association(&mut self, ssid: &str, password: &str) -> bool;

    fn wifi_disconnect(&mut self);

    /// Whether this target can enter true deep sleep.
    fn supports_deep_sleep(&self) -> bool;

    /// Powers down for `secs`. On capable hardware this never returns and
    /// the device reboots on wake; test doubles record the leg and return.
    fn power_off_deep_sleep(&mut self, secs: u32);

    /// Plain reboot. Never returns on hardware; test doubles record it.
    fn restart(&mut self);

    /// Best-effort write of a rendered failure record.
    fn store_failure_record(&mut self, line: &str) -> bool;

    /// One-shot read: returns the stored failure record and deletes it.
    fn take_failure_record(&mut self) -> Option<heapless::String<FAILURE_RECORD_BYTES>>;
}
