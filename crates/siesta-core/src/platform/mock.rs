use heapless::{Deque, String, Vec};

use super::{FAILURE_RECORD_BYTES, Platform, SLEEP_RECORD_BYTES};

/// No-hardware platform used during bring-up and by the host tests.
///
/// Time is virtual: `sleep_tick` advances the clock instantly, so waits that
/// take minutes on the device run in microseconds here. Deep sleep and
/// restart return after recording themselves, which lets a test walk a whole
/// resume chain by calling the scheduler again.
#[derive(Debug)]
pub struct MockPlatform {
    now_ms: u64,
    wall_base_secs: u64,
    deep_sleep_supported: bool,
    console: Deque<u8, 256>,
    console_arm: Option<(u64, &'static [u8])>,
    retained: [u8; SLEEP_RECORD_BYTES],
    visible_networks: Vec<&'static str, 4>,
    associated: bool,
    associate_after_polls: Option<u32>,
    associate_countdown: Option<u32>,
    begin_accepts: bool,
    store_accepts: bool,
    failure_record: Option<String<FAILURE_RECORD_BYTES>>,
    pub sleep_legs: Vec<u32, 16>,
    pub restarts: u32,
    pub watchdog_feeds: u32,
    pub ticked_ms: u64,
    pub scan_count: u32,
    pub begin_count: u32,
    pub disconnect_count: u32,
    pub begun_ssid: Option<String<32>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            wall_base_secs: 1_700_000_000,
            deep_sleep_supported: true,
            console: Deque::new(),
            console_arm: None,
            retained: [0u8; SLEEP_RECORD_BYTES],
            visible_networks: Vec::new(),
            associated: false,
            associate_after_polls: Some(0),
            associate_countdown: None,
            begin_accepts: true,
            store_accepts: true,
            failure_record: None,
            sleep_legs: Vec::new(),
            restarts: 0,
            watchdog_feeds: 0,
            ticked_ms: 0,
            scan_count: 0,
            begin_count: 0,
            disconnect_count: 0,
            begun_ssid: None,
        }
    }

    pub fn with_deep_sleep(mut self, supported: bool) -> Self {
        self.deep_sleep_supported = supported;
        self
    }

    /// Queues console input as if the operator had already typed it.
    pub fn type_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            let _ = self.console.push_back(*byte);
        }
    }

    /// Delivers `bytes` once the virtual clock has advanced by `ms`.
    pub fn type_bytes_after_ms(&mut self, ms: u64, bytes: &'static [u8]) {
        self.console_arm = Some((self.now_ms + ms, bytes));
    }

    pub fn set_visible_networks(&mut self, ssids: &[&'static str]) {
        self.visible_networks.clear();
        for ssid in ssids {
            let _ = self.visible_networks.push(ssid);
        }
    }

    /// Pretend the radio is already associated (skip-if-connected path).
    pub fn set_associated(&mut self, associated: bool) {
        self.associated = associated;
    }

    /// Number of status polls after `wifi_begin_association` before the
    /// association reads as up; `None` never associates.
    pub fn set_associate_after_polls(&mut self, polls: Option<u32>) {
        self.associate_after_polls = polls;
    }

    pub fn set_begin_accepts(&mut self, accepts: bool) {
        self.begin_accepts = accepts;
    }

    pub fn set_store_accepts(&mut self, accepts: bool) {
        self.store_accepts = accepts;
    }

    pub fn stored_failure_record(&self) -> Option<&str> {
        self.failure_record.as_deref()
    }

    pub fn retained_raw(&self) -> [u8; SLEEP_RECORD_BYTES] {
        self.retained
    }

    fn deliver_armed_bytes(&mut self) {
        if let Some((at_ms, bytes)) = self.console_arm
            && self.now_ms >= at_ms
        {
            self.console_arm = None;
            self.type_bytes(bytes);
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn now_ms(&mut self) -> u64 {
        self.now_ms
    }

    fn sleep_tick(&mut self, ms: u32) {
        self.now_ms += u64::from(ms);
        self.ticked_ms += u64::from(ms);
        self.deliver_armed_bytes();
    }

    fn feed_watchdog(&mut self) {
        self.watchdog_feeds += 1;
    }

    fn wall_clock_secs(&mut self) -> u64 {
        self.wall_base_secs + self.now_ms / 1_000
    }

    fn console_byte_ready(&mut self) -> bool {
        !self.console.is_empty()
    }

    fn console_read_byte(&mut self) -> Option<u8> {
        self.console.pop_front()
    }

    fn retained_read(&mut self) -> [u8; SLEEP_RECORD_BYTES] {
        self.retained
    }

    fn retained_write(&mut self, raw: [u8; SLEEP_RECORD_BYTES]) {
        self.retained = raw;
    }

    fn wifi_is_associated(&mut self) -> bool {
        if self.associated {
            return true;
        }
        match self.associate_countdown {
            Some(0) => {
                self.associated = true;
                true
            }
            Some(left) => {
                self.associate_countdown = Some(left - 1);
                false
            }
            None => false,
        }
    }

    fn wifi_scan(&mut self, visit: &mut dyn FnMut(&str)) {
        self.scan_count += 1;
        for ssid in &self.visible_networks {
            visit(ssid);
        }
    }

    fn wifi_begin_association(&mut self, ssid: &str, _password: &str) -> bool {
        self.begin_count += 1;
        if !self.begin_accepts {
            return false;
        }
        let mut stored = String::new();
        let _ = stored.push_str(ssid);
        self.begun_ssid = Some(stored);
        self.associate_countdown = self.associate_after_polls;
        true
    }

    fn wifi_disconnect(&mut self) {
        self.disconnect_count += 1;
        self.associated = false;
        self.associate_countdown = None;
    }

    fn supports_deep_sleep(&self) -> bool {
        self.deep_sleep_supported
    }

    fn power_off_deep_sleep(&mut self, secs: u32) {
        let _ = self.sleep_legs.push(secs);
        self.now_ms += u64::from(secs) * 1_000;
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn store_failure_record(&mut self, line: &str) -> bool {
        if !self.store_accepts {
            return false;
        }
        let mut stored = String::new();
        for c in line.chars() {
            if stored.push(c).is_err() {
                break;
            }
        }
        self.failure_record = Some(stored);
        true
    }

    fn take_failure_record(&mut self) -> Option<String<FAILURE_RECORD_BYTES>> {
        self.failure_record.take()
    }
}
