//! Sleep decomposition across hardware-bounded deep-sleep cycles.

use log::{debug, info, warn};

use crate::platform::{Platform, SLEEP_RECORD_BYTES};

const RECORD_MAGIC: u32 = 0x3150_4C53; // "SLP1"
const RECORD_VERSION: u8 = 1;
const RECORD_CHECKSUM_OFFSET: usize = 12;

/// Hardware-tuned sleep bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SleepTuning {
    max_single_cycle_secs: u32,
    invalid_threshold_secs: u32,
    tick_ms: u32,
}

impl SleepTuning {
    /// The threshold is clamped above the cycle bound; the resume-chain
    /// arithmetic relies on that ordering.
    pub fn new(max_single_cycle_secs: u32, invalid_threshold_secs: u32, tick_ms: u32) -> Self {
        let max_single_cycle_secs = max_single_cycle_secs.max(1);
        Self {
            max_single_cycle_secs,
            invalid_threshold_secs: invalid_threshold_secs
                .max(max_single_cycle_secs.saturating_add(1)),
            tick_ms: tick_ms.clamp(10, 10_000),
        }
    }

    pub fn max_single_cycle_secs(&self) -> u32 {
        self.max_single_cycle_secs
    }

    pub fn invalid_threshold_secs(&self) -> u32 {
        self.invalid_threshold_secs
    }
}

impl Default for SleepTuning {
    fn default() -> Self {
        Self::new(3_600, 21_600, 1_000)
    }
}

/// Decoded retained record: seconds still owed after the current leg.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SleepRecord {
    pub remaining_secs: u32,
}

impl SleepRecord {
    pub fn encode(&self) -> [u8; SLEEP_RECORD_BYTES] {
        let mut raw = [0u8; SLEEP_RECORD_BYTES];
        raw[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
        raw[4] = RECORD_VERSION;
        raw[8..12].copy_from_slice(&self.remaining_secs.to_le_bytes());
        let checksum = checksum32(&raw[..RECORD_CHECKSUM_OFFSET]);
        raw[12..16].copy_from_slice(&checksum.to_le_bytes());
        raw
    }

    /// Any framing mismatch reads as "no pending sleep"; retained RAM powers
    /// up with arbitrary contents after a cold start.
    pub fn decode(raw: &[u8; SLEEP_RECORD_BYTES]) -> Option<Self> {
        let magic = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if magic != RECORD_MAGIC {
            return None;
        }
        if raw[4] != RECORD_VERSION {
            return None;
        }
        let expected = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        if checksum32(&raw[..RECORD_CHECKSUM_OFFSET]) != expected {
            return None;
        }
        Some(Self {
            remaining_secs: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        })
    }
}

/// Splits sleep requests into hardware-bounded legs and owns the retained
/// record; its interruptible wait is the device's only idle primitive.
#[derive(Clone, Copy, Debug)]
pub struct SleepScheduler {
    tuning: SleepTuning,
}

impl SleepScheduler {
    pub const fn new(tuning: SleepTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> SleepTuning {
        self.tuning
    }

    /// Waits up to `budget_secs` in short ticks, feeding the watchdog and
    /// re-checking the console predicate each tick. Returns true when
    /// interrupted; an interrupted wait has consumed none of its remaining
    /// budget and is never resumed.
    pub fn interruptible_wait<P: Platform>(&self, p: &mut P, budget_secs: u32) -> bool {
        if p.console_byte_ready() {
            return true;
        }
        let budget_ms = u64::from(budget_secs) * 1_000;
        let begin_ms = p.now_ms();
        while p.now_ms().saturating_sub(begin_ms) < budget_ms {
            p.feed_watchdog();
            p.sleep_tick(self.tuning.tick_ms);
            if p.console_byte_ready() {
                return true;
            }
        }
        false
    }

    /// Enters deep sleep for one leg, crediting time already spent in the
    /// cycle. Does not return on deep-sleep-capable hardware; the device
    /// reboots on wake. Returns without sleeping when the cycle budget is
    /// already gone.
    pub fn deep_sleep<P: Platform>(&self, p: &mut P, cycle_begin_ms: u64, period_secs: u32) {
        let capped_secs = period_secs.min(self.tuning.max_single_cycle_secs);
        let spent_secs = p.now_ms().saturating_sub(cycle_begin_ms) / 1_000;
        let left_secs = u64::from(capped_secs).saturating_sub(spent_secs);
        if left_secs == 0 {
            debug!("deep sleep skipped, cycle budget already spent");
            return;
        }
        info!("deep sleep {}s", left_secs);
        p.power_off_deep_sleep(left_secs as u32);
    }

    /// Arms and enters a sleep that may span several reboot legs.
    pub fn schedule_extended_deep_sleep<P: Platform>(
        &self,
        p: &mut P,
        cycle_begin_ms: u64,
        period_secs: u32,
    ) {
        if period_secs > self.tuning.invalid_threshold_secs {
            warn!(
                "sleep request {}s above threshold {}s, discarded",
                period_secs, self.tuning.invalid_threshold_secs
            );
            self.clear_record(p);
        } else if period_secs <= self.tuning.max_single_cycle_secs {
            self.clear_record(p);
            self.deep_sleep(p, cycle_begin_ms, period_secs);
        } else {
            let remaining_secs = period_secs - self.tuning.max_single_cycle_secs;
            info!(
                "extended sleep {}s armed, first leg {}s, owed {}s",
                period_secs, self.tuning.max_single_cycle_secs, remaining_secs
            );
            self.write_record(p, SleepRecord { remaining_secs });
            self.deep_sleep(p, cycle_begin_ms, self.tuning.max_single_cycle_secs);
        }
    }

    /// Continues a sleep chain armed by a previous session. Must run before
    /// anything else at boot; does not return while legs remain.
    pub fn resume_extended_deep_sleep_if_applicable<P: Platform>(&self, p: &mut P) {
        let raw = p.retained_read();
        let remaining_secs = match SleepRecord::decode(&raw) {
            Some(record) => record.remaining_secs,
            None => {
                if raw != [0u8; SLEEP_RECORD_BYTES] {
                    debug!("retained sleep slot unreadable, cleared");
                    self.clear_record(p);
                }
                0
            }
        };

        if remaining_secs > self.tuning.invalid_threshold_secs {
            warn!(
                "retained sleep {}s above threshold, cleared",
                remaining_secs
            );
            self.clear_record(p);
        } else if remaining_secs > self.tuning.max_single_cycle_secs {
            let owed_secs = remaining_secs - self.tuning.max_single_cycle_secs;
            info!(
                "extended sleep continues, this leg {}s, owed {}s",
                self.tuning.max_single_cycle_secs, owed_secs
            );
            self.write_record(
                p,
                SleepRecord {
                    remaining_secs: owed_secs,
                },
            );
            let now_ms = p.now_ms();
            self.deep_sleep(p, now_ms, self.tuning.max_single_cycle_secs);
        } else if remaining_secs > 0 {
            info!("extended sleep final leg {}s", remaining_secs);
            self.clear_record(p);
            let now_ms = p.now_ms();
            self.deep_sleep(p, now_ms, remaining_secs);
        } else {
            debug!("no extended sleep pending");
        }
    }

    /// Seconds still owed; zero when the record is absent or unreadable.
    pub fn pending_secs<P: Platform>(&self, p: &mut P) -> u32 {
        let raw = p.retained_read();
        SleepRecord::decode(&raw).map_or(0, |record| record.remaining_secs)
    }

    fn write_record<P: Platform>(&self, p: &mut P, record: SleepRecord) {
        p.retained_write(record.encode());
    }

    fn clear_record<P: Platform>(&self, p: &mut P) {
        p.retained_write([0u8; SLEEP_RECORD_BYTES]);
    }
}

fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;

    fn scheduler() -> SleepScheduler {
        SleepScheduler::new(SleepTuning::new(100, 600, 50))
    }

    #[test]
    fn short_request_sleeps_once_and_leaves_nothing_armed() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();

        sched.schedule_extended_deep_sleep(&mut p, begin_ms, 80);

        assert_eq!(p.sleep_legs.as_slice(), &[80]);
        assert_eq!(sched.pending_secs(&mut p), 0);
    }

    #[test]
    fn boundary_request_stays_a_single_leg() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();

        sched.schedule_extended_deep_sleep(&mut p, begin_ms, 100);

        assert_eq!(p.sleep_legs.as_slice(), &[100]);
        assert_eq!(sched.pending_secs(&mut p), 0);
    }

    #[test]
    fn long_request_chains_legs_that_sum_to_the_request() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();

        sched.schedule_extended_deep_sleep(&mut p, begin_ms, 350);

        // Each wake runs the resume check again until the chain drains.
        for _ in 0..8 {
            sched.resume_extended_deep_sleep_if_applicable(&mut p);
        }

        assert_eq!(p.sleep_legs.as_slice(), &[100, 100, 100, 50]);
        let total: u64 = p.sleep_legs.iter().map(|leg| u64::from(*leg)).sum();
        assert_eq!(total, 350);
        assert!(p.sleep_legs.iter().all(|leg| *leg <= 100));
        assert_eq!(sched.pending_secs(&mut p), 0);
    }

    #[test]
    fn oversized_request_is_discarded_without_sleeping() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();

        sched.schedule_extended_deep_sleep(&mut p, begin_ms, 601);

        assert!(p.sleep_legs.is_empty());
        assert_eq!(sched.pending_secs(&mut p), 0);
    }

    #[test]
    fn resume_is_a_noop_without_a_pending_record() {
        let sched = scheduler();
        let mut p = MockPlatform::new();

        sched.resume_extended_deep_sleep_if_applicable(&mut p);

        assert!(p.sleep_legs.is_empty());
        assert_eq!(p.retained_raw(), [0u8; SLEEP_RECORD_BYTES]);
    }

    #[test]
    fn oversized_retained_record_is_cleared_at_resume() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        p.retained_write(
            SleepRecord {
                remaining_secs: 5_000,
            }
            .encode(),
        );

        sched.resume_extended_deep_sleep_if_applicable(&mut p);

        assert!(p.sleep_legs.is_empty());
        assert_eq!(sched.pending_secs(&mut p), 0);
    }

    #[test]
    fn garbage_in_the_slot_reads_as_absent_and_is_cleared() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        p.retained_write([0xAB; SLEEP_RECORD_BYTES]);

        sched.resume_extended_deep_sleep_if_applicable(&mut p);

        assert!(p.sleep_legs.is_empty());
        assert_eq!(p.retained_raw(), [0u8; SLEEP_RECORD_BYTES]);
    }

    #[test]
    fn flipped_record_byte_fails_the_checksum() {
        let mut raw = SleepRecord { remaining_secs: 42 }.encode();
        assert!(SleepRecord::decode(&raw).is_some());
        raw[9] ^= 0x01;
        assert!(SleepRecord::decode(&raw).is_none());
    }

    #[test]
    fn wait_returns_immediately_when_a_byte_is_already_pending() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        p.type_bytes(b"x");
        let before_ms = p.now_ms();

        assert!(sched.interruptible_wait(&mut p, 10));
        assert_eq!(p.now_ms(), before_ms);
        assert_eq!(p.ticked_ms, 0);
    }

    #[test]
    fn wait_runs_the_full_budget_and_feeds_the_watchdog() {
        let sched = scheduler();
        let mut p = MockPlatform::new();

        assert!(!sched.interruptible_wait(&mut p, 2));

        assert!(p.ticked_ms >= 2_000);
        assert_eq!(p.watchdog_feeds, 40);
    }

    #[test]
    fn wait_stops_at_a_mid_budget_interrupt() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        p.type_bytes_after_ms(500, b"q");

        assert!(sched.interruptible_wait(&mut p, 10));
        assert!(p.ticked_ms < 1_000);
    }

    #[test]
    fn deep_sleep_credits_time_already_spent_in_the_cycle() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();
        p.sleep_tick(30_000);

        sched.deep_sleep(&mut p, begin_ms, 80);

        assert_eq!(p.sleep_legs.as_slice(), &[50]);
    }

    #[test]
    fn deep_sleep_skips_when_the_budget_is_already_spent() {
        let sched = scheduler();
        let mut p = MockPlatform::new();
        let begin_ms = p.now_ms();
        p.sleep_tick(90_000);

        sched.deep_sleep(&mut p, begin_ms, 80);

        assert!(p.sleep_legs.is_empty());
    }
}
