//! Abort handling: persist a failure note, give the operator a grace
//! window, then power down or restart.

use core::fmt::Write as _;

use heapless::String;
use log::{error, info, warn};

use crate::{
    platform::{FAILURE_RECORD_BYTES, Platform},
    sleep::SleepScheduler,
};

/// Longest message carried inside one rendered failure record.
pub const FAILURE_MSG_BYTES: usize = 40;

/// One persisted failure note, readable on the next boot.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FailureRecord {
    pub time_secs: u64,
    pub msg: String<FAILURE_MSG_BYTES>,
}

impl FailureRecord {
    /// Builds a record, truncating the message to what fits.
    pub fn new(time_secs: u64, msg: &str) -> Self {
        let mut out = Self {
            time_secs,
            msg: String::new(),
        };
        for ch in msg.chars() {
            if out.msg.push(ch).is_err() {
                break;
            }
        }
        out
    }

    /// Renders the `time=<secs> msg=<text>` line stored on the device.
    pub fn render(&self) -> String<FAILURE_RECORD_BYTES> {
        let mut out = String::new();
        // The header always fits; the message is truncated to the remainder.
        let _ = write!(out, "time={} msg=", self.time_secs);
        for ch in self.msg.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        out
    }

    /// Parses a stored line back into a record, `None` on foreign data.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("time=")?;
        let (secs, msg) = rest.split_once(" msg=")?;
        let time_secs = secs.parse().ok()?;
        Some(Self::new(time_secs, msg))
    }
}

/// Logs the fault, persists it, then waits out the grace window.
///
/// Returns `true` when the operator interrupted the countdown; the device
/// then stays up. Otherwise powers down for `cooldown_secs` on hardware
/// that can, or restarts, and never reaches the final `false` in practice.
pub fn abort<P: Platform>(
    p: &mut P,
    scheduler: &SleepScheduler,
    grace_secs: u32,
    cooldown_secs: u32,
    msg: &str,
) -> bool {
    error!("aborting: {}", msg);

    let record = FailureRecord::new(p.wall_clock_secs(), msg);
    if !p.store_failure_record(record.render().as_str()) {
        warn!("failure record not stored");
    }

    info!("abort in {}s unless interrupted", grace_secs);
    if scheduler.interruptible_wait(p, grace_secs) {
        info!("abort skipped by console input");
        return true;
    }

    if p.supports_deep_sleep() {
        let now_ms = p.now_ms();
        scheduler.deep_sleep(p, now_ms, cooldown_secs);
    } else {
        p.restart();
    }
    false
}
