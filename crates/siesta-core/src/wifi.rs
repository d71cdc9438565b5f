//! Primary/backup network selection and bounded association retries.

use log::{info, warn};

use crate::{platform::Platform, sleep::SleepScheduler};

/// Credentials for one configured network, baked in at build time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiNetwork {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl WifiNetwork {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}

/// Which configured network one scan settled on. Never persisted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkChoice {
    None,
    Primary,
    Backup,
}

/// Retry budget for one connection attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiConnector {
    pub settle_secs: u32,
    pub retries: u32,
}

impl Default for WifiConnector {
    fn default() -> Self {
        Self {
            settle_secs: 10,
            retries: 12,
        }
    }
}

impl WifiConnector {
    /// One full connection attempt: scan, choose, associate, poll.
    ///
    /// Interruptible at every settle interval; an interrupt, a refused
    /// association, or an exhausted retry budget all fail the attempt and
    /// put the radio back down.
    pub fn connect<P: Platform>(
        &self,
        p: &mut P,
        scheduler: &SleepScheduler,
        primary: &WifiNetwork,
        backup: &WifiNetwork,
        skip_if_already_connected: bool,
    ) -> bool {
        if skip_if_already_connected && p.wifi_is_associated() {
            info!("wifi already associated");
            return true;
        }

        let target = match choose_network(p, primary, backup) {
            NetworkChoice::Primary => primary,
            NetworkChoice::Backup => {
                info!("primary not visible, using backup {}", backup.ssid);
                backup
            }
            NetworkChoice::None => {
                warn!("no configured network visible");
                return false;
            }
        };

        if !p.wifi_begin_association(target.ssid, target.password) {
            warn!("association with {} refused", target.ssid);
            p.wifi_disconnect();
            return false;
        }

        for attempt in 0..=self.retries {
            if scheduler.interruptible_wait(p, self.settle_secs) {
                info!("wifi connect interrupted");
                p.wifi_disconnect();
                return false;
            }
            if p.wifi_is_associated() {
                info!(
                    "wifi associated with {} (attempt {})",
                    target.ssid,
                    attempt + 1
                );
                return true;
            }
        }

        warn!(
            "wifi connect to {} gave up after {} attempts",
            target.ssid,
            self.retries + 1
        );
        p.wifi_disconnect();
        false
    }
}

/// Scan pass: primary wins whenever visible, backup is the fallback.
pub fn choose_network<P: Platform>(
    p: &mut P,
    primary: &WifiNetwork,
    backup: &WifiNetwork,
) -> NetworkChoice {
    let mut primary_seen = false;
    let mut backup_seen = false;
    p.wifi_scan(&mut |ssid| {
        // Hidden networks scan as an empty ssid; those never match, and
        // neither does an unset (empty) primary or backup entry.
        if ssid.is_empty() {
            return;
        }
        if ssid == primary.ssid {
            primary_seen = true;
        }
        if ssid == backup.ssid {
            backup_seen = true;
        }
    });
    if primary_seen {
        NetworkChoice::Primary
    } else if backup_seen {
        NetworkChoice::Backup
    } else {
        NetworkChoice::None
    }
}
